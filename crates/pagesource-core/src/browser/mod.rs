//! Headless Chromium page loader: process launch, DevTools Protocol
//! transport, and the page session the capture collector drives.

mod cdp;
mod launch;
mod session;

pub use cdp::CdpEvent;
pub use launch::{launch, LaunchOptions};
pub use session::BrowserSession;
