pub mod config;
pub mod logging;

pub mod browser;
pub mod capture;
pub mod error;
pub mod saver;
pub mod url_model;
