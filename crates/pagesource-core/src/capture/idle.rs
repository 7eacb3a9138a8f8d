//! Network-idle bookkeeping for load-completion detection.

use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Tracks in-flight requests and the load event to decide when a page has
/// reached a quiescent network state: load fired, nothing in flight, and at
/// least a settling interval since the last network activity.
pub(crate) struct NetworkIdleTracker {
    in_flight: HashSet<String>,
    load_fired: bool,
    last_activity: Instant,
    settle: Duration,
}

impl NetworkIdleTracker {
    pub(crate) fn new(settle: Duration) -> Self {
        Self {
            in_flight: HashSet::new(),
            load_fired: false,
            last_activity: Instant::now(),
            settle,
        }
    }

    pub(crate) fn request_started(&mut self, request_id: &str) {
        self.in_flight.insert(request_id.to_string());
        self.last_activity = Instant::now();
    }

    pub(crate) fn request_finished(&mut self, request_id: &str) {
        self.in_flight.remove(request_id);
        self.last_activity = Instant::now();
    }

    /// Any other network event (a response header arriving, say) also
    /// counts as activity and restarts the settling interval.
    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub(crate) fn load_event_fired(&mut self) {
        self.load_fired = true;
    }

    pub(crate) fn is_quiescent(&self) -> bool {
        self.load_fired && self.in_flight.is_empty() && self.last_activity.elapsed() >= self.settle
    }
}
