//! Per-client request throttling for the IPC socket

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ClientId;

/// Fixed-window request counter keyed by client.
///
/// Each client may issue `max_requests` within one `window`; the window
/// restarts with the first request after it elapses.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: HashMap<ClientId, Window>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    used: u32,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: HashMap::new(),
        }
    }

    /// `true` if the request is admitted
    pub fn check(&mut self, client_id: &ClientId) -> bool {
        self.check_at(client_id, Instant::now())
    }

    pub fn check_at(&mut self, client_id: &ClientId, now: Instant) -> bool {
        let window = self.windows.entry(*client_id).or_insert(Window {
            started: now,
            used: 0,
        });

        if now.saturating_duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                used: 0,
            };
        }

        if window.used < self.max_requests {
            window.used += 1;
            true
        } else {
            false
        }
    }

    /// Forget a disconnected client
    pub fn remove_client(&mut self, client_id: &ClientId) {
        self.windows.remove(client_id);
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}
