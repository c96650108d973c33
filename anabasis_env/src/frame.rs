//! Frame tickets and delivered frames.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ticket returned by [`crate::TickSource::request_frame`].
///
/// Ids increase monotonically per tick source, so a ticket issued after a
/// cancellation never collides with the cancelled one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameRequest(pub u64);

impl FrameRequest {
    /// Returns the raw ticket number.
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FrameRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// A fired frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The ticket this frame answers
    pub request: FrameRequest,

    /// Monotonic time the frame fired, relative to tick source creation
    pub timestamp: Duration,
}

impl Frame {
    /// Creates a frame for the given ticket.
    pub fn new(request: FrameRequest, timestamp: Duration) -> Self {
        Self { request, timestamp }
    }

    /// Seconds elapsed since `earlier`, saturating at zero.
    pub fn seconds_since(&self, earlier: Duration) -> f64 {
        self.timestamp.saturating_sub(earlier).as_secs_f64()
    }
}
