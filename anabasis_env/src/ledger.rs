//! Pending-frame bookkeeping shared by every tick source.

use crate::frame::FrameRequest;

/// Tracks the single outstanding frame request.
///
/// Issuing a new request supersedes the previous one: at most one frame is
/// ever in flight, which is what keeps two writers off the marker.
#[derive(Debug, Default)]
pub struct FrameLedger {
    next_id: u64,
    pending: Option<FrameRequest>,
    issued: u64,
    cancelled: u64,
}

impl FrameLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh ticket and makes it the pending one.
    pub fn request(&mut self) -> FrameRequest {
        self.next_id += 1;
        self.issued += 1;
        let request = FrameRequest(self.next_id);
        self.pending = Some(request);
        request
    }

    /// Cancels `request` if it is still pending. Returns whether it was.
    pub fn cancel(&mut self, request: FrameRequest) -> bool {
        if self.pending == Some(request) {
            self.pending = None;
            self.cancelled += 1;
            true
        } else {
            false
        }
    }

    /// The outstanding ticket, if any.
    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Removes and returns the outstanding ticket (the frame is firing).
    pub fn take(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }

    /// Total tickets issued.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Total tickets cancelled before firing.
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}
