//! Core tick source trait for the Anabasis playback engine.

use crate::frame::{Frame, FrameRequest};
use async_trait::async_trait;
use std::time::Duration;

/// The display-refresh interface.
///
/// This trait abstracts the per-frame callback so the animation driver can
/// run against a real refresh loop or a scripted one.
///
/// # Implementations
///
/// - **Production**: `TokioTickSource` - wraps `tokio::time`, `Instant`
/// - **Simulation**: `SimTickSource` - virtual clock with seeded jitter
///
/// # Contract
///
/// - A frame only fires for the currently pending request.
/// - Requesting again replaces the pending request.
/// - Cancelling a request that is no longer pending is a no-op.
#[async_trait]
pub trait TickSource: Send + Sync + 'static {
    /// Returns the current monotonic time since the source was created.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Schedules the next frame and returns its ticket.
    fn request_frame(&self) -> FrameRequest;

    /// Cancels a scheduled frame.
    fn cancel_frame(&self, request: FrameRequest);

    /// Returns the outstanding ticket, if any.
    fn pending(&self) -> Option<FrameRequest>;

    /// Waits for the next refresh and fires the pending frame.
    ///
    /// Returns `None` when nothing is scheduled (or the request was
    /// cancelled while waiting).
    async fn next_frame(&self) -> Option<Frame>;
}
