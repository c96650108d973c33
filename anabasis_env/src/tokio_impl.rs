//! Production implementation of TickSource using Tokio.

use crate::error::EnvError;
use crate::frame::{Frame, FrameRequest};
use crate::ledger::FrameLedger;
use crate::TickSource;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Production tick source backed by Tokio timers and the monotonic clock.
///
/// Frames fire roughly once per refresh period. The actual firing time is
/// read from the clock, so scheduler lag shows up as a longer elapsed time
/// instead of being silently absorbed.
pub struct TokioTickSource {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Nominal refresh period
    period: Duration,

    /// Outstanding request bookkeeping
    ledger: Mutex<FrameLedger>,
}

impl TokioTickSource {
    /// Creates a tick source firing at `refresh_hz`.
    pub fn new(refresh_hz: f64) -> Result<Self, EnvError> {
        let period = EnvError::check_refresh_rate(refresh_hz)?;
        Ok(Self {
            start: Instant::now(),
            period: Duration::from_secs_f64(period),
            ledger: Mutex::new(FrameLedger::new()),
        })
    }

    /// Creates an Arc-wrapped tick source for sharing with a session.
    pub fn shared(refresh_hz: f64) -> Result<Arc<Self>, EnvError> {
        Self::new(refresh_hz).map(Arc::new)
    }

    /// Nominal refresh period.
    pub fn period(&self) -> Duration {
        self.period
    }

    fn ledger(&self) -> MutexGuard<'_, FrameLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TickSource for TokioTickSource {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn request_frame(&self) -> FrameRequest {
        self.ledger().request()
    }

    fn cancel_frame(&self, request: FrameRequest) {
        self.ledger().cancel(request);
    }

    fn pending(&self) -> Option<FrameRequest> {
        self.ledger().pending()
    }

    async fn next_frame(&self) -> Option<Frame> {
        self.pending()?;
        tokio::time::sleep(self.period).await;
        let request = self.ledger().take()?;
        Some(Frame::new(request, self.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tokio_tick_source_time() {
        let ticks = TokioTickSource::new(120.0).unwrap();
        let request = ticks.request_frame();
        let t1 = ticks.now();

        let frame = ticks.next_frame().await.unwrap();

        assert_eq!(frame.request, request);
        assert!(frame.timestamp > t1);
        assert!(frame.timestamp - t1 >= ticks.period());
    }

    #[tokio::test]
    async fn test_no_frame_without_request() {
        let ticks = TokioTickSource::new(60.0).unwrap();
        assert!(ticks.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_request_never_fires() {
        let ticks = TokioTickSource::new(60.0).unwrap();
        let request = ticks.request_frame();
        ticks.cancel_frame(request);

        assert_eq!(ticks.pending(), None);
        assert!(ticks.next_frame().await.is_none());
    }

    #[test]
    fn test_invalid_refresh_rate() {
        assert!(matches!(
            TokioTickSource::new(0.0),
            Err(EnvError::InvalidRefreshRate(_))
        ));
        assert!(TokioTickSource::new(f64::NAN).is_err());
    }
}
