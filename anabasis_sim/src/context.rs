//! Simulated tick source implementing TickSource for deterministic runs.

use anabasis_env::{EnvError, Frame, FrameLedger, FrameRequest, TickSource};
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tick source backed by a virtual clock and seeded frame jitter.
///
/// This implements `TickSource` using:
/// - A virtual clock that only moves when a frame fires (or on demand)
/// - A seeded ChaCha8 RNG perturbing each refresh interval by up to
///   `±jitter × period`, so elapsed-time handling is exercised
/// - The shared [`FrameLedger`] for request bookkeeping
pub struct SimTickSource {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,

    /// Deterministic RNG for frame jitter
    rng: Arc<Mutex<ChaCha8Rng>>,

    /// Nominal refresh period in nanoseconds
    period_ns: u64,

    /// Jitter as a fraction of the period, in [0, 1)
    jitter: f64,

    /// Outstanding request bookkeeping
    ledger: Arc<Mutex<FrameLedger>>,
}

impl SimTickSource {
    /// Creates a tick source for `seed` firing at `refresh_hz` with `jitter`.
    pub fn new(seed: u64, refresh_hz: f64, jitter: f64) -> Result<Self, EnvError> {
        let period = EnvError::check_refresh_rate(refresh_hz)?;
        if !(0.0..1.0).contains(&jitter) {
            return Err(EnvError::InvalidJitter(jitter));
        }
        Ok(Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            period_ns: (period * 1e9).round() as u64,
            jitter,
            ledger: Arc::new(Mutex::new(FrameLedger::new())),
        })
    }

    /// Creates an Arc-wrapped tick source for sharing with a session.
    pub fn shared(seed: u64, refresh_hz: f64, jitter: f64) -> Result<Arc<Self>, EnvError> {
        Self::new(seed, refresh_hz, jitter).map(Arc::new)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.virtual_time_ns.lock().unwrap();
        *time += duration.as_nanos() as u64;
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.virtual_time_ns.lock().unwrap()
    }

    /// Next refresh interval with jitter applied.
    fn next_interval_ns(&self) -> u64 {
        if self.jitter == 0.0 {
            return self.period_ns;
        }
        let spread = Uniform::new_inclusive(-self.jitter, self.jitter);
        let factor = 1.0 + spread.sample(&mut *self.rng.lock().unwrap());
        (self.period_ns as f64 * factor).round().max(1.0) as u64
    }

    /// Advances to the next refresh and fires the pending frame.
    ///
    /// Returns `None` without moving the clock when nothing is scheduled.
    pub fn advance_frame(&self) -> Option<Frame> {
        self.ledger.lock().unwrap().pending()?;
        let interval = self.next_interval_ns();
        let now = {
            let mut time = self.virtual_time_ns.lock().unwrap();
            *time += interval;
            *time
        };
        let request = self.ledger.lock().unwrap().take()?;
        Some(Frame::new(request, Duration::from_nanos(now)))
    }

    /// Total tickets issued.
    pub fn issued(&self) -> u64 {
        self.ledger.lock().unwrap().issued()
    }

    /// Total tickets cancelled before firing.
    pub fn cancelled(&self) -> u64 {
        self.ledger.lock().unwrap().cancelled()
    }
}

impl Clone for SimTickSource {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            rng: Arc::clone(&self.rng),
            period_ns: self.period_ns,
            jitter: self.jitter,
            ledger: Arc::clone(&self.ledger),
        }
    }
}

#[async_trait]
impl TickSource for SimTickSource {
    fn now(&self) -> Duration {
        Duration::from_nanos(*self.virtual_time_ns.lock().unwrap())
    }

    fn request_frame(&self) -> FrameRequest {
        self.ledger.lock().unwrap().request()
    }

    fn cancel_frame(&self, request: FrameRequest) {
        self.ledger.lock().unwrap().cancel(request);
    }

    fn pending(&self) -> Option<FrameRequest> {
        self.ledger.lock().unwrap().pending()
    }

    async fn next_frame(&self) -> Option<Frame> {
        // Virtual time: no waiting, the clock jumps to the next refresh
        self.advance_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_tick_source_time() {
        let ticks = SimTickSource::new(42, 60.0, 0.0).unwrap();
        assert_eq!(ticks.now(), Duration::ZERO);

        ticks.advance_time(Duration::from_secs(1));
        assert_eq!(ticks.now(), Duration::from_secs(1));

        let request = ticks.request_frame();
        let frame = ticks.advance_frame().unwrap();
        assert_eq!(frame.request, request);
        assert_eq!(frame.timestamp, Duration::from_nanos(1_000_000_000 + 16_666_667));
    }

    #[test]
    fn test_no_frame_no_time() {
        let ticks = SimTickSource::new(42, 60.0, 0.2).unwrap();
        assert!(ticks.advance_frame().is_none());
        assert_eq!(ticks.time_ns(), 0);
    }

    #[test]
    fn test_cancelled_request_never_fires() {
        let ticks = SimTickSource::new(7, 60.0, 0.0).unwrap();
        let request = ticks.request_frame();
        ticks.cancel_frame(request);
        assert!(ticks.advance_frame().is_none());
        assert_eq!(ticks.cancelled(), 1);
    }

    #[test]
    fn test_jitter_is_deterministic_and_bounded() {
        let a = SimTickSource::new(99, 60.0, 0.25).unwrap();
        let b = SimTickSource::new(99, 60.0, 0.25).unwrap();
        let period = 16_666_667.0;

        let mut last = 0;
        for _ in 0..200 {
            a.request_frame();
            b.request_frame();
            let fa = a.advance_frame().unwrap();
            let fb = b.advance_frame().unwrap();
            assert_eq!(fa.timestamp, fb.timestamp);

            let interval = a.time_ns() - last;
            assert!(interval as f64 >= period * 0.75 - 1.0);
            assert!(interval as f64 <= period * 1.25 + 1.0);
            last = a.time_ns();
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            SimTickSource::new(1, 0.0, 0.0),
            Err(EnvError::InvalidRefreshRate(_))
        ));
        assert!(matches!(
            SimTickSource::new(1, 60.0, 1.0),
            Err(EnvError::InvalidJitter(_))
        ));
    }

    #[tokio::test]
    async fn test_next_frame_advances_virtual_clock() {
        let ticks = SimTickSource::new(3, 30.0, 0.0).unwrap();
        ticks.request_frame();
        let frame = ticks.next_frame().await.unwrap();
        assert_eq!(frame.timestamp, ticks.now());
        assert!(ticks.next_frame().await.is_none());
    }
}
