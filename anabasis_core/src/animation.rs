//! The animation driver: moves the marker along the active track.
//!
//! The driver owns the animation state (phase, pending frame, last frame
//! time) and is the only writer of the marker while playing. It advances on
//! frames delivered by a [`TickSource`], measuring elapsed time from frame
//! timestamps.
//!
//! # Leg evaluation
//!
//! From the current waypoint the driver looks up the next waypoint of the
//! active track and the segment joining them:
//!
//! - segment with positive length: traverse it frame by frame
//! - no segment, or degenerate geometry: jump to the next waypoint at once
//!   and continue on the following tick
//! - no next waypoint: completed, playback stops

use crate::config::{ConfigError, EngineConfig};
use crate::dataset::{DatasetView, Segment};
use crate::interpolate::{length, partial_line, position_at};
use crate::playback::PlaybackState;
use crate::render::{MarkerUpdate, RenderSink};
use crate::scene;
use anabasis_env::{Frame, FrameRequest, TickSource};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the driver is in the current leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum AnimationPhase {
    Idle,
    Traversing {
        segment_id: String,
        distance_traveled: f64,
    },
    /// Jumped to a waypoint; the next leg is evaluated on the next tick
    Teleporting,
}

/// What a frame did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Frame carried a cancelled or superseded request
    Stale,
    /// Nothing to animate
    Idle,
    /// Began traversing a segment
    Started { segment_id: String },
    Advanced { distance_traveled: f64 },
    Arrived { waypoint_id: String },
    Teleported { waypoint_id: String },
    /// Reached the end of the track; playback stopped
    Completed,
    /// Missing reference; playback stopped
    Halted,
}

/// Result of evaluating the leg from the current waypoint.
#[derive(Debug, Clone, PartialEq)]
enum Leg {
    Traversing(String),
    Teleported(String),
    Completed,
    Halted,
}

pub struct AnimationDriver {
    config: EngineConfig,
    phase: AnimationPhase,
    pending: Option<FrameRequest>,
    last_frame_at: Duration,
    frames_animated: u64,
}

impl AnimationDriver {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            phase: AnimationPhase::Idle,
            pending: None,
            last_frame_at: Duration::ZERO,
            frames_animated: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> &AnimationPhase {
        &self.phase
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Distance into the traversed segment, 0 when not traversing.
    pub fn distance_traveled(&self) -> f64 {
        match self.phase {
            AnimationPhase::Traversing {
                distance_traveled, ..
            } => distance_traveled,
            _ => 0.0,
        }
    }

    /// Segment currently being traversed.
    pub fn active_segment(&self) -> Option<&str> {
        match &self.phase {
            AnimationPhase::Traversing { segment_id, .. } => Some(segment_id),
            _ => None,
        }
    }

    /// Interpolated frames produced so far.
    pub fn frames_animated(&self) -> u64 {
        self.frames_animated
    }

    /// Ground speed on `segment` in meters per second.
    pub fn segment_speed(&self, segment: &Segment, playback_speed: f64) -> f64 {
        let total = length(&segment.geometry);
        let base = match segment.est_duration_minutes {
            Some(minutes) if minutes > 0.0 && total > 0.0 => total / (minutes * 60.0),
            _ => self.config.fallback_speed_mps,
        };
        base * playback_speed * self.config.transport_speeds.multiplier(segment.transport_mode)
    }

    /// Cancels the pending frame and resets the animation state.
    pub fn stop<T: TickSource + ?Sized>(&mut self, ticks: &T) {
        if let Some(request) = self.pending.take() {
            ticks.cancel_frame(request);
            debug!(%request, "Cancelled pending frame");
        }
        self.phase = AnimationPhase::Idle;
    }

    /// Brings the driver in line with `state`.
    ///
    /// Not playing: stop. Already traversing out of the current waypoint with
    /// a frame pending: keep going. Otherwise evaluate the leg afresh.
    pub fn sync<T: TickSource + ?Sized, S: RenderSink + ?Sized>(
        &mut self,
        data: &DatasetView,
        state: &mut PlaybackState,
        ticks: &T,
        sink: &mut S,
    ) -> FrameOutcome {
        if !state.is_playing() {
            self.stop(ticks);
            return FrameOutcome::Idle;
        }

        if self.pending.is_some() {
            let resuming = match &self.phase {
                AnimationPhase::Traversing { segment_id, .. } => data
                    .segment_by_id(segment_id)
                    .is_some_and(|s| Some(s.from_waypoint_id.as_str()) == state.current_waypoint()),
                AnimationPhase::Teleporting => true,
                AnimationPhase::Idle => false,
            };
            if resuming {
                return FrameOutcome::Idle;
            }
        }

        self.stop(ticks);
        self.last_frame_at = ticks.now();
        self.leg_outcome(data, state, ticks, sink)
    }

    /// Processes one fired frame.
    pub fn on_frame<T: TickSource + ?Sized, S: RenderSink + ?Sized>(
        &mut self,
        frame: Frame,
        data: &DatasetView,
        state: &mut PlaybackState,
        ticks: &T,
        sink: &mut S,
    ) -> FrameOutcome {
        if self.pending != Some(frame.request) {
            debug!(request = %frame.request, "Discarding stale frame");
            return FrameOutcome::Stale;
        }
        self.pending = None;

        let elapsed = frame.seconds_since(self.last_frame_at);
        self.last_frame_at = frame.timestamp;

        if !state.is_playing() {
            self.phase = AnimationPhase::Idle;
            return FrameOutcome::Idle;
        }

        match std::mem::replace(&mut self.phase, AnimationPhase::Idle) {
            AnimationPhase::Idle => FrameOutcome::Idle,
            AnimationPhase::Teleporting => self.leg_outcome(data, state, ticks, sink),
            AnimationPhase::Traversing {
                segment_id,
                distance_traveled,
            } => self.advance(&segment_id, distance_traveled, elapsed, data, state, ticks, sink),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn advance<T: TickSource + ?Sized, S: RenderSink + ?Sized>(
        &mut self,
        segment_id: &str,
        distance_traveled: f64,
        elapsed: f64,
        data: &DatasetView,
        state: &mut PlaybackState,
        ticks: &T,
        sink: &mut S,
    ) -> FrameOutcome {
        let Some(segment) = data.segment_by_id(segment_id) else {
            warn!(segment = segment_id, "Traversed segment vanished");
            return self.halt(state);
        };

        let total = length(&segment.geometry);
        let traveled = distance_traveled + self.segment_speed(segment, state.speed()) * elapsed;

        if traveled >= total - self.config.arrival_tolerance_m {
            let arrived = segment.to_waypoint_id.clone();
            state.set_waypoint(&arrived);
            scene::publish_waypoint(data, state, sink);
            debug!(segment = segment_id, waypoint = %arrived, "Arrived");

            // Chain into the next leg within the same frame
            return match self.begin_leg(data, state, ticks, sink) {
                Leg::Completed => FrameOutcome::Completed,
                Leg::Halted => FrameOutcome::Halted,
                Leg::Traversing(_) | Leg::Teleported(_) => FrameOutcome::Arrived {
                    waypoint_id: arrived,
                },
            };
        }

        if let Some(coordinate) = position_at(&segment.geometry, traveled) {
            sink.set_marker(MarkerUpdate {
                coordinate,
                mode: segment.transport_mode,
                recenter: false,
            });
        }
        let partial = partial_line(&segment.geometry, traveled);
        scene::publish_progress(data, state, Some(&partial), sink);

        self.phase = AnimationPhase::Traversing {
            segment_id: segment_id.to_string(),
            distance_traveled: traveled,
        };
        self.frames_animated += 1;
        self.request(ticks);
        FrameOutcome::Advanced {
            distance_traveled: traveled,
        }
    }

    fn leg_outcome<T: TickSource + ?Sized, S: RenderSink + ?Sized>(
        &mut self,
        data: &DatasetView,
        state: &mut PlaybackState,
        ticks: &T,
        sink: &mut S,
    ) -> FrameOutcome {
        match self.begin_leg(data, state, ticks, sink) {
            Leg::Traversing(segment_id) => FrameOutcome::Started { segment_id },
            Leg::Teleported(waypoint_id) => FrameOutcome::Teleported { waypoint_id },
            Leg::Completed => FrameOutcome::Completed,
            Leg::Halted => FrameOutcome::Halted,
        }
    }

    fn begin_leg<T: TickSource + ?Sized, S: RenderSink + ?Sized>(
        &mut self,
        data: &DatasetView,
        state: &mut PlaybackState,
        ticks: &T,
        sink: &mut S,
    ) -> Leg {
        let (Some(track_id), Some(current_id)) = (state.active_track(), state.current_waypoint())
        else {
            warn!("Nothing to play: no active track or waypoint");
            self.halt(state);
            return Leg::Halted;
        };

        let waypoints = data.waypoints_for_track(track_id);
        let Some(index) = data.waypoint_position(track_id, current_id) else {
            warn!(
                track = track_id,
                waypoint = current_id,
                "Current waypoint is not on the active track"
            );
            self.halt(state);
            return Leg::Halted;
        };

        let current = waypoints[index];
        let Some(next) = waypoints.get(index + 1).copied() else {
            info!(track = track_id, waypoint = current_id, "Reached end of track");
            state.set_playing(false);
            self.phase = AnimationPhase::Idle;
            scene::publish_progress(data, state, None, sink);
            return Leg::Completed;
        };

        match data.segment_between(track_id, &current.id, &next.id) {
            Some(segment) if length(&segment.geometry) > 0.0 => {
                debug!(segment = %segment.id, "Traversing");
                self.phase = AnimationPhase::Traversing {
                    segment_id: segment.id.clone(),
                    distance_traveled: 0.0,
                };
                self.request(ticks);
                Leg::Traversing(segment.id.clone())
            }
            segment => {
                let next_id = next.id.clone();
                if segment.is_some() {
                    warn!(from = %current.id, to = %next_id, "Degenerate segment, jumping");
                } else {
                    debug!(from = %current.id, to = %next_id, "No segment, teleporting");
                }
                state.set_waypoint(&next_id);
                scene::publish_waypoint(data, state, sink);
                self.phase = AnimationPhase::Teleporting;
                self.request(ticks);
                Leg::Teleported(next_id)
            }
        }
    }

    fn halt(&mut self, state: &mut PlaybackState) -> FrameOutcome {
        state.set_playing(false);
        self.phase = AnimationPhase::Idle;
        FrameOutcome::Halted
    }

    fn request<T: TickSource + ?Sized>(&mut self, ticks: &T) {
        self.pending = Some(ticks.request_frame());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::TransportMode;
    use crate::testing::{
        campaign_fixture, single_segment_dataset, teleport_dataset, CapturingSink, ManualTicks,
    };
    use approx::assert_relative_eq;

    const FRAME: f64 = 1.0 / 60.0;

    struct Harness {
        data: DatasetView,
        state: PlaybackState,
        driver: AnimationDriver,
        ticks: ManualTicks,
        sink: CapturingSink,
    }

    impl Harness {
        fn new(dataset: crate::dataset::CampaignDataset) -> Self {
            let data = DatasetView::new(dataset).unwrap();
            let state = PlaybackState::new(&data);
            Self {
                data,
                state,
                driver: AnimationDriver::new(EngineConfig::default()).unwrap(),
                ticks: ManualTicks::new(),
                sink: CapturingSink::default(),
            }
        }

        fn play(&mut self) -> FrameOutcome {
            self.state.set_playing(true);
            self.driver
                .sync(&self.data, &mut self.state, &self.ticks, &mut self.sink)
        }

        fn tick(&mut self, seconds: f64) -> Option<FrameOutcome> {
            let frame = self.ticks.fire(seconds)?;
            Some(
                self.driver
                    .on_frame(frame, &self.data, &mut self.state, &self.ticks, &mut self.sink),
            )
        }
    }

    #[test]
    fn test_single_segment_completes_in_sixty_seconds() {
        // 1200 m at the 20 m/s fallback, horse, 1.0×
        let mut h = Harness::new(single_segment_dataset(1_200.0, None));
        assert_eq!(
            h.play(),
            FrameOutcome::Started {
                segment_id: "leg".into()
            }
        );
        assert_eq!(h.driver.active_segment(), Some("leg"));

        let mut frames = 0;
        while h.state.is_playing() && frames < 4_000 {
            h.tick(FRAME);
            frames += 1;
        }

        assert_eq!(h.state.current_waypoint(), Some("end"));
        assert!(!h.state.is_playing());
        assert!(frames <= 3_601, "took {} frames", frames);
        assert!(frames >= 3_590, "took {} frames", frames);
        assert_eq!(h.driver.phase(), &AnimationPhase::Idle);
    }

    #[test]
    fn test_marker_snaps_to_end_waypoint() {
        let mut h = Harness::new(single_segment_dataset(1_200.0, None));
        h.play();
        // One long frame covers the whole segment
        assert_eq!(h.tick(120.0), Some(FrameOutcome::Completed));

        let end = h.data.waypoint_by_id("end").unwrap();
        assert_eq!(h.sink.last_marker().unwrap().coordinate, end.coordinates);
    }

    #[test]
    fn test_teleport_without_segment() {
        let mut h = Harness::new(teleport_dataset());
        let outcome = h.play();

        assert_eq!(
            outcome,
            FrameOutcome::Teleported {
                waypoint_id: "b".into()
            }
        );
        assert_eq!(h.state.current_waypoint(), Some("b"));
        assert_eq!(h.driver.frames_animated(), 0);

        assert_eq!(h.tick(FRAME), Some(FrameOutcome::Completed));
        assert!(!h.state.is_playing());
        assert_eq!(h.driver.frames_animated(), 0);
    }

    #[test]
    fn test_degenerate_segment_jumps() {
        let mut dataset = single_segment_dataset(1_200.0, None);
        dataset.segments[0].geometry = geo::LineString::from(vec![(0.0, 0.0)]);
        let mut h = Harness::new(dataset);

        assert!(matches!(h.play(), FrameOutcome::Teleported { .. }));
        assert_eq!(h.state.current_waypoint(), Some("end"));
    }

    #[test]
    fn test_zero_length_segment_jumps() {
        let mut dataset = single_segment_dataset(1_200.0, None);
        dataset.segments[0].geometry = geo::LineString::from(vec![(0.0, 0.0), (0.0, 0.0)]);
        let mut h = Harness::new(dataset);

        assert!(matches!(h.play(), FrameOutcome::Teleported { .. }));
        assert_eq!(h.state.current_waypoint(), Some("end"));
    }

    #[test]
    fn test_distance_is_monotonic() {
        let mut h = Harness::new(single_segment_dataset(5_000.0, None));
        h.play();

        let mut last = 0.0;
        for _ in 0..100 {
            h.tick(FRAME);
            let distance = h.driver.distance_traveled();
            assert!(distance >= last);
            last = distance;
        }
        assert_relative_eq!(last, 100.0 * FRAME * 20.0, max_relative = 1e-6);
    }

    #[test]
    fn test_duration_sets_base_speed() {
        // 6000 m in 10 minutes -> 10 m/s; ship multiplier 1.3; 2× playback
        let mut dataset = single_segment_dataset(6_000.0, Some(10.0));
        dataset.segments[0].transport_mode = TransportMode::Ship;
        let driver = AnimationDriver::new(EngineConfig::default()).unwrap();

        let speed = driver.segment_speed(&dataset.segments[0], 2.0);
        assert_relative_eq!(speed, 10.0 * 1.3 * 2.0, max_relative = 1e-9);

        // Zero duration falls back
        dataset.segments[0].est_duration_minutes = Some(0.0);
        let speed = driver.segment_speed(&dataset.segments[0], 1.0);
        assert_relative_eq!(speed, 20.0 * 1.3, max_relative = 1e-9);
    }

    #[test]
    fn test_elapsed_time_from_timestamps() {
        let mut h = Harness::new(single_segment_dataset(5_000.0, None));
        h.play();
        h.tick(0.5);
        assert_relative_eq!(h.driver.distance_traveled(), 10.0, max_relative = 1e-6);
        h.tick(0.25);
        assert_relative_eq!(h.driver.distance_traveled(), 15.0, max_relative = 1e-6);
    }

    #[test]
    fn test_stale_frame_discarded() {
        let mut h = Harness::new(single_segment_dataset(5_000.0, None));
        h.play();
        let stale = h.ticks.fire(1.0).unwrap();

        // Stop and restart: the old ticket is superseded
        h.state.set_playing(false);
        h.driver.sync(&h.data, &mut h.state, &h.ticks, &mut h.sink);
        h.play();

        let outcome = h
            .driver
            .on_frame(stale, &h.data, &mut h.state, &h.ticks, &mut h.sink);
        assert_eq!(outcome, FrameOutcome::Stale);
        assert_eq!(h.driver.distance_traveled(), 0.0);
    }

    #[test]
    fn test_stop_resets_state() {
        let mut h = Harness::new(single_segment_dataset(5_000.0, None));
        h.play();
        h.tick(1.0);
        assert!(h.driver.distance_traveled() > 0.0);

        h.driver.stop(&h.ticks);
        assert_eq!(h.driver.phase(), &AnimationPhase::Idle);
        assert_eq!(h.driver.pending(), None);
        assert_eq!(h.ticks.pending(), None);
    }

    #[test]
    fn test_sync_preserves_traversal() {
        let mut h = Harness::new(single_segment_dataset(5_000.0, None));
        h.play();
        h.tick(1.0);
        let before = h.driver.distance_traveled();

        // Still playing the same segment: nothing resets
        assert_eq!(h.play(), FrameOutcome::Idle);
        assert_eq!(h.driver.distance_traveled(), before);
    }

    #[test]
    fn test_chains_through_multiple_segments() {
        let mut h = Harness::new(campaign_fixture());
        h.play();
        assert_eq!(h.driver.active_segment(), Some("seg-1"));

        // 1000 m at 20 m/s
        assert_eq!(
            h.tick(50.0),
            Some(FrameOutcome::Arrived {
                waypoint_id: "wp-2".into()
            })
        );
        assert_eq!(h.driver.active_segment(), Some("seg-2"));
        assert_eq!(h.driver.distance_traveled(), 0.0);

        assert_eq!(h.tick(100.0), Some(FrameOutcome::Completed));
        assert_eq!(h.state.current_waypoint(), Some("wp-3"));
    }

    #[test]
    fn test_marker_uses_segment_mode_while_moving() {
        let mut dataset = single_segment_dataset(5_000.0, None);
        dataset.segments[0].transport_mode = TransportMode::Supply;
        let mut h = Harness::new(dataset);
        h.play();
        h.tick(FRAME);

        let marker = h.sink.last_marker().unwrap();
        assert_eq!(marker.mode, TransportMode::Supply);
        assert!(!marker.recenter);
        assert!(h.sink.source("active-track-progress").is_some());
    }

    #[test]
    fn test_waypoint_off_track_halts() {
        let mut h = Harness::new(campaign_fixture());
        h.state.set_waypoint("sea-1");
        assert_eq!(h.play(), FrameOutcome::Halted);
        assert!(!h.state.is_playing());
    }
}
