//! Scenario runner - executes playback scenarios against a virtual clock.

use crate::context::SimTickSource;
use crate::demo;
use crate::exporter::{PlaybackExport, PlaybackFrame};
use crate::recorder::RecordingSink;
use crate::scenarios::ScenarioId;

use anabasis_core::geojson::to_position;
use anabasis_core::interpolate::length;
use anabasis_core::overlay::resolve_territory_snapshot;
use anabasis_core::render::{transport_icon, transport_label};
use anabasis_core::{
    AnimationPhase, ConfigError, DatasetError, DatasetView, EngineConfig, FrameOutcome,
    PlaybackError, PlaybackSession, TransportMode,
};
use anabasis_env::{EnvError, TickSource};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Length of the single-segment route in meters
const SINGLE_SEGMENT_METERS: f64 = 1_200.0;

/// Length of the speed-change route in meters
const SPEED_CHANGE_METERS: f64 = 2_400.0;

/// The demo campaign spans hundreds of kilometers, so it runs on a coarse clock
const FULL_CAMPAIGN_REFRESH_HZ: f64 = 1.0;

/// Frames animated before the track switch
const TRACK_SWITCH_FRAMES: u64 = 30;

/// Frames observed on the new track after the switch
const TRACK_SWITCH_FOLLOW_FRAMES: u64 = 10;

/// Slack for nanosecond rounding of virtual time
const TIME_EPSILON: f64 = 1e-6;

/// Errors that abort a scenario before its assertions run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Tick source: {0}")]
    Env(#[from] EnvError),

    #[error("Engine config: {0}")]
    Config(#[from] ConfigError),

    #[error("Dataset: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Playback: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Export: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset lacks the structure a scenario needs
    #[error("Dataset has no {0}")]
    MissingFixture(&'static str),
}

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Frames handled
    pub total_frames: u64,

    /// Final virtual time in seconds
    pub final_time_secs: f64,

    /// Waypoint the run ended on
    pub final_waypoint: Option<String>,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Frame trace, when export was requested
    pub export: Option<PlaybackExport>,
}

impl ScenarioResult {
    fn aborted(scenario: ScenarioId, seed: u64, error: &SimError) -> Self {
        Self {
            scenario,
            seed,
            passed: false,
            total_frames: 0,
            final_time_secs: 0.0,
            final_waypoint: None,
            failure_reason: Some(error.to_string()),
            metrics: ScenarioMetrics::default(),
            export: None,
        }
    }
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Interpolated frames produced by the driver
    pub frames_animated: u64,

    /// Frames discarded as cancelled or superseded
    pub stale_frames: u64,

    /// Jumps over legs without a segment
    pub teleports: u64,

    /// Segment arrivals that chained into another leg
    pub arrivals: u64,

    /// Marker positions pushed to the sink
    pub marker_updates: u64,

    /// Frame requests cancelled before firing
    pub cancelled_requests: u64,
}

type SimSession = PlaybackSession<SimTickSource, RecordingSink>;

/// One scenario in flight: the session plus what has been observed so far.
struct Run {
    scenario: ScenarioId,
    seed: u64,
    session: SimSession,
    frames: u64,
    metrics: ScenarioMetrics,
    export: Option<PlaybackExport>,
    max_time_ns: u64,
    failures: Vec<String>,
}

impl Run {
    fn ticks(&self) -> &SimTickSource {
        self.session.ticks().as_ref()
    }

    fn elapsed_secs(&self) -> f64 {
        self.ticks().time_ns() as f64 / 1e9
    }

    /// Fires and handles one frame. `None` when idle or out of time.
    fn step(&mut self) -> Option<FrameOutcome> {
        if self.ticks().time_ns() >= self.max_time_ns {
            return None;
        }
        let frame = self.ticks().advance_frame()?;
        self.frames += 1;
        let outcome = self.session.handle_frame(frame);
        self.record(&outcome);
        Some(outcome)
    }

    /// Pumps frames until nothing is scheduled. Returns frames handled.
    fn run_to_idle(&mut self) -> u64 {
        let mut handled = 0;
        while self.step().is_some() {
            handled += 1;
        }
        if self.ticks().pending().is_some() {
            warn!(
                scenario = %self.scenario,
                time_secs = self.elapsed_secs(),
                "Stopped at maximum duration with a frame still pending"
            );
        }
        handled
    }

    fn record(&mut self, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Stale => self.metrics.stale_frames += 1,
            outcome => {
                if matches!(outcome, FrameOutcome::Arrived { .. }) {
                    self.metrics.arrivals += 1;
                }
                // A jump leaves the driver teleporting until the next frame,
                // whether it came from a fresh leg or chained off an arrival
                if *self.session.driver().phase() == AnimationPhase::Teleporting {
                    self.metrics.teleports += 1;
                }
            }
        }

        if self.export.is_none() {
            return;
        }
        let marker = self.session.sink().last_marker();
        let frame = PlaybackFrame {
            time_sec: self.elapsed_secs(),
            waypoint_id: self.session.state().current_waypoint().map(str::to_string),
            marker: marker.map(|m| to_position(m.coordinate)),
            mode: marker.map(|m| m.mode),
            transport: marker
                .map(|m| format!("{} {}", transport_icon(m.mode), transport_label(m.mode))),
            segment_id: self.session.driver().active_segment().map(str::to_string),
            distance_traveled: self.session.driver().distance_traveled(),
            outcome: outcome.clone(),
        };
        if let Some(export) = self.export.as_mut() {
            export.add_frame(frame);
        }
    }

    /// Records a failed assertion.
    fn check(&mut self, condition: bool, failure: impl FnOnce() -> String) {
        if !condition {
            let failure = failure();
            debug!(scenario = %self.scenario, %failure, "Assertion failed");
            self.failures.push(failure);
        }
    }

    /// Checks that arrival happened in the first frame at or after `earliest`.
    fn check_arrival(&mut self, earliest: f64, max_interval: f64) {
        let actual = self.elapsed_secs();
        let latest = earliest + max_interval;
        self.check(
            actual + TIME_EPSILON >= earliest && actual <= latest + TIME_EPSILON,
            || format!("Arrived at {:.3}s, expected {:.3}s..{:.3}s", actual, earliest, latest),
        );
    }

    fn finish(mut self) -> ScenarioResult {
        self.metrics.frames_animated = self.session.driver().frames_animated();
        self.metrics.marker_updates = self.session.sink().markers().len() as u64;
        self.metrics.cancelled_requests = self.ticks().cancelled();

        let passed = self.failures.is_empty();
        let final_waypoint = self.session.state().current_waypoint().map(str::to_string);
        if let Some(export) = self.export.as_mut() {
            export.finalize(passed, final_waypoint.clone());
        }

        ScenarioResult {
            scenario: self.scenario,
            seed: self.seed,
            passed,
            total_frames: self.frames,
            final_time_secs: self.elapsed_secs(),
            final_waypoint,
            failure_reason: (!passed).then(|| self.failures.join("; ")),
            metrics: self.metrics,
            export: self.export,
        }
    }
}

/// Runs playback scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Nominal refresh rate in Hz
    refresh_hz: f64,

    /// Frame interval jitter as a fraction of the period
    jitter: f64,

    /// Maximum virtual duration in seconds
    max_duration_secs: f64,

    /// Playback speed multiplier
    playback_speed: f64,

    /// Engine configuration handed to every session
    engine: EngineConfig,

    /// Dataset for the campaign scenarios (defaults to the demo campaign)
    dataset: Option<Arc<DatasetView>>,

    /// Whether to collect a frame trace
    export: bool,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        let engine = EngineConfig::default();
        Self {
            seed,
            refresh_hz: engine.refresh_hz,
            jitter: 0.2,
            max_duration_secs: 86_400.0,
            playback_speed: 1.0,
            engine,
            dataset: None,
            export: false,
        }
    }

    /// Sets the refresh rate.
    pub fn with_refresh_rate(mut self, hz: f64) -> Self {
        self.refresh_hz = hz;
        self
    }

    /// Sets the frame jitter.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Sets the playback speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.playback_speed = speed;
        self
    }

    /// Sets the engine configuration, including its refresh rate.
    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.refresh_hz = engine.refresh_hz;
        self.engine = engine;
        self
    }

    /// Replaces the demo campaign.
    pub fn with_dataset(mut self, dataset: Arc<DatasetView>) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Collects a frame trace in each result.
    pub fn with_export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let result = match scenario {
            ScenarioId::SingleSegment => self.run_single_segment(),
            ScenarioId::Teleport => self.run_teleport(),
            ScenarioId::TerritoryFallback => self.run_territory_fallback(),
            ScenarioId::FullCampaign => self.run_full_campaign(),
            ScenarioId::TrackSwitch => self.run_track_switch(),
            ScenarioId::SpeedChange => self.run_speed_change(),
        };

        result.unwrap_or_else(|e| {
            warn!(scenario = %scenario, error = %e, "Scenario aborted");
            ScenarioResult::aborted(scenario, self.seed, &e)
        })
    }

    fn campaign(&self) -> Result<Arc<DatasetView>, SimError> {
        match &self.dataset {
            Some(dataset) => Ok(Arc::clone(dataset)),
            None => Ok(Arc::new(demo::demo_view()?)),
        }
    }

    /// Longest possible frame interval at `refresh_hz`.
    fn max_interval(&self, refresh_hz: f64) -> f64 {
        (1.0 + self.jitter) / refresh_hz
    }

    fn start(
        &self,
        scenario: ScenarioId,
        data: Arc<DatasetView>,
        refresh_hz: f64,
    ) -> Result<Run, SimError> {
        let ticks = SimTickSource::shared(self.seed, refresh_hz, self.jitter)?;
        let mut session =
            PlaybackSession::new(data, ticks, RecordingSink::new(), self.engine.clone())?;
        session.initialize();
        session.set_speed(self.playback_speed)?;

        Ok(Run {
            scenario,
            seed: self.seed,
            session,
            frames: 0,
            metrics: ScenarioMetrics::default(),
            export: self
                .export
                .then(|| PlaybackExport::new(scenario.name(), self.seed)),
            max_time_ns: (self.max_duration_secs * 1e9) as u64,
            failures: Vec::new(),
        })
    }

    /// PB-001: SingleSegment - one timed segment from start to arrival.
    ///
    /// **Assertion**: arrival lands on the first frame at or after
    /// `length / speed`, and playback stops at the end of the track.
    fn run_single_segment(&self) -> Result<ScenarioResult, SimError> {
        info!("PB-001: SingleSegment - {} m horse leg", SINGLE_SEGMENT_METERS);

        let data = demo::straight_route(SINGLE_SEGMENT_METERS, TransportMode::Horse)?;
        let data = Arc::new(data);
        let segment = data
            .segment_by_id(demo::ROUTE_SEGMENT)
            .ok_or(SimError::MissingFixture("route segment"))?;
        let total = length(&segment.geometry);

        let mut run = self.start(ScenarioId::SingleSegment, Arc::clone(&data), self.refresh_hz)?;
        let speed = run
            .session
            .driver()
            .segment_speed(segment, run.session.state().speed());

        let outcome = run.session.set_playing(true);
        run.record(&outcome);
        run.check(
            outcome
                == FrameOutcome::Started {
                    segment_id: demo::ROUTE_SEGMENT.into(),
                },
            || format!("Expected traversal to start, got {:?}", outcome),
        );

        run.run_to_idle();

        let earliest = (total - self.engine.arrival_tolerance_m) / speed;
        run.check_arrival(earliest, self.max_interval(self.refresh_hz));
        let current = run.session.state().current_waypoint().map(str::to_string);
        run.check(current.as_deref() == Some(demo::ROUTE_END), || {
            format!("Ended on {:?} instead of {}", current, demo::ROUTE_END)
        });
        let playing = run.session.state().is_playing();
        run.check(!playing, || "Playback still running at end of track".into());
        let progress = run
            .session
            .sink()
            .source("active-track-progress")
            .map(|p| p.ids().join(","))
            .unwrap_or_default();
        run.check(progress == format!("progress-{}", demo::ROUTE_SEGMENT), || {
            format!("Unexpected final progress: [{}]", progress)
        });

        info!(
            meters = total,
            speed_mps = speed,
            time_secs = run.elapsed_secs(),
            "Single segment complete"
        );
        Ok(run.finish())
    }

    /// PB-002: Teleport - waypoints with no joining segment.
    ///
    /// **Assertion**: the marker jumps to the next waypoint without
    /// interpolating, and the next leg is evaluated on the very next frame.
    fn run_teleport(&self) -> Result<ScenarioResult, SimError> {
        info!("PB-002: Teleport - leg without a segment");

        let data = self.campaign()?;
        let (track, from, to) = data
            .tracks()
            .iter()
            .find_map(|track| {
                data.waypoints_for_track(&track.id)
                    .windows(2)
                    .find(|pair| {
                        data.segment_between(&track.id, &pair[0].id, &pair[1].id)
                            .is_none()
                    })
                    .map(|pair| (track.id.clone(), pair[0].id.clone(), pair[1].id.clone()))
            })
            .ok_or(SimError::MissingFixture("leg without a segment"))?;
        debug!(%track, %from, %to, "Teleport leg");

        let mut run = self.start(ScenarioId::Teleport, Arc::clone(&data), self.refresh_hz)?;
        run.session.set_active_track(&track);
        let outcome = run.session.set_waypoint(&from);
        run.record(&outcome);
        let outcome = run.session.set_playing(true);
        run.record(&outcome);

        run.check(
            outcome == FrameOutcome::Teleported {
                waypoint_id: to.clone(),
            },
            || format!("Expected a jump to {}, got {:?}", to, outcome),
        );
        let expected = data.waypoint_by_id(&to).map(|w| w.coordinates);
        let marker = run.session.sink().last_marker().map(|m| m.coordinate);
        run.check(marker.is_some() && marker == expected, || {
            format!("Marker at {:?}, expected {:?}", marker, expected)
        });
        let frames_animated = run.session.driver().frames_animated();
        run.check(frames_animated == 0, || {
            format!("{} interpolated frames during a jump", frames_animated)
        });

        let territories = run
            .session
            .sink()
            .source("territories")
            .map(|t| t.ids().into_iter().map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default();
        let snapshot: Vec<String> = resolve_territory_snapshot(&data, &to)
            .territories
            .into_iter()
            .map(|t| t.id)
            .collect();
        run.check(territories == snapshot, || {
            format!("Territories {:?} do not match {}", territories, to)
        });

        let next = run.step();
        run.check(
            matches!(
                next,
                Some(
                    FrameOutcome::Started { .. }
                        | FrameOutcome::Teleported { .. }
                        | FrameOutcome::Completed
                )
            ),
            || format!("Next leg not evaluated on the following frame: {:?}", next),
        );

        run.session.set_playing(false);
        info!(%from, %to, "Teleport complete");
        Ok(run.finish())
    }

    /// PB-003: TerritoryFallback - step through every waypoint.
    ///
    /// **Assertion**: each waypoint shows its own snapshot, or the last
    /// declared one when it has none.
    fn run_territory_fallback(&self) -> Result<ScenarioResult, SimError> {
        info!("PB-003: TerritoryFallback - stepping the active track");

        let data = self.campaign()?;
        if data.territory_timeline().is_empty() {
            return Err(SimError::MissingFixture("territory timeline"));
        }
        let mut run =
            self.start(ScenarioId::TerritoryFallback, Arc::clone(&data), self.refresh_hz)?;
        let track = run
            .session
            .state()
            .active_track()
            .map(str::to_string)
            .ok_or(SimError::MissingFixture("track"))?;
        let count = data.waypoints_for_track(&track).len();

        let mut fallbacks = 0;
        for step in 0..count {
            if step > 0 {
                let outcome = run.session.step_next();
                run.record(&outcome);
            }
            let Some(waypoint) = run.session.state().current_waypoint().map(str::to_string) else {
                break;
            };

            if !data
                .territory_timeline()
                .iter()
                .any(|s| s.waypoint_id == waypoint)
            {
                fallbacks += 1;
            }

            let expected: BTreeMap<String, String> = resolve_territory_snapshot(&data, &waypoint)
                .territories
                .into_iter()
                .map(|t| (t.id, t.controller.name().to_string()))
                .collect();
            let shown: BTreeMap<String, String> = run
                .session
                .sink()
                .source("territories")
                .map(|collection| {
                    collection
                        .features
                        .iter()
                        .map(|f| {
                            let controller = f.property_str("controller").unwrap_or_default();
                            (f.id.clone(), controller.to_string())
                        })
                        .collect()
                })
                .unwrap_or_default();
            run.check(shown == expected, || {
                format!("Territory at {}: shown {:?}, expected {:?}", waypoint, shown, expected)
            });
        }

        let label = run.session.position_label();
        run.check(label == format!("{} / {}", count, count), || {
            format!("Stopped at {} of {} waypoints", label, count)
        });
        let completed = run
            .session
            .sink()
            .source("active-track-progress")
            .map(|p| p.len())
            .unwrap_or(0);
        let segments = data.segments_for_track(&track).len();
        run.check(completed == segments, || {
            format!("{} completed progress features for {} segments", completed, segments)
        });

        info!(waypoints = count, fallbacks, "Territory fallback complete");
        Ok(run.finish())
    }

    /// PB-004: FullCampaign - autoplay the active track end to end.
    ///
    /// **Assertion**: the last waypoint is reached within the analytic
    /// traversal time plus one frame per leg, and the whole path is drawn.
    fn run_full_campaign(&self) -> Result<ScenarioResult, SimError> {
        info!("PB-004: FullCampaign - {} Hz clock", FULL_CAMPAIGN_REFRESH_HZ);

        let data = self.campaign()?;
        let mut run = self.start(
            ScenarioId::FullCampaign,
            Arc::clone(&data),
            FULL_CAMPAIGN_REFRESH_HZ,
        )?;
        run.session.set_speed(self.engine.max_speed)?;
        let speed = run.session.state().speed();

        let track = run
            .session
            .state()
            .active_track()
            .map(str::to_string)
            .ok_or(SimError::MissingFixture("track"))?;
        let waypoints = data.waypoints_for_track(&track);
        let last = waypoints
            .last()
            .map(|w| w.id.clone())
            .ok_or(SimError::MissingFixture("waypoints on the active track"))?;
        let legs = waypoints.len().saturating_sub(1) as u64;

        let traversal: f64 = waypoints
            .windows(2)
            .filter_map(|pair| data.segment_between(&track, &pair[0].id, &pair[1].id))
            .filter(|segment| length(&segment.geometry) > 0.0)
            .map(|segment| {
                let total = length(&segment.geometry) - self.engine.arrival_tolerance_m;
                total.max(0.0) / run.session.driver().segment_speed(segment, speed)
            })
            .sum();

        let outcome = run.session.set_playing(true);
        run.record(&outcome);
        run.run_to_idle();

        let current = run.session.state().current_waypoint().map(str::to_string);
        run.check(current.as_deref() == Some(last.as_str()), || {
            format!("Ended on {:?} instead of {}", current, last)
        });
        let playing = run.session.state().is_playing();
        run.check(!playing, || "Playback still running".into());

        let max_interval = self.max_interval(FULL_CAMPAIGN_REFRESH_HZ);
        let elapsed = run.elapsed_secs();
        let latest = traversal + (legs + 1) as f64 * max_interval;
        run.check(
            elapsed + TIME_EPSILON >= traversal && elapsed <= latest + TIME_EPSILON,
            || format!("Campaign took {:.1}s, expected {:.1}s..{:.1}s", elapsed, traversal, latest),
        );

        let drawn = run
            .session
            .sink()
            .source("active-track-progress")
            .map(|p| p.len())
            .unwrap_or(0);
        let segments = data.segments_for_track(&track).len();
        run.check(drawn == segments, || {
            format!("{} progress features for {} segments", drawn, segments)
        });

        let legs_taken = run.metrics.arrivals + run.metrics.teleports + 1;
        run.check(legs == 0 || legs_taken == legs, || {
            format!("{} legs taken of {}", legs_taken, legs)
        });
        let stale = run.metrics.stale_frames;
        run.check(stale == 0, || format!("{} stale frames during autoplay", stale));

        info!(
            track = %track,
            legs,
            teleports = run.metrics.teleports,
            time_secs = elapsed,
            "Full campaign complete"
        );
        Ok(run.finish())
    }

    /// PB-005: TrackSwitch - switch tracks mid-traversal.
    ///
    /// **Assertion**: the frame fired before the switch is discarded and the
    /// new track starts from its first waypoint at distance zero.
    fn run_track_switch(&self) -> Result<ScenarioResult, SimError> {
        info!("PB-005: TrackSwitch - switching after {} frames", TRACK_SWITCH_FRAMES);

        let data = self.campaign()?;
        let mut run = self.start(ScenarioId::TrackSwitch, Arc::clone(&data), self.refresh_hz)?;
        let source = run
            .session
            .state()
            .active_track()
            .map(str::to_string)
            .ok_or(SimError::MissingFixture("track"))?;
        let target = data
            .tracks()
            .iter()
            .find(|t| t.id != source && data.first_waypoint(&t.id).is_some())
            .map(|t| t.id.clone())
            .ok_or(SimError::MissingFixture("second track with waypoints"))?;

        let outcome = run.session.set_playing(true);
        run.record(&outcome);
        run.check(matches!(outcome, FrameOutcome::Started { .. }), || {
            format!("First leg of {} is not a segment: {:?}", source, outcome)
        });

        while run.session.driver().frames_animated() < TRACK_SWITCH_FRAMES {
            if run.step().is_none() {
                break;
            }
        }

        // Fire a frame but hand it over only after the switch
        let in_flight = run.ticks().advance_frame();

        let switched = run.session.set_active_track(&target);
        run.check(switched, || format!("Switch to {} rejected", target));

        let target_start = data.first_waypoint(&target).map(|w| w.id.clone());
        let current = run.session.state().current_waypoint().map(str::to_string);
        run.check(current == target_start, || {
            format!("After switch on {:?}, expected {:?}", current, target_start)
        });
        let distance = run.session.driver().distance_traveled();
        run.check(distance == 0.0, || format!("Distance carried over: {} m", distance));

        match in_flight {
            Some(frame) => {
                let outcome = run.session.handle_frame(frame);
                run.frames += 1;
                run.record(&outcome);
                run.check(outcome == FrameOutcome::Stale, || {
                    format!("Pre-switch frame was not discarded: {:?}", outcome)
                });
            }
            None => run.check(false, || "No frame in flight at the switch".into()),
        }

        let expected_mode = run
            .session
            .driver()
            .active_segment()
            .and_then(|id| data.segment_by_id(id))
            .map(|s| s.transport_mode);
        for _ in 0..TRACK_SWITCH_FOLLOW_FRAMES {
            if run.step().is_none() {
                break;
            }
        }
        if let Some(mode) = expected_mode {
            let shown = run.session.sink().last_marker().map(|m| m.mode);
            run.check(shown == Some(mode), || {
                format!("Marker mode {:?} on {}, expected {}", shown, target, mode)
            });
        }

        run.session.set_playing(false);
        info!(from = %source, to = %target, "Track switch complete");
        Ok(run.finish())
    }

    /// PB-006: SpeedChange - double the speed halfway along a segment.
    ///
    /// **Assertion**: the traversal keeps its distance and the remainder is
    /// covered at the new speed.
    fn run_speed_change(&self) -> Result<ScenarioResult, SimError> {
        info!("PB-006: SpeedChange - {} m at 1x then 2x", SPEED_CHANGE_METERS);

        let data = demo::straight_route(SPEED_CHANGE_METERS, TransportMode::Horse)?;
        let data = Arc::new(data);
        let segment = data
            .segment_by_id(demo::ROUTE_SEGMENT)
            .ok_or(SimError::MissingFixture("route segment"))?;
        let total = length(&segment.geometry);

        let mut run = self.start(ScenarioId::SpeedChange, Arc::clone(&data), self.refresh_hz)?;
        let outcome = run.session.set_playing(true);
        run.record(&outcome);

        while run.session.driver().distance_traveled() < total / 2.0 {
            if run.step().is_none() {
                break;
            }
        }
        let switched_at = run.elapsed_secs();
        let covered = run.session.driver().distance_traveled();

        let doubled = run.session.state().speed() * 2.0;
        run.session.set_speed(doubled)?;
        let speed = run.session.driver().segment_speed(segment, doubled);

        let next = run.step();
        let advanced = match next {
            Some(FrameOutcome::Advanced { distance_traveled }) => distance_traveled > covered,
            Some(FrameOutcome::Completed) => true,
            _ => false,
        };
        run.check(advanced, || {
            format!("Traversal did not continue from {:.1} m: {:?}", covered, next)
        });

        run.run_to_idle();

        let remaining = (total - self.engine.arrival_tolerance_m - covered).max(0.0);
        run.check_arrival(switched_at + remaining / speed, self.max_interval(self.refresh_hz));
        let current = run.session.state().current_waypoint().map(str::to_string);
        run.check(current.as_deref() == Some(demo::ROUTE_END), || {
            format!("Ended on {:?} instead of {}", current, demo::ROUTE_END)
        });

        info!(
            switched_at_secs = switched_at,
            covered_m = covered,
            time_secs = run.elapsed_secs(),
            "Speed change complete"
        );
        Ok(run.finish())
    }
}
