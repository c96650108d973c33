//! Playback session: the explicit context object a UI drives.
//!
//! A session owns the playback state, the animation driver and the render
//! sink, and shares the dataset and tick source. Each operation mutates the
//! state, keeps the driver in step (cancel, resync) and re-emits whatever
//! derived layers changed.

use crate::animation::{AnimationDriver, FrameOutcome};
use crate::config::{ConfigError, EngineConfig};
use crate::dataset::DatasetView;
use crate::playback::{OverlayKind, PanelView, PlaybackError, PlaybackState, TimeFilterUpdate};
use crate::render::RenderSink;
use crate::scene;
use anabasis_env::{Frame, TickSource};
use std::sync::Arc;
use tracing::{debug, info};

pub struct PlaybackSession<T: TickSource, S: RenderSink> {
    data: Arc<DatasetView>,
    ticks: Arc<T>,
    state: PlaybackState,
    driver: AnimationDriver,
    sink: S,
}

impl<T: TickSource, S: RenderSink> PlaybackSession<T, S> {
    pub fn new(
        data: Arc<DatasetView>,
        ticks: Arc<T>,
        sink: S,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        let state = PlaybackState::new(&data);
        let driver = AnimationDriver::new(config)?;
        info!(
            track = ?state.active_track(),
            waypoint = ?state.current_waypoint(),
            "Playback session created"
        );
        Ok(Self {
            data,
            ticks,
            state,
            driver,
            sink,
        })
    }

    /// Emits every layer for the initial state.
    pub fn initialize(&mut self) {
        scene::publish_all(&self.data, &self.state, &mut self.sink);
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn driver(&self) -> &AnimationDriver {
        &self.driver
    }

    pub fn data(&self) -> &DatasetView {
        &self.data
    }

    pub fn ticks(&self) -> &Arc<T> {
        &self.ticks
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn sync(&mut self) -> FrameOutcome {
        self.driver
            .sync(&self.data, &mut self.state, self.ticks.as_ref(), &mut self.sink)
    }

    /// Cancels animation, runs `change`, republishes the waypoint layers and
    /// resumes if still playing.
    fn reposition(
        &mut self,
        change: impl FnOnce(&DatasetView, &mut PlaybackState),
    ) -> FrameOutcome {
        self.driver.stop(self.ticks.as_ref());
        change(self.data.as_ref(), &mut self.state);
        scene::publish_waypoint(&self.data, &self.state, &mut self.sink);
        self.sync()
    }

    // ------------------------------------------------------------------------
    // State operations
    // ------------------------------------------------------------------------

    /// Returns `false` for an unknown track (nothing changes).
    pub fn set_active_track(&mut self, track_id: &str) -> bool {
        if self.data.track_by_id(track_id).is_none() {
            return self.state.set_active_track(&self.data, track_id);
        }
        let mut switched = false;
        self.reposition(|data, state| switched = state.set_active_track(data, track_id));
        switched
    }

    pub fn toggle_track_visibility(&mut self, track_id: &str) {
        self.state.toggle_track_visibility(track_id);
        scene::publish_visibility(&self.data, &self.state, &mut self.sink);
    }

    pub fn set_waypoint(&mut self, waypoint_id: &str) -> FrameOutcome {
        self.reposition(|_, state| state.set_waypoint(waypoint_id))
    }

    pub fn set_playing(&mut self, playing: bool) -> FrameOutcome {
        self.state.set_playing(playing);
        if !playing {
            self.driver.stop(self.ticks.as_ref());
            scene::publish_progress(&self.data, &self.state, None, &mut self.sink);
            return FrameOutcome::Idle;
        }
        self.sync()
    }

    /// Takes effect on the next frame; a traversal in progress continues.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), PlaybackError> {
        self.state.set_speed(speed)?;
        debug!(speed, "Playback speed set");
        Ok(())
    }

    pub fn set_overlay_visible(&mut self, kind: OverlayKind, visible: bool) {
        self.state.set_overlay_visible(kind, visible);
        scene::publish_visibility(&self.data, &self.state, &mut self.sink);
    }

    /// Stored only; no layer consumes the filter.
    pub fn update_time_filter(&mut self, update: TimeFilterUpdate) {
        self.state.update_time_filter(update);
    }

    pub fn cycle_panel_view(&mut self) -> PanelView {
        self.state.cycle_panel_view()
    }

    pub fn set_highlighted_life_event(&mut self, event_id: Option<&str>) {
        self.state.set_highlighted_life_event(event_id);
        scene::publish_life_events(&self.data, &self.state, &mut self.sink);
    }

    // ------------------------------------------------------------------------
    // Control-panel helpers
    // ------------------------------------------------------------------------

    pub fn toggle_playing(&mut self) -> FrameOutcome {
        let playing = !self.state.is_playing();
        self.set_playing(playing)
    }

    /// Sequence number to navigate from: the current waypoint's, or the
    /// track's first when the current waypoint is elsewhere.
    fn navigation_seq(&self) -> Option<(&str, i64)> {
        let track_id = self.state.active_track()?;
        let waypoints = self.data.waypoints_for_track(track_id);
        let current = self
            .state
            .current_waypoint()
            .and_then(|id| waypoints.iter().find(|w| w.id == id))
            .or_else(|| waypoints.first())?;
        Some((track_id, current.seq))
    }

    /// Moves to the next waypoint, or stops playback at the end.
    pub fn step_next(&mut self) -> FrameOutcome {
        let next = self
            .navigation_seq()
            .and_then(|(track, seq)| self.data.next_waypoint(track, seq))
            .map(|w| w.id.clone());
        match next {
            Some(id) => self.set_waypoint(&id),
            None => self.set_playing(false),
        }
    }

    /// Moves to the previous waypoint; no-op at the start.
    pub fn step_previous(&mut self) -> FrameOutcome {
        let previous = self
            .navigation_seq()
            .and_then(|(track, seq)| self.data.previous_waypoint(track, seq))
            .map(|w| w.id.clone());
        match previous {
            Some(id) => self.set_waypoint(&id),
            None => FrameOutcome::Idle,
        }
    }

    /// Jumps to the waypoint nearest `percent` of the way along the track.
    pub fn scrub(&mut self, percent: f64) -> FrameOutcome {
        let Some(track_id) = self.state.active_track() else {
            return FrameOutcome::Idle;
        };
        let waypoints = self.data.waypoints_for_track(track_id);
        let Some(last) = waypoints.len().checked_sub(1) else {
            return FrameOutcome::Idle;
        };

        let index = if percent.is_finite() {
            ((percent / 100.0) * last as f64).round().clamp(0.0, last as f64) as usize
        } else {
            0
        };
        let id = waypoints[index].id.clone();
        self.set_waypoint(&id)
    }

    fn position(&self) -> (usize, usize) {
        let Some(track_id) = self.state.active_track() else {
            return (0, 0);
        };
        let waypoints = self.data.waypoints_for_track(track_id);
        let index = self
            .state
            .current_waypoint()
            .and_then(|id| self.data.waypoint_position(track_id, id))
            .unwrap_or(0);
        (index, waypoints.len())
    }

    /// Position along the track in percent of waypoints passed.
    pub fn progress_percent(&self) -> f64 {
        match self.position() {
            (index, count) if count > 1 => index as f64 / (count - 1) as f64 * 100.0,
            _ => 0.0,
        }
    }

    /// `"<position> / <count>"`, 1-based.
    pub fn position_label(&self) -> String {
        match self.position() {
            (_, 0) => "0 / 0".to_string(),
            (index, count) => format!("{} / {}", index + 1, count),
        }
    }

    /// Nudges the speed by `steps` slider increments.
    pub fn adjust_speed(&mut self, steps: i32) -> Result<f64, PlaybackError> {
        let speed = self.driver.config().step_speed(self.state.speed(), steps);
        self.set_speed(speed)?;
        Ok(speed)
    }

    // ------------------------------------------------------------------------
    // Frame pump
    // ------------------------------------------------------------------------

    pub fn handle_frame(&mut self, frame: Frame) -> FrameOutcome {
        self.driver
            .on_frame(frame, &self.data, &mut self.state, self.ticks.as_ref(), &mut self.sink)
    }

    /// Pumps frames until nothing is scheduled. Returns frames handled.
    pub async fn run(&mut self) -> u64 {
        let mut handled = 0;
        while let Some(frame) = self.ticks.next_frame().await {
            self.handle_frame(frame);
            handled += 1;
        }
        info!(frames = handled, waypoint = ?self.state.current_waypoint(), "Playback loop idle");
        handled
    }
}
