//! Playback state: the externally invocable state surface.
//!
//! Every mutation is synchronous and local. Validation is limited to what the
//! UI cannot guarantee (speed sign); reference checks against the dataset are
//! the caller's job, matching how the control panel drives it.

use crate::dataset::{DatasetView, TrackKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum PlaybackError {
    #[error("Playback speed must be positive and finite, got {0}")]
    NonPositiveSpeed(f64),
}

/// Toggleable map overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    /// Regions, territory control and ancient labels
    Regions,
    /// Battle, siege, treaty and founding areas
    Events,
}

/// Which side panel is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelView {
    #[default]
    Waypoint,
    Legend,
    Timeline,
}

impl PanelView {
    /// waypoint → legend → timeline → waypoint
    pub fn next(self) -> Self {
        match self {
            Self::Waypoint => Self::Legend,
            Self::Legend => Self::Timeline,
            Self::Timeline => Self::Waypoint,
        }
    }
}

/// Advisory date range. Stored and merged, not applied to any layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeFilter {
    pub enabled: bool,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Partial update for [`TimeFilter`]. `None` keeps the previous value.
///
/// `start`/`end` are doubly optional so a field can be cleared explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeFilterUpdate {
    pub enabled: Option<bool>,
    pub start: Option<Option<String>>,
    pub end: Option<Option<String>>,
}

impl TimeFilter {
    fn merge(&mut self, update: TimeFilterUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(start) = update.start {
            self.start = start;
        }
        if let Some(end) = update.end {
            self.end = end;
        }
    }
}

/// Snapshot of what the user selected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    active_track: Option<String>,
    current_waypoint: Option<String>,
    playing: bool,
    speed: f64,
    visible_tracks: BTreeMap<String, bool>,
    show_regions: bool,
    show_events: bool,
    time_filter: TimeFilter,
    panel_view: PanelView,
    highlighted_life_event: Option<String>,
}

impl PlaybackState {
    /// Initial state for `data`.
    ///
    /// The active track is the first land track (else the first track) and
    /// the current waypoint is its first waypoint.
    pub fn new(data: &DatasetView) -> Self {
        let initial = data
            .tracks()
            .iter()
            .find(|t| t.kind == TrackKind::Land)
            .or_else(|| data.tracks().first());

        let current_waypoint = initial
            .and_then(|t| data.first_waypoint(&t.id))
            .map(|w| w.id.clone());

        Self {
            active_track: initial.map(|t| t.id.clone()),
            current_waypoint,
            playing: false,
            speed: 1.0,
            visible_tracks: data
                .tracks()
                .iter()
                .map(|t| (t.id.clone(), t.visible_by_default))
                .collect(),
            show_regions: true,
            show_events: true,
            time_filter: TimeFilter::default(),
            panel_view: PanelView::default(),
            highlighted_life_event: None,
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn active_track(&self) -> Option<&str> {
        self.active_track.as_deref()
    }

    pub fn current_waypoint(&self) -> Option<&str> {
        self.current_waypoint.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Absent entries count as hidden.
    pub fn is_track_visible(&self, track_id: &str) -> bool {
        self.visible_tracks.get(track_id).copied().unwrap_or(false)
    }

    pub fn visible_tracks(&self) -> &BTreeMap<String, bool> {
        &self.visible_tracks
    }

    pub fn is_overlay_visible(&self, kind: OverlayKind) -> bool {
        match kind {
            OverlayKind::Regions => self.show_regions,
            OverlayKind::Events => self.show_events,
        }
    }

    pub fn time_filter(&self) -> &TimeFilter {
        &self.time_filter
    }

    pub fn panel_view(&self) -> PanelView {
        self.panel_view
    }

    pub fn highlighted_life_event(&self) -> Option<&str> {
        self.highlighted_life_event.as_deref()
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Switches tracks and rewinds to the track's first waypoint.
    ///
    /// Unknown tracks are ignored (returns `false`). A known track without
    /// waypoints becomes active while the current waypoint is left as is.
    pub fn set_active_track(&mut self, data: &DatasetView, track_id: &str) -> bool {
        if data.track_by_id(track_id).is_none() {
            warn!(track = track_id, "Ignoring unknown track");
            return false;
        }

        self.active_track = Some(track_id.to_string());
        match data.first_waypoint(track_id) {
            Some(first) => self.current_waypoint = Some(first.id.clone()),
            None => warn!(track = track_id, "Active track has no waypoints"),
        }
        debug!(track = track_id, waypoint = ?self.current_waypoint, "Active track set");
        true
    }

    pub fn toggle_track_visibility(&mut self, track_id: &str) {
        let visible = !self.is_track_visible(track_id);
        self.visible_tracks.insert(track_id.to_string(), visible);
    }

    /// Points at `waypoint_id`. Membership in the active track is not checked.
    pub fn set_waypoint(&mut self, waypoint_id: &str) {
        self.current_waypoint = Some(waypoint_id.to_string());
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Accepts any positive finite multiplier unchanged.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), PlaybackError> {
        if !(speed.is_finite() && speed > 0.0) {
            warn!(speed, "Rejected playback speed");
            return Err(PlaybackError::NonPositiveSpeed(speed));
        }
        self.speed = speed;
        Ok(())
    }

    pub fn set_overlay_visible(&mut self, kind: OverlayKind, visible: bool) {
        match kind {
            OverlayKind::Regions => self.show_regions = visible,
            OverlayKind::Events => self.show_events = visible,
        }
    }

    pub fn update_time_filter(&mut self, update: TimeFilterUpdate) {
        self.time_filter.merge(update);
    }

    pub fn cycle_panel_view(&mut self) -> PanelView {
        self.panel_view = self.panel_view.next();
        self.panel_view
    }

    pub fn set_highlighted_life_event(&mut self, event_id: Option<&str>) {
        self.highlighted_life_event = event_id.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CampaignDataset;
    use crate::testing::{campaign_fixture, track, waypoint};

    fn view() -> DatasetView {
        DatasetView::new(campaign_fixture()).unwrap()
    }

    #[test]
    fn test_initial_state_prefers_land_track() {
        let mut dataset = campaign_fixture();
        // Put the sea track first in declaration order
        dataset.tracks.reverse();
        let data = DatasetView::new(dataset).unwrap();
        let state = PlaybackState::new(&data);

        assert_eq!(state.active_track(), Some("track-land"));
        assert_eq!(state.current_waypoint(), Some("wp-1"));
        assert!(!state.is_playing());
        assert_eq!(state.speed(), 1.0);
        assert!(state.is_overlay_visible(OverlayKind::Regions));
        assert!(state.is_overlay_visible(OverlayKind::Events));
        assert_eq!(state.panel_view(), PanelView::Waypoint);
        assert!(!state.time_filter().enabled);
    }

    #[test]
    fn test_initial_state_without_land_track() {
        let data = DatasetView::new(CampaignDataset {
            tracks: vec![track("fleet", TrackKind::Sea)],
            waypoints: vec![waypoint("port", "fleet", 1, 0.0, 0.0)],
            ..Default::default()
        })
        .unwrap();
        let state = PlaybackState::new(&data);
        assert_eq!(state.active_track(), Some("fleet"));
        assert_eq!(state.current_waypoint(), Some("port"));
    }

    #[test]
    fn test_set_active_track_resets_waypoint() {
        let data = view();
        let mut state = PlaybackState::new(&data);
        state.set_waypoint("wp-3");

        assert!(state.set_active_track(&data, "track-sea"));
        assert_eq!(state.active_track(), Some("track-sea"));
        assert_eq!(state.current_waypoint(), Some("sea-1"));
    }

    #[test]
    fn test_set_active_track_unknown_is_noop() {
        let data = view();
        let mut state = PlaybackState::new(&data);
        let before = state.clone();

        assert!(!state.set_active_track(&data, "track-ghost"));
        assert_eq!(state, before);
    }

    #[test]
    fn test_set_active_track_without_waypoints_leaves_waypoint() {
        let mut dataset = campaign_fixture();
        dataset.tracks.push(track("empty", TrackKind::Supply));
        let data = DatasetView::new(dataset).unwrap();
        let mut state = PlaybackState::new(&data);

        assert!(state.set_active_track(&data, "empty"));
        assert_eq!(state.active_track(), Some("empty"));
        assert_eq!(state.current_waypoint(), Some("wp-1"));
    }

    #[test]
    fn test_set_waypoint_is_idempotent() {
        let data = view();
        let mut once = PlaybackState::new(&data);
        once.set_waypoint("wp-2");
        let mut twice = once.clone();
        twice.set_waypoint("wp-2");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_toggle_visibility_absent_counts_hidden() {
        let data = view();
        let mut state = PlaybackState::new(&data);

        assert!(!state.is_track_visible("unlisted"));
        state.toggle_track_visibility("unlisted");
        assert!(state.is_track_visible("unlisted"));

        let before = state.is_track_visible("track-land");
        state.toggle_track_visibility("track-land");
        assert_eq!(state.is_track_visible("track-land"), !before);
    }

    #[test]
    fn test_set_speed_rejects_non_positive() {
        let data = view();
        let mut state = PlaybackState::new(&data);

        state.set_speed(3.7).unwrap();
        assert_eq!(state.speed(), 3.7);

        assert_eq!(state.set_speed(0.0), Err(PlaybackError::NonPositiveSpeed(0.0)));
        assert!(state.set_speed(-2.0).is_err());
        assert!(state.set_speed(f64::INFINITY).is_err());
        assert!(state.set_speed(f64::NAN).is_err());
        assert_eq!(state.speed(), 3.7);
    }

    #[test]
    fn test_time_filter_merge_keeps_unspecified() {
        let data = view();
        let mut state = PlaybackState::new(&data);

        state.update_time_filter(TimeFilterUpdate {
            enabled: Some(true),
            start: Some(Some("0334".into())),
            ..Default::default()
        });
        state.update_time_filter(TimeFilterUpdate {
            end: Some(Some("0323".into())),
            ..Default::default()
        });

        let filter = state.time_filter();
        assert!(filter.enabled);
        assert_eq!(filter.start.as_deref(), Some("0334"));
        assert_eq!(filter.end.as_deref(), Some("0323"));

        state.update_time_filter(TimeFilterUpdate {
            start: Some(None),
            ..Default::default()
        });
        assert_eq!(state.time_filter().start, None);
        assert!(state.time_filter().enabled);
    }

    #[test]
    fn test_panel_view_cycles() {
        let data = view();
        let mut state = PlaybackState::new(&data);
        assert_eq!(state.cycle_panel_view(), PanelView::Legend);
        assert_eq!(state.cycle_panel_view(), PanelView::Timeline);
        assert_eq!(state.cycle_panel_view(), PanelView::Waypoint);
    }

    #[test]
    fn test_overlay_and_highlight() {
        let data = view();
        let mut state = PlaybackState::new(&data);

        state.set_overlay_visible(OverlayKind::Events, false);
        assert!(!state.is_overlay_visible(OverlayKind::Events));
        assert!(state.is_overlay_visible(OverlayKind::Regions));

        state.set_highlighted_life_event(Some("life-1"));
        assert_eq!(state.highlighted_life_event(), Some("life-1"));
        state.set_highlighted_life_event(None);
        assert_eq!(state.highlighted_life_event(), None);
    }
}
