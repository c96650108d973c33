//! Render sink contract.
//!
//! The engine never talks to a map directly. It pushes named feature
//! collections, marker updates and a declarative visibility list into a
//! [`RenderSink`]; the sink decides how to draw them.

use crate::dataset::{DatasetView, TransportMode};
use crate::overlay::FeatureCollection;
use crate::playback::{OverlayKind, PlaybackState};
use geo::Coord;
use serde::{Serialize, Serializer};
use std::fmt;

/// Named geometry source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceId {
    TrackLines(String),
    TrackWaypoints(String),
    Territories,
    Events,
    Regions,
    AncientLabels,
    ActiveTrackProgress,
    LifeEvents,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrackLines(id) => write!(f, "track-lines-{}", id),
            Self::TrackWaypoints(id) => write!(f, "track-waypoints-{}", id),
            Self::Territories => write!(f, "territories"),
            Self::Events => write!(f, "events"),
            Self::Regions => write!(f, "regions"),
            Self::AncientLabels => write!(f, "ancient-labels"),
            Self::ActiveTrackProgress => write!(f, "active-track-progress"),
            Self::LifeEvents => write!(f, "life-events"),
        }
    }
}

/// Drawable layer. Several layers can share one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerId {
    TrackLines(String),
    TrackWaypoints(String),
    TerritoriesFill,
    TerritoriesOutline,
    EventsFill,
    EventsOutline,
    RegionsFill,
    RegionsOutline,
    AncientLabels,
    ActiveTrackProgress,
    LifeEvents,
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrackLines(id) => write!(f, "track-lines-{}", id),
            Self::TrackWaypoints(id) => write!(f, "track-waypoints-{}", id),
            Self::TerritoriesFill => write!(f, "territories-fill"),
            Self::TerritoriesOutline => write!(f, "territories-outline"),
            Self::EventsFill => write!(f, "events-fill"),
            Self::EventsOutline => write!(f, "events-outline"),
            Self::RegionsFill => write!(f, "regions-fill"),
            Self::RegionsOutline => write!(f, "regions-outline"),
            Self::AncientLabels => write!(f, "ancient-labels"),
            Self::ActiveTrackProgress => write!(f, "active-track-progress"),
            Self::LifeEvents => write!(f, "life-events"),
        }
    }
}

impl Serialize for LayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerVisibility {
    pub layer: LayerId,
    pub visible: bool,
}

impl LayerVisibility {
    fn new(layer: LayerId, visible: bool) -> Self {
        Self { layer, visible }
    }
}

/// New marker position and styling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerUpdate {
    /// `x = lon`, `y = lat`
    pub coordinate: Coord<f64>,
    pub mode: TransportMode,
    /// Whether the view should ease to the marker (set on waypoint changes)
    pub recenter: bool,
}

/// Map surface the engine draws into.
pub trait RenderSink {
    /// Replaces the data of `source`.
    fn set_source_data(&mut self, source: SourceId, features: FeatureCollection);

    /// Moves the single route marker.
    fn set_marker(&mut self, marker: MarkerUpdate);

    /// Applies the complete visibility list.
    fn apply_visibility(&mut self, layers: &[LayerVisibility]);
}

/// Declarative layer visibility for `state`.
///
/// Track layers follow the visibility map. The regions overlay governs
/// regions, territories and labels; the events overlay governs event layers.
/// Progress and life events are always shown.
pub fn visibility_plan(state: &PlaybackState, data: &DatasetView) -> Vec<LayerVisibility> {
    let mut plan = Vec::with_capacity(data.tracks().len() * 2 + 9);

    for track in data.tracks() {
        let visible = state.is_track_visible(&track.id);
        plan.push(LayerVisibility::new(LayerId::TrackLines(track.id.clone()), visible));
        plan.push(LayerVisibility::new(LayerId::TrackWaypoints(track.id.clone()), visible));
    }

    let regions = state.is_overlay_visible(OverlayKind::Regions);
    for layer in [
        LayerId::RegionsFill,
        LayerId::RegionsOutline,
        LayerId::TerritoriesFill,
        LayerId::TerritoriesOutline,
        LayerId::AncientLabels,
    ] {
        plan.push(LayerVisibility::new(layer, regions));
    }

    let events = state.is_overlay_visible(OverlayKind::Events);
    plan.push(LayerVisibility::new(LayerId::EventsFill, events));
    plan.push(LayerVisibility::new(LayerId::EventsOutline, events));

    plan.push(LayerVisibility::new(LayerId::ActiveTrackProgress, true));
    plan.push(LayerVisibility::new(LayerId::LifeEvents, true));
    plan
}

pub fn transport_label(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Foot => "On foot",
        TransportMode::Horse => "Mounted",
        TransportMode::Ship => "Naval",
        TransportMode::Supply => "Supply",
    }
}

pub fn transport_icon(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Foot => "🚶",
        TransportMode::Horse => "🐎",
        TransportMode::Ship => "⛵",
        TransportMode::Supply => "📦",
    }
}
