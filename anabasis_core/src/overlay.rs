//! Overlay builders: renderable feature collections derived from the dataset
//! and the playback position.
//!
//! Every builder returns owned data. Nothing here holds on to the dataset, so
//! a sink may keep or mutate what it receives.

use crate::dataset::{DatasetView, TerritorySnapshot};
use crate::geojson::as_geometry;
use geo::{Geometry, LineString, Point};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

/// A single renderable feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Feature {
    pub id: String,
    pub properties: Map<String, Value>,
    #[serde(with = "as_geometry")]
    pub geometry: Geometry<f64>,
}

impl Feature {
    fn new(id: impl Into<String>, properties: Value, geometry: impl Into<Geometry<f64>>) -> Self {
        let properties = match properties {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            properties,
            geometry: geometry.into(),
        }
    }

    /// String property, if present.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.id.as_str()).collect()
    }
}

/// Tag on progress features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    Completed,
    Active,
}

impl ProgressState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Active => "active",
        }
    }
}

pub const ACTIVE_PROGRESS_ID: &str = "progress-active";

// ============================================================================
// PROGRESS
// ============================================================================

/// Visited path up to `waypoint_id` on `track_id`.
///
/// Each consecutive waypoint pair strictly before the current waypoint that
/// has a segment contributes a `completed` feature. `partial`, when it has at
/// least two coordinates, is appended as the `active` feature. An unknown
/// waypoint yields only the partial line.
pub fn build_progress_geometry(
    data: &DatasetView,
    track_id: &str,
    waypoint_id: &str,
    partial: Option<&LineString<f64>>,
) -> FeatureCollection {
    let waypoints = data.waypoints_for_track(track_id);
    let current = data.waypoint_position(track_id, waypoint_id);
    let mut features = Vec::new();

    if let Some(current) = current {
        for pair in waypoints[..=current].windows(2) {
            if let Some(segment) = data.segment_between(track_id, &pair[0].id, &pair[1].id) {
                features.push(Feature::new(
                    format!("progress-{}", segment.id),
                    json!({ "trackId": track_id, "state": ProgressState::Completed.name() }),
                    segment.geometry.clone(),
                ));
            }
        }
    }

    if let Some(line) = partial.filter(|line| line.0.len() > 1) {
        features.push(Feature::new(
            ACTIVE_PROGRESS_ID,
            json!({ "trackId": track_id, "state": ProgressState::Active.name() }),
            line.clone(),
        ));
    }

    FeatureCollection::new(features)
}

// ============================================================================
// TERRITORY
// ============================================================================

/// Control map for `waypoint_id`.
///
/// Exact match, else the last snapshot in declared order. The result is a
/// deep copy carrying the requested waypoint id. An empty timeline gives an
/// empty snapshot.
pub fn resolve_territory_snapshot(data: &DatasetView, waypoint_id: &str) -> TerritorySnapshot {
    let timeline = data.territory_timeline();
    let found = timeline
        .iter()
        .find(|s| s.waypoint_id == waypoint_id)
        .or_else(|| {
            debug!(waypoint = waypoint_id, "No exact territory snapshot, using latest");
            timeline.last()
        });

    match found {
        Some(snapshot) => TerritorySnapshot {
            waypoint_id: waypoint_id.to_string(),
            ..snapshot.clone()
        },
        None => TerritorySnapshot {
            waypoint_id: waypoint_id.to_string(),
            description: None,
            territories: Vec::new(),
        },
    }
}

pub fn build_territory_features(data: &DatasetView, waypoint_id: &str) -> FeatureCollection {
    let snapshot = resolve_territory_snapshot(data, waypoint_id);
    FeatureCollection::new(
        snapshot
            .territories
            .into_iter()
            .map(|territory| {
                Feature::new(
                    territory.id.clone(),
                    json!({
                        "id": territory.id,
                        "name": territory.name,
                        "controller": territory.controller.name(),
                    }),
                    territory.geometry,
                )
            })
            .collect(),
    )
}

// ============================================================================
// STATIC LAYERS
// ============================================================================

pub fn build_track_line_features(data: &DatasetView, track_id: &str) -> FeatureCollection {
    FeatureCollection::new(
        data.segments_for_track(track_id)
            .into_iter()
            .map(|segment| {
                Feature::new(
                    segment.id.clone(),
                    json!({ "trackId": track_id, "transportMode": segment.transport_mode.name() }),
                    segment.geometry.clone(),
                )
            })
            .collect(),
    )
}

pub fn build_waypoint_features(data: &DatasetView, track_id: &str) -> FeatureCollection {
    FeatureCollection::new(
        data.waypoints_for_track(track_id)
            .into_iter()
            .map(|waypoint| {
                Feature::new(
                    waypoint.id.clone(),
                    json!({ "trackId": track_id, "name": waypoint.name, "seq": waypoint.seq }),
                    Point(waypoint.coordinates),
                )
            })
            .collect(),
    )
}

pub fn build_event_features(data: &DatasetView) -> FeatureCollection {
    FeatureCollection::new(
        data.events()
            .iter()
            .map(|event| {
                Feature::new(
                    event.id.clone(),
                    json!({
                        "name": event.name,
                        "kind": event.kind,
                        "occurredOn": event.occurred_on,
                        "summary": event.summary,
                        "sourceCitation": event.source_citation,
                    }),
                    event.area.clone(),
                )
            })
            .collect(),
    )
}

pub fn build_region_features(data: &DatasetView) -> FeatureCollection {
    FeatureCollection::new(
        data.regions()
            .iter()
            .map(|region| {
                Feature::new(
                    region.id.clone(),
                    json!({ "name": region.name, "period": region.period }),
                    region.geometry.clone(),
                )
            })
            .collect(),
    )
}

pub fn build_ancient_label_features(data: &DatasetView) -> FeatureCollection {
    FeatureCollection::new(
        data.ancient_labels()
            .iter()
            .map(|label| {
                Feature::new(
                    label.id.clone(),
                    json!({ "name": label.name, "kind": label.kind }),
                    Point(label.coordinates),
                )
            })
            .collect(),
    )
}

/// Life events that have a location, flagging the highlighted one.
pub fn build_life_event_features(
    data: &DatasetView,
    highlighted: Option<&str>,
) -> FeatureCollection {
    FeatureCollection::new(
        data.life_timeline()
            .iter()
            .filter_map(|event| {
                let coordinate = event.coordinates?;
                Some(Feature::new(
                    event.id.clone(),
                    json!({
                        "title": event.title,
                        "occurredOn": event.occurred_on,
                        "location": event.location,
                        "highlighted": highlighted == Some(event.id.as_str()),
                    }),
                    Point(coordinate),
                ))
            })
            .collect(),
    )
}
