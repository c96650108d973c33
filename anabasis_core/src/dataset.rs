//! The campaign dataset and its read-only view.
//!
//! The dataset is immutable for the lifetime of a session. [`DatasetView`]
//! validates it once and builds the lookup indices every other component
//! queries: ordered waypoints per track, segments per track, segments by
//! endpoint pair.

use crate::geojson::{as_coord, as_geometry, as_line_string, as_option_coord};
use geo::{Coord, Geometry, LineString};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// REFERENCE TYPES
// ============================================================================

/// How a segment is traversed. Drives speed and marker styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Foot,
    Horse,
    Ship,
    Supply,
}

impl TransportMode {
    pub fn all() -> [TransportMode; 4] {
        [Self::Foot, Self::Horse, Self::Ship, Self::Supply]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Foot => "foot",
            Self::Horse => "horse",
            Self::Ship => "ship",
            Self::Supply => "supply",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A track's default transport: one mode, or mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackTransport {
    Foot,
    Horse,
    Ship,
    Supply,
    Mixed,
}

impl TrackTransport {
    /// Mode shown on the marker while resting at a waypoint.
    ///
    /// Mixed tracks rest as mounted.
    pub fn resting_mode(&self) -> TransportMode {
        match self {
            Self::Foot => TransportMode::Foot,
            Self::Horse | Self::Mixed => TransportMode::Horse,
            Self::Ship => TransportMode::Ship,
            Self::Supply => TransportMode::Supply,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Land,
    Sea,
    Supply,
    Enemy,
}

/// One actor's path through the campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub person_id: Option<String>,
    /// CSS color string used for the route line
    pub color: String,
    pub transport_default: TrackTransport,
    pub visible_by_default: bool,
    pub kind: TrackKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Image,
    Text,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointMedia {
    pub id: String,
    pub kind: MediaKind,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub credit: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

/// A named, ordered stop on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub id: String,
    pub track_id: String,

    /// March order within the track (unique, strictly increasing)
    pub seq: i64,

    pub name: String,

    /// Free-form date string, e.g. `0334-05-01` for 334 BCE
    #[serde(default)]
    pub occurred_on: Option<String>,

    /// Location as `[lon, lat]`
    #[serde(with = "as_coord")]
    pub coordinates: Coord<f64>,

    pub summary: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub autoplay_audio: Option<bool>,
    #[serde(default)]
    pub media: Vec<WaypointMedia>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Traversable geometry between two consecutive waypoints of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: String,
    pub track_id: String,
    pub from_waypoint_id: String,
    pub to_waypoint_id: String,
    #[serde(with = "as_line_string")]
    pub geometry: LineString<f64>,
    pub transport_mode: TransportMode,
    #[serde(default)]
    pub est_duration_minutes: Option<f64>,
}

/// Political controller of a territory polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Controller {
    Macedon,
    Allies,
    Persia,
}

impl Controller {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Macedon => "macedon",
            Self::Allies => "allies",
            Self::Persia => "persia",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryFeature {
    pub id: String,
    pub name: String,
    pub controller: Controller,
    #[serde(with = "as_geometry")]
    pub geometry: Geometry<f64>,
}

/// Control map associated with one waypoint of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritorySnapshot {
    pub waypoint_id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub territories: Vec<TerritoryFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonRole {
    Alexander,
    General,
    Enemy,
    Ally,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub slug: String,
    pub display_name: String,
    pub role: PersonRole,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub portrait_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Battle,
    Siege,
    Treaty,
    Founding,
}

/// Highlighted area for a battle, siege, treaty or founding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOverlay {
    pub id: String,
    pub name: String,
    pub kind: EventKind,
    #[serde(default)]
    pub occurred_on: Option<String>,
    #[serde(with = "as_geometry")]
    pub area: Geometry<f64>,
    pub summary: String,
    #[serde(default)]
    pub source_citation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionOverlay {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(with = "as_geometry")]
    pub geometry: Geometry<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    Region,
    City,
    Territory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AncientLabel {
    pub id: String,
    pub name: String,
    pub kind: LabelKind,
    #[serde(with = "as_coord")]
    pub coordinates: Coord<f64>,
}

/// Entry of the biographical timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub occurred_on: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, with = "as_option_coord")]
    pub coordinates: Option<Coord<f64>>,
    pub description: String,
}

/// The full static campaign, as loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDataset {
    #[serde(default)]
    pub people: Vec<Person>,
    pub tracks: Vec<Track>,
    pub waypoints: Vec<Waypoint>,
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub events: Vec<EventOverlay>,
    #[serde(default)]
    pub regions: Vec<RegionOverlay>,
    #[serde(default)]
    pub territory_timeline: Vec<TerritorySnapshot>,
    #[serde(default)]
    pub ancient_labels: Vec<AncientLabel>,
    #[serde(default)]
    pub life_timeline: Vec<LifeEvent>,
}

impl CampaignDataset {
    /// Parses a dataset from JSON without validating it.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed dataset: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{item} references unknown track {track}")]
    UnknownTrack { item: String, track: String },

    #[error("Track {track} has more than one waypoint with seq {seq}")]
    DuplicateSeq { track: String, seq: i64 },

    #[error("Segment {segment} references unknown waypoint {waypoint}")]
    DanglingSegment { segment: String, waypoint: String },

    #[error("Segment {segment} does not join consecutive waypoints of track {track}")]
    NonConsecutiveSegment { segment: String, track: String },
}

// ============================================================================
// DATASET VIEW
// ============================================================================

/// Read-only, indexed access to a validated [`CampaignDataset`].
#[derive(Debug, Clone)]
pub struct DatasetView {
    dataset: CampaignDataset,
    track_index: HashMap<String, usize>,
    waypoint_index: HashMap<String, usize>,
    segment_index: HashMap<String, usize>,
    /// Waypoint indices per track, ascending by seq
    ordered_waypoints: HashMap<String, Vec<usize>>,
    /// Segment indices per track, in dataset order
    track_segments: HashMap<String, Vec<usize>>,
    /// (from, to) waypoint ids -> segment index
    segment_by_endpoints: HashMap<(String, String), usize>,
}

fn index_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, usize>, DatasetError> {
    let mut index = HashMap::new();
    for (i, id) in ids.enumerate() {
        if index.insert(id.to_string(), i).is_some() {
            return Err(DatasetError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(index)
}

impl DatasetView {
    /// Validates `dataset` and builds the lookup indices.
    pub fn new(dataset: CampaignDataset) -> Result<Self, DatasetError> {
        let track_index = index_ids("track", dataset.tracks.iter().map(|t| t.id.as_str()))?;
        let waypoint_index =
            index_ids("waypoint", dataset.waypoints.iter().map(|w| w.id.as_str()))?;
        let segment_index = index_ids("segment", dataset.segments.iter().map(|s| s.id.as_str()))?;

        // Step 1: Group waypoints by track and order them
        let mut ordered_waypoints: HashMap<String, Vec<usize>> = dataset
            .tracks
            .iter()
            .map(|t| (t.id.clone(), Vec::new()))
            .collect();

        for (i, waypoint) in dataset.waypoints.iter().enumerate() {
            let Some(list) = ordered_waypoints.get_mut(&waypoint.track_id) else {
                return Err(DatasetError::UnknownTrack {
                    item: format!("Waypoint {}", waypoint.id),
                    track: waypoint.track_id.clone(),
                });
            };
            list.push(i);
        }

        for (track_id, list) in ordered_waypoints.iter_mut() {
            list.sort_by_key(|&i| dataset.waypoints[i].seq);
            let mut seen = HashSet::new();
            for &i in list.iter() {
                let seq = dataset.waypoints[i].seq;
                if !seen.insert(seq) {
                    return Err(DatasetError::DuplicateSeq {
                        track: track_id.clone(),
                        seq,
                    });
                }
            }
        }

        // Step 2: Check segment endpoints against the ordering
        let mut track_segments: HashMap<String, Vec<usize>> = dataset
            .tracks
            .iter()
            .map(|t| (t.id.clone(), Vec::new()))
            .collect();
        let mut segment_by_endpoints = HashMap::new();

        for (i, segment) in dataset.segments.iter().enumerate() {
            let Some(list) = track_segments.get_mut(&segment.track_id) else {
                return Err(DatasetError::UnknownTrack {
                    item: format!("Segment {}", segment.id),
                    track: segment.track_id.clone(),
                });
            };

            let position_of = |waypoint_id: &str| -> Result<usize, DatasetError> {
                let dangling = || DatasetError::DanglingSegment {
                    segment: segment.id.clone(),
                    waypoint: waypoint_id.to_string(),
                };
                let index = *waypoint_index.get(waypoint_id).ok_or_else(dangling)?;
                ordered_waypoints[&segment.track_id]
                    .iter()
                    .position(|&w| w == index)
                    .ok_or_else(|| DatasetError::NonConsecutiveSegment {
                        segment: segment.id.clone(),
                        track: segment.track_id.clone(),
                    })
            };

            let from = position_of(&segment.from_waypoint_id)?;
            let to = position_of(&segment.to_waypoint_id)?;
            if to != from + 1 {
                return Err(DatasetError::NonConsecutiveSegment {
                    segment: segment.id.clone(),
                    track: segment.track_id.clone(),
                });
            }

            let key = (
                segment.from_waypoint_id.clone(),
                segment.to_waypoint_id.clone(),
            );
            if segment_by_endpoints.insert(key, i).is_some() {
                return Err(DatasetError::DuplicateId {
                    kind: "segment endpoint pair",
                    id: segment.id.clone(),
                });
            }
            list.push(i);
        }

        debug!(
            tracks = dataset.tracks.len(),
            waypoints = dataset.waypoints.len(),
            segments = dataset.segments.len(),
            snapshots = dataset.territory_timeline.len(),
            "Dataset indexed"
        );

        Ok(Self {
            dataset,
            track_index,
            waypoint_index,
            segment_index,
            ordered_waypoints,
            track_segments,
            segment_by_endpoints,
        })
    }

    /// Parses and validates a JSON dataset.
    pub fn from_json_str(json: &str) -> Result<Self, DatasetError> {
        Self::new(CampaignDataset::from_json_str(json)?)
    }

    /// Reads, parses and validates a JSON dataset file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// The underlying dataset.
    pub fn dataset(&self) -> &CampaignDataset {
        &self.dataset
    }

    pub fn tracks(&self) -> &[Track] {
        &self.dataset.tracks
    }

    pub fn track_by_id(&self, id: &str) -> Option<&Track> {
        self.track_index.get(id).map(|&i| &self.dataset.tracks[i])
    }

    pub fn waypoint_by_id(&self, id: &str) -> Option<&Waypoint> {
        self.waypoint_index.get(id).map(|&i| &self.dataset.waypoints[i])
    }

    pub fn segment_by_id(&self, id: &str) -> Option<&Segment> {
        self.segment_index.get(id).map(|&i| &self.dataset.segments[i])
    }

    /// Waypoints of a track, strictly ascending by `seq`.
    ///
    /// Unknown tracks yield an empty list.
    pub fn waypoints_for_track(&self, track_id: &str) -> Vec<&Waypoint> {
        self.ordered_waypoints
            .get(track_id)
            .map(|list| list.iter().map(|&i| &self.dataset.waypoints[i]).collect())
            .unwrap_or_default()
    }

    /// Segments of a track in dataset order.
    pub fn segments_for_track(&self, track_id: &str) -> Vec<&Segment> {
        self.track_segments
            .get(track_id)
            .map(|list| list.iter().map(|&i| &self.dataset.segments[i]).collect())
            .unwrap_or_default()
    }

    /// The segment joining `from` to `to` on `track_id`, if one exists.
    pub fn segment_between(&self, track_id: &str, from: &str, to: &str) -> Option<&Segment> {
        self.segment_by_endpoints
            .get(&(from.to_string(), to.to_string()))
            .map(|&i| &self.dataset.segments[i])
            .filter(|segment| segment.track_id == track_id)
    }

    pub fn first_waypoint(&self, track_id: &str) -> Option<&Waypoint> {
        self.ordered_waypoints
            .get(track_id)?
            .first()
            .map(|&i| &self.dataset.waypoints[i])
    }

    /// Position of `waypoint_id` within its track's ordering.
    pub fn waypoint_position(&self, track_id: &str, waypoint_id: &str) -> Option<usize> {
        let index = *self.waypoint_index.get(waypoint_id)?;
        self.ordered_waypoints
            .get(track_id)?
            .iter()
            .position(|&i| i == index)
    }

    /// The waypoint after the one with `seq` on `track_id`.
    pub fn next_waypoint(&self, track_id: &str, seq: i64) -> Option<&Waypoint> {
        let list = self.ordered_waypoints.get(track_id)?;
        let at = list
            .iter()
            .position(|&i| self.dataset.waypoints[i].seq == seq)?;
        list.get(at + 1).map(|&i| &self.dataset.waypoints[i])
    }

    /// The waypoint before the one with `seq` on `track_id`.
    pub fn previous_waypoint(&self, track_id: &str, seq: i64) -> Option<&Waypoint> {
        let list = self.ordered_waypoints.get(track_id)?;
        let at = list
            .iter()
            .position(|&i| self.dataset.waypoints[i].seq == seq)?;
        at.checked_sub(1)
            .and_then(|prev| list.get(prev))
            .map(|&i| &self.dataset.waypoints[i])
    }

    /// Territory snapshots in declared order.
    pub fn territory_timeline(&self) -> &[TerritorySnapshot] {
        &self.dataset.territory_timeline
    }

    pub fn events(&self) -> &[EventOverlay] {
        &self.dataset.events
    }

    pub fn regions(&self) -> &[RegionOverlay] {
        &self.dataset.regions
    }

    pub fn ancient_labels(&self) -> &[AncientLabel] {
        &self.dataset.ancient_labels
    }

    pub fn life_timeline(&self) -> &[LifeEvent] {
        &self.dataset.life_timeline
    }

    pub fn people(&self) -> &[Person] {
        &self.dataset.people
    }
}
