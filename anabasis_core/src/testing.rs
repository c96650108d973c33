//! Shared fixtures for unit tests.

use crate::dataset::*;
use crate::geojson::to_coord;
use crate::overlay::FeatureCollection;
use crate::render::{LayerVisibility, MarkerUpdate, RenderSink, SourceId};
use anabasis_env::{Frame, FrameLedger, FrameRequest, TickSource};
use async_trait::async_trait;
use geo::{Geometry, LineString, Polygon};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Meters per degree of longitude on the equator (haversine mean radius).
pub const METERS_PER_DEGREE: f64 = 6_371_008.8 * std::f64::consts::PI / 180.0;

pub fn lon_for_meters(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Line along the equator through the given along-track offsets in meters.
pub fn equator_line(offsets: &[f64]) -> LineString<f64> {
    LineString::from(
        offsets
            .iter()
            .map(|&m| (lon_for_meters(m), 0.0))
            .collect::<Vec<_>>(),
    )
}

pub fn track(id: &str, kind: TrackKind) -> Track {
    Track {
        id: id.to_string(),
        title: id.to_string(),
        person_id: None,
        color: "#7c3f00".to_string(),
        transport_default: TrackTransport::Mixed,
        visible_by_default: kind != TrackKind::Enemy,
        kind,
    }
}

pub fn waypoint(id: &str, track_id: &str, seq: i64, lon: f64, lat: f64) -> Waypoint {
    Waypoint {
        id: id.to_string(),
        track_id: track_id.to_string(),
        seq,
        name: id.to_string(),
        occurred_on: None,
        coordinates: to_coord([lon, lat]),
        summary: String::new(),
        transcript: None,
        autoplay_audio: None,
        media: Vec::new(),
        sources: Vec::new(),
    }
}

/// Horse segment without a duration estimate.
pub fn segment(id: &str, track_id: &str, from: &str, to: &str, coords: &[(f64, f64)]) -> Segment {
    Segment {
        id: id.to_string(),
        track_id: track_id.to_string(),
        from_waypoint_id: from.to_string(),
        to_waypoint_id: to.to_string(),
        geometry: LineString::from(coords.to_vec()),
        transport_mode: TransportMode::Horse,
        est_duration_minutes: None,
    }
}

fn square(lon: f64, lat: f64) -> Geometry<f64> {
    Geometry::Polygon(Polygon::new(
        LineString::from(vec![
            (lon, lat),
            (lon + 1.0, lat),
            (lon + 1.0, lat + 1.0),
            (lon, lat + 1.0),
        ]),
        vec![],
    ))
}

fn territory(id: &str, controller: Controller) -> TerritoryFeature {
    TerritoryFeature {
        id: id.to_string(),
        name: id.to_string(),
        controller,
        geometry: square(20.0, 38.0),
    }
}

/// Two tracks.
///
/// `track-land`: wp-1 (0 m) → wp-2 (1000 m) → wp-3 (3000 m) along the
/// equator, joined by seg-1 and seg-2.
/// `track-sea`: sea-1 → sea-2 joined by a ship segment.
/// Territory snapshots exist for wp-1 and wp-2 only.
pub fn campaign_fixture() -> CampaignDataset {
    let lon = lon_for_meters;
    CampaignDataset {
        people: vec![Person {
            id: "person-alexander".into(),
            slug: "alexander".into(),
            display_name: "Alexander III".into(),
            role: PersonRole::Alexander,
            bio: None,
            portrait_url: None,
        }],
        tracks: vec![track("track-land", TrackKind::Land), track("track-sea", TrackKind::Sea)],
        waypoints: vec![
            waypoint("wp-1", "track-land", 1, 0.0, 0.0),
            waypoint("wp-2", "track-land", 2, lon(1_000.0), 0.0),
            waypoint("wp-3", "track-land", 3, lon(3_000.0), 0.0),
            waypoint("sea-1", "track-sea", 10, 26.0, 40.0),
            waypoint("sea-2", "track-sea", 20, 27.0, 39.0),
        ],
        segments: vec![
            segment("seg-1", "track-land", "wp-1", "wp-2", &[(0.0, 0.0), (lon(1_000.0), 0.0)]),
            segment(
                "seg-2",
                "track-land",
                "wp-2",
                "wp-3",
                &[(lon(1_000.0), 0.0), (lon(2_000.0), 0.0), (lon(3_000.0), 0.0)],
            ),
            Segment {
                transport_mode: TransportMode::Ship,
                ..segment("sea-seg-1", "track-sea", "sea-1", "sea-2", &[(26.0, 40.0), (27.0, 39.0)])
            },
        ],
        events: vec![EventOverlay {
            id: "event-granicus".into(),
            name: "Granicus".into(),
            kind: EventKind::Battle,
            occurred_on: Some("0334-05".into()),
            area: square(27.0, 40.0),
            summary: "First victory".into(),
            source_citation: None,
        }],
        regions: vec![RegionOverlay {
            id: "region-macedonia".into(),
            name: "Macedonia".into(),
            period: None,
            geometry: square(21.0, 40.0),
        }],
        territory_timeline: vec![
            TerritorySnapshot {
                waypoint_id: "wp-1".into(),
                description: Some("Before the crossing".into()),
                territories: vec![territory("macedon-core", Controller::Macedon)],
            },
            TerritorySnapshot {
                waypoint_id: "wp-2".into(),
                description: Some("After Granicus".into()),
                territories: vec![
                    territory("macedon-core", Controller::Macedon),
                    territory("ionia", Controller::Allies),
                    territory("persis", Controller::Persia),
                ],
            },
        ],
        ancient_labels: vec![AncientLabel {
            id: "label-pella".into(),
            name: "Pella".into(),
            kind: LabelKind::City,
            coordinates: to_coord([22.5, 40.75]),
        }],
        life_timeline: vec![
            LifeEvent {
                id: "life-birth".into(),
                title: "Birth".into(),
                occurred_on: Some("0356-07-20".into()),
                location: Some("Pella".into()),
                coordinates: Some(to_coord([22.5, 40.75])),
                description: "Born to Philip II".into(),
            },
            LifeEvent {
                id: "life-tutor".into(),
                title: "Tutored by Aristotle".into(),
                occurred_on: None,
                location: None,
                coordinates: None,
                description: "Mieza".into(),
            },
        ],
    }
}

/// One track of two waypoints `meters` apart, joined by a horse segment.
pub fn single_segment_dataset(meters: f64, est_duration_minutes: Option<f64>) -> CampaignDataset {
    CampaignDataset {
        tracks: vec![track("t", TrackKind::Land)],
        waypoints: vec![
            waypoint("start", "t", 1, 0.0, 0.0),
            waypoint("end", "t", 2, lon_for_meters(meters), 0.0),
        ],
        segments: vec![Segment {
            est_duration_minutes,
            ..segment("leg", "t", "start", "end", &[(0.0, 0.0), (lon_for_meters(meters), 0.0)])
        }],
        ..Default::default()
    }
}

/// One track of two waypoints without a segment between them.
pub fn teleport_dataset() -> CampaignDataset {
    CampaignDataset {
        tracks: vec![track("t", TrackKind::Land)],
        waypoints: vec![waypoint("a", "t", 1, 0.0, 0.0), waypoint("b", "t", 2, 10.0, 10.0)],
        ..Default::default()
    }
}

// ============================================================================
// MANUAL TICKS
// ============================================================================

/// Tick source advanced by hand.
#[derive(Default)]
pub struct ManualTicks {
    clock: Mutex<Duration>,
    ledger: Mutex<FrameLedger>,
}

impl ManualTicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `seconds` and fires the pending frame, if any.
    pub fn fire(&self, seconds: f64) -> Option<Frame> {
        let mut clock = self.clock.lock().unwrap();
        *clock += Duration::from_secs_f64(seconds);
        let request = self.ledger.lock().unwrap().take()?;
        Some(Frame::new(request, *clock))
    }

    pub fn issued(&self) -> u64 {
        self.ledger.lock().unwrap().issued()
    }
}

#[async_trait]
impl TickSource for ManualTicks {
    fn now(&self) -> Duration {
        *self.clock.lock().unwrap()
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
        self.fire(1.0 / 60.0)
    }
}

// ============================================================================
// CAPTURING SINK
// ============================================================================

/// Keeps the latest data per source and every marker update.
#[derive(Debug, Default)]
pub struct CapturingSink {
    pub sources: HashMap<String, FeatureCollection>,
    pub markers: Vec<MarkerUpdate>,
    pub visibility: Vec<LayerVisibility>,
}

impl CapturingSink {
    pub fn source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id)
    }

    pub fn last_marker(&self) -> Option<&MarkerUpdate> {
        self.markers.last()
    }

    pub fn is_visible(&self, layer: &str) -> Option<bool> {
        self.visibility
            .iter()
            .find(|entry| entry.layer.to_string() == layer)
            .map(|entry| entry.visible)
    }
}

impl RenderSink for CapturingSink {
    fn set_source_data(&mut self, source: SourceId, features: FeatureCollection) {
        self.sources.insert(source.to_string(), features);
    }

    fn set_marker(&mut self, marker: MarkerUpdate) {
        self.markers.push(marker);
    }

    fn apply_visibility(&mut self, layers: &[LayerVisibility]) {
        self.visibility = layers.to_vec();
    }
}
