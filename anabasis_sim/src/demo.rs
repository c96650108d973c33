//! Built-in demo campaign: the opening of Alexander's Asian campaign.
//!
//! Coordinates are historical approximations. Durations are left out so the
//! engine's fallback speed applies, and the Halicarnassus → Gordium leg has
//! no geometry on purpose (it plays as a jump).

use anabasis_core::dataset::*;
use anabasis_core::geojson::{to_coord, Position};
use anabasis_core::{DatasetError, DatasetView};
use geo::{Geometry, LineString, Polygon};

pub const ALEXANDER: &str = "track-alexander";
pub const PARMENION: &str = "track-parmenion";
pub const DARIUS: &str = "track-darius";
pub const NEARCHUS: &str = "track-nearchus";

fn track(
    id: &str,
    title: &str,
    person: &str,
    color: &str,
    transport: TrackTransport,
    visible: bool,
    kind: TrackKind,
) -> Track {
    Track {
        id: id.into(),
        title: title.into(),
        person_id: Some(person.into()),
        color: color.into(),
        transport_default: transport,
        visible_by_default: visible,
        kind,
    }
}

fn waypoint(
    id: &str,
    track_id: &str,
    seq: i64,
    name: &str,
    date: &str,
    at: Position,
    summary: &str,
) -> Waypoint {
    Waypoint {
        id: id.into(),
        track_id: track_id.into(),
        seq,
        name: name.into(),
        occurred_on: Some(date.into()),
        coordinates: to_coord(at),
        summary: summary.into(),
        transcript: None,
        autoplay_audio: None,
        media: Vec::new(),
        sources: vec!["Arrian, Anabasis Alexandri".into()],
    }
}

fn segment(
    id: &str,
    track_id: &str,
    from: &str,
    to: &str,
    path: &[Position],
    mode: TransportMode,
) -> Segment {
    Segment {
        id: id.into(),
        track_id: track_id.into(),
        from_waypoint_id: from.into(),
        to_waypoint_id: to.into(),
        geometry: LineString::new(path.iter().copied().map(to_coord).collect()),
        transport_mode: mode,
        est_duration_minutes: None,
    }
}

fn area(ring: &[Position]) -> Geometry<f64> {
    Geometry::Polygon(Polygon::new(
        LineString::new(ring.iter().copied().map(to_coord).collect()),
        Vec::new(),
    ))
}

fn territory(id: &str, name: &str, controller: Controller, ring: &[Position]) -> TerritoryFeature {
    TerritoryFeature {
        id: id.into(),
        name: name.into(),
        controller,
        geometry: area(ring),
    }
}

const MACEDON_CORE: &[Position] = &[[20.5, 39.8], [24.5, 39.8], [24.5, 41.8], [20.5, 41.8]];
const IONIA: &[Position] = &[[26.0, 37.0], [28.5, 37.0], [28.5, 40.5], [26.0, 40.5]];
const ANATOLIA: &[Position] = &[[28.5, 36.0], [36.5, 36.0], [36.5, 41.5], [28.5, 41.5]];
const LEVANT: &[Position] = &[[34.0, 31.0], [37.0, 31.0], [37.0, 36.0], [34.0, 36.0]];

pub fn demo_campaign() -> CampaignDataset {
    CampaignDataset {
        people: vec![
            person(
                "person-alexander",
                "alexander-the-great",
                "Alexander III of Macedon",
                PersonRole::Alexander,
            ),
            person("person-parmenion", "parmenion", "Parmenion", PersonRole::General),
            person("person-darius", "darius-iii", "Darius III", PersonRole::Enemy),
            person("person-nearchus", "nearchus", "Nearchus", PersonRole::General),
        ],
        tracks: vec![
            track(
                ALEXANDER,
                "Alexander the Great",
                "person-alexander",
                "#7c3f00",
                TrackTransport::Mixed,
                true,
                TrackKind::Land,
            ),
            track(
                PARMENION,
                "General Parmenion",
                "person-parmenion",
                "#3a6b6c",
                TrackTransport::Horse,
                false,
                TrackKind::Land,
            ),
            track(
                DARIUS,
                "King Darius III",
                "person-darius",
                "#7a1f2a",
                TrackTransport::Horse,
                false,
                TrackKind::Enemy,
            ),
            track(
                NEARCHUS,
                "Admiral Nearchus (Fleet)",
                "person-nearchus",
                "#2f4858",
                TrackTransport::Ship,
                true,
                TrackKind::Sea,
            ),
        ],
        waypoints: vec![
            waypoint(
                "wp-pella",
                ALEXANDER,
                1,
                "Pella",
                "0356-07-20",
                [22.524, 40.758],
                "Birthplace and royal capital.",
            ),
            waypoint(
                "wp-hellespont",
                ALEXANDER,
                2,
                "Hellespont",
                "0334-04-01",
                [26.4, 40.2],
                "The army crosses into Asia.",
            ),
            waypoint(
                "wp-granicus",
                ALEXANDER,
                3,
                "Granicus",
                "0334-05-01",
                [27.033, 40.444],
                "First victory over the satraps.",
            ),
            waypoint(
                "wp-halicarnassus",
                ALEXANDER,
                4,
                "Halicarnassus",
                "0334-09-01",
                [27.43, 37.037],
                "Siege of the Carian stronghold.",
            ),
            waypoint(
                "wp-gordium",
                ALEXANDER,
                5,
                "Gordium",
                "0333-03-01",
                [31.99, 37.511],
                "The Gordian knot.",
            ),
            waypoint(
                "wp-issus",
                ALEXANDER,
                6,
                "Issus",
                "0333-11-05",
                [35.9807, 36.587],
                "Darius flees the field.",
            ),
            waypoint(
                "wp-parmenion-granicus",
                PARMENION,
                1,
                "Granicus (left wing)",
                "0334-05-01",
                [27.02, 40.45],
                "Parmenion holds the left.",
            ),
            waypoint(
                "wp-parmenion-issus",
                PARMENION,
                2,
                "Issus (left wing)",
                "0333-11-05",
                [35.98, 36.6],
                "Thessalian cavalry on the coast.",
            ),
            waypoint(
                "wp-darius-issus",
                DARIUS,
                1,
                "Issus",
                "0333-11-05",
                [36.05, 36.6],
                "The Persian host arrives behind Alexander.",
            ),
            waypoint(
                "wp-darius-gaugamela",
                DARIUS,
                2,
                "Gaugamela",
                "0331-10-01",
                [43.3, 36.37],
                "A prepared battlefield.",
            ),
            waypoint(
                "wp-nearchus-tyre",
                NEARCHUS,
                1,
                "Tyre",
                "0332-07-01",
                [35.19, 33.27],
                "The fleet gathers after the siege.",
            ),
            waypoint(
                "wp-nearchus-babylon",
                NEARCHUS,
                2,
                "Babylon",
                "0323-05-01",
                [44.42, 32.54],
                "The fleet reaches Babylon.",
            ),
        ],
        segments: vec![
            segment(
                "seg-pella-hellespont",
                ALEXANDER,
                "wp-pella",
                "wp-hellespont",
                &[[22.524, 40.758], [23.8, 40.6], [25.1, 40.4], [26.4, 40.2]],
                TransportMode::Horse,
            ),
            segment(
                "seg-hellespont-granicus",
                ALEXANDER,
                "wp-hellespont",
                "wp-granicus",
                &[[26.4, 40.2], [26.9, 40.3], [27.033, 40.444]],
                TransportMode::Horse,
            ),
            segment(
                "seg-granicus-halicarnassus",
                ALEXANDER,
                "wp-granicus",
                "wp-halicarnassus",
                &[[27.033, 40.444], [27.8, 39.5], [27.4, 38.4], [27.43, 37.037]],
                TransportMode::Foot,
            ),
            segment(
                "seg-gordium-issus",
                ALEXANDER,
                "wp-gordium",
                "wp-issus",
                &[[31.99, 37.511], [34.5, 37.0], [35.9807, 36.587]],
                TransportMode::Supply,
            ),
            segment(
                "seg-parmenion-issus",
                PARMENION,
                "wp-parmenion-granicus",
                "wp-parmenion-issus",
                &[[27.02, 40.45], [31.0, 38.5], [35.98, 36.6]],
                TransportMode::Horse,
            ),
            segment(
                "seg-nearchus-fleet",
                NEARCHUS,
                "wp-nearchus-tyre",
                "wp-nearchus-babylon",
                &[[35.19, 33.27], [34.0, 32.0], [32.0, 31.0], [34.5, 30.5], [44.42, 32.538]],
                TransportMode::Ship,
            ),
        ],
        events: vec![
            EventOverlay {
                id: "event-granicus".into(),
                name: "Battle of the Granicus".into(),
                kind: EventKind::Battle,
                occurred_on: Some("0334-05-01".into()),
                area: area(&[[26.9, 40.35], [27.15, 40.35], [27.15, 40.55], [26.9, 40.55]]),
                summary: "Alexander leads the Companion cavalry across the river.".into(),
                source_citation: Some("Arrian 1.13-16".into()),
            },
            EventOverlay {
                id: "event-halicarnassus".into(),
                name: "Siege of Halicarnassus".into(),
                kind: EventKind::Siege,
                occurred_on: Some("0334-09".into()),
                area: area(&[[27.3, 36.95], [27.55, 36.95], [27.55, 37.12], [27.3, 37.12]]),
                summary: "Memnon's garrison withdraws by sea.".into(),
                source_citation: None,
            },
        ],
        regions: vec![
            RegionOverlay {
                id: "region-macedonia".into(),
                name: "Macedonia".into(),
                period: Some("4th century BCE".into()),
                geometry: area(MACEDON_CORE),
            },
            RegionOverlay {
                id: "region-anatolia".into(),
                name: "Anatolia".into(),
                period: None,
                geometry: area(ANATOLIA),
            },
        ],
        territory_timeline: vec![
            TerritorySnapshot {
                waypoint_id: "wp-pella".into(),
                description: Some("Macedon before the crossing".into()),
                territories: vec![
                    territory("terr-macedon", "Macedon", Controller::Macedon, MACEDON_CORE),
                    territory("terr-ionia", "Ionia", Controller::Persia, IONIA),
                    territory("terr-anatolia", "Anatolia", Controller::Persia, ANATOLIA),
                    territory("terr-levant", "Levant", Controller::Persia, LEVANT),
                ],
            },
            TerritorySnapshot {
                waypoint_id: "wp-granicus".into(),
                description: Some("The Greek cities of Asia go over to Alexander".into()),
                territories: vec![
                    territory("terr-macedon", "Macedon", Controller::Macedon, MACEDON_CORE),
                    territory("terr-ionia", "Ionia", Controller::Allies, IONIA),
                    territory("terr-anatolia", "Anatolia", Controller::Persia, ANATOLIA),
                    territory("terr-levant", "Levant", Controller::Persia, LEVANT),
                ],
            },
            TerritorySnapshot {
                waypoint_id: "wp-gordium".into(),
                description: Some("Anatolia under Macedonian control".into()),
                territories: vec![
                    territory("terr-macedon", "Macedon", Controller::Macedon, MACEDON_CORE),
                    territory("terr-ionia", "Ionia", Controller::Allies, IONIA),
                    territory("terr-anatolia", "Anatolia", Controller::Macedon, ANATOLIA),
                    territory("terr-levant", "Levant", Controller::Persia, LEVANT),
                ],
            },
        ],
        ancient_labels: vec![
            label("label-pella", "Pella", LabelKind::City, [22.524, 40.758]),
            label("label-sardis", "Sardis", LabelKind::City, [28.04, 38.49]),
            label("label-asia-minor", "Asia Minor", LabelKind::Region, [32.0, 39.0]),
        ],
        life_timeline: vec![
            life(
                "life-birth",
                "Birth",
                Some("0356-07-20"),
                Some("Pella"),
                Some([22.524, 40.758]),
                "Born to Philip II and Olympias.",
            ),
            life(
                "life-aristotle",
                "Tutored by Aristotle",
                Some("0343"),
                Some("Mieza"),
                None,
                "Studies at the Nymphaeum of Mieza.",
            ),
            life(
                "life-accession",
                "Accession",
                Some("0336"),
                Some("Aigai"),
                Some([22.32, 40.48]),
                "Becomes king after Philip's assassination.",
            ),
            life(
                "life-knot",
                "The Gordian knot",
                Some("0333"),
                Some("Gordium"),
                Some([31.99, 37.511]),
                "Cuts the knot of Gordium.",
            ),
        ],
    }
}

fn person(id: &str, slug: &str, name: &str, role: PersonRole) -> Person {
    Person {
        id: id.into(),
        slug: slug.into(),
        display_name: name.into(),
        role,
        bio: None,
        portrait_url: None,
    }
}

fn label(id: &str, name: &str, kind: LabelKind, at: Position) -> AncientLabel {
    AncientLabel {
        id: id.into(),
        name: name.into(),
        kind,
        coordinates: to_coord(at),
    }
}

fn life(
    id: &str,
    title: &str,
    date: Option<&str>,
    location: Option<&str>,
    at: Option<Position>,
    description: &str,
) -> LifeEvent {
    LifeEvent {
        id: id.into(),
        title: title.into(),
        occurred_on: date.map(Into::into),
        location: location.map(Into::into),
        coordinates: at.map(to_coord),
        description: description.into(),
    }
}

/// The demo campaign, validated.
pub fn demo_view() -> Result<DatasetView, DatasetError> {
    DatasetView::new(demo_campaign())
}

// ============================================================================
// SYNTHETIC ROUTES
// ============================================================================

pub const ROUTE_TRACK: &str = "route";
pub const ROUTE_START: &str = "route-start";
pub const ROUTE_END: &str = "route-end";
pub const ROUTE_SEGMENT: &str = "route-leg";

/// Haversine meters per degree of longitude on the equator.
const METERS_PER_DEGREE: f64 = 6_371_008.8 * std::f64::consts::PI / 180.0;

/// One track heading east along the equator for `meters`, in four equal
/// pieces, with no duration so the fallback speed applies.
pub fn straight_route(meters: f64, mode: TransportMode) -> Result<DatasetView, DatasetError> {
    let end = meters / METERS_PER_DEGREE;
    let path: Vec<Position> = (0..=4).map(|i| [end * f64::from(i) / 4.0, 0.0]).collect();

    DatasetView::new(CampaignDataset {
        tracks: vec![Track {
            id: ROUTE_TRACK.into(),
            title: "Survey route".into(),
            person_id: None,
            color: "#444444".into(),
            transport_default: TrackTransport::Horse,
            visible_by_default: true,
            kind: TrackKind::Land,
        }],
        waypoints: vec![
            waypoint(ROUTE_START, ROUTE_TRACK, 1, "Start", "0334-01-01", [0.0, 0.0], "Departure."),
            waypoint(ROUTE_END, ROUTE_TRACK, 2, "End", "0334-01-02", [end, 0.0], "Arrival."),
        ],
        segments: vec![segment(ROUTE_SEGMENT, ROUTE_TRACK, ROUTE_START, ROUTE_END, &path, mode)],
        ..CampaignDataset::default()
    })
}
