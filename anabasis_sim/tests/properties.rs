//! Property tests for the playback engine.

use anabasis_core::dataset::{
    CampaignDataset, Track, TrackKind, TrackTransport, TransportMode, Waypoint,
};
use anabasis_core::interpolate::{length, position_at};
use anabasis_core::{DatasetView, EngineConfig, FrameOutcome, PlaybackSession};
use anabasis_sim::demo::{straight_route, ROUTE_END};
use anabasis_sim::scenarios::ScenarioId;
use anabasis_sim::{RecordingSink, ScenarioRunner, SimTickSource};
use geo::{Coord, LineString};
use proptest::prelude::*;
use std::sync::Arc;

fn waypoint(id: String, seq: i64) -> Waypoint {
    Waypoint {
        id,
        track_id: "t".into(),
        seq,
        name: String::new(),
        occurred_on: None,
        coordinates: Coord { x: 0.0, y: 0.0 },
        summary: String::new(),
        transcript: None,
        autoplay_audio: None,
        media: Vec::new(),
        sources: Vec::new(),
    }
}

fn coordinate() -> impl Strategy<Value = Coord<f64>> {
    (-170.0..170.0f64, -70.0..70.0f64).prop_map(|(x, y)| Coord { x, y })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn waypoints_come_back_in_seq_order(
        seqs in prop::collection::btree_set(-1_000i64..1_000, 1..40)
    ) {
        // Declared in reverse so the ordering has to come from the view
        let waypoints: Vec<Waypoint> = seqs
            .iter()
            .rev()
            .map(|&seq| waypoint(format!("w{}", seq), seq))
            .collect();
        let view = DatasetView::new(CampaignDataset {
            tracks: vec![Track {
                id: "t".into(),
                title: "t".into(),
                person_id: None,
                color: "#000000".into(),
                transport_default: TrackTransport::Foot,
                visible_by_default: true,
                kind: TrackKind::Land,
            }],
            waypoints,
            ..CampaignDataset::default()
        })
        .unwrap();

        let ordered: Vec<i64> = view.waypoints_for_track("t").iter().map(|w| w.seq).collect();
        let expected: Vec<i64> = seqs.iter().copied().collect();
        prop_assert_eq!(ordered, expected);
    }

    #[test]
    fn position_at_endpoints_are_exact(points in prop::collection::vec(coordinate(), 2..8)) {
        let line = LineString::new(points.clone());
        let total = length(&line);

        prop_assert_eq!(position_at(&line, 0.0), Some(points[0]));
        prop_assert_eq!(position_at(&line, total), Some(points[points.len() - 1]));
        prop_assert_eq!(position_at(&line, total * 2.0 + 1.0), Some(points[points.len() - 1]));
    }

    #[test]
    fn clamped_speed_stays_in_range(speed in -10.0..10.0f64, steps in -20i32..20) {
        let config = EngineConfig::default();
        let stepped = config.step_speed(speed, steps);
        prop_assert!(stepped >= config.min_speed && stepped <= config.max_speed);

        let grid = (stepped - config.min_speed) / config.speed_step;
        prop_assert!((grid - grid.round()).abs() < 1e-9);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn distance_never_decreases(
        seed in any::<u64>(),
        jitter in 0.0..0.9f64,
        meters in 50.0..800.0f64
    ) {
        let data = Arc::new(straight_route(meters, TransportMode::Foot).unwrap());
        let ticks = SimTickSource::shared(seed, 60.0, jitter).unwrap();
        let mut session = PlaybackSession::new(
            data,
            Arc::clone(&ticks),
            RecordingSink::new(),
            EngineConfig::default(),
        )
        .unwrap();
        session.initialize();
        session.set_playing(true);

        let mut last = 0.0;
        while let Some(frame) = ticks.advance_frame() {
            match session.handle_frame(frame) {
                FrameOutcome::Advanced { distance_traveled } => {
                    prop_assert!(distance_traveled >= last);
                    last = distance_traveled;
                }
                FrameOutcome::Completed => break,
                other => prop_assert!(false, "unexpected outcome {:?}", other),
            }
        }

        prop_assert_eq!(session.state().current_waypoint(), Some(ROUTE_END));
        prop_assert!(!session.state().is_playing());
    }

    #[test]
    fn same_seed_same_run(seed in any::<u64>()) {
        let a = ScenarioRunner::new(seed).run(ScenarioId::SpeedChange);
        let b = ScenarioRunner::new(seed).run(ScenarioId::SpeedChange);

        prop_assert!(a.passed, "{:?}", a.failure_reason);
        prop_assert_eq!(a.total_frames, b.total_frames);
        prop_assert_eq!(a.final_time_secs, b.final_time_secs);
        prop_assert_eq!(a.metrics.frames_animated, b.metrics.frames_animated);
    }
}
