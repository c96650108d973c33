//! Derived-layer publishing: glue between state, overlay builders and a sink.

use crate::dataset::DatasetView;
use crate::overlay::{
    build_ancient_label_features, build_event_features, build_life_event_features,
    build_progress_geometry, build_region_features, build_territory_features,
    build_track_line_features, build_waypoint_features, FeatureCollection,
};
use crate::playback::PlaybackState;
use crate::render::{visibility_plan, MarkerUpdate, RenderSink, SourceId};
use geo::LineString;
use tracing::{debug, warn};

/// Pushes every layer: static sources, waypoint-derived layers, visibility.
pub fn publish_all<S: RenderSink + ?Sized>(
    data: &DatasetView,
    state: &PlaybackState,
    sink: &mut S,
) {
    for track in data.tracks() {
        sink.set_source_data(
            SourceId::TrackLines(track.id.clone()),
            build_track_line_features(data, &track.id),
        );
        sink.set_source_data(
            SourceId::TrackWaypoints(track.id.clone()),
            build_waypoint_features(data, &track.id),
        );
    }
    sink.set_source_data(SourceId::Events, build_event_features(data));
    sink.set_source_data(SourceId::Regions, build_region_features(data));
    sink.set_source_data(SourceId::AncientLabels, build_ancient_label_features(data));
    publish_life_events(data, state, sink);
    publish_waypoint(data, state, sink);
    publish_visibility(data, state, sink);
}

/// Marker, territory control and completed progress for the current waypoint.
pub fn publish_waypoint<S: RenderSink + ?Sized>(
    data: &DatasetView,
    state: &PlaybackState,
    sink: &mut S,
) {
    let Some(waypoint_id) = state.current_waypoint() else {
        publish_progress(data, state, None, sink);
        return;
    };

    match data.waypoint_by_id(waypoint_id) {
        Some(waypoint) => {
            let mode = state
                .active_track()
                .and_then(|id| data.track_by_id(id))
                .map(|track| track.transport_default.resting_mode());
            if let Some(mode) = mode {
                sink.set_marker(MarkerUpdate {
                    coordinate: waypoint.coordinates,
                    mode,
                    recenter: true,
                });
            }
        }
        None => warn!(waypoint = waypoint_id, "Current waypoint not in dataset"),
    }

    sink.set_source_data(SourceId::Territories, build_territory_features(data, waypoint_id));
    publish_progress(data, state, None, sink);
}

/// Progress for the active track up to the current waypoint, plus `partial`.
pub fn publish_progress<S: RenderSink + ?Sized>(
    data: &DatasetView,
    state: &PlaybackState,
    partial: Option<&LineString<f64>>,
    sink: &mut S,
) {
    let progress = match (state.active_track(), state.current_waypoint()) {
        (Some(track), Some(waypoint)) => build_progress_geometry(data, track, waypoint, partial),
        _ => FeatureCollection::default(),
    };
    sink.set_source_data(SourceId::ActiveTrackProgress, progress);
}

pub fn publish_life_events<S: RenderSink + ?Sized>(
    data: &DatasetView,
    state: &PlaybackState,
    sink: &mut S,
) {
    sink.set_source_data(
        SourceId::LifeEvents,
        build_life_event_features(data, state.highlighted_life_event()),
    );
}

pub fn publish_visibility<S: RenderSink + ?Sized>(
    data: &DatasetView,
    state: &PlaybackState,
    sink: &mut S,
) {
    let plan = visibility_plan(state, data);
    debug!(layers = plan.len(), "Applying visibility plan");
    sink.apply_visibility(&plan);
}
