//! Anabasis Core - Route Playback and Geospatial Animation Engine
//!
//! Animates a historical campaign route on a map: a marker travels along a
//! sequence of geographic segments, timed to real-world distance and a
//! selectable playback speed, while territory control and visited-path
//! progress update in lockstep.
//!
//! # Components
//!
//! - [`dataset`]: the static campaign and its indexed, validated view
//! - [`playback`]: the user-facing playback state and its operations
//! - [`interpolate`]: haversine length and point-along-path queries
//! - [`animation`]: the per-frame driver moving the marker
//! - [`overlay`]: feature builders for progress, territory and static layers
//! - [`render`]: the render sink contract and layer visibility plan
//! - [`session`]: the context object tying the above to a tick source
//!
//! Frame scheduling comes from [`anabasis_env::TickSource`], so the same
//! engine runs against a real refresh loop or a simulated clock.

pub mod animation;
pub mod config;
pub mod dataset;
pub mod geojson;
pub mod interpolate;
pub mod overlay;
pub mod playback;
pub mod render;
pub mod scene;
pub mod session;

#[cfg(test)]
mod testing;

pub use animation::{AnimationDriver, AnimationPhase, FrameOutcome};
pub use config::{ConfigError, EngineConfig, TransportSpeeds};
pub use dataset::{
    CampaignDataset, DatasetError, DatasetView, Segment, TerritorySnapshot, Track,
    TrackTransport, TransportMode, Waypoint,
};
pub use overlay::{Feature, FeatureCollection, ProgressState};
pub use playback::{
    OverlayKind, PanelView, PlaybackError, PlaybackState, TimeFilter, TimeFilterUpdate,
};
pub use render::{LayerId, LayerVisibility, MarkerUpdate, RenderSink, SourceId};
pub use session::PlaybackSession;
