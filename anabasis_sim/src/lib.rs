//! Anabasis Deterministic Playback Simulation Harness
//!
//! Runs the playback engine end to end against a virtual clock, so that a
//! whole campaign can be animated in milliseconds and every run is
//! reproducible from a single 64-bit seed.
//!
//! # Core Principle: Controlled Frames
//!
//! The engine only ever sees frames delivered by [`SimTickSource`]:
//! - **Time**: the virtual clock moves only when a requested frame fires
//! - **Jitter**: frame intervals are perturbed by a seeded ChaCha8 RNG
//! - **Output**: every source, marker and visibility plan lands in a
//!   [`RecordingSink`] for assertions
//!
//! # Usage
//!
//! ```ignore
//! use anabasis_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::FullCampaign);
//! assert!(result.passed);
//! ```

mod context;
pub mod demo;
mod exporter;
mod recorder;
mod runner;
pub mod scenarios;

pub use context::SimTickSource;
pub use exporter::{PlaybackExport, PlaybackFrame};
pub use recorder::RecordingSink;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, SimError};
