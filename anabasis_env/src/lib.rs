//! Anabasis Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the playback engine run
//! against a real display refresh (tokio) or a simulated one (virtual clock).
//!
//! # Core Concept: Frame Requests
//!
//! The engine never sleeps or reads the wall clock itself. It asks the tick
//! source for a frame, receives a [`FrameRequest`] ticket, and later gets a
//! [`Frame`] stamped with the time it fired. Only the most recently issued,
//! uncancelled ticket is honoured, so cancellation is deterministic.
//!
//! # Example
//!
//! ```ignore
//! use anabasis_env::{TickSource, TokioTickSource};
//!
//! async fn pump<T: TickSource>(ticks: &T) {
//!     ticks.request_frame();
//!     while let Some(frame) = ticks.next_frame().await {
//!         handle(frame);
//!     }
//! }
//! ```

mod error;
mod frame;
mod ledger;
mod tick;
mod tokio_impl;

pub use error::EnvError;
pub use frame::{Frame, FrameRequest};
pub use ledger::FrameLedger;
pub use tick::TickSource;
pub use tokio_impl::TokioTickSource;
