#![forbid(unsafe_code)]
//! Core primitives for collaborative text editing: operational transformation over
//! retain/insert/delete sequences, plus an append-only version graph that can replay,
//! diff, and compare any two historical states of a document.
//! This crate stays independent of concrete storage engines and runtimes so it can be
//! embedded behind any session layer that can satisfy the traits defined here.

pub mod apply;
pub mod compose;
pub mod delta;
pub mod error;
pub mod graph;
pub mod ids;
pub mod invert;
pub mod ops;
pub mod traits;
pub mod transform;
#[cfg(feature = "serde")]
pub mod wire;

pub use apply::apply;
pub use compose::{compose, compose_all};
pub use delta::{generate_delta, generate_delta_with, DiffOptions};
pub use error::{Error, Result};
pub use graph::{VersionGraph, VersionNode};
pub use ids::{AuthorId, RoomId, Timestamp, VersionId};
pub use invert::invert;
pub use ops::{normalize, Operation, OperationSeq};
pub use traits::{Clock, LogicalClock, MemoryVersionStore, SystemClock, VersionStore};
pub use transform::{transform, transform_pair, transform_with, Side};
#[cfg(feature = "serde")]
pub use wire::WireOperation;
