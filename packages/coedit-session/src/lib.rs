#![forbid(unsafe_code)]
//! Session coordinator for collaborative rooms.
//!
//! Each room runs as one tokio task that owns the room's text, participants and version
//! graph. Requests reach it through an inbox and are handled strictly one at a time, so
//! transformation and commits never race; different rooms run in parallel. Store writes
//! happen on the blocking pool and finish before the next request is taken.

mod config;
mod error;
mod event;
mod hub;
mod room;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use event::{
    ChangesBetween, CommittedEdit, EditAck, Participant, RoomEvent, RoomSnapshot, Subscription,
};
pub use hub::SessionHub;
