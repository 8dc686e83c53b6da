#![forbid(unsafe_code)]
//! Postgres-backed version history for `coedit-core`.
//!
//! One row per committed version node, keyed by `(room_id, version_id)` and ordered by the
//! per-room `seq`. All edit semantics stay in `coedit-core`; this crate only stores and
//! reloads nodes, so it works on any vanilla PostgreSQL deployment.

mod schema;
mod store;

pub use schema::{ensure_schema, reset_room_for_tests};
pub use store::{
    append_version, get_version, latest_version, load_versions, room_len, PgVersionStore,
};
