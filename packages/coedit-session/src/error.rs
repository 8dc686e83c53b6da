use thiserror::Error;

use coedit_core::{AuthorId, RoomId, VersionId};

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Core(#[from] coedit_core::Error),
    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),
    #[error("{user} has not joined room {room}")]
    NotParticipant { room: RoomId, user: AuthorId },
    #[error("old text does not match the text of base version {}", .base.as_ref().map_or("<empty>", VersionId::as_str))]
    BaseMismatch { base: Option<VersionId> },
    #[error("room {0} is closed")]
    RoomClosed(RoomId),
    #[error("store error: {0}")]
    Store(String),
    #[error("invalid config: {0}")]
    Config(String),
}
