use thiserror::Error;

use crate::ids::VersionId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("operation at offset {offset} spans {count} chars past the end of a {len}-char text")]
    OutOfRange {
        offset: usize,
        count: usize,
        len: usize,
    },
    #[error("length mismatch: expected {expected} chars, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("unknown version: {0}")]
    UnknownVersion(VersionId),
    #[error("version {base} is not an ancestor of {head}")]
    NotAncestor { base: VersionId, head: VersionId },
    #[error("malformed operation: {0}")]
    MalformedOperation(String),
    #[error("inconsistent state: {0}")]
    InconsistentState(String),
    #[error("storage error: {0}")]
    Storage(String),
}
