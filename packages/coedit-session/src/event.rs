use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use coedit_core::{AuthorId, OperationSeq, RoomId, Timestamp, VersionId, VersionNode};

/// Outbound shape of one committed edit. `operations` apply to the text at `parent_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedEdit {
    pub version_id: VersionId,
    pub parent_id: Option<VersionId>,
    pub timestamp: Timestamp,
    pub editor_id: AuthorId,
    pub operations: OperationSeq,
}

impl From<&VersionNode> for CommittedEdit {
    fn from(node: &VersionNode) -> Self {
        Self {
            version_id: node.version_id.clone(),
            parent_id: node.parent_id.clone(),
            timestamp: node.timestamp,
            editor_id: node.author_id.clone(),
            operations: node.operations.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    Edit(CommittedEdit),
    ParticipantJoined {
        user_id: AuthorId,
        display_name: String,
    },
    ParticipantLeft {
        user_id: AuthorId,
    },
    LanguageChanged {
        language: String,
        user_id: AuthorId,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: AuthorId,
    pub display_name: String,
}

/// Point-in-time view of a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub text: String,
    pub language: String,
    /// Latest committed version; `None` until the first edit.
    pub head: Option<VersionId>,
    /// Sorted by user id.
    pub participants: Vec<Participant>,
}

/// Reply to an accepted edit.
///
/// `operations` is the edit as committed, after transformation against everything that
/// landed since the editor's base. It is empty (and `version_id` is the unchanged head)
/// when the edit turned out to be a no-op.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditAck {
    pub version_id: Option<VersionId>,
    pub operations: OperationSeq,
}

impl EditAck {
    pub fn is_noop(&self) -> bool {
        self.operations.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesBetween {
    /// Text at the `from` version.
    pub base_text: String,
    /// Applying these to `base_text` yields the text at the `to` version.
    pub diff_operations: OperationSeq,
}

/// Receiving end of a participant's event stream.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<RoomEvent>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<RoomEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the room has dropped this participant.
    pub async fn recv(&mut self) -> Option<RoomEvent> {
        self.rx.recv().await
    }

    /// Next already-delivered event, without waiting.
    pub fn try_recv(&mut self) -> Option<RoomEvent> {
        self.rx.try_recv().ok()
    }
}
