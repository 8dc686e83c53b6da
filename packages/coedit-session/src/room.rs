use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use coedit_core::{
    apply, generate_delta_with, invert, transform, AuthorId, DiffOptions, OperationSeq, RoomId,
    SystemClock, VersionGraph, VersionId, VersionNode, VersionStore,
};

use crate::error::{Result, SessionError};
use crate::event::{
    ChangesBetween, CommittedEdit, EditAck, Participant, RoomEvent, RoomSnapshot, Subscription,
};

type Reply<T> = oneshot::Sender<Result<T>>;

pub(crate) enum RoomCommand {
    Join {
        user_id: AuthorId,
        display_name: String,
        reply: Reply<(RoomSnapshot, Subscription)>,
    },
    Leave {
        user_id: AuthorId,
        /// `true` when the room shut down because it became empty.
        reply: Reply<bool>,
    },
    Submit {
        editor_id: AuthorId,
        base: Option<VersionId>,
        old_text: String,
        new_text: String,
        reply: Reply<EditAck>,
    },
    Undo {
        editor_id: AuthorId,
        version_id: VersionId,
        reply: Reply<EditAck>,
    },
    SetLanguage {
        user_id: AuthorId,
        language: String,
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<RoomSnapshot>,
    },
    History {
        reply: Reply<Vec<CommittedEdit>>,
    },
    ChangesBetween {
        from: VersionId,
        to: VersionId,
        reply: Reply<ChangesBetween>,
    },
    Reconstruct {
        version_id: VersionId,
        reply: Reply<String>,
    },
    CommonAncestor {
        a: VersionId,
        b: VersionId,
        reply: Reply<Option<VersionId>>,
    },
}

struct Member {
    display_name: String,
    events: mpsc::UnboundedSender<RoomEvent>,
}

/// State owned by one room task. Nothing outside the task touches it.
pub(crate) struct Room<S> {
    room_id: RoomId,
    text: String,
    language: String,
    graph: VersionGraph<SystemClock>,
    members: BTreeMap<AuthorId, Member>,
    store: Arc<Mutex<S>>,
    diff_options: DiffOptions,
    keep_dormant: bool,
}

impl<S> Room<S>
where
    S: VersionStore + Send + 'static,
{
    pub(crate) fn new(
        graph: VersionGraph<SystemClock>,
        language: String,
        store: Arc<Mutex<S>>,
        diff_options: DiffOptions,
        keep_dormant: bool,
    ) -> Result<Self> {
        let text = match graph.head() {
            Some(head) => graph.reconstruct(&head.version_id)?,
            None => String::new(),
        };
        Ok(Self {
            room_id: graph.room_id().clone(),
            text,
            language,
            graph,
            members: BTreeMap::new(),
            store,
            diff_options,
            keep_dormant,
        })
    }

    /// Process commands one at a time until the inbox closes or the room empties out.
    #[tracing::instrument(name = "room", skip_all, fields(room = %self.room_id))]
    pub(crate) async fn run(mut self, mut inbox: mpsc::Receiver<RoomCommand>) {
        info!(versions = self.graph.len(), "room opened");
        while let Some(command) = inbox.recv().await {
            if !self.handle(command).await {
                break;
            }
        }
        info!("room closed");
    }

    /// Returns `false` when the room should stop.
    async fn handle(&mut self, command: RoomCommand) -> bool {
        match command {
            RoomCommand::Join {
                user_id,
                display_name,
                reply,
            } => {
                let _ = reply.send(Ok(self.join(user_id, display_name)));
            }
            RoomCommand::Leave { user_id, reply } => {
                let closing = self.leave(&user_id);
                let stop = matches!(closing, Ok(true));
                let _ = reply.send(closing);
                if stop {
                    return false;
                }
            }
            RoomCommand::Submit {
                editor_id,
                base,
                old_text,
                new_text,
                reply,
            } => {
                let result = self.submit(editor_id, base, &old_text, &new_text).await;
                let _ = reply.send(result);
            }
            RoomCommand::Undo {
                editor_id,
                version_id,
                reply,
            } => {
                let result = self.undo(editor_id, &version_id).await;
                let _ = reply.send(result);
            }
            RoomCommand::SetLanguage {
                user_id,
                language,
                reply,
            } => {
                let _ = reply.send(self.set_language(user_id, language));
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            RoomCommand::History { reply } => {
                let history = self
                    .graph
                    .history()
                    .into_iter()
                    .map(CommittedEdit::from)
                    .collect();
                let _ = reply.send(Ok(history));
            }
            RoomCommand::ChangesBetween { from, to, reply } => {
                let _ = reply.send(self.changes_between(&from, &to));
            }
            RoomCommand::Reconstruct { version_id, reply } => {
                let _ = reply.send(self.graph.reconstruct(&version_id).map_err(Into::into));
            }
            RoomCommand::CommonAncestor { a, b, reply } => {
                let _ = reply.send(self.graph.common_ancestor(&a, &b).map_err(Into::into));
            }
        }
        true
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            text: self.text.clone(),
            language: self.language.clone(),
            head: self.head_id(),
            participants: self
                .members
                .iter()
                .map(|(user_id, member)| Participant {
                    user_id: user_id.clone(),
                    display_name: member.display_name.clone(),
                })
                .collect(),
        }
    }

    fn head_id(&self) -> Option<VersionId> {
        self.graph.head().map(|n| n.version_id.clone())
    }

    fn join(&mut self, user_id: AuthorId, display_name: String) -> (RoomSnapshot, Subscription) {
        let (events, rx) = mpsc::unbounded_channel();
        let rejoined = self
            .members
            .insert(
                user_id.clone(),
                Member {
                    display_name: display_name.clone(),
                    events,
                },
            )
            .is_some();
        info!(user = %user_id, rejoined, "participant joined");
        self.broadcast(
            &user_id,
            RoomEvent::ParticipantJoined {
                user_id: user_id.clone(),
                display_name,
            },
        );
        (self.snapshot(), Subscription::new(rx))
    }

    fn leave(&mut self, user_id: &AuthorId) -> Result<bool> {
        if self.members.remove(user_id).is_none() {
            return Err(self.not_participant(user_id));
        }
        info!(user = %user_id, remaining = self.members.len(), "participant left");
        self.broadcast(
            user_id,
            RoomEvent::ParticipantLeft {
                user_id: user_id.clone(),
            },
        );
        Ok(self.members.is_empty() && !self.keep_dormant)
    }

    fn set_language(&mut self, user_id: AuthorId, language: String) -> Result<()> {
        self.require_member(&user_id)?;
        debug!(user = %user_id, %language, "language changed");
        self.language = language.clone();
        self.broadcast(&user_id, RoomEvent::LanguageChanged { language, user_id: user_id.clone() });
        Ok(())
    }

    fn changes_between(&self, from: &VersionId, to: &VersionId) -> Result<ChangesBetween> {
        Ok(ChangesBetween {
            base_text: self.graph.reconstruct(from)?,
            diff_operations: self.graph.diff(from, to)?,
        })
    }

    async fn submit(
        &mut self,
        editor_id: AuthorId,
        base: Option<VersionId>,
        old_text: &str,
        new_text: &str,
    ) -> Result<EditAck> {
        self.require_member(&editor_id)?;
        let head = self.head_id();

        let base_text = match &base {
            Some(id) if Some(id) == head.as_ref() => self.text.clone(),
            Some(id) => self.graph.reconstruct(id)?,
            None => String::new(),
        };
        if base_text != old_text {
            warn!(editor = %editor_id, base = ?base, "rejected edit: old text does not match base");
            return Err(SessionError::BaseMismatch { base });
        }

        let mut ops = generate_delta_with(old_text, new_text, &self.diff_options);
        if let Some(head) = &head {
            let concurrent = self.graph.operations_since(base.as_ref(), head)?;
            if !concurrent.is_empty() {
                debug!(editor = %editor_id, behind = concurrent.len(), "transforming stale edit");
            }
            for node in concurrent {
                ops = transform(&ops, &node.operations)?;
            }
        }
        self.commit(editor_id, ops).await
    }

    async fn undo(&mut self, editor_id: AuthorId, version_id: &VersionId) -> Result<EditAck> {
        self.require_member(&editor_id)?;
        let target = self
            .graph
            .get(version_id)
            .ok_or_else(|| coedit_core::Error::UnknownVersion(version_id.clone()))?;
        let parent_text = match &target.parent_id {
            Some(parent) => self.graph.reconstruct(parent)?,
            None => String::new(),
        };
        let mut ops = invert(&target.operations, &parent_text)?;

        if let Some(head) = self.head_id() {
            for node in self.graph.operations_since(Some(version_id), &head)? {
                ops = transform(&ops, &node.operations)?;
            }
        }
        debug!(editor = %editor_id, undone = %version_id, "undo");
        self.commit(editor_id, ops).await
    }

    /// Persist and append `ops` on top of the head, then fan the edit out.
    async fn commit(&mut self, editor_id: AuthorId, ops: OperationSeq) -> Result<EditAck> {
        if ops.is_empty() {
            return Ok(EditAck {
                version_id: self.head_id(),
                operations: ops,
            });
        }

        let text = apply(&self.text, &ops)?;
        let parent = self.head_id();
        let node = self.graph.prepare(parent.as_ref(), editor_id, ops)?;
        self.persist(&node).await?;
        self.graph.commit_node(node.clone())?;
        self.text = text;

        debug!(
            version = %node.version_id,
            editor = %node.author_id,
            ops = node.operations.len(),
            len = self.text.chars().count(),
            "committed edit"
        );
        let edit = CommittedEdit::from(&node);
        self.broadcast(&node.author_id, RoomEvent::Edit(edit));
        Ok(EditAck {
            version_id: Some(node.version_id),
            operations: node.operations,
        })
    }

    async fn persist(&self, node: &VersionNode) -> Result<()> {
        let store = Arc::clone(&self.store);
        let room = self.room_id.clone();
        let node = node.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut guard = store
                .lock()
                .map_err(|_| coedit_core::Error::Storage("store lock poisoned".into()))?;
            guard.append(&room, &node)
        })
        .await;

        match outcome {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to persist version");
                Err(SessionError::Store(e.to_string()))
            }
            Err(e) => {
                warn!(error = %e, "store task failed");
                Err(SessionError::Store(e.to_string()))
            }
        }
    }

    /// Send `event` to every member except `author`, dropping members whose stream is gone.
    fn broadcast(&mut self, author: &AuthorId, event: RoomEvent) {
        let mut gone = Vec::new();
        for (user_id, member) in &self.members {
            if user_id == author {
                continue;
            }
            if member.events.send(event.clone()).is_err() {
                gone.push(user_id.clone());
            }
        }
        for user_id in gone {
            debug!(user = %user_id, "dropping disconnected participant");
            self.members.remove(&user_id);
        }
    }

    fn require_member(&self, user_id: &AuthorId) -> Result<()> {
        if self.members.contains_key(user_id) {
            Ok(())
        } else {
            Err(self.not_participant(user_id))
        }
    }

    fn not_participant(&self, user_id: &AuthorId) -> SessionError {
        warn!(user = %user_id, "request from non-participant");
        SessionError::NotParticipant {
            room: self.room_id.clone(),
            user: user_id.clone(),
        }
    }
}
