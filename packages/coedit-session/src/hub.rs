use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use coedit_core::{AuthorId, RoomId, SystemClock, VersionGraph, VersionId, VersionStore};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::event::{ChangesBetween, CommittedEdit, EditAck, RoomSnapshot, Subscription};
use crate::room::{Room, RoomCommand};

struct RoomHandle {
    commands: mpsc::Sender<RoomCommand>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Registry entry for one room. The handle is filled in once the room's history has loaded,
/// outside the registry lock.
#[derive(Default)]
struct RoomSlot {
    handle: OnceCell<RoomHandle>,
}

impl RoomSlot {
    fn commands(&self) -> Option<mpsc::Sender<RoomCommand>> {
        self.handle.get().map(|handle| handle.commands.clone())
    }

    /// A slot still loading is not closed.
    fn is_closed(&self) -> bool {
        self.handle
            .get()
            .is_some_and(|handle| handle.commands.is_closed())
    }
}

struct HubInner<S> {
    config: SessionConfig,
    store: Arc<Mutex<S>>,
    rooms: tokio::sync::Mutex<HashMap<RoomId, Arc<RoomSlot>>>,
}

/// Entry point for collaborators: routes every request to its room's task.
///
/// Rooms are opened on first join, replaying persisted history from the store, and shut
/// down when their last participant leaves (unless `keep_dormant_rooms` is set). The
/// registry lock only guards the map; loading a room and talking to it happen without it.
pub struct SessionHub<S> {
    inner: Arc<HubInner<S>>,
}

impl<S> Clone for SessionHub<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> SessionHub<S>
where
    S: VersionStore + Send + 'static,
{
    pub fn new(store: S, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(HubInner {
                config,
                store: Arc::new(Mutex::new(store)),
                rooms: tokio::sync::Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Rooms with a running task.
    pub async fn active_rooms(&self) -> Vec<RoomId> {
        let rooms = self.inner.rooms.lock().await;
        let mut ids: Vec<RoomId> = rooms
            .iter()
            .filter(|(_, slot)| slot.handle.initialized() && !slot.is_closed())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub async fn join(
        &self,
        room: &RoomId,
        user_id: AuthorId,
        display_name: impl Into<String>,
    ) -> Result<(RoomSnapshot, Subscription)> {
        let display_name = display_name.into();
        loop {
            let slot = self.slot_for_join(room).await;
            let opened = slot
                .handle
                .get_or_try_init(|| self.open_room(room))
                .await;
            let commands = match opened {
                Ok(handle) => handle.commands.clone(),
                Err(e) => {
                    self.forget(room, &slot).await;
                    return Err(e);
                }
            };

            let joined = send(room, &commands, |reply| RoomCommand::Join {
                user_id: user_id.clone(),
                display_name: display_name.clone(),
                reply,
            })
            .await;
            match joined {
                // The room shut down between lookup and join; open a fresh one.
                Err(SessionError::RoomClosed(_)) if slot.is_closed() => {
                    debug!(room = %room, "room closed during join, reopening");
                    self.forget(room, &slot).await;
                }
                other => return other,
            }
        }
    }

    pub async fn leave(&self, room: &RoomId, user_id: AuthorId) -> Result<()> {
        let slot = self.slot(room).await?;
        let commands = slot
            .commands()
            .ok_or_else(|| SessionError::UnknownRoom(room.clone()))?;

        let closed = send(room, &commands, |reply| RoomCommand::Leave { user_id, reply }).await?;
        if closed {
            self.forget(room, &slot).await;
        }
        Ok(())
    }

    /// Submit an edit made against `base_version_id` (`None` for an empty document).
    pub async fn submit_edit(
        &self,
        room: &RoomId,
        editor_id: AuthorId,
        base_version_id: Option<VersionId>,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Result<EditAck> {
        let (old_text, new_text) = (old_text.into(), new_text.into());
        self.request(room, |reply| RoomCommand::Submit {
            editor_id,
            base: base_version_id,
            old_text,
            new_text,
            reply,
        })
        .await
    }

    /// Revert `version_id` with a new forward edit on top of the current head.
    pub async fn undo(
        &self,
        room: &RoomId,
        editor_id: AuthorId,
        version_id: VersionId,
    ) -> Result<EditAck> {
        self.request(room, |reply| RoomCommand::Undo {
            editor_id,
            version_id,
            reply,
        })
        .await
    }

    pub async fn set_language(
        &self,
        room: &RoomId,
        user_id: AuthorId,
        language: impl Into<String>,
    ) -> Result<()> {
        let language = language.into();
        self.request(room, |reply| RoomCommand::SetLanguage {
            user_id,
            language,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self, room: &RoomId) -> Result<RoomSnapshot> {
        self.request(room, |reply| RoomCommand::Snapshot { reply })
            .await
    }

    pub async fn history(&self, room: &RoomId) -> Result<Vec<CommittedEdit>> {
        self.request(room, |reply| RoomCommand::History { reply })
            .await
    }

    pub async fn changes_between(
        &self,
        room: &RoomId,
        from: VersionId,
        to: VersionId,
    ) -> Result<ChangesBetween> {
        self.request(room, |reply| RoomCommand::ChangesBetween { from, to, reply })
            .await
    }

    pub async fn reconstruct(&self, room: &RoomId, version_id: VersionId) -> Result<String> {
        self.request(room, |reply| RoomCommand::Reconstruct { version_id, reply })
            .await
    }

    pub async fn common_ancestor(
        &self,
        room: &RoomId,
        a: VersionId,
        b: VersionId,
    ) -> Result<Option<VersionId>> {
        self.request(room, |reply| RoomCommand::CommonAncestor { a, b, reply })
            .await
    }

    /// Stop every room task and wait for them to finish.
    pub async fn shutdown(&self) {
        let slots: Vec<(RoomId, Arc<RoomSlot>)> =
            self.inner.rooms.lock().await.drain().collect();
        let mut tasks = Vec::new();
        for (room, slot) in slots {
            let task = slot
                .handle
                .get()
                .and_then(|handle| handle.task.lock().ok().and_then(|mut task| task.take()));
            // Dropping the slot drops its command sender, which ends the room loop.
            drop(slot);
            if let Some(task) = task {
                tasks.push((room, task));
            }
        }
        for (room, task) in tasks {
            if let Err(e) = task.await {
                warn!(room = %room, error = %e, "room task failed");
            }
        }
    }

    async fn request<T, F>(&self, room: &RoomId, make: F) -> Result<T>
    where
        F: FnOnce(oneshot::Sender<Result<T>>) -> RoomCommand,
    {
        let commands = self
            .slot(room)
            .await?
            .commands()
            .ok_or_else(|| SessionError::UnknownRoom(room.clone()))?;
        send(room, &commands, make).await
    }

    async fn slot(&self, room: &RoomId) -> Result<Arc<RoomSlot>> {
        let rooms = self.inner.rooms.lock().await;
        rooms
            .get(room)
            .cloned()
            .ok_or_else(|| SessionError::UnknownRoom(room.clone()))
    }

    /// The live slot for `room`, replacing a closed one with an empty slot.
    async fn slot_for_join(&self, room: &RoomId) -> Arc<RoomSlot> {
        let mut rooms = self.inner.rooms.lock().await;
        match rooms.get(room) {
            Some(slot) if !slot.is_closed() => Arc::clone(slot),
            _ => {
                let slot = Arc::new(RoomSlot::default());
                rooms.insert(room.clone(), Arc::clone(&slot));
                slot
            }
        }
    }

    /// Drop `slot` from the registry unless it has already been replaced.
    async fn forget(&self, room: &RoomId, slot: &Arc<RoomSlot>) {
        let mut rooms = self.inner.rooms.lock().await;
        if rooms.get(room).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            rooms.remove(room);
        }
    }

    async fn open_room(&self, room: &RoomId) -> Result<RoomHandle> {
        let store = Arc::clone(&self.inner.store);
        let room_id = room.clone();
        let nodes = tokio::task::spawn_blocking(move || {
            let store = store
                .lock()
                .map_err(|_| coedit_core::Error::Storage("store lock poisoned".into()))?;
            store.load_room(&room_id)
        })
        .await
        .map_err(|e| SessionError::Store(e.to_string()))?
        .map_err(|e| SessionError::Store(e.to_string()))?;

        let graph = VersionGraph::from_nodes(room.clone(), SystemClock, nodes)?;
        let config = &self.inner.config;
        let state = Room::new(
            graph,
            config.default_language.clone(),
            Arc::clone(&self.inner.store),
            config.diff_options(),
            config.keep_dormant_rooms,
        )?;
        info!(room = %room, "opening room");

        let (commands, inbox) = mpsc::channel(config.inbox_capacity);
        let task = tokio::spawn(state.run(inbox));
        Ok(RoomHandle {
            commands,
            task: Mutex::new(Some(task)),
        })
    }
}

async fn send<T, F>(room: &RoomId, commands: &mpsc::Sender<RoomCommand>, make: F) -> Result<T>
where
    F: FnOnce(oneshot::Sender<Result<T>>) -> RoomCommand,
{
    let (reply, response) = oneshot::channel();
    commands
        .send(make(reply))
        .await
        .map_err(|_| SessionError::RoomClosed(room.clone()))?;
    response
        .await
        .map_err(|_| SessionError::RoomClosed(room.clone()))?
}
