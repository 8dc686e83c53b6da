use std::cell::RefCell;

use postgres::{Client, Row};
use tracing::{debug, warn};

use coedit_core::{
    AuthorId, Error, OperationSeq, Result, RoomId, VersionId, VersionNode, VersionStore,
};

fn storage_debug<E: std::fmt::Debug>(e: E) -> Error {
    Error::Storage(format!("{e:?}"))
}

fn ops_to_bytes(ops: &OperationSeq) -> Result<Vec<u8>> {
    serde_json::to_vec(ops).map_err(|e| Error::Storage(e.to_string()))
}

fn ops_from_bytes(bytes: &[u8]) -> Result<OperationSeq> {
    serde_json::from_slice(bytes).map_err(|e| Error::Storage(e.to_string()))
}

const SELECT_COLUMNS: &str =
    "SELECT version_id, parent_id, seq, ts_millis, author_id, operations FROM coedit_versions";

fn row_to_node(row: &Row) -> Result<VersionNode> {
    let seq: i64 = row.get(2);
    let operations: Vec<u8> = row.get(5);
    Ok(VersionNode {
        version_id: VersionId::new(row.get::<_, String>(0)),
        parent_id: row.get::<_, Option<String>>(1).map(VersionId::new),
        seq: u64::try_from(seq).map_err(|_| Error::Storage(format!("negative seq {seq}")))?,
        timestamp: row.get(3),
        author_id: AuthorId::new(row.get::<_, String>(4)),
        operations: ops_from_bytes(&operations)?,
    })
}

/// Insert one node. Returns `false` when the room already holds that version id.
pub fn append_version(client: &mut Client, room: &RoomId, node: &VersionNode) -> Result<bool> {
    let operations = ops_to_bytes(&node.operations)?;
    let parent_id = node.parent_id.as_ref().map(VersionId::as_str);
    let inserted = client
        .execute(
            "INSERT INTO coedit_versions(room_id, version_id, parent_id, seq, ts_millis, author_id, operations) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (room_id, version_id) DO NOTHING",
            &[
                &room.as_str(),
                &node.version_id.as_str(),
                &parent_id,
                &(node.seq as i64),
                &node.timestamp,
                &node.author_id.as_str(),
                &operations,
            ],
        )
        .map_err(|e| {
            warn!(room = %room, version = %node.version_id, error = ?e, "failed to append version");
            storage_debug(e)
        })?;
    debug!(room = %room, version = %node.version_id, seq = node.seq, inserted, "append version");
    Ok(inserted == 1)
}

/// Every node of `room`, ordered by `seq`.
pub fn load_versions(client: &mut Client, room: &RoomId) -> Result<Vec<VersionNode>> {
    let rows = client
        .query(
            format!("{SELECT_COLUMNS} WHERE room_id = $1 ORDER BY seq").as_str(),
            &[&room.as_str()],
        )
        .map_err(storage_debug)?;
    rows.iter().map(row_to_node).collect()
}

pub fn get_version(
    client: &mut Client,
    room: &RoomId,
    id: &VersionId,
) -> Result<Option<VersionNode>> {
    let rows = client
        .query(
            format!("{SELECT_COLUMNS} WHERE room_id = $1 AND version_id = $2 LIMIT 1").as_str(),
            &[&room.as_str(), &id.as_str()],
        )
        .map_err(storage_debug)?;
    rows.first().map(row_to_node).transpose()
}

/// The most recently appended node of `room`.
pub fn latest_version(client: &mut Client, room: &RoomId) -> Result<Option<VersionNode>> {
    let rows = client
        .query(
            format!("{SELECT_COLUMNS} WHERE room_id = $1 ORDER BY seq DESC LIMIT 1").as_str(),
            &[&room.as_str()],
        )
        .map_err(storage_debug)?;
    rows.first().map(row_to_node).transpose()
}

pub fn room_len(client: &mut Client, room: &RoomId) -> Result<u64> {
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM coedit_versions WHERE room_id = $1",
            &[&room.as_str()],
        )
        .map_err(storage_debug)?;
    Ok(row.get::<_, i64>(0).max(0) as u64)
}

/// [`VersionStore`] over a single Postgres connection.
///
/// The connection sits behind a `RefCell` so reads can share `&self`; wrap the store in a
/// mutex to use it from more than one thread.
pub struct PgVersionStore {
    client: RefCell<Client>,
}

impl PgVersionStore {
    pub fn new(client: Client) -> Self {
        Self {
            client: RefCell::new(client),
        }
    }

    /// Connect and make sure the schema exists.
    pub fn connect(url: &str) -> Result<Self> {
        let mut client = Client::connect(url, postgres::NoTls).map_err(storage_debug)?;
        crate::schema::ensure_schema(&mut client)?;
        Ok(Self::new(client))
    }

    pub fn client_mut(&mut self) -> &mut Client {
        self.client.get_mut()
    }

    pub fn into_inner(self) -> Client {
        self.client.into_inner()
    }

    pub fn latest_version(&self, room: &RoomId) -> Result<Option<VersionNode>> {
        latest_version(&mut self.client.borrow_mut(), room)
    }

    pub fn room_len(&self, room: &RoomId) -> Result<u64> {
        room_len(&mut self.client.borrow_mut(), room)
    }
}

impl VersionStore for PgVersionStore {
    fn append(&mut self, room: &RoomId, node: &VersionNode) -> Result<bool> {
        append_version(self.client.get_mut(), room, node)
    }

    fn load_room(&self, room: &RoomId) -> Result<Vec<VersionNode>> {
        load_versions(&mut self.client.borrow_mut(), room)
    }

    fn get(&self, room: &RoomId, id: &VersionId) -> Result<Option<VersionNode>> {
        get_version(&mut self.client.borrow_mut(), room, id)
    }

    fn rooms(&self) -> Result<Vec<RoomId>> {
        let rows = self
            .client
            .borrow_mut()
            .query(
                "SELECT DISTINCT room_id FROM coedit_versions ORDER BY room_id",
                &[],
            )
            .map_err(storage_debug)?;
        Ok(rows
            .iter()
            .map(|row| RoomId::new(row.get::<_, String>(0)))
            .collect())
    }
}
