use postgres::Client;
use coedit_core::{Error, Result};

const SCHEMA_LOCK_KEY: i64 = 0x636f656469740001; // "coedit"

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS coedit_versions (
  room_id TEXT NOT NULL,
  version_id TEXT NOT NULL,
  parent_id TEXT,
  seq BIGINT NOT NULL,
  ts_millis BIGINT NOT NULL,
  author_id TEXT NOT NULL,
  operations BYTEA NOT NULL,
  PRIMARY KEY (room_id, version_id),
  UNIQUE (room_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_coedit_versions_room_history
  ON coedit_versions (room_id, ts_millis, seq);
"#;

pub fn ensure_schema(client: &mut Client) -> Result<()> {
    // Concurrent `CREATE TABLE IF NOT EXISTS` can still race on the catalog; serialize it.
    client
        .query_one("SELECT pg_advisory_lock($1)", &[&SCHEMA_LOCK_KEY])
        .map_err(|e| Error::Storage(format!("{e:?}")))?;

    let res = client
        .batch_execute(SCHEMA_SQL)
        .map_err(|e| Error::Storage(format!("{e:?}")));

    // Released with the connection anyway.
    let _ = client.query_one("SELECT pg_advisory_unlock($1)", &[&SCHEMA_LOCK_KEY]);

    res
}

pub fn reset_room_for_tests(client: &mut Client, room_id: &str) -> Result<()> {
    client
        .execute("DELETE FROM coedit_versions WHERE room_id = $1", &[&room_id])
        .map_err(|e| Error::Storage(format!("{e:?}")))?;
    Ok(())
}
