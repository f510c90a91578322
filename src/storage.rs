//! Result persistence.
//!
//! Stores are fire-and-forget from the pipeline's point of view: an insert
//! failure is logged by the caller and never aborts batch processing. The
//! row layout keeps the legacy contract: unset frame fields are −1 on the
//! wire, direction is its enum name, and the full result rides along as a
//! JSON payload column.

use anyhow::{anyhow, Result};
use rand::RngCore;
use rusqlite::{params, Connection, OpenFlags};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::motion::{MotionResult, WireResult};

/// A shared in-memory SQLite URI usable across connections in one process.
pub fn shared_memory_uri() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!(
        "file:speedcam_{:x}?mode=memory&cache=shared",
        u64::from_le_bytes(bytes)
    )
}

pub(crate) fn open_db_connection(db_path: &str) -> Result<Connection> {
    if db_path.starts_with("file:") {
        return Ok(Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?);
    }
    Ok(Connection::open(db_path)?)
}

fn now_s() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// One persisted row, as read back from a store.
#[derive(Clone, Debug)]
pub struct StoredResult {
    pub video_filename: String,
    pub first_motion_frame: i64,
    pub last_motion_frame: i64,
    pub has_motion: bool,
    pub is_rejected: bool,
    pub direction: String,
    pub speed_mph: f64,
    pub payload: WireResult,
}

pub trait ResultStore {
    fn insert(&mut self, result: &MotionResult, video_filename: &str) -> Result<()>;

    /// Most recent rows first.
    fn recent(&self, limit: usize) -> Result<Vec<StoredResult>>;
}

pub struct SqliteResultStore {
    conn: Connection,
}

impl SqliteResultStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let db_path = if db_path == ":memory:" {
            shared_memory_uri()
        } else {
            db_path.to_string()
        };
        let conn = open_db_connection(&db_path)?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS motion_results (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              created_at INTEGER NOT NULL,
              detection_time TEXT,
              video_filename TEXT NOT NULL,
              first_motion_frame INTEGER NOT NULL,
              last_motion_frame INTEGER NOT NULL,
              first_motion_x REAL NOT NULL,
              has_motion INTEGER NOT NULL,
              is_rejected INTEGER NOT NULL,
              direction TEXT NOT NULL,
              first_motion_time REAL NOT NULL,
              last_motion_time REAL NOT NULL,
              speed_mph REAL NOT NULL,
              total_frames INTEGER NOT NULL,
              payload_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_results_created ON motion_results(created_at);
            "#,
        )?;
        Ok(())
    }
}

impl ResultStore for SqliteResultStore {
    fn insert(&mut self, result: &MotionResult, video_filename: &str) -> Result<()> {
        let wire = result.wire();
        let created_at = now_s()? as i64;
        let payload_json = serde_json::to_string(&wire)?;

        self.conn.execute(
            r#"
            INSERT INTO motion_results(
                created_at, detection_time, video_filename,
                first_motion_frame, last_motion_frame, first_motion_x,
                has_motion, is_rejected, direction,
                first_motion_time, last_motion_time, speed_mph,
                total_frames, payload_json
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                created_at,
                wire.detection_time,
                video_filename,
                wire.first_motion_frame,
                wire.last_motion_frame,
                wire.first_motion_x,
                wire.has_motion,
                wire.is_rejected,
                wire.direction.to_string(),
                wire.first_motion_time,
                wire.last_motion_time,
                wire.speed_mph,
                wire.total_frames_processed,
                payload_json,
            ],
        )?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredResult>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT video_filename, first_motion_frame, last_motion_frame,
                   has_motion, is_rejected, direction, speed_mph, payload_json
            FROM motion_results ORDER BY id DESC LIMIT ?1
            "#,
        )?;
        let mut rows = stmt.query(params![limit as i64])?;
        let mut out = Vec::new();

        while let Some(row) = rows.next()? {
            let payload_json: String = row.get(7)?;
            let payload: WireResult = serde_json::from_str(&payload_json)
                .map_err(|e| anyhow!("corrupt payload_json: {}", e))?;
            out.push(StoredResult {
                video_filename: row.get(0)?,
                first_motion_frame: row.get(1)?,
                last_motion_frame: row.get(2)?,
                has_motion: row.get(3)?,
                is_rejected: row.get(4)?,
                direction: row.get(5)?,
                speed_mph: row.get(6)?,
                payload,
            });
        }
        Ok(out)
    }
}

#[derive(Default)]
pub struct InMemoryResultStore {
    rows: Vec<StoredResult>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ResultStore for InMemoryResultStore {
    fn insert(&mut self, result: &MotionResult, video_filename: &str) -> Result<()> {
        let wire = result.wire();
        self.rows.push(StoredResult {
            video_filename: video_filename.to_string(),
            first_motion_frame: wire.first_motion_frame,
            last_motion_frame: wire.last_motion_frame,
            has_motion: wire.has_motion,
            is_rejected: wire.is_rejected,
            direction: wire.direction.to_string(),
            speed_mph: wire.speed_mph,
            payload: wire,
        });
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredResult>> {
        Ok(self.rows.iter().rev().take(limit).cloned().collect())
    }
}
