//! SQLite-backed report store.
//!
//! Each call opens its own connection on the blocking pool, so the store
//! never holds state across awaits and concurrent writes are serialized by
//! SQLite itself.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::debug;

use super::{PhotoUpload, ReportStore, StoreError, StoreResult};
use crate::model::{Location, Report, ReportPatch};

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<task::JoinError> for StoreError {
    fn from(err: task::JoinError) -> Self {
        StoreError::Unavailable(format!("store worker failed: {}", err))
    }
}

/// Fixed-width UTC timestamps, so `ORDER BY created_at` is chronological.
fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", s, e)))
}

type ReportRow = (String, String, f64, f64, String, String, Option<String>, Option<String>, String, String);

const SELECT_REPORT: &str = "SELECT id, kind, lat, lng, status, description, priority, photo_ref, created_at, created_by FROM reports";

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok((
        row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?,
        row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?, row.get(9)?,
    ))
}

fn decode_row(row: ReportRow) -> StoreResult<Report> {
    let (id, kind, lat, lng, status, description, priority, photo_ref, created_at, created_by) = row;
    Ok(Report {
        kind: kind.parse().map_err(StoreError::Corrupt)?,
        status: status.parse().map_err(StoreError::Corrupt)?,
        location: Location::new(lat, lng),
        created_at: decode_time(&created_at)?,
        id,
        description,
        priority,
        photo_ref,
        created_by,
    })
}

#[derive(Clone)]
pub struct SqliteReportStore {
    db_path: PathBuf,
}

impl SqliteReportStore {
    pub async fn new(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let path_clone = path.clone();

        task::spawn_blocking(move || -> StoreResult<()> {
            let conn = Connection::open(&path_clone)?;
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS reports (
                    id TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    lat REAL NOT NULL,
                    lng REAL NOT NULL,
                    status TEXT NOT NULL,
                    description TEXT NOT NULL,
                    priority TEXT,
                    photo_ref TEXT,
                    created_at TEXT NOT NULL,
                    created_by TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_reports_created_at ON reports(created_at);
                CREATE TABLE IF NOT EXISTS photos (
                    reference TEXT PRIMARY KEY,
                    content_type TEXT NOT NULL,
                    bytes BLOB NOT NULL,
                    uploaded_at TEXT NOT NULL
                );
                "#,
            )?;
            Ok(())
        })
        .await??;

        debug!("Report store ready at {:?}", path);
        Ok(Self { db_path: path })
    }

    /// Fetch stored photo bytes by reference.
    pub async fn photo(&self, reference: &str) -> StoreResult<Option<PhotoUpload>> {
        let path = self.db_path.clone();
        let reference = reference.to_string();

        task::spawn_blocking(move || -> StoreResult<Option<PhotoUpload>> {
            let conn = Connection::open(&path)?;
            let photo = conn
                .query_row(
                    "SELECT bytes, content_type FROM photos WHERE reference = ?1",
                    params![&reference],
                    |row| Ok(PhotoUpload { bytes: row.get(0)?, content_type: row.get(1)? }),
                )
                .optional()?;
            Ok(photo)
        })
        .await?
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn insert(&self, report: &Report) -> StoreResult<String> {
        let path = self.db_path.clone();
        let report = report.clone();

        task::spawn_blocking(move || -> StoreResult<String> {
            let conn = Connection::open(&path)?;
            let result = conn.execute(
                "INSERT INTO reports (id, kind, lat, lng, status, description, priority, photo_ref, created_at, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    &report.id,
                    report.kind.as_str(),
                    report.location.lat,
                    report.location.lng,
                    report.status.as_str(),
                    &report.description,
                    &report.priority,
                    &report.photo_ref,
                    encode_time(&report.created_at),
                    &report.created_by,
                ],
            );
            match result {
                Ok(_) => Ok(report.id),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    Err(StoreError::Duplicate(report.id))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await?
    }

    async fn update(&self, id: &str, patch: &ReportPatch) -> StoreResult<Report> {
        let path = self.db_path.clone();
        let id = id.to_string();
        let patch = patch.clone();

        task::spawn_blocking(move || -> StoreResult<Report> {
            let mut conn = Connection::open(&path)?;
            let tx = conn.transaction()?;

            if let Some(status) = patch.status {
                tx.execute(
                    "UPDATE reports SET status = ?1 WHERE id = ?2",
                    params![status.as_str(), &id],
                )?;
            }
            let row = tx
                .query_row(&format!("{} WHERE id = ?1", SELECT_REPORT), params![&id], read_row)
                .optional()?;
            tx.commit()?;

            match row {
                Some(row) => decode_row(row),
                None => Err(StoreError::NotFound(id)),
            }
        })
        .await?
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let path = self.db_path.clone();
        let id = id.to_string();

        task::spawn_blocking(move || -> StoreResult<()> {
            let conn = Connection::open(&path)?;
            let changed = conn.execute("DELETE FROM reports WHERE id = ?1", params![&id])?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await?
    }

    async fn list_all(&self) -> StoreResult<Vec<Report>> {
        let path = self.db_path.clone();

        task::spawn_blocking(move || -> StoreResult<Vec<Report>> {
            let conn = Connection::open(&path)?;
            let mut stmt = conn.prepare(&format!("{} ORDER BY created_at DESC, id ASC", SELECT_REPORT))?;
            let rows = stmt
                .query_map([], read_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(decode_row).collect()
        })
        .await?
    }

    async fn upload_photo(&self, photo: &PhotoUpload) -> StoreResult<String> {
        let path = self.db_path.clone();
        let photo = photo.clone();

        task::spawn_blocking(move || -> StoreResult<String> {
            let conn = Connection::open(&path)?;
            let reference = photo.reference();
            conn.execute(
                "INSERT OR IGNORE INTO photos (reference, content_type, bytes, uploaded_at) VALUES (?1, ?2, ?3, ?4)",
                params![&reference, &photo.content_type, &photo.bytes, encode_time(&Utc::now())],
            )?;
            Ok(reference)
        })
        .await?
    }
}
