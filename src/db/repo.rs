use super::model::{QueueCriteria, StatusCount};
use crate::error::{Result, SyncError};
use crate::model::{QueueAction, QueueEntry, QueueKind, QueueStatus};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

pub type Pool = SqlitePool;

const ENTRY_COLUMNS: &str = "id, kind, action, status, target_entity_id, store_view_id, \
     type_metadata, value, asset_id, claimed_by, error_message, created_at, updated_at";

pub async fn init_pool(database_url: &str) -> anyhow::Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    // WAL plus full sync on every pooled connection; create the file on first run.
    let options = SqliteConnectOptions::from_str(&normalized)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = format!("sqlite://{}", expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn entry_from_row(row: &SqliteRow) -> Result<QueueEntry> {
    let id: i64 = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    let action: String = row.try_get("action")?;
    let status: String = row.try_get("status")?;

    Ok(QueueEntry {
        id: Some(id),
        kind: QueueKind::parse_kind(&kind)
            .ok_or_else(|| SyncError::State(format!("entry {id} has unknown kind {kind}")))?,
        action: QueueAction::parse_action(&action)
            .ok_or_else(|| SyncError::State(format!("entry {id} has unknown action {action}")))?,
        status: QueueStatus::parse_status(&status)
            .ok_or_else(|| SyncError::State(format!("entry {id} has unknown status {status}")))?,
        target_entity_id: row.try_get("target_entity_id")?,
        store_view_id: row.try_get("store_view_id")?,
        type_metadata: row.try_get("type_metadata")?,
        value: row.try_get::<Option<String>, _>("value")?,
        asset_id: row.try_get("asset_id")?,
        claimed_by: row.try_get::<Option<String>, _>("claimed_by")?,
        error_message: row.try_get::<Option<String>, _>("error_message")?,
        created_at: row.try_get("created_at").ok(),
        updated_at: row.try_get("updated_at").ok(),
    })
}

/// Durable store for queue entries.
///
/// The store itself guarantees at most one PENDING/PROCESSING entry per
/// `(kind, target_entity_id, type_metadata, action)`; a second insert for the
/// same key either returns `None` from [`QueueStore::enqueue`] or fails
/// [`QueueStore::save`] with a state error.
#[derive(Debug, Clone)]
pub struct QueueStore {
    pool: Pool,
}

impl QueueStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Unsaved entry in its default PENDING state.
    pub fn create(&self, kind: QueueKind) -> QueueEntry {
        QueueEntry::new(kind)
    }

    /// Insert on first save (assigning the id), update afterwards.
    #[instrument(skip_all, fields(entry_id = ?entry.id))]
    pub async fn save(&self, entry: &QueueEntry) -> Result<QueueEntry> {
        match entry.id {
            None => match self.insert(entry).await {
                Ok(saved) => Ok(saved),
                Err(SyncError::Persistence(sqlx::Error::Database(db)))
                    if db.is_unique_violation() =>
                {
                    Err(SyncError::State(format!(
                        "an active {} entry already exists for target {} ({}, {})",
                        entry.kind.as_str(),
                        entry.target_entity_id,
                        entry.type_metadata,
                        entry.action.as_str()
                    )))
                }
                Err(err) => Err(err),
            },
            Some(id) => {
                let sql = format!(
                    "UPDATE queue_entries SET action = ?, status = ?, target_entity_id = ?, \
                     store_view_id = ?, type_metadata = ?, value = ?, asset_id = ?, \
                     claimed_by = ?, error_message = ?, updated_at = CURRENT_TIMESTAMP \
                     WHERE id = ? RETURNING {ENTRY_COLUMNS}"
                );
                let row = sqlx::query(&sql)
                    .bind(entry.action.as_str())
                    .bind(entry.status.as_str())
                    .bind(&entry.target_entity_id)
                    .bind(entry.store_view_id)
                    .bind(&entry.type_metadata)
                    .bind(entry.value.as_deref())
                    .bind(entry.asset_id)
                    .bind(entry.claimed_by.as_deref())
                    .bind(entry.error_message.as_deref())
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                let row = row.ok_or_else(|| {
                    SyncError::State(format!("queue entry {id} does not exist"))
                })?;
                entry_from_row(&row)
            }
        }
    }

    async fn insert(&self, entry: &QueueEntry) -> Result<QueueEntry> {
        let sql = format!(
            "INSERT INTO queue_entries (kind, action, status, target_entity_id, store_view_id, \
             type_metadata, value, asset_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {ENTRY_COLUMNS}"
        );
        let row = self
            .bind_new_entry(sqlx::query(&sql), entry)
            .fetch_one(&self.pool)
            .await?;
        entry_from_row(&row)
    }

    fn bind_new_entry<'q>(
        &self,
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        entry: &'q QueueEntry,
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        query
            .bind(entry.kind.as_str())
            .bind(entry.action.as_str())
            .bind(entry.status.as_str())
            .bind(&entry.target_entity_id)
            .bind(entry.store_view_id)
            .bind(&entry.type_metadata)
            .bind(entry.value.as_deref())
            .bind(entry.asset_id)
    }

    /// Insert unless an equivalent active entry exists. Single statement, so
    /// concurrent callers cannot both win.
    #[instrument(skip_all, fields(target_entity_id = %entry.target_entity_id))]
    pub async fn enqueue(&self, entry: &QueueEntry) -> Result<Option<QueueEntry>> {
        let sql = format!(
            "INSERT INTO queue_entries (kind, action, status, target_entity_id, store_view_id, \
             type_metadata, value, asset_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT DO NOTHING RETURNING {ENTRY_COLUMNS}"
        );
        let row = self
            .bind_new_entry(sqlx::query(&sql), entry)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(entry_from_row(&row)?)),
            None => {
                debug!(
                    type_metadata = %entry.type_metadata,
                    action = entry.action.as_str(),
                    "equivalent entry already active; not enqueued"
                );
                Ok(None)
            }
        }
    }

    pub async fn get(&self, id: i64) -> Result<Option<QueueEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    #[instrument(skip_all)]
    pub async fn find(&self, criteria: &QueueCriteria) -> Result<Vec<QueueEntry>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE 1 = 1"
        ));
        if let Some(kind) = criteria.kind {
            qb.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(target) = &criteria.target_entity_id {
            qb.push(" AND target_entity_id = ").push_bind(target.clone());
        }
        if let Some(type_metadata) = &criteria.type_metadata {
            qb.push(" AND type_metadata = ").push_bind(type_metadata.clone());
        }
        if let Some(action) = criteria.action {
            qb.push(" AND action = ").push_bind(action.as_str());
        }
        if !criteria.statuses.is_empty() {
            qb.push(" AND status IN (");
            let mut separated = qb.separated(", ");
            for status in &criteria.statuses {
                separated.push_bind(status.as_str());
            }
            separated.push_unseparated(")");
        }
        qb.push(" ORDER BY id ASC");
        if let Some(limit) = criteria.limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Atomically move the oldest PENDING entry of `kind` to PROCESSING.
    #[instrument(skip_all)]
    pub async fn claim_next(&self, kind: QueueKind, worker_id: &str) -> Result<Option<QueueEntry>> {
        let sql = format!(
            "UPDATE queue_entries SET status = 'processing', claimed_by = ?, \
             updated_at = CURRENT_TIMESTAMP \
             WHERE id = (SELECT id FROM queue_entries WHERE kind = ? AND status = 'pending' \
                         ORDER BY id ASC LIMIT 1) \
             AND status = 'pending' RETURNING {ENTRY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(worker_id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    /// Terminal transition for a PROCESSING entry. Returns false when the entry
    /// was not in PROCESSING (e.g. reset by external supervision meanwhile).
    #[instrument(skip_all, fields(entry_id = id, status = status.as_str()))]
    pub async fn complete(
        &self,
        id: i64,
        status: QueueStatus,
        asset_id: Option<i64>,
        error_message: Option<&str>,
    ) -> Result<bool> {
        if !status.is_terminal() {
            return Err(SyncError::State(format!(
                "cannot complete entry {id} with non-terminal status {}",
                status.as_str()
            )));
        }
        let res = sqlx::query(
            "UPDATE queue_entries SET status = ?, asset_id = COALESCE(?, asset_id), \
             error_message = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ? AND status = 'processing'",
        )
        .bind(status.as_str())
        .bind(asset_id)
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn count_by_status(&self) -> Result<Vec<StatusCount>> {
        let rows = sqlx::query(
            "SELECT kind, status, COUNT(*) AS cnt FROM queue_entries \
             GROUP BY kind, status ORDER BY kind, status",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let kind: String = row.try_get("kind")?;
                let status: String = row.try_get("status")?;
                Ok(StatusCount {
                    kind: QueueKind::parse_kind(&kind)
                        .ok_or_else(|| SyncError::State(format!("unknown kind {kind}")))?,
                    status: QueueStatus::parse_status(&status)
                        .ok_or_else(|| SyncError::State(format!("unknown status {status}")))?,
                    count: row.try_get("cnt")?,
                })
            })
            .collect()
    }
}
