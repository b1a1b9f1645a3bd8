//! Job repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use tscribe_models::{CanonicalUrl, Job, JobId, JobStatus, Language, ModelSize, Transition};

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

const JOB_COLUMNS: &str = "id, video_url, model_size, language, status, created_at, updated_at, \
     transcript_url, audio_url, srt_url, txt_url, video_title, video_duration, processing_time, \
     error_code, error_message, error_details";

/// Input for creating a job. The URL type guarantees canonical form.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub video_url: CanonicalUrl,
    pub model_size: ModelSize,
    pub language: Language,
}

/// Result of a create call.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// A new row was inserted.
    Created(Job),
    /// A live job for the same key already existed; nothing was inserted.
    Existing(Job),
}

impl CreateOutcome {
    pub fn job(&self) -> &Job {
        match self {
            CreateOutcome::Created(job) | CreateOutcome::Existing(job) => job,
        }
    }

    pub fn into_job(self) -> Job {
        match self {
            CreateOutcome::Created(job) | CreateOutcome::Existing(job) => job,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

/// Pagination parameters for history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Clamp caller-supplied values: limit to 1..=100 (default 20), offset to >= 0.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l >= 1 => l.min(Self::MAX_LIMIT as i64) as u32,
            _ => Self::DEFAULT_LIMIT,
        };
        let offset = offset.filter(|o| *o >= 0).unwrap_or(0).min(u32::MAX as i64) as u32;
        Self { limit, offset }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of jobs, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// The single owner of job records.
///
/// No other component mutates a job; status changes go through
/// [`JobStore::apply_transition`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a pending job, or return the live job already holding its key.
    async fn create(&self, job: NewJob) -> StoreResult<CreateOutcome>;

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>>;

    /// Most recent non-failed job for the exact (URL, model) key.
    async fn find_active(
        &self,
        video_url: &CanonicalUrl,
        model_size: ModelSize,
    ) -> StoreResult<Option<Job>>;

    /// Validate and persist a status change in a single write.
    async fn apply_transition(&self, id: &JobId, transition: Transition) -> StoreResult<Job>;

    async fn list(&self, page: PageRequest) -> StoreResult<JobPage>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> StoreResult<()>;
}

/// SQLite implementation of [`JobStore`].
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Run a closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, new_job: NewJob) -> StoreResult<CreateOutcome> {
        self.blocking(move |conn| {
            let job = Job::new(new_job.video_url.as_str(), new_job.model_size, new_job.language);

            match insert_job(conn, &job) {
                Ok(_) => {
                    info!(job_id = %job.id, video_url = %job.video_url, model_size = %job.model_size, "Created job");
                    Ok(CreateOutcome::Created(job))
                }
                Err(e) if is_constraint_violation(&e) => {
                    // Lost the race to another writer for the same key.
                    match select_active(conn, &job.video_url, job.model_size)? {
                        Some(existing) => {
                            counter!("tscribe_store_create_conflicts_total").increment(1);
                            warn!(
                                job_id = %existing.id,
                                video_url = %existing.video_url,
                                "Live job already holds dedup key, returning it"
                            );
                            Ok(CreateOutcome::Existing(existing))
                        }
                        None => Err(StoreError::Sqlite(e)),
                    }
                }
                Err(e) => Err(StoreError::Sqlite(e)),
            }
        })
        .await
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let id = id.clone();
        self.blocking(move |conn| select_by_id(conn, &id)).await
    }

    async fn find_active(
        &self,
        video_url: &CanonicalUrl,
        model_size: ModelSize,
    ) -> StoreResult<Option<Job>> {
        let video_url = video_url.as_str().to_string();
        self.blocking(move |conn| select_active(conn, &video_url, model_size))
            .await
    }

    async fn apply_transition(&self, id: &JobId, transition: Transition) -> StoreResult<Job> {
        let id = id.clone();
        self.blocking(move |conn| {
            let mut job = select_by_id(conn, &id)?.ok_or_else(|| StoreError::not_found(id.as_str()))?;
            let observed = job.status;

            job.apply_transition(transition)?;

            let changed = update_job(conn, &job, observed)?;
            if changed == 0 {
                return Err(StoreError::Conflict(id.to_string()));
            }

            debug!(job_id = %job.id, from = %observed, to = %job.status, "Applied transition");
            Ok(job)
        })
        .await
    }

    async fn list(&self, page: PageRequest) -> StoreResult<JobPage> {
        self.blocking(move |conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
            let total = total.max(0) as u64;

            let sql = format!(
                "SELECT {} FROM jobs ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
                JOB_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![page.limit, page.offset], JobRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            let jobs = rows
                .into_iter()
                .map(JobRow::into_job)
                .collect::<StoreResult<Vec<_>>>()?;

            Ok(JobPage {
                jobs,
                total,
                limit: page.limit,
                offset: page.offset,
            })
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.blocking(|conn| {
            conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn insert_job(conn: &Connection, job: &Job) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO jobs (id, video_url, model_size, language, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            job.id.as_str(),
            job.video_url,
            job.model_size.as_str(),
            job.language.as_str(),
            job.status.as_str(),
            job.created_at.timestamp(),
            job.updated_at.timestamp(),
        ],
    )
}

/// Write the mutable columns, guarded on the status the change was validated against.
fn update_job(conn: &Connection, job: &Job, observed: JobStatus) -> StoreResult<usize> {
    let error_details = job
        .error_details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StoreError::Corrupt {
            id: job.id.to_string(),
            reason: e.to_string(),
        })?;

    let changed = conn.execute(
        "UPDATE jobs SET status = ?3, updated_at = ?4,
             transcript_url = ?5, audio_url = ?6, srt_url = ?7, txt_url = ?8,
             video_title = ?9, video_duration = ?10, processing_time = ?11,
             error_code = ?12, error_message = ?13, error_details = ?14
         WHERE id = ?1 AND status = ?2",
        params![
            job.id.as_str(),
            observed.as_str(),
            job.status.as_str(),
            job.updated_at.timestamp(),
            job.transcript_url,
            job.audio_url,
            job.srt_url,
            job.txt_url,
            job.video_title,
            job.video_duration,
            job.processing_time,
            job.error_code,
            job.error_message,
            error_details,
        ],
    )?;
    Ok(changed)
}

fn select_by_id(conn: &Connection, id: &JobId) -> StoreResult<Option<Job>> {
    let sql = format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS);
    conn.query_row(&sql, params![id.as_str()], JobRow::from_row)
        .optional()?
        .map(JobRow::into_job)
        .transpose()
}

fn select_active(conn: &Connection, video_url: &str, model_size: ModelSize) -> StoreResult<Option<Job>> {
    let sql = format!(
        "SELECT {} FROM jobs
         WHERE video_url = ?1 AND model_size = ?2 AND status != 'failed'
         ORDER BY created_at DESC, rowid DESC LIMIT 1",
        JOB_COLUMNS
    );
    conn.query_row(&sql, params![video_url, model_size.as_str()], JobRow::from_row)
        .optional()?
        .map(JobRow::into_job)
        .transpose()
}

/// A raw job row from the database.
#[derive(Debug)]
struct JobRow {
    id: String,
    video_url: String,
    model_size: String,
    language: String,
    status: String,
    created_at: i64,
    updated_at: i64,
    transcript_url: Option<String>,
    audio_url: Option<String>,
    srt_url: Option<String>,
    txt_url: Option<String>,
    video_title: Option<String>,
    video_duration: Option<f64>,
    processing_time: Option<f64>,
    error_code: Option<String>,
    error_message: Option<String>,
    error_details: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            video_url: row.get("video_url")?,
            model_size: row.get("model_size")?,
            language: row.get("language")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            transcript_url: row.get("transcript_url")?,
            audio_url: row.get("audio_url")?,
            srt_url: row.get("srt_url")?,
            txt_url: row.get("txt_url")?,
            video_title: row.get("video_title")?,
            video_duration: row.get("video_duration")?,
            processing_time: row.get("processing_time")?,
            error_code: row.get("error_code")?,
            error_message: row.get("error_message")?,
            error_details: row.get("error_details")?,
        })
    }

    fn into_job(self) -> StoreResult<Job> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.id.clone(),
            reason,
        };

        let model_size = self.model_size.parse().map_err(|e| corrupt(format!("{}", e)))?;
        let language = self.language.parse().map_err(|e| corrupt(format!("{}", e)))?;
        let status = self.status.parse().map_err(|e| corrupt(format!("{}", e)))?;
        let created_at = timestamp(self.created_at).ok_or_else(|| corrupt("bad created_at".into()))?;
        let updated_at = timestamp(self.updated_at).ok_or_else(|| corrupt("bad updated_at".into()))?;

        let error_details = self.error_details.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });

        Ok(Job {
            id: JobId::from_string(self.id),
            video_url: self.video_url,
            model_size,
            language,
            status,
            created_at,
            updated_at,
            transcript_url: self.transcript_url,
            audio_url: self.audio_url,
            srt_url: self.srt_url,
            txt_url: self.txt_url,
            video_title: self.video_title,
            video_duration: self.video_duration,
            processing_time: self.processing_time,
            error_code: self.error_code,
            error_message: self.error_message,
            error_details,
        })
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
