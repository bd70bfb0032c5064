// ==========================================
// 医院库存ERP系统 - 导入历史 Repository 实现
// ==========================================
// 职责: 实现任务记录数据访问(使用 rusqlite)
// 红线: Repository 不含业务规则,只做数据 CRUD
// 并发: 进度更新走独立连接,不进入任务数据事务,
//       轮询方在任务事务未提交时也能看到进度推进
// ==========================================

use crate::domain::job::ImportJob;
use crate::domain::types::JobStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_history_repo::ImportHistoryRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ImportHistoryRepositoryImpl
// ==========================================
pub struct ImportHistoryRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportHistoryRepositoryImpl {
    /// 创建新的 Repository 实例并确保表结构存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 复用已有连接(测试用)
    pub fn with_connection(conn: Connection) -> RepositoryResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> RepositoryResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS import_history (
                job_id             TEXT PRIMARY KEY,
                session_id         TEXT NOT NULL,
                module             TEXT NOT NULL,
                status             TEXT NOT NULL,
                error_message      TEXT,
                total_rows         INTEGER NOT NULL DEFAULT 0,
                imported_rows      INTEGER NOT NULL DEFAULT 0,
                error_rows         INTEGER NOT NULL DEFAULT 0,
                warning_count      INTEGER NOT NULL DEFAULT 0,
                started_at         TEXT,
                completed_at       TEXT,
                duration_ms        INTEGER,
                rollback_supported INTEGER NOT NULL DEFAULT 0,
                file_name          TEXT NOT NULL,
                file_size          INTEGER NOT NULL DEFAULT 0,
                imported_by_id     TEXT,
                imported_by_name   TEXT,
                created_at         TEXT NOT NULL,
                updated_at         TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_import_history_module
                ON import_history (module, created_at DESC);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ImportJob> {
        let status_raw: String = row.get("status")?;
        let status = JobStatus::parse(&status_raw).unwrap_or(JobStatus::Failed);
        Ok(ImportJob {
            job_id: row.get("job_id")?,
            session_id: row.get("session_id")?,
            module: row.get("module")?,
            status,
            error_message: row.get("error_message")?,
            total_rows: row.get::<_, i64>("total_rows")? as usize,
            imported_rows: row.get::<_, i64>("imported_rows")? as usize,
            error_rows: row.get::<_, i64>("error_rows")? as usize,
            warning_count: row.get::<_, i64>("warning_count")? as usize,
            started_at: row.get::<_, Option<DateTime<Utc>>>("started_at")?,
            completed_at: row.get::<_, Option<DateTime<Utc>>>("completed_at")?,
            duration_ms: row.get("duration_ms")?,
            rollback_supported: row.get::<_, i64>("rollback_supported")? != 0,
            file_name: row.get("file_name")?,
            file_size: row.get::<_, i64>("file_size")? as usize,
            imported_by_id: row.get("imported_by_id")?,
            imported_by_name: row.get("imported_by_name")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[async_trait]
impl ImportHistoryRepository for ImportHistoryRepositoryImpl {
    async fn insert_job(&self, job: &ImportJob) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO import_history (
                job_id, session_id, module, status, error_message,
                total_rows, imported_rows, error_rows, warning_count,
                started_at, completed_at, duration_ms, rollback_supported,
                file_name, file_size, imported_by_id, imported_by_name,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19
            )
            "#,
            params![
                job.job_id,
                job.session_id,
                job.module,
                job.status.as_str(),
                job.error_message,
                job.total_rows as i64,
                job.imported_rows as i64,
                job.error_rows as i64,
                job.warning_count as i64,
                job.started_at,
                job.completed_at,
                job.duration_ms,
                job.rollback_supported as i64,
                job.file_name,
                job.file_size as i64,
                job.imported_by_id,
                job.imported_by_name,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    }

    async fn update_job(&self, job: &ImportJob) -> RepositoryResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            r#"
            UPDATE import_history SET
                status = ?2, error_message = ?3,
                total_rows = ?4, imported_rows = ?5, error_rows = ?6,
                warning_count = ?7, started_at = ?8, completed_at = ?9,
                duration_ms = ?10, updated_at = ?11
            WHERE job_id = ?1
            "#,
            params![
                job.job_id,
                job.status.as_str(),
                job.error_message,
                job.total_rows as i64,
                job.imported_rows as i64,
                job.error_rows as i64,
                job.warning_count as i64,
                job.started_at,
                job.completed_at,
                job.duration_ms,
                Utc::now(),
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportJob".to_string(),
                id: job.job_id.clone(),
            });
        }
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> RepositoryResult<Option<ImportJob>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM import_history WHERE job_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![job_id], Self::map_row)?;
        match rows.next() {
            Some(job) => Ok(Some(job?)),
            None => Ok(None),
        }
    }

    async fn list_recent(&self, module: &str, limit: usize) -> RepositoryResult<Vec<ImportJob>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM import_history
            WHERE module = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )?;
        let jobs = stmt
            .query_map(params![module, limit as i64], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }
}
