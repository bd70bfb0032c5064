// ==========================================
// 医院库存ERP系统 - 导入管道编排器
// ==========================================
// 依据: 批量导入平台设计文档 - 导入主流程
// 流程: 模板 → 解析 → 逐行校验 → 会话 → 异步批次落库 → 状态/撤销/历史
// 红线: 通用编排只依赖 ImportModulePolicy 契约
// 事务: 一个任务一个工作单元事务(整体提交或整体回滚)
// ==========================================

use crate::config::ImportSettings;
use crate::domain::job::{ImportJob, ImportOptions, ImportStatusSnapshot};
use crate::domain::row::ParsedRow;
use crate::domain::types::{ConflictPolicy, FileFormat, JobStatus, Severity};
use crate::domain::validation::{
    ValidationIssue, ValidationReport, ValidationSession, ValidationStats,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::FileParser;
use crate::importer::module_policy::ImportModulePolicy;
use crate::importer::session::SessionStore;
use crate::importer::template::TemplateGenerator;
use crate::repository::ImportHistoryRepository;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// FileValidationOutcome - validate_file 返回值
// ==========================================
#[derive(Debug, Clone)]
pub struct FileValidationOutcome {
    pub session_id: String,
    pub expires_at: chrono::DateTime<Utc>,
    pub report: ValidationReport,
}

// ==========================================
// StartedImport - import_data 即时返回值
// ==========================================
// 任务异步执行,调用方凭 job_id 轮询状态
#[derive(Debug, Clone)]
pub struct StartedImport {
    pub job_id: String,
    pub status: JobStatus,
}

// ==========================================
// ImportPipeline - 单模块导入管道
// ==========================================
pub struct ImportPipeline {
    policy: Arc<dyn ImportModulePolicy>,
    sessions: Arc<dyn SessionStore>,
    history: Arc<dyn ImportHistoryRepository>,
    settings: ImportSettings,
}

impl ImportPipeline {
    pub fn new(
        policy: Arc<dyn ImportModulePolicy>,
        sessions: Arc<dyn SessionStore>,
        history: Arc<dyn ImportHistoryRepository>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            policy,
            sessions,
            history,
            settings,
        }
    }

    pub fn module_name(&self) -> &str {
        self.policy.module_name()
    }

    // ==========================================
    // 模板生成
    // ==========================================

    /// 生成当前模块的下载模板
    pub fn generate_template(&self, format: FileFormat) -> ImportResult<Vec<u8>> {
        TemplateGenerator::generate(self.policy.template_columns(), format)
    }

    // ==========================================
    // 文件校验(会话创建)
    // ==========================================

    /// 解析并逐行校验上传文件,创建时间盒会话
    ///
    /// # 流程
    /// 1. 结构化解析(失败即 ParseError,不创建会话)
    /// 2. 按文件顺序逐行调用模块校验
    /// 3. 聚合统计,can_proceed = 零 ERROR
    /// 4. 创建会话(expires_at = now + TTL,过期惰性判定)
    #[instrument(skip(self, buffer), fields(module = %self.policy.module_name(), file = %file_name))]
    pub async fn validate_file(
        &self,
        buffer: &[u8],
        file_name: &str,
        format: FileFormat,
        actor: Option<&str>,
    ) -> ImportResult<FileValidationOutcome> {
        info!(size = buffer.len(), "开始校验上传文件");

        // === 步骤 1: 解析文件 ===
        let rows = FileParser::parse_buffer(buffer, format, self.policy.template_columns())
            .map_err(|e| {
                error!(error = %e, "文件解析失败");
                e
            })?;
        let total_rows = rows.len();
        debug!(total_rows, "文件解析完成");

        // === 步骤 2: 逐行校验(文件顺序,不重排) + 文件级跨行校验 ===
        let mut issues: Vec<ValidationIssue> = Vec::new();
        for row in &rows {
            issues.extend(self.policy.validate_row(row, row.row_number).await?);
        }
        issues.extend(self.policy.validate_rows(&rows).await?);

        let mut errors: Vec<ValidationIssue> = Vec::new();
        let mut warnings: Vec<ValidationIssue> = Vec::new();
        for issue in issues {
            match issue.severity {
                Severity::Error => errors.push(issue),
                Severity::Warning => warnings.push(issue),
            }
        }
        // 合并文件级问题后仍按行号报告
        errors.sort_by_key(|i| i.row_number);
        warnings.sort_by_key(|i| i.row_number);

        // 仅 WARNING 的行仍计为有效
        let error_row_set: std::collections::HashSet<usize> =
            errors.iter().map(|i| i.row_number).collect();
        let error_rows = error_row_set.len();
        let valid_rows = total_rows - error_rows;
        let is_valid = errors.is_empty();
        let report = ValidationReport {
            is_valid,
            // WARNING 永不阻断;ERROR 必须清零或经 skip_warnings 剔除
            can_proceed: is_valid,
            errors,
            warnings,
            stats: ValidationStats {
                total_rows,
                valid_rows,
                error_rows,
            },
        };

        // === 步骤 3: 创建会话 ===
        let now = Utc::now();
        let session_id = Uuid::new_v4().to_string();
        let expires_at = now + self.settings.session_ttl();
        let session = ValidationSession {
            session_id: session_id.clone(),
            module: self.policy.module_name().to_string(),
            file_name: file_name.to_string(),
            file_format: format,
            file_size: buffer.len(),
            uploaded_at: now,
            expires_at,
            rows,
            report: report.clone(),
            consumed: false,
            created_by: actor.map(|a| a.to_string()),
        };
        self.sessions.put(session)?;

        info!(
            session_id = %session_id,
            total = total_rows,
            valid = valid_rows,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "文件校验完成"
        );

        Ok(FileValidationOutcome {
            session_id,
            expires_at,
            report,
        })
    }

    // ==========================================
    // 导入任务启动(异步执行)
    // ==========================================

    /// 消费会话并启动异步导入任务,立即返回 job_id
    ///
    /// # 前置条件
    /// - 会话存在且未过期(否则 SessionNotFound)
    /// - 会话未被消费(单次消费,否则 SessionConsumed)
    /// - can_proceed 或 skip_warnings=true(否则 ValidationBlocked);
    ///   skip_warnings 强制导入时仅导入无 ERROR 的行,
    ///   被剔除的行预计入 error_rows,保持行数守恒
    #[instrument(skip(self, options), fields(module = %self.policy.module_name(), session_id = %session_id))]
    pub async fn import_data(
        &self,
        session_id: &str,
        options: ImportOptions,
        actor_id: Option<&str>,
        actor_name: Option<&str>,
    ) -> ImportResult<StartedImport> {
        if options.batch_size == 0 {
            return Err(ImportError::InvalidOption {
                key: "batch_size".to_string(),
                message: "批次大小必须为正整数".to_string(),
            });
        }

        // 阻断判定先于消费: 被拒绝的请求不烧掉会话,
        // 调用方仍可改用 skip_warnings 重试
        let preview = self
            .sessions
            .get(session_id)?
            .ok_or_else(|| ImportError::SessionNotFound(session_id.to_string()))?;
        if !preview.report.can_proceed && !options.skip_warnings {
            return Err(ImportError::ValidationBlocked {
                errors: preview.report.errors.len(),
            });
        }

        // 原子消费: 过期/已消费在此一并判定(并发下的唯一闸门)
        let session = self.sessions.consume(session_id)?;

        // skip_warnings 强制路径: 剔除含 ERROR 的行,预计入 error_rows
        let total_rows = session.report.stats.total_rows;
        let (rows, excluded) = if session.report.can_proceed {
            (session.rows, 0)
        } else {
            let error_rows = session.report.error_row_numbers();
            let before = session.rows.len();
            let kept: Vec<ParsedRow> = session
                .rows
                .into_iter()
                .filter(|r| !error_rows.contains(&r.row_number))
                .collect();
            let excluded = before - kept.len();
            warn!(excluded, "skip_warnings 强制导入: 剔除校验失败行");
            (kept, excluded)
        };

        // === 创建任务记录(pending) ===
        let now = Utc::now();
        let job = ImportJob {
            job_id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            module: self.policy.module_name().to_string(),
            status: JobStatus::Pending,
            error_message: None,
            total_rows,
            imported_rows: 0,
            error_rows: excluded,
            warning_count: session.report.warnings.len(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
            rollback_supported: self.policy.supports_rollback(),
            file_name: session.file_name.clone(),
            file_size: session.file_size,
            imported_by_id: actor_id.map(|a| a.to_string()),
            imported_by_name: actor_name.map(|a| a.to_string()),
            created_at: now,
            updated_at: now,
        };
        self.history
            .insert_job(&job)
            .await
            .map_err(|e| ImportError::DatabaseQueryError(e.to_string()))?;

        let job_id = job.job_id.clone();
        info!(job_id = %job_id, total = total_rows, batch_size = options.batch_size, "导入任务已入队");

        // === 异步执行(调用方立即返回) ===
        let policy = Arc::clone(&self.policy);
        let history = Arc::clone(&self.history);
        tokio::spawn(async move {
            Self::run_job(policy, history, job, rows, options).await;
        });

        Ok(StartedImport {
            job_id,
            status: JobStatus::Pending,
        })
    }

    /// 任务执行体: 一个工作单元事务内按批次落库
    ///
    /// 状态机: PENDING → RUNNING → (COMPLETED | FAILED)
    /// 进度通过历史仓储独立连接持久化,每批次一次
    async fn run_job(
        policy: Arc<dyn ImportModulePolicy>,
        history: Arc<dyn ImportHistoryRepository>,
        mut job: ImportJob,
        rows: Vec<ParsedRow>,
        options: ImportOptions,
    ) {
        let job_id = job.job_id.clone();
        match Self::execute_batches(&policy, &history, &mut job, rows, &options).await {
            Ok(()) => {
                info!(
                    job_id = %job_id,
                    imported = job.imported_rows,
                    errors = job.error_rows,
                    duration_ms = job.duration_ms.unwrap_or(0),
                    "导入任务完成"
                );
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "导入任务失败");
                job.status = JobStatus::Failed;
                job.error_message = Some(e.to_string());
                job.completed_at = Some(Utc::now());
                if let (Some(started), Some(completed)) = (job.started_at, job.completed_at) {
                    job.duration_ms = Some((completed - started).num_milliseconds());
                }
                if let Err(persist_err) = history.update_job(&job).await {
                    error!(job_id = %job_id, error = %persist_err, "任务失败状态持久化失败");
                }
            }
        }
    }

    async fn execute_batches(
        policy: &Arc<dyn ImportModulePolicy>,
        history: &Arc<dyn ImportHistoryRepository>,
        job: &mut ImportJob,
        rows: Vec<ParsedRow>,
        options: &ImportOptions,
    ) -> ImportResult<()> {
        // === RUNNING ===
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        history
            .update_job(job)
            .await
            .map_err(|e| ImportError::DatabaseQueryError(e.to_string()))?;

        // === 整个任务一个事务 ===
        let mut uow = policy.begin_import(&job.job_id).await?;

        for (batch_index, batch) in rows.chunks(options.batch_size).enumerate() {
            match uow.insert_batch(batch, options.on_conflict).await {
                Ok(count) => {
                    job.imported_rows += count;
                    debug!(
                        job_id = %job.job_id,
                        batch = batch_index + 1,
                        rows = count,
                        "批次落库完成"
                    );
                }
                Err(e) => match options.on_conflict {
                    // skip: 整批记为错误行,继续后续批次
                    ConflictPolicy::Skip => {
                        job.error_rows += batch.len();
                        warn!(
                            job_id = %job.job_id,
                            batch = batch_index + 1,
                            error = %e,
                            "批次插入失败,按 skip 策略跳过"
                        );
                    }
                    // error: 中止任务,整体回滚
                    // update: 冲突应由模块消解,仍失败则视同中止
                    ConflictPolicy::Error | ConflictPolicy::Update => {
                        job.error_rows += batch.len();
                        uow.rollback().await?;
                        return Err(ImportError::BatchInsertError {
                            batch_index: batch_index + 1,
                            message: e.to_string(),
                        });
                    }
                },
            }

            // 每批次持久化进度(独立连接,轮询可见)
            job.updated_at = Utc::now();
            history
                .update_job(job)
                .await
                .map_err(|e| ImportError::DatabaseQueryError(e.to_string()))?;
        }

        // === 提交并进入终态 ===
        uow.commit().await?;

        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        if let (Some(started), Some(completed)) = (job.started_at, job.completed_at) {
            job.duration_ms = Some((completed - started).num_milliseconds());
        }
        history
            .update_job(job)
            .await
            .map_err(|e| ImportError::DatabaseQueryError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 任务状态查询
    // ==========================================

    /// 任务即时状态快照(纯读取,不改变任务状态)
    pub async fn get_import_status(&self, job_id: &str) -> ImportResult<ImportStatusSnapshot> {
        let job = self
            .history
            .get_job(job_id)
            .await
            .map_err(|e| ImportError::DatabaseQueryError(e.to_string()))?
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))?;

        let now = Utc::now();
        Ok(ImportStatusSnapshot {
            job_id: job.job_id.clone(),
            status: job.status,
            progress: job.progress(),
            started_at: job.started_at,
            estimated_completion: job.estimated_completion(now),
            error: job.error_message.clone(),
        })
    }

    // ==========================================
    // 撤销
    // ==========================================

    /// 任务是否可撤销: 模块声明支持 且 状态为 COMPLETED
    pub async fn can_rollback(&self, job_id: &str) -> ImportResult<bool> {
        let job = self
            .history
            .get_job(job_id)
            .await
            .map_err(|e| ImportError::DatabaseQueryError(e.to_string()))?
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))?;
        Ok(self.policy.supports_rollback() && job.status == JobStatus::Completed)
    }

    /// 撤销已完成任务: 调用模块撤销例程恰好一次,转入 ROLLED_BACK
    #[instrument(skip(self), fields(module = %self.policy.module_name()))]
    pub async fn rollback(&self, job_id: &str) -> ImportResult<()> {
        let mut job = self
            .history
            .get_job(job_id)
            .await
            .map_err(|e| ImportError::DatabaseQueryError(e.to_string()))?
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()))?;

        if !self.policy.supports_rollback() {
            return Err(ImportError::RollbackUnsupported(
                self.policy.module_name().to_string(),
            ));
        }
        if job.status != JobStatus::Completed {
            return Err(ImportError::InvalidJobState {
                current: job.status.to_string(),
                expected: JobStatus::Completed.to_string(),
            });
        }

        let removed = self.policy.rollback_job(job_id).await?;
        info!(job_id = %job_id, removed, "导入已撤销");

        job.status = JobStatus::RolledBack;
        job.updated_at = Utc::now();
        self.history
            .update_job(&job)
            .await
            .map_err(|e| ImportError::DatabaseQueryError(e.to_string()))?;
        Ok(())
    }

    // ==========================================
    // 历史查询
    // ==========================================

    /// 当前模块最近的导入记录,按时间倒序
    ///
    /// 历史仅作展示,读取失败降级为空列表(记录日志,不上抛)
    pub async fn get_import_history(&self, limit: usize) -> Vec<ImportJob> {
        match self
            .history
            .list_recent(self.policy.module_name(), limit)
            .await
        {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(module = %self.policy.module_name(), error = %e, "导入历史读取失败,降级为空列表");
                Vec::new()
            }
        }
    }
}
