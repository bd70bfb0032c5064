// ==========================================
// 医院库存ERP系统 - 导入接口门面
// ==========================================
// 依据: 批量导入平台设计文档 - 接口契约
// 职责: DTO 组装与错误映射,业务全部委托 ImportPipeline
// 约定: 对外 JSON 字段 camelCase,状态字符串 snake_case
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::{
    ConflictPolicy, FileFormat, ImportJob, ImportOptions, ImportStatusSnapshot, JobStatus,
    ValidationIssue, ValidationReport,
};
use crate::importer::{ImportError, ImportPipeline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ==========================================
// 请求 DTO
// ==========================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartImportRequest {
    pub session_id: String,
    #[serde(default)]
    pub options: ImportOptionsDto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptionsDto {
    #[serde(default)]
    pub skip_warnings: bool,
    pub batch_size: Option<usize>,
    pub on_conflict: Option<String>, // skip / update / error
}

impl Default for ImportOptionsDto {
    fn default() -> Self {
        Self {
            skip_warnings: false,
            batch_size: None,
            on_conflict: None,
        }
    }
}

impl ImportOptionsDto {
    fn into_options(self) -> ApiResult<ImportOptions> {
        let defaults = ImportOptions::default();
        let on_conflict = match self.on_conflict.as_deref() {
            None => defaults.on_conflict,
            Some("skip") => ConflictPolicy::Skip,
            Some("update") => ConflictPolicy::Update,
            Some("error") => ConflictPolicy::Error,
            Some(other) => {
                return Err(ApiError::bad_request(format!(
                    "无效的冲突策略: {}(可选 skip/update/error)",
                    other
                )))
            }
        };
        // 惯例集合仅作前端选项提示,执行器接受任意正整数
        let batch_size = self.batch_size.unwrap_or(defaults.batch_size);
        if !crate::config::CONVENTIONAL_BATCH_SIZES.contains(&batch_size) {
            tracing::debug!(batch_size, "批次大小不在惯例集合内,按原值执行");
        }
        Ok(ImportOptions {
            skip_warnings: self.skip_warnings,
            batch_size,
            on_conflict,
        })
    }
}

// ==========================================
// 响应 DTO
// ==========================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDownload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssueDto {
    pub row: usize,
    pub field: String,
    pub message: String,
    pub severity: String, // ERROR / WARNING
    pub code: String,
}

impl From<&ValidationIssue> for ValidationIssueDto {
    fn from(issue: &ValidationIssue) -> Self {
        Self {
            row: issue.row_number,
            field: issue.field.clone(),
            message: issue.message.clone(),
            severity: issue.severity.to_string(),
            code: issue.code.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStatsDto {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResultResponse {
    pub session_id: String,
    pub is_valid: bool,
    pub can_proceed: bool,
    pub errors: Vec<ValidationIssueDto>,
    pub warnings: Vec<ValidationIssueDto>,
    pub stats: ValidationStatsDto,
    pub expires_at: DateTime<Utc>,
}

impl ValidationResultResponse {
    fn build(session_id: String, expires_at: DateTime<Utc>, report: &ValidationReport) -> Self {
        Self {
            session_id,
            is_valid: report.is_valid,
            can_proceed: report.can_proceed,
            errors: report.errors.iter().map(ValidationIssueDto::from).collect(),
            warnings: report
                .warnings
                .iter()
                .map(ValidationIssueDto::from)
                .collect(),
            stats: ValidationStatsDto {
                total_rows: report.stats.total_rows,
                valid_rows: report.stats.valid_rows,
                error_rows: report.stats.error_rows,
            },
            expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartImportResponse {
    pub job_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgressDto {
    pub total_rows: usize,
    pub imported_rows: usize,
    pub error_rows: usize,
    pub current_row: usize,
    pub percent_complete: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatusResponse {
    pub job_id: String,
    pub status: String,
    pub progress: ImportProgressDto,
    pub started_at: Option<DateTime<Utc>>,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl From<ImportStatusSnapshot> for ImportStatusResponse {
    fn from(snapshot: ImportStatusSnapshot) -> Self {
        Self {
            job_id: snapshot.job_id,
            status: snapshot.status.as_str().to_string(),
            progress: ImportProgressDto {
                total_rows: snapshot.progress.total_rows,
                imported_rows: snapshot.progress.imported_rows,
                error_rows: snapshot.progress.error_rows,
                current_row: snapshot.progress.current_row,
                percent_complete: snapshot.progress.percent_complete,
            },
            started_at: snapshot.started_at,
            estimated_completion: snapshot.estimated_completion,
            error: snapshot.error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResponse {
    pub job_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedByDto {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportHistoryItem {
    pub job_id: String,
    pub module: String,
    pub file_name: String,
    pub status: String,
    pub total_rows: usize,
    pub records_imported: usize,
    pub error_rows: usize,
    pub warning_count: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub rollback_supported: bool,
    pub imported_by: ImportedByDto,
}

impl From<&ImportJob> for ImportHistoryItem {
    fn from(job: &ImportJob) -> Self {
        Self {
            job_id: job.job_id.clone(),
            module: job.module.clone(),
            file_name: job.file_name.clone(),
            status: job.status.as_str().to_string(),
            total_rows: job.total_rows,
            records_imported: job.imported_rows,
            error_rows: job.error_rows,
            warning_count: job.warning_count,
            started_at: job.started_at,
            completed_at: job.completed_at,
            duration_ms: job.duration_ms,
            rollback_supported: job.rollback_supported,
            imported_by: ImportedByDto {
                id: job.imported_by_id.clone(),
                name: job.imported_by_name.clone(),
            },
        }
    }
}

// ==========================================
// ImportApi - 导入接口门面
// ==========================================
pub struct ImportApi {
    pipeline: Arc<ImportPipeline>,
}

impl ImportApi {
    pub fn new(pipeline: Arc<ImportPipeline>) -> Self {
        Self { pipeline }
    }

    /// GET /import/{module}/template?format=csv|xlsx
    pub fn get_template(&self, format: &str) -> ApiResult<TemplateDownload> {
        let format = FileFormat::parse(format)
            .ok_or_else(|| ImportError::UnsupportedFormat(format.to_string()))?;
        let bytes = self.pipeline.generate_template(format)?;
        let content_type = match format {
            FileFormat::Csv => "text/csv; charset=utf-8",
            FileFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        };
        Ok(TemplateDownload {
            file_name: format!(
                "{}_template.{}",
                self.pipeline.module_name(),
                format.extension()
            ),
            content_type: content_type.to_string(),
            bytes,
        })
    }

    /// POST /import/{module}/validate (multipart 文件上传)
    pub async fn validate_file(
        &self,
        buffer: &[u8],
        file_name: &str,
        format: &str,
        actor: Option<&str>,
    ) -> ApiResult<ValidationResultResponse> {
        let format = FileFormat::parse(format)
            .ok_or_else(|| ImportError::UnsupportedFormat(format.to_string()))?;
        let outcome = self
            .pipeline
            .validate_file(buffer, file_name, format, actor)
            .await?;
        Ok(ValidationResultResponse::build(
            outcome.session_id,
            outcome.expires_at,
            &outcome.report,
        ))
    }

    /// POST /import/{module}/execute
    pub async fn start_import(
        &self,
        request: StartImportRequest,
        actor_id: Option<&str>,
        actor_name: Option<&str>,
    ) -> ApiResult<StartImportResponse> {
        let options = request.options.into_options()?;
        let started = self
            .pipeline
            .import_data(&request.session_id, options, actor_id, actor_name)
            .await?;
        Ok(StartImportResponse {
            job_id: started.job_id,
            status: started.status.as_str().to_string(),
        })
    }

    /// GET /import/jobs/{job_id}/status
    pub async fn get_import_status(&self, job_id: &str) -> ApiResult<ImportStatusResponse> {
        let snapshot = self.pipeline.get_import_status(job_id).await?;
        Ok(snapshot.into())
    }

    /// GET /import/jobs/{job_id}/can-rollback
    pub async fn can_rollback(&self, job_id: &str) -> ApiResult<bool> {
        Ok(self.pipeline.can_rollback(job_id).await?)
    }

    /// POST /import/jobs/{job_id}/rollback
    pub async fn rollback_import(&self, job_id: &str) -> ApiResult<RollbackResponse> {
        self.pipeline.rollback(job_id).await?;
        Ok(RollbackResponse {
            job_id: job_id.to_string(),
            status: JobStatus::RolledBack.as_str().to_string(),
        })
    }

    /// GET /import/{module}/history?limit=N
    pub async fn get_import_history(&self, limit: usize) -> ApiResult<Vec<ImportHistoryItem>> {
        let jobs = self.pipeline.get_import_history(limit).await;
        Ok(jobs.iter().map(ImportHistoryItem::from).collect())
    }
}
