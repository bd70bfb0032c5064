// ==========================================
// 医院库存ERP系统 - 导入任务模型
// ==========================================
// 依据: 批量导入平台设计文档 - 数据模型
// 对齐: import_history 表(系统唯一持久化状态)
// ==========================================

use crate::domain::types::{ConflictPolicy, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ImportOptions - 任务启动选项
// ==========================================
// 任务生命周期内不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    pub skip_warnings: bool,         // true: 允许带 ERROR 的会话按有效行子集导入
    pub batch_size: usize,           // 正整数;UI 惯例取 {50,100,500,1000}
    pub on_conflict: ConflictPolicy, // skip / update / error
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_warnings: false,
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
            on_conflict: ConflictPolicy::Error,
        }
    }
}

// ==========================================
// ImportJob - 一次导入执行记录
// ==========================================
// 不变量: imported_rows + error_rows <= total_rows(执行期)
//         终态后(completed/failed/rolled_back)记录不再变更,
//         仅 completed → rolled_back 这一条撤销转换除外
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    // ===== 标识 =====
    pub job_id: String,     // UUID v4
    pub session_id: String, // 来源校验会话
    pub module: String,     // 业务模块名

    // ===== 状态 =====
    pub status: JobStatus,
    pub error_message: Option<String>, // FAILED 时的顶层错误

    // ===== 行计数 =====
    pub total_rows: usize,
    pub imported_rows: usize,
    pub error_rows: usize,
    pub warning_count: usize, // 会话阶段的 WARNING 条数(冻结快照)

    // ===== 时间 =====
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,

    // ===== 撤销 =====
    pub rollback_supported: bool, // 模块是否声明支持撤销

    // ===== 来源与操作者 =====
    pub file_name: String,
    pub file_size: usize,
    pub imported_by_id: Option<String>,
    pub imported_by_name: Option<String>,

    // ===== 审计 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ImportProgress - 即时进度(状态查询投影)
// ==========================================
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImportProgress {
    pub total_rows: usize,
    pub imported_rows: usize,
    pub error_rows: usize,
    pub current_row: usize,    // = imported_rows
    pub percent_complete: u32, // round(imported/total*100), total=0 时为 0
}

// ==========================================
// ImportStatusSnapshot - 任务状态时点快照
// ==========================================
// 只读投影,查询不改变任务状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStatusSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: ImportProgress,
    pub started_at: Option<DateTime<Utc>>,
    pub estimated_completion: Option<DateTime<Utc>>, // 仅 RUNNING 且已有进度时线性外推
    pub error: Option<String>,                       // FAILED 时的顶层错误
}

impl ImportJob {
    /// 进度投影
    pub fn progress(&self) -> ImportProgress {
        let percent = if self.total_rows == 0 {
            0
        } else {
            ((self.imported_rows as f64 / self.total_rows as f64) * 100.0).round() as u32
        };
        ImportProgress {
            total_rows: self.total_rows,
            imported_rows: self.imported_rows,
            error_rows: self.error_rows,
            current_row: self.imported_rows,
            percent_complete: percent,
        }
    }

    /// 预计完成时间: elapsed * total / imported 的线性外推
    ///
    /// 仅在 RUNNING 且 imported_rows > 0 时有值
    pub fn estimated_completion(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.status != JobStatus::Running || self.imported_rows == 0 {
            return None;
        }
        let started = self.started_at?;
        let elapsed_ms = (now - started).num_milliseconds().max(0);
        let total_ms =
            (elapsed_ms as f64 * self.total_rows as f64 / self.imported_rows as f64) as i64;
        Some(started + chrono::Duration::milliseconds(total_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_job(status: JobStatus, total: usize, imported: usize) -> ImportJob {
        let now = Utc::now();
        ImportJob {
            job_id: "j-1".to_string(),
            session_id: "s-1".to_string(),
            module: "drug_catalog".to_string(),
            status,
            error_message: None,
            total_rows: total,
            imported_rows: imported,
            error_rows: 0,
            warning_count: 0,
            started_at: Some(now - Duration::seconds(10)),
            completed_at: None,
            duration_ms: None,
            rollback_supported: true,
            file_name: "drugs.csv".to_string(),
            file_size: 1024,
            imported_by_id: None,
            imported_by_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_progress_percent() {
        let job = sample_job(JobStatus::Running, 200, 50);
        assert_eq!(job.progress().percent_complete, 25);
        assert_eq!(job.progress().current_row, 50);

        let empty = sample_job(JobStatus::Completed, 0, 0);
        assert_eq!(empty.progress().percent_complete, 0);
    }

    #[test]
    fn test_estimated_completion_gating() {
        let now = Utc::now();

        // 无进度 → 无估算
        let job = sample_job(JobStatus::Running, 100, 0);
        assert!(job.estimated_completion(now).is_none());

        // 非 RUNNING → 无估算
        let job = sample_job(JobStatus::Completed, 100, 100);
        assert!(job.estimated_completion(now).is_none());

        // RUNNING 且有进度 → 在 started_at 之后
        let job = sample_job(JobStatus::Running, 100, 50);
        let eta = job.estimated_completion(now).unwrap();
        assert!(eta > job.started_at.unwrap());
    }
}
