// ==========================================
// 医院库存ERP系统 - 导入领域类型定义
// ==========================================
// 依据: 批量导入平台设计文档 - 数据模型
// 序列化格式: 与 import_history 表字符串列一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 校验严重级别 (Severity)
// ==========================================
// 红线: ERROR 阻断导入, WARNING 仅提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,   // 阻断级
    Warning, // 提示级
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

// ==========================================
// 导入任务状态 (Job Status)
// ==========================================
// 状态机: PENDING → RUNNING → (COMPLETED | FAILED)
// ROLLED_BACK 仅可由 COMPLETED 进入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,    // 已创建,等待执行
    Running,    // 执行中
    Completed,  // 全部批次提交完成
    Failed,     // 中止并整体回滚
    RolledBack, // 导入后被撤销
}

impl JobStatus {
    /// 数据库存储形式
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::RolledBack => "rolled_back",
        }
    }

    /// 从数据库字符串解析
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "rolled_back" => Some(JobStatus::RolledBack),
            _ => None,
        }
    }

    /// 终态判定(执行器不再推进)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::RolledBack
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 冲突处理策略 (Conflict Policy)
// ==========================================
// 批次插入遇到约束冲突时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    Skip,   // 跳过失败批次,继续后续批次
    Update, // 由模块负责以更新方式消解冲突
    Error,  // 中止任务,整体回滚
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::Update => "update",
            ConflictPolicy::Error => "error",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 文件格式 (File Format)
// ==========================================
// 仅支持 CSV / Excel 两种上传格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Csv,
    Excel,
}

impl FileFormat {
    /// 从格式参数解析(csv / xlsx / excel)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" | "xls" | "excel" => Some(FileFormat::Excel),
            _ => None,
        }
    }

    /// 下载文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "xlsx",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Excel => write!(f, "excel"),
        }
    }
}

// ==========================================
// 列语义类型 (Column Type)
// ==========================================
// 模板生成与类型校验共用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Number,
    Boolean,
    Date,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Number => write!(f, "number"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Date => write!(f, "date"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::RolledBack,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("unknown"), None);
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::RolledBack.is_terminal());
    }

    #[test]
    fn test_file_format_parse() {
        assert_eq!(FileFormat::parse("csv"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::parse("XLSX"), Some(FileFormat::Excel));
        assert_eq!(FileFormat::parse("excel"), Some(FileFormat::Excel));
        assert_eq!(FileFormat::parse("pdf"), None);
    }
}
