// ==========================================
// 医院库存ERP系统 - 校验结果与会话模型
// ==========================================
// 依据: 批量导入平台设计文档 - 数据模型
// 红线: ERROR 阻断导入, WARNING 不影响 can_proceed
// ==========================================

use crate::domain::row::ParsedRow;
use crate::domain::types::{FileFormat, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ValidationIssue - 单条校验问题
// ==========================================
// 行号 1 起始,与解析行一一对应;创建后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub row_number: usize,  // 数据行号(1 起始)
    pub field: String,      // 字段名
    pub message: String,    // 人读信息
    pub severity: Severity, // ERROR / WARNING
    pub code: String,       // 机器码(前端定位用)
}

impl ValidationIssue {
    pub fn error(row_number: usize, field: &str, code: &str, message: String) -> Self {
        Self {
            row_number,
            field: field.to_string(),
            message,
            severity: Severity::Error,
            code: code.to_string(),
        }
    }

    pub fn warning(row_number: usize, field: &str, code: &str, message: String) -> Self {
        Self {
            row_number,
            field: field.to_string(),
            message,
            severity: Severity::Warning,
            code: code.to_string(),
        }
    }
}

// ==========================================
// ValidationStats - 聚合统计
// ==========================================
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ValidationStats {
    pub total_rows: usize, // 文件数据行总数
    pub valid_rows: usize, // 无 ERROR 的行数(仅 WARNING 仍记为有效)
    pub error_rows: usize, // 含至少一条 ERROR 的行数
}

// ==========================================
// ValidationReport - 整个文件的校验结论
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,                  // errors 为空
    pub can_proceed: bool,               // 等价 is_valid(WARNING 永不阻断)
    pub errors: Vec<ValidationIssue>,    // ERROR 级问题,文件顺序
    pub warnings: Vec<ValidationIssue>,  // WARNING 级问题,文件顺序
    pub stats: ValidationStats,
}

impl ValidationReport {
    /// 含 ERROR 的行号集合(skip_warnings 强制导入时用于剔除)
    pub fn error_row_numbers(&self) -> std::collections::HashSet<usize> {
        self.errors.iter().map(|e| e.row_number).collect()
    }
}

// ==========================================
// ValidationSession - 时间盒内待确认的已校验快照
// ==========================================
// 不变量: expires_at = uploaded_at + TTL;超时后任何访问等价于不存在
// 单次消费: import_data 首次调用即置 consumed,二次调用拒绝
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSession {
    pub session_id: String,           // 不透明唯一令牌(UUID v4)
    pub module: String,               // 业务模块名
    pub file_name: String,            // 上传文件名
    pub file_format: FileFormat,      // csv / excel
    pub file_size: usize,             // 上传字节数
    pub uploaded_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub rows: Vec<ParsedRow>,         // 完整解析行集,文件顺序
    pub report: ValidationReport,
    pub consumed: bool,               // 已被 import_data 消费
    pub created_by: Option<String>,   // 上传者标识
}

impl ValidationSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = ValidationSession {
            session_id: "s-1".to_string(),
            module: "drug_catalog".to_string(),
            file_name: "drugs.csv".to_string(),
            file_format: FileFormat::Csv,
            file_size: 128,
            uploaded_at: now,
            expires_at: now + Duration::minutes(30),
            rows: vec![],
            report: ValidationReport {
                is_valid: true,
                can_proceed: true,
                errors: vec![],
                warnings: vec![],
                stats: ValidationStats::default(),
            },
            consumed: false,
            created_by: None,
        };

        assert!(!session.is_expired(now + Duration::minutes(29)));
        assert!(session.is_expired(now + Duration::minutes(30)));
        assert!(session.is_expired(now + Duration::minutes(31)));
    }
}
