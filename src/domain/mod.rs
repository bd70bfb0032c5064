// ==========================================
// 医院库存ERP系统 - 导入领域层
// ==========================================
// 职责: 导入管道的实体与值对象(无业务规则)
// ==========================================

pub mod column;
pub mod job;
pub mod row;
pub mod types;
pub mod validation;

// 重导出核心类型
pub use column::ColumnDef;
pub use job::{ImportJob, ImportOptions, ImportProgress, ImportStatusSnapshot};
pub use row::{CellValue, ParsedRow};
pub use types::{ColumnType, ConflictPolicy, FileFormat, JobStatus, Severity};
pub use validation::{ValidationIssue, ValidationReport, ValidationSession, ValidationStats};
