// ==========================================
// 医院库存ERP系统 - 导入层
// ==========================================
// 职责: 批量导入管道(模板/解析/校验/会话/任务/撤销/历史)
// 红线: 对业务模块只依赖 ImportModulePolicy 契约
// ==========================================

// 模块声明
pub mod column_rules;
pub mod error;
pub mod file_parser;
pub mod module_policy;
pub mod pipeline;
pub mod session;
pub mod template;

// 重导出核心类型
pub use column_rules::ColumnRuleValidator;
pub use error::{ImportError, ImportResult};
pub use file_parser::FileParser;
pub use pipeline::{FileValidationOutcome, ImportPipeline, StartedImport};
pub use session::{InMemorySessionStore, SessionStore};
pub use template::TemplateGenerator;

// 重导出 Trait 接口
pub use module_policy::{ImportModulePolicy, ImportUnitOfWork};
