// ==========================================
// 医院库存ERP系统 - 批量数据导入平台核心库
// ==========================================
// 依据: 批量导入平台设计文档
// 技术栈: Rust + Tokio + SQLite
// 系统定位: 后端导入管道 (模板/校验/会话/异步任务/撤销/历史)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 导入管道
pub mod importer;

// 业务模块层 - 各业务域导入策略
pub mod modules;

// 接口层 - 对外门面
pub mod api;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CellValue, ColumnDef, ColumnType, ConflictPolicy, FileFormat, ImportJob, ImportOptions,
    ImportProgress, ImportStatusSnapshot, JobStatus, ParsedRow, Severity, ValidationIssue,
    ValidationReport, ValidationSession, ValidationStats,
};

// 导入管道
pub use importer::{
    FileValidationOutcome, ImportError, ImportModulePolicy, ImportPipeline, ImportResult,
    ImportUnitOfWork, InMemorySessionStore, SessionStore, StartedImport,
};

// 业务模块
pub use modules::DrugImportModule;

// 仓储
pub use repository::{ImportHistoryRepository, ImportHistoryRepositoryImpl};

// API
pub use api::{ApiError, ApiResult, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "医院库存ERP系统 - 批量数据导入平台";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
