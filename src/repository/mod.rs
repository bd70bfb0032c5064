// ==========================================
// 医院库存ERP系统 - 数据仓储层
// ==========================================
// 职责: 导入管道的数据访问(不含业务规则)
// ==========================================

pub mod error;
pub mod import_history_repo;
pub mod import_history_repo_impl;

pub use error::{RepositoryError, RepositoryResult};
pub use import_history_repo::ImportHistoryRepository;
pub use import_history_repo_impl::ImportHistoryRepositoryImpl;
