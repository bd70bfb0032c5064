// ==========================================
// 医院库存ERP系统 - 导入模块错误类型
// ==========================================
// 依据: 批量导入平台设计文档 - 错误分类
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入管道错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件与解析错误 =====
    #[error("文件格式不支持: {0}(仅支持 csv/xlsx)")]
    UnsupportedFormat(String),

    #[error("文件解析失败: {0}")]
    ParseError(String),

    // ===== 会话错误 =====
    #[error("会话不存在或已过期: {0}")]
    SessionNotFound(String),

    #[error("会话已被消费,不可重复导入: {0}")]
    SessionConsumed(String),

    #[error("校验未通过,导入被阻断: {errors} 条错误(skip_warnings=false)")]
    ValidationBlocked { errors: usize },

    // ===== 任务错误 =====
    #[error("导入任务不存在: {0}")]
    JobNotFound(String),

    #[error("批次插入失败 (批次 {batch_index}): {message}")]
    BatchInsertError { batch_index: usize, message: String },

    #[error("无效的任务状态转换: 当前 {current}, 期望 {expected}")]
    InvalidJobState { current: String, expected: String },

    // ===== 撤销错误 =====
    #[error("模块 {0} 不支持撤销导入")]
    RollbackUnsupported(String),

    // ===== 数据库错误 =====
    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 配置错误 =====
    #[error("无效的导入选项 (key: {key}): {message}")]
    InvalidOption { key: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::ParseError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::ParseError(format!("CSV 解析失败: {}", err))
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ParseError(format!("Excel 解析失败: {}", err))
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::DatabaseQueryError(err.to_string())
    }
}

// 实现 From<rust_xlsxwriter::XlsxError>
impl From<rust_xlsxwriter::XlsxError> for ImportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ImportError::InternalError(format!("Excel 模板生成失败: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
