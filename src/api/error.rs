// ==========================================
// 医院库存ERP系统 - 接口层错误
// ==========================================
// 职责: 将导入管道错误映射为接口错误分类(HTTP 语义)
// 红线: 内部错误细节不透传给前端,只给分类与人读信息
// ==========================================

use crate::importer::ImportError;
use serde::Serialize;
use thiserror::Error;

/// 接口错误分类(与 HTTP 状态码对齐)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    BadRequest,          // 400: 参数非法
    NotFound,            // 404: 会话/任务不存在或已过期
    Conflict,            // 409: 状态冲突(会话已消费/任务状态不符/不可撤销)
    UnprocessableEntity, // 422: 校验未通过被阻断
    Internal,            // 500: 其余错误
}

impl ApiErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiErrorKind::BadRequest => 400,
            ApiErrorKind::NotFound => 404,
            ApiErrorKind::Conflict => 409,
            ApiErrorKind::UnprocessableEntity => 422,
            ApiErrorKind::Internal => 500,
        }
    }
}

// ==========================================
// ApiError - 前端可见的错误形态
// ==========================================
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest,
            message: message.into(),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        let kind = match &err {
            ImportError::UnsupportedFormat(_)
            | ImportError::ParseError(_)
            | ImportError::InvalidOption { .. } => ApiErrorKind::BadRequest,
            ImportError::SessionNotFound(_) | ImportError::JobNotFound(_) => ApiErrorKind::NotFound,
            ImportError::SessionConsumed(_)
            | ImportError::InvalidJobState { .. }
            | ImportError::RollbackUnsupported(_) => ApiErrorKind::Conflict,
            ImportError::ValidationBlocked { .. } => ApiErrorKind::UnprocessableEntity,
            ImportError::BatchInsertError { .. }
            | ImportError::DatabaseTransactionError(_)
            | ImportError::DatabaseQueryError(_)
            | ImportError::InternalError(_)
            | ImportError::Other(_) => ApiErrorKind::Internal,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// 接口层 Result 别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: ApiError = ImportError::UnsupportedFormat("pdf".to_string()).into();
        assert_eq!(err.kind, ApiErrorKind::BadRequest);
        assert!(err.message.contains("pdf"));

        let err: ApiError = ImportError::SessionNotFound("s-1".to_string()).into();
        assert_eq!(err.kind, ApiErrorKind::NotFound);
        assert_eq!(err.kind.status_code(), 404);

        let err: ApiError = ImportError::SessionConsumed("s-1".to_string()).into();
        assert_eq!(err.kind, ApiErrorKind::Conflict);

        let err: ApiError = ImportError::ValidationBlocked { errors: 3 }.into();
        assert_eq!(err.kind.status_code(), 422);

        let err: ApiError = ImportError::InvalidOption {
            key: "batch_size".to_string(),
            message: "必须为正整数".to_string(),
        }
        .into();
        assert_eq!(err.kind, ApiErrorKind::BadRequest);
    }
}
