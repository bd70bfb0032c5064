// ==========================================
// 医院库存ERP系统 - 接口层
// ==========================================
// 职责: 导入管道的对外门面(DTO/错误映射)
// 红线: 不含业务规则,全部委托 ImportPipeline
// ==========================================

pub mod error;
pub mod import_api;

pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use import_api::{
    ImportApi, ImportHistoryItem, ImportOptionsDto, ImportStatusResponse, StartImportRequest,
    StartImportResponse, TemplateDownload, ValidationResultResponse,
};
