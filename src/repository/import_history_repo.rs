// ==========================================
// 医院库存ERP系统 - 导入历史 Repository Trait
// ==========================================
// 职责: 定义任务生命周期记录的数据访问接口(不含业务逻辑)
// 红线: Repository 不含业务规则,只做数据 CRUD
// 说明: import_history 表是导入管道唯一拥有的持久化状态
// ==========================================

use crate::domain::job::ImportJob;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportHistoryRepository Trait
// ==========================================
// 用途: 任务记录的创建/推进/查询
// 实现者: ImportHistoryRepositoryImpl(rusqlite)
#[async_trait]
pub trait ImportHistoryRepository: Send + Sync {
    /// 插入新任务记录(状态 pending)
    async fn insert_job(&self, job: &ImportJob) -> RepositoryResult<()>;

    /// 全量更新任务记录(执行器每批次后持久化进度)
    async fn update_job(&self, job: &ImportJob) -> RepositoryResult<()>;

    /// 按 job_id 查询任务
    ///
    /// # 返回
    /// - Ok(Some(job)): 找到
    /// - Ok(None): 未找到
    async fn get_job(&self, job_id: &str) -> RepositoryResult<Option<ImportJob>>;

    /// 查询指定模块最近的任务记录,按创建时间倒序
    async fn list_recent(&self, module: &str, limit: usize) -> RepositoryResult<Vec<ImportJob>>;
}
