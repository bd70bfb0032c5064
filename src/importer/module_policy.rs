// ==========================================
// 医院库存ERP系统 - 模块导入策略 Trait
// ==========================================
// 依据: 批量导入平台设计文档 - Module Import Policy
// 职责: 定义业务模块接入导入管道的能力契约(不含实现)
// 红线: 通用管道(会话/批次/状态/历史)只依赖本契约,
//       绝不感知具体业务表结构
// ==========================================

use crate::domain::column::ColumnDef;
use crate::domain::row::ParsedRow;
use crate::domain::types::ConflictPolicy;
use crate::domain::validation::ValidationIssue;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// ImportModulePolicy Trait
// ==========================================
// 用途: 每个可批量导入的业务模块实现一次
// 实现者: DrugImportModule 等
#[async_trait]
pub trait ImportModulePolicy: Send + Sync {
    /// 模块名(历史记录与日志的归属维度)
    fn module_name(&self) -> &str;

    /// 模板列定义(模板生成与位置映射共用,运行期不可变)
    fn template_columns(&self) -> &[ColumnDef];

    /// 是否声明支持撤销已完成的导入
    fn supports_rollback(&self) -> bool;

    /// 校验单行业务规则
    ///
    /// # 参数
    /// - row: 解析行
    /// - row_number: 数据行号(1 起始)
    ///
    /// # 返回
    /// - Ok(Vec<ValidationIssue>): 零条表示整行合规;
    ///   管道按文件顺序逐行调用,不重排
    /// - Err: 校验所需的数据查询失败
    async fn validate_row(
        &self,
        row: &ParsedRow,
        row_number: usize,
    ) -> ImportResult<Vec<ValidationIssue>>;

    /// 文件级校验: 跨行约束(如文件内重复主键)
    ///
    /// # 说明
    /// - 在逐行校验之后调用一次,rows 保持文件顺序
    /// - 默认无跨行约束
    async fn validate_rows(&self, _rows: &[ParsedRow]) -> ImportResult<Vec<ValidationIssue>> {
        Ok(Vec::new())
    }

    /// 开启一次导入的工作单元(一个任务一个事务)
    ///
    /// # 参数
    /// - job_id: 任务标识,模块应以此标记写入行以支持撤销
    async fn begin_import(&self, job_id: &str) -> ImportResult<Box<dyn ImportUnitOfWork>>;

    /// 撤销指定任务写入的数据
    ///
    /// # 返回
    /// - Ok(u64): 被移除/还原的行数
    ///
    /// # 说明
    /// - 管道不跟踪逐行标识,正确撤销完全由模块负责
    async fn rollback_job(&self, job_id: &str) -> ImportResult<u64>;
}

// ==========================================
// ImportUnitOfWork Trait
// ==========================================
// 用途: 显式注入的事务边界(整个任务一个事务)
// 不变量: commit/rollback 恰好调用一次,之后工作单元不可再用
#[async_trait]
pub trait ImportUnitOfWork: Send {
    /// 在事务内插入一个批次
    ///
    /// # 参数
    /// - rows: 批次行(保持文件顺序)
    /// - on_conflict: 冲突策略(update 由模块自行消解;
    ///   error 应让约束冲突原样上抛)
    ///
    /// # 返回
    /// - Ok(usize): 实际落库行数
    async fn insert_batch(
        &mut self,
        rows: &[ParsedRow],
        on_conflict: ConflictPolicy,
    ) -> ImportResult<usize>;

    /// 提交整个任务事务
    async fn commit(self: Box<Self>) -> ImportResult<()>;

    /// 回滚整个任务事务(落库行全部撤销)
    async fn rollback(self: Box<Self>) -> ImportResult<()>;
}
