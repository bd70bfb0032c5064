// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、管道组装、数据文件生成
// ==========================================

use his_import::config::ImportSettings;
use his_import::domain::ImportStatusSnapshot;
use his_import::{
    DrugImportModule, ImportHistoryRepositoryImpl, ImportPipeline, InMemorySessionStore,
};
use rusqlite::Connection;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// 创建临时测试数据库目录
///
/// # 返回
/// - TempDir: 临时目录（需要保持存活）
/// - String: 业务数据库文件路径
pub fn create_test_db() -> Result<(TempDir, String), Box<dyn Error>> {
    his_import::logging::init_test();
    let dir = tempfile::tempdir()?;
    let db_path = dir
        .path()
        .join("his_import_test.db")
        .to_string_lossy()
        .to_string();
    Ok((dir, db_path))
}

/// 组装药品目录导入管道(默认配置)
pub fn create_test_pipeline(db_path: &str) -> Arc<ImportPipeline> {
    create_test_pipeline_with_settings(db_path, ImportSettings::default())
}

/// 组装药品目录导入管道(自定义配置,用于 TTL 等场景)
///
/// 历史库使用独立数据库文件: 任务事务持有业务库写锁期间,
/// 进度更新仍可落盘
pub fn create_test_pipeline_with_settings(
    db_path: &str,
    settings: ImportSettings,
) -> Arc<ImportPipeline> {
    let history_db_path = format!("{}.history", db_path);
    let policy = Arc::new(DrugImportModule::new(db_path).expect("创建药品导入模块失败"));
    let sessions = Arc::new(InMemorySessionStore::new());
    let history =
        Arc::new(ImportHistoryRepositoryImpl::new(&history_db_path).expect("创建历史仓储失败"));
    Arc::new(ImportPipeline::new(policy, sessions, history, settings))
}

// ==========================================
// 测试数据生成
// ==========================================

/// 药品目录 CSV 表头(与模板列顺序一致)
pub const DRUG_CSV_HEADER: &str =
    "药品编码,药品名称,剂型,规格,单位,单价(元),补货点,管控药品,批准文号,启用日期";

/// 一行合规的药品数据
pub fn drug_csv_row(code: &str, name: &str) -> String {
    format!(
        "{},{},胶囊,0.25g*24粒,盒,12.50,50,false,国药准字H12345678,2025-01-01",
        code, name
    )
}

/// 拼装完整 CSV 文件内容
pub fn drug_csv(rows: &[String]) -> Vec<u8> {
    let mut content = String::from(DRUG_CSV_HEADER);
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content.push('\n');
    content.into_bytes()
}

/// 生成 n 行编码连续的合规数据文件
pub fn drug_csv_n(n: usize) -> Vec<u8> {
    let rows: Vec<String> = (0..n)
        .map(|i| drug_csv_row(&format!("D{:04}", 1000 + i), &format!("测试药品{}", i)))
        .collect();
    drug_csv(&rows)
}

// ==========================================
// 断言辅助
// ==========================================

/// 轮询任务直到进入终态(pending/running 之外)
pub async fn wait_for_terminal(pipeline: &ImportPipeline, job_id: &str) -> ImportStatusSnapshot {
    for _ in 0..250 {
        let snapshot = pipeline
            .get_import_status(job_id)
            .await
            .expect("状态查询失败");
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("任务 {} 未在预期时间内进入终态", job_id);
}

/// drug_catalog 当前行数
pub fn count_drug_rows(db_path: &str) -> i64 {
    let conn = Connection::open(db_path).expect("打开数据库失败");
    conn.query_row("SELECT COUNT(1) FROM drug_catalog", [], |row| row.get(0))
        .expect("行数查询失败")
}

/// 指定编码的药品名称(不存在返回 None)
pub fn drug_name_of(db_path: &str, code: &str) -> Option<String> {
    let conn = Connection::open(db_path).expect("打开数据库失败");
    conn.query_row(
        "SELECT drug_name FROM drug_catalog WHERE drug_code = ?1",
        [code],
        |row| row.get(0),
    )
    .ok()
}
