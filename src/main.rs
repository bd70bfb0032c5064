// ==========================================
// 医院库存ERP系统 - 批量导入平台主入口
// ==========================================
// 依据: 批量导入平台设计文档
// 用途: 命令行方式驱动导入管道(模板下载/文件校验/导入/撤销)
// ==========================================

use his_import::config::ImportSettings;
use his_import::{
    DrugImportModule, ImportApi, ImportHistoryRepositoryImpl, ImportOptions, ImportPipeline,
    InMemorySessionStore, JobStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// 默认数据目录: <系统数据目录>/his-import
///
/// 业务库与历史库分文件存放: 任务事务持有业务库写锁期间,
/// 进度更新仍可写入历史库
fn get_default_db_paths() -> (String, String) {
    let mut dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("his-import");
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(error = %e, "数据目录创建失败,回退到当前目录");
        dir = PathBuf::from(".");
    }
    let db_path = dir.join("his_import.db").to_string_lossy().to_string();
    let history_db_path = dir
        .join("his_import_history.db")
        .to_string_lossy()
        .to_string();
    (db_path, history_db_path)
}

fn print_usage() {
    println!("用法:");
    println!("  his-import template <csv|xlsx> [输出文件]");
    println!("  his-import import <数据文件.csv|.xlsx>");
    println!();
    println!("当前内置模块: drug_catalog (药品目录)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    his_import::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", his_import::APP_NAME);
    tracing::info!("系统版本: {}", his_import::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let (db_path, history_db_path) = get_default_db_paths();
    tracing::info!("使用业务数据库: {}", db_path);
    tracing::info!("使用历史数据库: {}", history_db_path);

    // 组装导入管道: 药品目录模块 + 内存会话 + SQLite 历史
    let policy = Arc::new(DrugImportModule::new(&db_path)?);
    let sessions = Arc::new(InMemorySessionStore::new());
    let history = Arc::new(ImportHistoryRepositoryImpl::new(&history_db_path)?);
    let pipeline = Arc::new(ImportPipeline::new(
        policy,
        sessions,
        history,
        ImportSettings::from_env(),
    ));
    let api = ImportApi::new(Arc::clone(&pipeline));

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(|s| s.as_str()) {
        Some("template") => {
            let format = args.get(1).map(|s| s.as_str()).unwrap_or("csv");
            let download = api.get_template(format)?;
            let out = args
                .get(2)
                .cloned()
                .unwrap_or_else(|| download.file_name.clone());
            std::fs::write(&out, &download.bytes)?;
            tracing::info!(file = %out, bytes = download.bytes.len(), "模板已生成");
        }
        Some("import") => {
            let file = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("缺少数据文件参数"))?;
            let format = if file.to_lowercase().ends_with(".csv") {
                "csv"
            } else {
                "xlsx"
            };
            let buffer = std::fs::read(file)?;

            // 校验并创建会话
            let validation = api.validate_file(&buffer, file, format, Some("cli")).await?;
            tracing::info!(
                session_id = %validation.session_id,
                total = validation.stats.total_rows,
                valid = validation.stats.valid_rows,
                errors = validation.errors.len(),
                warnings = validation.warnings.len(),
                "文件校验完成"
            );
            for issue in validation.errors.iter().take(20) {
                tracing::error!(row = issue.row, field = %issue.field, "{}", issue.message);
            }
            if !validation.can_proceed {
                anyhow::bail!("校验未通过,已中止(修正数据后重试)");
            }

            // 启动导入并轮询状态
            let started = pipeline
                .import_data(
                    &validation.session_id,
                    ImportOptions::default(),
                    Some("cli"),
                    Some("命令行导入"),
                )
                .await?;
            tracing::info!(job_id = %started.job_id, "导入任务已启动");

            loop {
                tokio::time::sleep(Duration::from_millis(200)).await;
                let status = pipeline.get_import_status(&started.job_id).await?;
                tracing::info!(
                    status = %status.status,
                    percent = status.progress.percent_complete,
                    imported = status.progress.imported_rows,
                    "导入进度"
                );
                if status.status.is_terminal() {
                    if status.status != JobStatus::Completed {
                        anyhow::bail!(
                            "导入失败: {}",
                            status.error.unwrap_or_else(|| "未知错误".to_string())
                        );
                    }
                    tracing::info!(
                        imported = status.progress.imported_rows,
                        "导入完成"
                    );
                    break;
                }
            }
        }
        _ => print_usage(),
    }

    Ok(())
}
