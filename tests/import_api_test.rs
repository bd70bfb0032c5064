// ==========================================
// 导入接口集成测试
// ==========================================
// 测试目标: DTO 契约(camelCase)、模板回灌、错误映射
// ==========================================

mod test_helpers;

use his_import::api::{ApiErrorKind, ImportApi, ImportOptionsDto, StartImportRequest};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::*;

fn create_test_api(db_path: &str) -> ImportApi {
    ImportApi::new(create_test_pipeline(db_path))
}

// ==========================================
// 模板
// ==========================================

#[tokio::test]
async fn test_csv_template_roundtrip_validates_clean() {
    let (_db, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    let download = api.get_template("csv").unwrap();
    assert_eq!(download.file_name, "drug_catalog_template.csv");
    assert!(download.content_type.starts_with("text/csv"));

    // 模板自带示例行与 # 说明行,原样回灌应零错误
    let result = api
        .validate_file(&download.bytes, &download.file_name, "csv", None)
        .await
        .unwrap();
    assert!(result.is_valid, "模板示例行应通过校验: {:?}", result.errors);
    assert_eq!(result.stats.total_rows, 1);
}

#[tokio::test]
async fn test_excel_template_roundtrip_validates_clean() {
    let (_db, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    let download = api.get_template("xlsx").unwrap();
    assert_eq!(download.file_name, "drug_catalog_template.xlsx");

    let result = api
        .validate_file(&download.bytes, &download.file_name, "xlsx", None)
        .await
        .unwrap();
    assert!(result.is_valid, "模板示例行应通过校验: {:?}", result.errors);
    assert_eq!(result.stats.total_rows, 1);
}

#[tokio::test]
async fn test_template_unknown_format_is_bad_request() {
    let (_db, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    let err = api.get_template("pdf").unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::BadRequest);
}

// ==========================================
// 全流程(接口形态)
// ==========================================

#[tokio::test]
async fn test_api_full_flow_with_camel_case_contract() {
    let (_db, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    // 校验
    let validation = api
        .validate_file(&drug_csv_n(10), "drugs.csv", "csv", Some("张药师"))
        .await
        .unwrap();
    assert!(validation.can_proceed);
    assert_eq!(validation.stats.total_rows, 10);

    // 校验响应字段为 camelCase
    let json = serde_json::to_value(&validation).unwrap();
    assert!(json.get("sessionId").is_some());
    assert!(json.get("canProceed").is_some());
    assert!(json["stats"].get("totalRows").is_some());
    assert!(json.get("expiresAt").is_some());

    // 启动导入(请求 DTO 同样 camelCase)
    let request: StartImportRequest = serde_json::from_value(serde_json::json!({
        "sessionId": validation.session_id,
        "options": {"skipWarnings": false, "batchSize": 4, "onConflict": "error"}
    }))
    .unwrap();
    let started = api
        .start_import(request, Some("u-1"), Some("张药师"))
        .await
        .unwrap();
    assert_eq!(started.status, "pending");

    // 轮询直到终态
    let mut status = api.get_import_status(&started.job_id).await.unwrap();
    for _ in 0..250 {
        if status.status == "completed" || status.status == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        status = api.get_import_status(&started.job_id).await.unwrap();
    }
    assert_eq!(status.status, "completed");
    assert_eq!(status.progress.imported_rows, 10);
    assert_eq!(status.progress.percent_complete, 100);

    let json = serde_json::to_value(&status).unwrap();
    assert!(json.get("jobId").is_some());
    assert!(json["progress"].get("percentComplete").is_some());
    assert!(json.get("estimatedCompletion").is_some());

    // 历史条目携带操作者
    let history = api.get_import_history(10).await.unwrap();
    let item = history
        .iter()
        .find(|h| h.job_id == started.job_id)
        .expect("历史应包含该任务");
    assert_eq!(item.module, "drug_catalog");
    assert_eq!(item.records_imported, 10);
    assert_eq!(item.imported_by.name.as_deref(), Some("张药师"));
    let json = serde_json::to_value(item).unwrap();
    assert!(json.get("recordsImported").is_some());
    assert!(json["importedBy"].get("name").is_some());

    // 撤销
    assert!(api.can_rollback(&started.job_id).await.unwrap());
    let rollback = api.rollback_import(&started.job_id).await.unwrap();
    assert_eq!(rollback.status, "rolled_back");
    assert_eq!(count_drug_rows(&db_path), 0);
}

// ==========================================
// 错误映射
// ==========================================

#[tokio::test]
async fn test_api_error_kinds() {
    let (_db, db_path) = create_test_db().unwrap();
    let api = create_test_api(&db_path);

    // 不支持的上传格式 → 400
    let err = api
        .validate_file(b"a,b\n1,2\n", "drugs.pdf", "pdf", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::BadRequest);

    // 未知任务 → 404
    let err = api.get_import_status("no-such-job").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::NotFound);
    assert_eq!(err.kind.status_code(), 404);

    // 未知会话 → 404
    let request = StartImportRequest {
        session_id: "no-such-session".to_string(),
        options: ImportOptionsDto::default(),
    };
    let err = api.start_import(request, None, None).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::NotFound);

    // 校验阻断 → 422,且被拒绝的请求不烧掉会话
    let validation = api
        .validate_file(
            &drug_csv(&[drug_csv_row("BAD", "坏编码"), drug_csv_row("D9001", "好行")]),
            "drugs.csv",
            "csv",
            None,
        )
        .await
        .unwrap();
    assert!(!validation.can_proceed);
    let request = StartImportRequest {
        session_id: validation.session_id.clone(),
        options: ImportOptionsDto::default(),
    };
    let err = api.start_import(request, None, None).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::UnprocessableEntity);

    // 同一会话改用 skipWarnings 重试仍可导入有效子集
    let request = StartImportRequest {
        session_id: validation.session_id.clone(),
        options: ImportOptionsDto {
            skip_warnings: true,
            batch_size: None,
            on_conflict: None,
        },
    };
    let started = api.start_import(request, None, None).await.unwrap();
    assert_eq!(started.status, "pending");

    // 会话已被消费,再次使用 → 409
    let request = StartImportRequest {
        session_id: validation.session_id,
        options: ImportOptionsDto {
            skip_warnings: true,
            batch_size: None,
            on_conflict: None,
        },
    };
    let err = api.start_import(request, None, None).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Conflict);
}
