// ==========================================
// 医院库存ERP系统 - 药品目录导入模块
// ==========================================
// 依据: 批量导入平台设计文档 - Module Import Policy
// 职责: 药品目录(drug_catalog)的列定义/业务校验/落库/撤销
// 撤销: 落库行打 import_job_id 标记,按标记删除
// ==========================================

use crate::domain::column::ColumnDef;
use crate::domain::row::ParsedRow;
use crate::domain::types::{ColumnType, ConflictPolicy};
use crate::domain::validation::ValidationIssue;
use crate::importer::column_rules::ColumnRuleValidator;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::module_policy::{ImportModulePolicy, ImportUnitOfWork};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub const MODULE_NAME: &str = "drug_catalog";

// ===== 业务校验机器码 =====
pub const CODE_DUPLICATE_CODE: &str = "DUPLICATE_CODE";
pub const CODE_DUPLICATE_IN_FILE: &str = "DUPLICATE_IN_FILE";
pub const CODE_PRICE_ZERO: &str = "PRICE_ZERO";

/// 药品目录列定义(模板/映射/校验共用)
fn drug_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("drug_code", ColumnType::String)
            .display("药品编码")
            .required()
            .length(Some(4), Some(20))
            .pattern(r"^D\d{4,}$")
            .example("D1001"),
        ColumnDef::new("drug_name", ColumnType::String)
            .display("药品名称")
            .required()
            .length(Some(1), Some(100))
            .example("阿莫西林胶囊"),
        ColumnDef::new("dosage_form", ColumnType::String)
            .display("剂型")
            .required()
            .allowed(&["片剂", "胶囊", "注射剂", "颗粒剂", "口服液"]),
        ColumnDef::new("specification", ColumnType::String)
            .display("规格")
            .length(None, Some(50))
            .example("0.25g*24粒"),
        ColumnDef::new("unit", ColumnType::String)
            .display("单位")
            .required()
            .allowed(&["盒", "瓶", "支", "袋"]),
        ColumnDef::new("unit_price", ColumnType::Number)
            .display("单价(元)")
            .required()
            .range(Some(0.0), Some(100_000.0))
            .example("12.50"),
        ColumnDef::new("reorder_point", ColumnType::Number)
            .display("补货点")
            .range(Some(0.0), Some(1_000_000.0))
            .example("50"),
        ColumnDef::new("controlled_flag", ColumnType::Boolean)
            .display("管控药品")
            .example("false"),
        ColumnDef::new("approval_number", ColumnType::String)
            .display("批准文号")
            .pattern(r"^国药准字[HZSJ]\d{8}$")
            .example("国药准字H12345678"),
        ColumnDef::new("launch_date", ColumnType::Date).display("启用日期"),
    ]
}

// ==========================================
// DrugImportModule
// ==========================================
pub struct DrugImportModule {
    db_path: String,
    columns: Vec<ColumnDef>,
    rules: ColumnRuleValidator,
    // 校验期存在性查询用的共享连接(任务事务走独立连接)
    lookup_conn: Arc<Mutex<Connection>>,
}

impl DrugImportModule {
    /// 创建模块实例并确保目标表存在
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let columns = drug_columns();
        let rules = ColumnRuleValidator::new(&columns)
            .map_err(|e| ImportError::InternalError(format!("列定义正则非法: {}", e)))?;

        let conn = crate::db::open_sqlite_connection(db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            db_path: db_path.to_string(),
            columns,
            rules,
            lookup_conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> ImportResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS drug_catalog (
                drug_code       TEXT PRIMARY KEY,
                drug_name       TEXT NOT NULL,
                dosage_form     TEXT NOT NULL,
                specification   TEXT,
                unit            TEXT NOT NULL,
                unit_price      REAL NOT NULL,
                reorder_point   REAL,
                controlled_flag INTEGER NOT NULL DEFAULT 0,
                approval_number TEXT,
                launch_date     TEXT,
                import_job_id   TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_drug_catalog_import_job
                ON drug_catalog (import_job_id);
            "#,
        )?;
        Ok(())
    }

    /// drug_code 是否已存在于目录
    fn code_exists(&self, code: &str) -> ImportResult<bool> {
        let conn = self
            .lookup_conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("连接锁获取失败: {}", e)))?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(1) FROM drug_catalog WHERE drug_code = ?1",
            params![code],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[async_trait]
impl ImportModulePolicy for DrugImportModule {
    fn module_name(&self) -> &str {
        MODULE_NAME
    }

    fn template_columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    fn supports_rollback(&self) -> bool {
        true
    }

    /// 业务校验 = 通用列约束 + 药品目录规则
    async fn validate_row(
        &self,
        row: &ParsedRow,
        row_number: usize,
    ) -> ImportResult<Vec<ValidationIssue>> {
        let mut issues = self.rules.validate_row(row, row_number);

        // 目录已有同编码 → WARNING(按冲突策略处理,不阻断)
        if let Some(code) = row.get("drug_code").as_text() {
            if self.code_exists(&code)? {
                issues.push(ValidationIssue::warning(
                    row_number,
                    "drug_code",
                    CODE_DUPLICATE_CODE,
                    format!("药品编码 {} 已存在于目录,导入时按冲突策略处理", code),
                ));
            }
        }

        // 零单价 → WARNING(允许,但通常是漏填)
        if row.get("unit_price").as_number() == Some(0.0) {
            issues.push(ValidationIssue::warning(
                row_number,
                "unit_price",
                CODE_PRICE_ZERO,
                "单价为 0,请确认是否漏填".to_string(),
            ));
        }

        Ok(issues)
    }

    /// 文件内重复编码 → WARNING(update 策略下后行覆盖前行是合法用法,
    /// error 策略下将在落库时失败)
    async fn validate_rows(&self, rows: &[ParsedRow]) -> ImportResult<Vec<ValidationIssue>> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut issues = Vec::new();
        for row in rows {
            let Some(code) = row.get("drug_code").as_text() else {
                continue;
            };
            match seen.get(&code) {
                Some(first_row) => issues.push(ValidationIssue::warning(
                    row.row_number,
                    "drug_code",
                    CODE_DUPLICATE_IN_FILE,
                    format!("药品编码 {} 与第 {} 行重复", code, first_row),
                )),
                None => {
                    seen.insert(code, row.row_number);
                }
            }
        }
        Ok(issues)
    }

    /// 开启任务事务: 独立连接 + BEGIN IMMEDIATE
    async fn begin_import(&self, job_id: &str) -> ImportResult<Box<dyn ImportUnitOfWork>> {
        let conn = crate::db::open_sqlite_connection(&self.db_path)?;
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
        debug!(job_id = %job_id, "药品目录导入事务已开启");
        Ok(Box::new(DrugImportUnitOfWork {
            conn,
            job_id: job_id.to_string(),
        }))
    }

    /// 撤销: 删除该任务标记的全部落库行
    async fn rollback_job(&self, job_id: &str) -> ImportResult<u64> {
        let conn = self
            .lookup_conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("连接锁获取失败: {}", e)))?;
        let removed = conn.execute(
            "DELETE FROM drug_catalog WHERE import_job_id = ?1",
            params![job_id],
        )?;
        Ok(removed as u64)
    }
}

// ==========================================
// DrugImportUnitOfWork - 一个任务一个事务
// ==========================================
struct DrugImportUnitOfWork {
    conn: Connection,
    job_id: String,
}

#[async_trait]
impl ImportUnitOfWork for DrugImportUnitOfWork {
    async fn insert_batch(
        &mut self,
        rows: &[ParsedRow],
        on_conflict: ConflictPolicy,
    ) -> ImportResult<usize> {
        // update 策略以整行替换消解冲突;skip/error 让约束冲突原样上抛,
        // 由执行器按策略决定跳过批次还是中止任务
        let sql = match on_conflict {
            ConflictPolicy::Update => {
                r#"
                INSERT OR REPLACE INTO drug_catalog (
                    drug_code, drug_name, dosage_form, specification, unit,
                    unit_price, reorder_point, controlled_flag, approval_number,
                    launch_date, import_job_id, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#
            }
            ConflictPolicy::Skip | ConflictPolicy::Error => {
                r#"
                INSERT INTO drug_catalog (
                    drug_code, drug_name, dosage_form, specification, unit,
                    unit_price, reorder_point, controlled_flag, approval_number,
                    launch_date, import_job_id, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#
            }
        };

        // 批次级保存点: 批次中途失败时整批撤回,
        // skip 策略下不会把半个批次留在任务事务里
        self.conn
            .execute_batch("SAVEPOINT batch_insert")
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        let now = Utc::now();
        let inserted = (|| -> ImportResult<usize> {
            let mut stmt = self
                .conn
                .prepare(sql)
                .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

            let mut count = 0usize;
            for row in rows {
                stmt.execute(params![
                    row.get("drug_code").as_text(),
                    row.get("drug_name").as_text(),
                    row.get("dosage_form").as_text(),
                    row.get("specification").as_text(),
                    row.get("unit").as_text(),
                    row.get("unit_price").as_number(),
                    row.get("reorder_point").as_number(),
                    row.get("controlled_flag").as_boolean().unwrap_or(false) as i64,
                    row.get("approval_number").as_text(),
                    row.get("launch_date").as_date(),
                    self.job_id,
                    now,
                    now,
                ])?;
                count += 1;
            }
            Ok(count)
        })();

        match inserted {
            Ok(count) => {
                self.conn
                    .execute_batch("RELEASE batch_insert")
                    .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;
                Ok(count)
            }
            Err(e) => {
                self.conn
                    .execute_batch("ROLLBACK TO batch_insert; RELEASE batch_insert")
                    .map_err(|re| ImportError::DatabaseTransactionError(re.to_string()))?;
                Err(e)
            }
        }
    }

    async fn commit(self: Box<Self>) -> ImportResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> ImportResult<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))
    }
}
