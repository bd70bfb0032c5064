// ==========================================
// 医院库存ERP系统 - 业务导入模块层
// ==========================================
// 职责: 各业务域对 ImportModulePolicy 的具体实现
// ==========================================

pub mod drug_import;

pub use drug_import::DrugImportModule;
