// ==========================================
// 医院库存ERP系统 - 配置层
// ==========================================
// 职责: 导入管道运行配置
// 覆写: 默认值 < 环境变量
// ==========================================

pub mod import_settings;

pub use import_settings::{
    config_keys, ImportSettings, CONVENTIONAL_BATCH_SIZES, DEFAULT_BATCH_SIZE,
    DEFAULT_SESSION_TTL_MINUTES,
};
