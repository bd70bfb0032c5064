// ==========================================
// 医院库存ERP系统 - 导入配置
// ==========================================
// 职责: 导入管道运行参数(TTL/批次大小)
// 覆写: 环境变量优先于默认值
// ==========================================

use serde::{Deserialize, Serialize};
use std::env;

/// 会话有效期默认值(分钟)
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

/// 默认批次大小
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// UI 层惯例批次大小集合(仅作前端选项,执行器接受任意正整数)
pub const CONVENTIONAL_BATCH_SIZES: [usize; 4] = [50, 100, 500, 1000];

// ==========================================
// 配置键(环境变量)
// ==========================================
pub mod config_keys {
    /// 会话有效期(分钟)
    pub const SESSION_TTL_MINUTES: &str = "HIS_IMPORT_SESSION_TTL_MINUTES";
    /// 默认批次大小
    pub const DEFAULT_BATCH_SIZE: &str = "HIS_IMPORT_DEFAULT_BATCH_SIZE";
}

// ==========================================
// ImportSettings - 导入管道运行参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    pub session_ttl_minutes: i64,
    pub default_batch_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            default_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ImportSettings {
    /// 从环境变量加载,缺失项取默认值
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(raw) = env::var(config_keys::SESSION_TTL_MINUTES) {
            if let Ok(minutes) = raw.trim().parse::<i64>() {
                if minutes > 0 {
                    settings.session_ttl_minutes = minutes;
                }
            }
        }

        if let Ok(raw) = env::var(config_keys::DEFAULT_BATCH_SIZE) {
            if let Ok(size) = raw.trim().parse::<usize>() {
                if size > 0 {
                    settings.default_batch_size = size;
                }
            }
        }

        settings
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ImportSettings::default();
        assert_eq!(settings.session_ttl_minutes, 30);
        assert_eq!(settings.default_batch_size, 100);
        assert_eq!(settings.session_ttl(), chrono::Duration::minutes(30));
    }

    #[test]
    fn test_default_batch_size_is_conventional() {
        assert!(CONVENTIONAL_BATCH_SIZES.contains(&DEFAULT_BATCH_SIZE));
    }
}
