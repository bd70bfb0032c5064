// ==========================================
// 医院库存ERP系统 - 校验会话存储
// ==========================================
// 依据: 批量导入平台设计文档 - Validation Session Manager
// 红线: 会话是瞬态数据,绝不持久化
// 过期策略: 读取时惰性判定(不依赖墙钟定时器),
//           过期条目等价于不存在并即时清除
// ==========================================

use crate::domain::validation::ValidationSession;
use crate::importer::error::{ImportError, ImportResult};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

// ==========================================
// SessionStore Trait
// ==========================================
// 用途: 会话存储的可替换依赖(内存实现/外部缓存实现)
// 实现者: InMemorySessionStore
pub trait SessionStore: Send + Sync {
    /// 写入新会话
    fn put(&self, session: ValidationSession) -> ImportResult<()>;

    /// 读取会话(过期即不存在)
    fn get(&self, session_id: &str) -> ImportResult<Option<ValidationSession>>;

    /// 取出会话并标记已消费(单次消费语义,原子判定)
    ///
    /// # 返回
    /// - Ok(session): 首次消费,返回会话快照
    /// - Err(SessionNotFound): 不存在或已过期
    /// - Err(SessionConsumed): 已被先前的导入消费
    fn consume(&self, session_id: &str) -> ImportResult<ValidationSession>;

    /// 删除会话
    fn remove(&self, session_id: &str) -> ImportResult<()>;

    /// 清理所有过期条目(维护钩子,非正确性依赖)
    fn purge_expired(&self) -> ImportResult<usize>;
}

// ==========================================
// InMemorySessionStore
// ==========================================
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, ValidationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn put(&self, session: ValidationSession) -> ImportResult<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ImportError::InternalError(format!("会话锁获取失败: {}", e)))?;
        debug!(session_id = %session.session_id, module = %session.module, "写入校验会话");
        sessions.insert(session.session_id.clone(), session);
        Ok(())
    }

    fn get(&self, session_id: &str) -> ImportResult<Option<ValidationSession>> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ImportError::InternalError(format!("会话锁获取失败: {}", e)))?;

        let now = Utc::now();
        match sessions.get(session_id) {
            Some(session) if session.is_expired(now) => {
                // 惰性过期: 读到即清除
                debug!(session_id = %session_id, "会话已过期,清除");
                sessions.remove(session_id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    fn consume(&self, session_id: &str) -> ImportResult<ValidationSession> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ImportError::InternalError(format!("会话锁获取失败: {}", e)))?;

        let now = Utc::now();
        let session = match sessions.get_mut(session_id) {
            Some(session) if session.is_expired(now) => {
                sessions.remove(session_id);
                return Err(ImportError::SessionNotFound(session_id.to_string()));
            }
            Some(session) => session,
            None => return Err(ImportError::SessionNotFound(session_id.to_string())),
        };

        if session.consumed {
            return Err(ImportError::SessionConsumed(session_id.to_string()));
        }
        session.consumed = true;
        Ok(session.clone())
    }

    fn remove(&self, session_id: &str) -> ImportResult<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ImportError::InternalError(format!("会话锁获取失败: {}", e)))?;
        sessions.remove(session_id);
        Ok(())
    }

    fn purge_expired(&self) -> ImportResult<usize> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ImportError::InternalError(format!("会话锁获取失败: {}", e)))?;

        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FileFormat;
    use crate::domain::validation::{ValidationReport, ValidationStats};
    use chrono::Duration;

    fn sample_session(session_id: &str, ttl_minutes: i64) -> ValidationSession {
        let now = Utc::now();
        ValidationSession {
            session_id: session_id.to_string(),
            module: "drug_catalog".to_string(),
            file_name: "drugs.csv".to_string(),
            file_format: FileFormat::Csv,
            file_size: 64,
            uploaded_at: now,
            expires_at: now + Duration::minutes(ttl_minutes),
            rows: vec![],
            report: ValidationReport {
                is_valid: true,
                can_proceed: true,
                errors: vec![],
                warnings: vec![],
                stats: ValidationStats::default(),
            },
            consumed: false,
            created_by: None,
        }
    }

    #[test]
    fn test_put_get_roundtrip() {
        let store = InMemorySessionStore::new();
        store.put(sample_session("s-1", 30)).unwrap();

        let session = store.get("s-1").unwrap().expect("会话应存在");
        assert_eq!(session.module, "drug_catalog");
        assert!(store.get("s-unknown").unwrap().is_none());
    }

    #[test]
    fn test_lazy_expiry_on_get() {
        let store = InMemorySessionStore::new();
        store.put(sample_session("s-expired", -1)).unwrap();

        // 过期条目读取即不存在,且被清除
        assert!(store.get("s-expired").unwrap().is_none());
        assert!(store
            .sessions
            .lock()
            .unwrap()
            .get("s-expired")
            .is_none());
    }

    #[test]
    fn test_consume_single_use() {
        let store = InMemorySessionStore::new();
        store.put(sample_session("s-1", 30)).unwrap();

        assert!(store.consume("s-1").is_ok());
        // 二次消费被拒绝
        assert!(matches!(
            store.consume("s-1"),
            Err(ImportError::SessionConsumed(_))
        ));
    }

    #[test]
    fn test_consume_expired_is_not_found() {
        let store = InMemorySessionStore::new();
        store.put(sample_session("s-old", -5)).unwrap();

        assert!(matches!(
            store.consume("s-old"),
            Err(ImportError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_purge_expired() {
        let store = InMemorySessionStore::new();
        store.put(sample_session("s-live", 30)).unwrap();
        store.put(sample_session("s-dead", -1)).unwrap();

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.get("s-live").unwrap().is_some());
    }
}
