//! Bounded recent-message log backing anti-delete recovery.
//!
//! Keyed by message id, FIFO-evicted at capacity, and flushed to a single
//! JSON file after every mutation so brief process restarts keep the
//! recoverable window. Persistence is best-effort by design: a write
//! failure is logged and dropped, and an unreadable file loads as empty.

use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{domain::MessageId, events::MessageEvent, utils::iso_timestamp_utc};

/// Recoverable content of one observed message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMessage {
    pub body: String,
    pub chat: String,
    pub sender: String,
    pub sender_name: String,
}

#[derive(Default)]
struct LogInner {
    entries: HashMap<String, CachedMessage>,
    /// Insertion order; front is the oldest (next to evict).
    order: VecDeque<String>,
}

pub struct RecentMessageLog {
    path: PathBuf,
    capacity: usize,
    inner: Mutex<LogInner>,
}

#[derive(Serialize, Deserialize)]
struct PersistedLog {
    saved_at: String,
    entries: Vec<PersistedEntry>,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    id: String,
    #[serde(flatten)]
    message: CachedMessage,
}

impl RecentMessageLog {
    /// Open the log, rehydrating from `path` if a readable file exists.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let inner = load_persisted(&path);
        Self {
            path,
            capacity,
            inner: Mutex::new(inner),
        }
    }

    /// Record a qualifying inbound message: non-empty text body, not sent
    /// by the bot itself. At capacity, the oldest entry is evicted first.
    pub async fn observe(&self, msg: &MessageEvent) {
        if msg.from_self || msg.body.trim().is_empty() {
            return;
        }

        let entry = CachedMessage {
            body: msg.body.clone(),
            chat: msg.chat.0.clone(),
            sender: msg.sender.0.clone(),
            sender_name: msg.sender_name.clone(),
        };

        let mut inner = self.inner.lock().await;
        if inner.entries.insert(msg.id.0.clone(), entry).is_none() {
            inner.order.push_back(msg.id.0.clone());
        }
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        self.persist(&inner);
    }

    /// Read an entry without removing it.
    pub async fn recall(&self, id: &MessageId) -> Option<CachedMessage> {
        self.inner.lock().await.entries.get(&id.0).cloned()
    }

    /// Read and remove an entry, so a delete is reported at most once.
    pub async fn consume(&self, id: &MessageId) -> Option<CachedMessage> {
        let mut inner = self.inner.lock().await;
        let entry = inner.entries.remove(&id.0)?;
        inner.order.retain(|k| k != &id.0);
        self.persist(&inner);
        Some(entry)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.order.len()
    }

    fn persist(&self, inner: &LogInner) {
        let persisted = PersistedLog {
            saved_at: iso_timestamp_utc(),
            entries: inner
                .order
                .iter()
                .filter_map(|id| {
                    inner.entries.get(id).map(|m| PersistedEntry {
                        id: id.clone(),
                        message: m.clone(),
                    })
                })
                .collect(),
        };

        let write = serde_json::to_string(&persisted)
            .map_err(crate::Error::from)
            .and_then(|txt| std::fs::write(&self.path, txt).map_err(crate::Error::from));
        if let Err(e) = write {
            eprintln!("[MSGLOG] cache write failed: {e}");
        }
    }
}

fn load_persisted(path: &Path) -> LogInner {
    if !path.exists() {
        return LogInner::default();
    }

    let txt = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("[MSGLOG] cache unreadable, starting empty: {e}");
            return LogInner::default();
        }
    };
    if txt.trim().is_empty() {
        return LogInner::default();
    }

    let persisted: PersistedLog = match serde_json::from_str(&txt) {
        Ok(p) => p,
        Err(e) => {
            let err = crate::Error::CacheCorrupt(e.to_string());
            eprintln!("[MSGLOG] {err}, starting empty");
            return LogInner::default();
        }
    };

    let mut inner = LogInner::default();
    for pe in persisted.entries {
        if inner.entries.insert(pe.id.clone(), pe.message).is_none() {
            inner.order.push_back(pe.id);
        }
    }
    inner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Jid;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.json"))
    }

    fn msg(id: &str, body: &str) -> MessageEvent {
        MessageEvent {
            id: MessageId(id.to_string()),
            chat: Jid("room@g.us".into()),
            sender: Jid("200@s.whatsapp.net".into()),
            sender_name: "Bea".to_string(),
            from_self: false,
            body: body.to_string(),
            mentioned: None,
            revokes: None,
        }
    }

    #[tokio::test]
    async fn evicts_oldest_beyond_capacity() {
        let log = RecentMessageLog::open(tmp_file("warden-msglog-fifo"), 500);
        for i in 0..501 {
            log.observe(&msg(&format!("m{i}"), "hello")).await;
        }

        assert_eq!(log.len().await, 500);
        assert!(log.recall(&MessageId("m0".into())).await.is_none());
        assert!(log.recall(&MessageId("m1".into())).await.is_some());
        assert!(log.recall(&MessageId("m500".into())).await.is_some());
    }

    #[tokio::test]
    async fn consume_is_exactly_once() {
        let log = RecentMessageLog::open(tmp_file("warden-msglog-consume"), 500);
        log.observe(&msg("m1", "secret")).await;

        let first = log.consume(&MessageId("m1".into())).await;
        assert_eq!(first.map(|e| e.body), Some("secret".to_string()));
        assert!(log.consume(&MessageId("m1".into())).await.is_none());
    }

    #[tokio::test]
    async fn skips_self_and_bodyless_messages() {
        let log = RecentMessageLog::open(tmp_file("warden-msglog-skip"), 500);

        let mut own = msg("m1", "mine");
        own.from_self = true;
        log.observe(&own).await;
        log.observe(&msg("m2", "   ")).await;

        assert_eq!(log.len().await, 0);
    }

    #[tokio::test]
    async fn duplicate_id_replaces_without_growing() {
        let log = RecentMessageLog::open(tmp_file("warden-msglog-dup"), 500);
        log.observe(&msg("m1", "first")).await;
        log.observe(&msg("m1", "edited")).await;

        assert_eq!(log.len().await, 1);
        let entry = log.recall(&MessageId("m1".into())).await.unwrap();
        assert_eq!(entry.body, "edited");
    }

    #[tokio::test]
    async fn rehydrates_from_disk_preserving_order() {
        let path = tmp_file("warden-msglog-rehydrate");
        {
            let log = RecentMessageLog::open(&path, 3);
            log.observe(&msg("m1", "one")).await;
            log.observe(&msg("m2", "two")).await;
            log.observe(&msg("m3", "three")).await;
        }

        let log = RecentMessageLog::open(&path, 3);
        assert_eq!(log.len().await, 3);

        // m1 is still the oldest and gets evicted by the next insert.
        log.observe(&msg("m4", "four")).await;
        assert!(log.recall(&MessageId("m1".into())).await.is_none());
        assert!(log.recall(&MessageId("m2".into())).await.is_some());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty() {
        let path = tmp_file("warden-msglog-corrupt");
        std::fs::write(&path, "{not json").unwrap();

        let log = RecentMessageLog::open(&path, 500);
        assert_eq!(log.len().await, 0);

        // Still usable afterwards.
        log.observe(&msg("m1", "hello")).await;
        assert!(log.recall(&MessageId("m1".into())).await.is_some());

        let _ = std::fs::remove_file(&path);
    }
}
