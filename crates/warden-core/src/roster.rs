//! Group roster cache + role resolution.
//!
//! One timestamped snapshot per group, refreshed when older than the
//! freshness window or explicitly invalidated. Role questions are always
//! answered from a fresh snapshot; if the external fetch fails the answer
//! is "unknown", which every caller treats as not-admin (fail closed).

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{
    domain::{Jid, RosterSnapshot},
    errors::Error,
    ports::ChatClient,
    Result,
};

struct CachedRoster {
    snapshot: Arc<RosterSnapshot>,
    fetched_at: Instant,
}

pub struct RosterCache {
    client: Arc<dyn ChatClient>,
    ttl: Duration,
    inner: Mutex<HashMap<String, CachedRoster>>,
}

impl RosterCache {
    pub fn new(client: Arc<dyn ChatClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Current snapshot for `group`, fetching if absent or expired.
    ///
    /// Concurrent misses may issue redundant fetches; the entry is replaced
    /// whole, so readers never observe a partial snapshot. A stale snapshot
    /// is never served after a failed refresh — callers get the error and
    /// must treat the role question as unknown.
    pub async fn get(&self, group: &Jid) -> Result<Arc<RosterSnapshot>> {
        {
            let map = self.inner.lock().await;
            if let Some(cached) = map.get(&group.0) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.snapshot.clone());
                }
            }
        }

        let snapshot = self
            .client
            .fetch_roster(group)
            .await
            .map(Arc::new)
            .map_err(|e| Error::RosterUnavailable {
                group: group.0.clone(),
                reason: e.to_string(),
            })?;

        let mut map = self.inner.lock().await;
        map.insert(
            group.0.clone(),
            CachedRoster {
                snapshot: snapshot.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(snapshot)
    }

    /// Evict the cached snapshot; the next `get` refetches.
    ///
    /// Called on every membership-change event so a known-changed roster is
    /// never served from cache.
    pub async fn invalidate(&self, group: &Jid) {
        let mut map = self.inner.lock().await;
        map.remove(&group.0);
    }

    /// Does the bot itself hold admin rights in `group`?
    ///
    /// The bot's identity can appear in the roster under its linked-device
    /// form or its phone-number form; both are checked.
    pub async fn is_bot_admin(&self, group: &Jid) -> bool {
        let snapshot = match self.get(group).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[ROSTER] is_bot_admin failed for {group}: {e}");
                return false;
            }
        };

        let identity = self.client.identity();
        snapshot
            .members
            .iter()
            .find(|m| identity.matches(&m.jid))
            .map(|m| m.role.is_admin())
            .unwrap_or(false)
    }

    /// Does `member` hold admin rights in `group`? Fails closed like
    /// [`RosterCache::is_bot_admin`].
    pub async fn is_member_admin(&self, group: &Jid, member: &Jid) -> bool {
        let snapshot = match self.get(group).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[ROSTER] is_member_admin failed for {group}: {e}");
                return false;
            }
        };

        snapshot
            .member_by_identity(member.normalized())
            .map(|m| m.role.is_admin())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageKey, Role, RosterMember};
    use crate::events::MembershipAction;
    use crate::ports::{BotIdentity, SendOptions};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeClient {
        fetches: AtomicUsize,
        fail: AtomicBool,
        members: Vec<RosterMember>,
    }

    impl FakeClient {
        fn with_members(members: Vec<RosterMember>) -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                members,
            }
        }

        fn fetch_calls(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatClient for FakeClient {
        fn identity(&self) -> BotIdentity {
            BotIdentity {
                device: Some(Jid("42@lid".into())),
                phone: Jid("100:3@s.whatsapp.net".into()),
            }
        }

        async fn fetch_roster(&self, group: &Jid) -> Result<RosterSnapshot> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Delivery("socket closed".to_string()));
            }
            Ok(RosterSnapshot {
                group: group.clone(),
                members: self.members.clone(),
            })
        }

        async fn send_text(&self, _to: &Jid, _text: &str, _opts: SendOptions) -> Result<()> {
            Ok(())
        }

        async fn delete_message(&self, _key: &MessageKey) -> Result<()> {
            Ok(())
        }

        async fn update_membership(
            &self,
            _group: &Jid,
            _members: &[Jid],
            _action: MembershipAction,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn member(jid: &str, role: Role) -> RosterMember {
        RosterMember {
            jid: Jid(jid.into()),
            role,
        }
    }

    fn group() -> Jid {
        Jid("room@g.us".into())
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_snapshot_served_without_refetch() {
        let client = Arc::new(FakeClient::with_members(vec![]));
        let cache = RosterCache::new(client.clone(), Duration::from_secs(300));

        cache.get(&group()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        cache.get(&group()).await.unwrap();
        assert_eq!(client.fetch_calls(), 1);

        tokio::time::sleep(Duration::from_secs(301)).await;
        cache.get(&group()).await.unwrap();
        assert_eq!(client.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let client = Arc::new(FakeClient::with_members(vec![]));
        let cache = RosterCache::new(client.clone(), Duration::from_secs(300));

        cache.get(&group()).await.unwrap();
        cache.invalidate(&group()).await;
        cache.get(&group()).await.unwrap();
        assert_eq!(client.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_fails_role_questions_closed() {
        let client = Arc::new(FakeClient::with_members(vec![member(
            "100@s.whatsapp.net",
            Role::Admin,
        )]));
        client.fail.store(true, Ordering::SeqCst);
        let cache = RosterCache::new(client.clone(), Duration::from_secs(300));

        assert!(matches!(
            cache.get(&group()).await,
            Err(Error::RosterUnavailable { .. })
        ));
        assert!(!cache.is_bot_admin(&group()).await);
        assert!(
            !cache
                .is_member_admin(&group(), &Jid("100@s.whatsapp.net".into()))
                .await
        );
    }

    #[tokio::test]
    async fn bot_admin_matches_either_identity_form() {
        // Roster lists the bot under its linked-device form only.
        let client = Arc::new(FakeClient::with_members(vec![
            member("42@lid", Role::SuperAdmin),
            member("200@s.whatsapp.net", Role::Regular),
        ]));
        let cache = RosterCache::new(client.clone(), Duration::from_secs(300));

        assert!(cache.is_bot_admin(&group()).await);
        assert!(
            !cache
                .is_member_admin(&group(), &Jid("200:1@s.whatsapp.net".into()))
                .await
        );
    }

    #[tokio::test]
    async fn member_admin_normalizes_device_suffix() {
        let client = Arc::new(FakeClient::with_members(vec![member(
            "200@s.whatsapp.net",
            Role::Admin,
        )]));
        let cache = RosterCache::new(client, Duration::from_secs(300));

        assert!(
            cache
                .is_member_admin(&group(), &Jid("200:7@s.whatsapp.net".into()))
                .await
        );
    }
}
