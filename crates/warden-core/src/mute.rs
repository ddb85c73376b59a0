//! Per-group mute state: a group-wide flag plus individually muted members.
//!
//! Pure in-memory state for the process lifetime. A group absent from
//! either map behaves as not muted; operations never fail.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::domain::Jid;

#[derive(Default)]
struct MuteState {
    group_all: HashMap<String, bool>,
    individual: HashMap<String, HashSet<String>>,
}

#[derive(Default)]
pub struct MuteRegistry {
    inner: Mutex<MuteState>,
}

impl MuteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_group_muted(&self, group: &Jid, muted: bool) {
        let mut st = self.inner.lock().await;
        st.group_all.insert(group.0.clone(), muted);
    }

    pub async fn is_group_muted(&self, group: &Jid) -> bool {
        let st = self.inner.lock().await;
        st.group_all.get(&group.0).copied().unwrap_or(false)
    }

    pub async fn mute_member(&self, group: &Jid, member: &Jid) {
        let mut st = self.inner.lock().await;
        st.individual
            .entry(group.0.clone())
            .or_default()
            .insert(member.0.clone());
    }

    pub async fn unmute_member(&self, group: &Jid, member: &Jid) {
        let mut st = self.inner.lock().await;
        if let Some(set) = st.individual.get_mut(&group.0) {
            set.remove(&member.0);
        }
    }

    pub async fn is_member_muted(&self, group: &Jid, member: &Jid) -> bool {
        let st = self.inner.lock().await;
        st.individual
            .get(&group.0)
            .map(|set| set.contains(&member.0))
            .unwrap_or(false)
    }

    /// Drop all individual mutes for a group. The group-wide flag is a
    /// separate toggle and is cleared independently.
    pub async fn clear_group(&self, group: &Jid) {
        let mut st = self.inner.lock().await;
        st.individual.remove(&group.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Jid {
        Jid("room@g.us".into())
    }

    fn member(n: &str) -> Jid {
        Jid(format!("{n}@s.whatsapp.net"))
    }

    #[tokio::test]
    async fn unknown_group_defaults_to_unmuted() {
        let reg = MuteRegistry::new();
        assert!(!reg.is_group_muted(&group()).await);
        assert!(!reg.is_member_muted(&group(), &member("200")).await);
    }

    #[tokio::test]
    async fn mute_and_unmute_member_round_trip() {
        let reg = MuteRegistry::new();
        reg.mute_member(&group(), &member("200")).await;
        assert!(reg.is_member_muted(&group(), &member("200")).await);
        assert!(!reg.is_member_muted(&group(), &member("300")).await);

        reg.unmute_member(&group(), &member("200")).await;
        assert!(!reg.is_member_muted(&group(), &member("200")).await);
    }

    #[tokio::test]
    async fn clear_group_leaves_group_wide_flag_alone() {
        let reg = MuteRegistry::new();
        reg.set_group_muted(&group(), true).await;
        reg.mute_member(&group(), &member("200")).await;

        reg.clear_group(&group()).await;
        assert!(!reg.is_member_muted(&group(), &member("200")).await);
        assert!(reg.is_group_muted(&group()).await);

        reg.set_group_muted(&group(), false).await;
        assert!(!reg.is_group_muted(&group()).await);
    }
}
