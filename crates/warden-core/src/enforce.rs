//! Enforcement engine: turns inbound events into moderation actions.
//!
//! Evaluation order per message is fixed and short-circuiting: delete
//! recovery, then link enforcement, then mute enforcement. Membership
//! changes and batch deletes arrive as separate events. Delivery failures
//! never abort an event — every outbound call is logged and dropped on
//! error, and the engine runs the current event to completion.

use std::sync::Arc;

use regex::Regex;

use crate::{
    config::Config,
    domain::{Jid, MessageKey},
    errors::Error,
    events::{DeleteNotification, MembershipAction, MembershipUpdate, MessageEvent},
    msglog::RecentMessageLog,
    mute::MuteRegistry,
    ports::{ChatClient, SendOptions},
    roster::RosterCache,
    Result,
};

/// Generic web links plus platform invite links, permissive on purpose.
const LINK_PATTERN: &str = r"(?i)(?:https?://|www\.)\S+|chat\.whatsapp\.com/\S+";

const LINK_TAUNT: &str = "404 Page Not Found! Are you happy now? 😂";

pub struct Enforcer {
    cfg: Arc<Config>,
    client: Arc<dyn ChatClient>,
    roster: Arc<RosterCache>,
    log: Arc<RecentMessageLog>,
    mutes: Arc<MuteRegistry>,
    link_re: Regex,
}

impl Enforcer {
    pub fn new(
        cfg: Arc<Config>,
        client: Arc<dyn ChatClient>,
        roster: Arc<RosterCache>,
        log: Arc<RecentMessageLog>,
        mutes: Arc<MuteRegistry>,
    ) -> Result<Self> {
        let link_re = Regex::new(LINK_PATTERN)
            .map_err(|e| Error::Config(format!("bad link pattern: {e}")))?;
        Ok(Self {
            cfg,
            client,
            roster,
            log,
            mutes,
            link_re,
        })
    }

    /// Process one inbound message.
    ///
    /// Returns `true` when link enforcement consumed the message, so the
    /// dispatcher suppresses any further command fallthrough for it.
    pub async fn on_message(&self, msg: &MessageEvent) -> bool {
        self.log.observe(msg).await;

        if msg.revokes.is_some() {
            self.recover_revoked(msg).await;
            return false;
        }

        if self.enforce_links(msg).await {
            return true;
        }

        self.enforce_mute(msg).await;
        false
    }

    /// Membership changed: drop the cached roster first, then notify.
    pub async fn on_membership_change(&self, update: &MembershipUpdate) {
        self.roster.invalidate(&update.group).await;

        let template = match update.action {
            MembershipAction::Add if self.cfg.welcome_enabled => &self.cfg.welcome_message,
            MembershipAction::Remove | MembershipAction::Leave if self.cfg.goodbye_enabled => {
                &self.cfg.goodbye_message
            }
            _ => return,
        };

        for member in &update.members {
            let text = template.replace("{name}", &format!("@{}", member.normalized()));
            self.try_send(
                &update.group,
                &text,
                SendOptions::mentioning(member.clone()),
            )
            .await;
        }
    }

    /// Externally delivered batch delete: report recovered content to the
    /// owner. Recovery is best-effort — an already-evicted id is a no-op.
    pub async fn on_delete_notification(&self, ev: &DeleteNotification) {
        if !self.cfg.anti_delete {
            return;
        }

        let owner = self.cfg.owner_jid();
        for key in &ev.keys {
            if key.from_self {
                continue;
            }
            let Some(entry) = self.log.consume(&key.id).await else {
                continue;
            };
            let deleter = Jid(entry.sender.clone());
            let text = format!(
                "🕵️ @{} deleted \"{}\" I saw it 👀",
                deleter.normalized(),
                entry.body
            );
            self.try_send(&owner, &text, SendOptions::default()).await;
        }
    }

    /// Self-observed delete marker: tell the original sender directly.
    async fn recover_revoked(&self, msg: &MessageEvent) {
        if !self.cfg.anti_delete {
            return;
        }
        let Some(revoked) = &msg.revokes else {
            return;
        };
        let Some(entry) = self.log.consume(revoked).await else {
            return;
        };

        let text = format!("You deleted \"{}\" I saw it 👀", entry.body);
        self.try_send(&Jid(entry.sender.clone()), &text, SendOptions::default())
            .await;
    }

    async fn enforce_links(&self, msg: &MessageEvent) -> bool {
        if !self.cfg.anti_link || !msg.chat.is_group() {
            return false;
        }
        if !self.link_re.is_match(&msg.body) {
            return false;
        }
        if msg.from_self || msg.sender.normalized() == self.cfg.owner_number {
            return false;
        }
        if self.roster.is_member_admin(&msg.chat, &msg.sender).await {
            return false;
        }
        // Without admin rights the bot has no authority to delete; skip.
        if !self.roster.is_bot_admin(&msg.chat).await {
            return false;
        }

        let key = message_key(msg);
        if let Err(e) = self.client.delete_message(&key).await {
            eprintln!("[ENFORCE] link delete failed in {}: {e}", msg.chat);
        }
        self.try_send(&msg.chat, LINK_TAUNT, SendOptions::quoting(key))
            .await;
        true
    }

    async fn enforce_mute(&self, msg: &MessageEvent) {
        if !msg.chat.is_group() || msg.from_self {
            return;
        }

        // Group-wide mute takes precedence; either way one delete suffices.
        let group_muted = self.mutes.is_group_muted(&msg.chat).await;
        let member_muted = self.mutes.is_member_muted(&msg.chat, &msg.sender).await;
        if !group_muted && !member_muted {
            return;
        }

        if !self.roster.is_bot_admin(&msg.chat).await {
            return;
        }

        if let Err(e) = self.client.delete_message(&message_key(msg)).await {
            eprintln!("[ENFORCE] mute delete failed in {}: {e}", msg.chat);
        }
    }

    async fn try_send(&self, to: &Jid, text: &str, opts: SendOptions) {
        if let Err(e) = self.client.send_text(to, text, opts).await {
            eprintln!("[ENFORCE] send to {to} failed: {e}");
        }
    }
}

fn message_key(msg: &MessageEvent) -> MessageKey {
    MessageKey {
        chat: msg.chat.clone(),
        id: msg.id.clone(),
        sender: msg.chat.is_group().then(|| msg.sender.clone()),
        from_self: msg.from_self,
    }
}
