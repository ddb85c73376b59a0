use async_trait::async_trait;

use crate::{
    domain::{Jid, MessageKey, RosterSnapshot},
    events::MembershipAction,
    Result,
};

/// The bot's own identity as known to the client session.
///
/// The platform exposes the account in two alternate encodings: a
/// linked-device form and a phone-number form. Role resolution must accept
/// either; a hypothetical third form would fail closed (known limitation).
#[derive(Clone, Debug)]
pub struct BotIdentity {
    pub device: Option<Jid>,
    pub phone: Jid,
}

impl BotIdentity {
    /// True if `jid` is one of the bot's own identity forms.
    pub fn matches(&self, jid: &Jid) -> bool {
        let id = jid.normalized();
        if id == self.phone.normalized() {
            return true;
        }
        self.device
            .as_ref()
            .map(|d| d.normalized() == id)
            .unwrap_or(false)
    }
}

/// Options for an outbound send.
#[derive(Clone, Debug, Default)]
pub struct SendOptions {
    /// Jids to render as `@number` mentions in the text.
    pub mentions: Vec<Jid>,
    /// Reply-quote the given message.
    pub quoted: Option<MessageKey>,
}

impl SendOptions {
    pub fn mentioning(jid: Jid) -> Self {
        Self {
            mentions: vec![jid],
            ..Self::default()
        }
    }

    pub fn quoting(key: MessageKey) -> Self {
        Self {
            quoted: Some(key),
            ..Self::default()
        }
    }
}

/// Port for the external messaging-protocol client.
///
/// The first adapter targets a WhatsApp-style client; the shape is kept
/// narrow so other platforms can fit behind the same interface.
#[async_trait]
pub trait ChatClient: Send + Sync {
    fn identity(&self) -> BotIdentity;

    async fn fetch_roster(&self, group: &Jid) -> Result<RosterSnapshot>;
    async fn send_text(&self, to: &Jid, text: &str, opts: SendOptions) -> Result<()>;
    async fn delete_message(&self, key: &MessageKey) -> Result<()>;
    async fn update_membership(
        &self,
        group: &Jid,
        members: &[Jid],
        action: MembershipAction,
    ) -> Result<()>;
}
