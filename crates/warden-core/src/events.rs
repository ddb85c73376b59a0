use crate::domain::{Jid, MessageId};

/// Incoming message as delivered by the dispatcher.
///
/// Platform-specific payload shapes (caption vs text, protocol messages)
/// are flattened by the adapter before they reach the core.
#[derive(Clone, Debug)]
pub struct MessageEvent {
    pub id: MessageId,
    /// Group jid or direct-chat jid.
    pub chat: Jid,
    /// Participant jid in groups, chat jid in direct chats.
    pub sender: Jid,
    pub sender_name: String,
    pub from_self: bool,
    /// Extracted text body (empty for media without caption).
    pub body: String,
    /// First member mentioned/quoted in the message, if any.
    pub mentioned: Option<Jid>,
    /// Self-observed delete marker: the id this message revokes.
    pub revokes: Option<MessageId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipAction {
    Add,
    Remove,
    Leave,
}

/// Group membership change (join, kick, voluntary leave).
#[derive(Clone, Debug)]
pub struct MembershipUpdate {
    pub group: Jid,
    pub members: Vec<Jid>,
    pub action: MembershipAction,
}

/// Externally delivered batch delete event.
#[derive(Clone, Debug)]
pub struct DeleteNotification {
    pub keys: Vec<DeletedKey>,
}

#[derive(Clone, Debug)]
pub struct DeletedKey {
    pub id: MessageId,
    pub from_self: bool,
}
