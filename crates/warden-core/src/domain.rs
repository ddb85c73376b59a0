/// A messaging-platform address ("jid"): a user, a group or a broadcast.
///
/// Jids carry a server suffix (`@s.whatsapp.net`, `@lid`, `@g.us`) and may
/// carry a `:device` suffix for linked devices. Identity comparisons go
/// through [`Jid::normalized`], which strips both.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Jid(pub String);

impl Jid {
    /// Numeric identity: everything before the first `:` or `@`.
    pub fn normalized(&self) -> &str {
        let s = self.0.as_str();
        let s = s.split(':').next().unwrap_or(s);
        s.split('@').next().unwrap_or(s)
    }

    /// Group chats live on the `g.us` server.
    pub fn is_group(&self) -> bool {
        self.0.ends_with("@g.us")
    }
}

impl std::fmt::Display for Jid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform message id (opaque string).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

/// A stable reference to a message, sufficient for a delete call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageKey {
    pub chat: Jid,
    pub id: MessageId,
    /// Participant jid inside a group; `None` in direct chats.
    pub sender: Option<Jid>,
    pub from_self: bool,
}

/// Member role inside a group roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Regular,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

#[derive(Clone, Debug)]
pub struct RosterMember {
    pub jid: Jid,
    pub role: Role,
}

/// One group's member list at a point in time.
///
/// Snapshots are owned by the roster cache and replaced atomically on
/// refresh; other components read them through the role-resolution API.
#[derive(Clone, Debug)]
pub struct RosterSnapshot {
    pub group: Jid,
    pub members: Vec<RosterMember>,
}

impl RosterSnapshot {
    /// Find a member by normalized numeric identity.
    pub fn member_by_identity(&self, identity: &str) -> Option<&RosterMember> {
        self.members.iter().find(|m| m.jid.normalized() == identity)
    }
}
