/// Core error type for the moderation engine.
///
/// Adapter crates should map their client-specific errors into this type so
/// the core can handle failures consistently. Within a single event's
/// enforcement chain no error is allowed to abort later steps: roster
/// failures resolve the role question to "unknown" (treated as not-admin),
/// and delivery failures are logged at the call site and dropped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("roster unavailable for {group}: {reason}")]
    RosterUnavailable { group: String, reason: String },

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("message cache corrupt: {0}")]
    CacheCorrupt(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
