use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration for the moderation core.
///
/// Everything comes from the environment (with `.env` support) so a
/// deployment can be reconfigured without rebuilding.
#[derive(Clone, Debug)]
pub struct Config {
    // Identity
    pub bot_name: String,
    /// Normalized numeric identity of the single configured owner.
    pub owner_number: String,

    // Membership notifications
    pub welcome_enabled: bool,
    pub goodbye_enabled: bool,
    /// `{name}` is replaced with an `@number` mention of the member.
    pub welcome_message: String,
    pub goodbye_message: String,

    // Enforcement toggles
    pub anti_delete: bool,
    pub anti_link: bool,

    // Stalk fan-out
    pub stalk_message: String,
    pub stalk_delay: Duration,

    // Recent-message log
    pub message_cache_file: PathBuf,
    pub message_cache_capacity: usize,

    // Roster cache
    pub roster_ttl: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let owner_number = env_str("OWNER_NUMBER").unwrap_or_default();
        if owner_number.trim().is_empty() {
            return Err(Error::Config(
                "OWNER_NUMBER environment variable is required".to_string(),
            ));
        }

        let bot_name = env_str("BOT_NAME")
            .and_then(non_empty)
            .unwrap_or_else(|| "warden".to_string());

        let welcome_enabled = env_bool("WELCOME").unwrap_or(true);
        let goodbye_enabled = env_bool("GOODBYE").unwrap_or(true);
        let welcome_message = env_str("WELCOME_MESSAGE")
            .and_then(non_empty)
            .unwrap_or_else(|| "Welcome {name} 👋".to_string());
        let goodbye_message = env_str("GOODBYE_MESSAGE")
            .and_then(non_empty)
            .unwrap_or_else(|| "Goodbye {name} 👋".to_string());

        let anti_delete = env_bool("ANTI_DELETE").unwrap_or(true);
        let anti_link = env_bool("ANTI_LINK").unwrap_or(true);

        let stalk_message = env_str("STALK_MESSAGE")
            .and_then(non_empty)
            .unwrap_or_else(|| "👀".to_string());
        let stalk_delay = Duration::from_millis(env_u64("STALK_DELAY_MS").unwrap_or(5_000));

        let message_cache_file = env_path("MESSAGE_CACHE_FILE")
            .unwrap_or_else(|| PathBuf::from("/tmp/warden-message-cache.json"));
        let message_cache_capacity = env_usize("MESSAGE_CACHE_CAPACITY").unwrap_or(500);

        let roster_ttl = Duration::from_secs(env_u64("ROSTER_TTL_SECS").unwrap_or(300));

        Ok(Self {
            bot_name,
            owner_number,
            welcome_enabled,
            goodbye_enabled,
            welcome_message,
            goodbye_message,
            anti_delete,
            anti_link,
            stalk_message,
            stalk_delay,
            message_cache_file,
            message_cache_capacity,
            roster_ttl,
        })
    }

    /// The owner's direct-chat jid (phone-number form).
    pub fn owner_jid(&self) -> crate::domain::Jid {
        crate::domain::Jid(format!("{}@s.whatsapp.net", self.owner_number))
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        bot_name: "warden".to_string(),
        owner_number: "777".to_string(),
        welcome_enabled: true,
        goodbye_enabled: true,
        welcome_message: "Welcome {name} 👋".to_string(),
        goodbye_message: "Goodbye {name} 👋".to_string(),
        anti_delete: true,
        anti_link: true,
        stalk_message: "👀".to_string(),
        stalk_delay: Duration::from_millis(0),
        message_cache_file: PathBuf::from("/tmp/warden-test-unused.json"),
        message_cache_capacity: 500,
        roster_ttl: Duration::from_secs(300),
    }
}
