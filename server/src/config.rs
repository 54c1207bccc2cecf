//! Server configuration parsed from environment variables.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_TICKET_TTL_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Actions kept per table for join backfill.
    pub history_limit: usize,
    /// Outbound queue depth per connection; fan-out skips frames beyond it.
    pub client_channel_capacity: usize,
    /// Lifetime of an unused websocket ticket.
    pub ticket_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
            ticket_ttl_secs: DEFAULT_TICKET_TTL_SECS,
        }
    }
}

impl ServerConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000; an unparseable value is an error
    /// - `HISTORY_LIMIT`: default 100
    /// - `CLIENT_CHANNEL_CAPACITY`: default 256, minimum 1
    /// - `TICKET_TTL_SECS`: default 60
    ///
    /// # Errors
    ///
    /// Returns `InvalidPort` when `PORT` is set but not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            history_limit: env_parse("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT),
            client_channel_capacity: env_parse("CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY).max(1),
            ticket_ttl_secs: env_parse("TICKET_TTL_SECS", DEFAULT_TICKET_TTL_SECS),
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
