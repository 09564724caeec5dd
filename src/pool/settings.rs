use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use super::PoolError;

/// Credentials and tuning passed to every
/// [`ConnectionFactory::connect`](super::ConnectionFactory::connect).
///
/// Missing fields fall back to the broker defaults (`guest`/`guest` on
/// virtual host `/`, 60 second heartbeat).
///
/// ```
/// use mta_rust::pool::ConnectionSettings;
///
/// let settings = ConnectionSettings::from_json(r#"{ "virtual_host": "/orders" }"#).unwrap();
/// assert_eq!(settings.username, "guest");
/// assert_eq!(settings.virtual_host, "/orders");
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub username: String,
    pub password: String,
    pub virtual_host: String,
    /// Heartbeat interval in seconds; 0 disables heartbeats.
    pub heartbeat_secs: u16,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            username: "guest".to_string(),
            password: "guest".to_string(),
            virtual_host: "/".to_string(),
            heartbeat_secs: 60,
        }
    }
}

impl ConnectionSettings {
    pub fn from_json(json: &str) -> Result<Self, PoolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn heartbeat(&self) -> Option<Duration> {
        (self.heartbeat_secs > 0).then(|| Duration::from_secs(u64::from(self.heartbeat_secs)))
    }
}

// The password never reaches logs.
impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("username", &self.username)
            .field("password", &"***")
            .field("virtual_host", &self.virtual_host)
            .field("heartbeat_secs", &self.heartbeat_secs)
            .finish()
    }
}
