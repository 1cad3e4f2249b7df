use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A conversation thread held by the agent server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<SessionTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SessionTime {
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub updated: i64,
}

impl Session {
    /// Creation time reported by the server, in milliseconds since the epoch.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let created = self.time?.created;
        Utc.timestamp_millis_opt(created).single()
    }
}
