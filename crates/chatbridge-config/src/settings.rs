use crate::schema::{Config, OnCreateFailure};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:4096";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_WINDOW: usize = 50;
pub const DEFAULT_PACING_MS: u64 = 20;
pub const DEFAULT_SESSION_TITLE: &str = "OpenAI Bridge Session";
pub const DEFAULT_PROVIDER: &str = "opencode";
pub const DEFAULT_AGENT: &str = "build";

/// Fully resolved settings handed to the bridge and server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub poll: PollSettings,
    pub stream: StreamSettings,
    pub session: SessionSettings,
    pub models: ModelsSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendSettings {
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamSettings {
    pub window: usize,
    pub pacing_ms: u64,
    pub emit_role_frame: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSettings {
    pub title: String,
    pub on_create_failure: OnCreateFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelsSettings {
    pub default_provider: String,
    pub aliases: BTreeMap<String, String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            agent: DEFAULT_AGENT.to_string(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            pacing_ms: DEFAULT_PACING_MS,
            emit_role_frame: true,
        }
    }
}

impl StreamSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_SESSION_TITLE.to_string(),
            on_create_failure: OnCreateFailure::default(),
        }
    }
}

impl Default for ModelsSettings {
    fn default() -> Self {
        let aliases = [
            ("gpt-4", "grok-code"),
            ("gpt-4-turbo", "grok-code"),
            ("gpt-3.5-turbo", "qwen3-coder"),
            ("gpt-3.5-turbo-16k", "qwen3-coder"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            default_provider: DEFAULT_PROVIDER.to_string(),
            aliases,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Config::default().resolve()
    }
}

impl Config {
    /// Applies defaults to every unset field. Configured aliases are layered
    /// over the built-in ones.
    pub fn resolve(&self) -> Settings {
        let server = self.server.clone().unwrap_or_default();
        let backend = self.backend.clone().unwrap_or_default();
        let poll = self.poll.clone().unwrap_or_default();
        let stream = self.stream.clone().unwrap_or_default();
        let session = self.session.clone().unwrap_or_default();
        let models = self.models.clone().unwrap_or_default();

        let mut model_settings = ModelsSettings::default();
        if let Some(provider) = models.default_provider {
            model_settings.default_provider = provider;
        }
        if let Some(aliases) = models.aliases {
            model_settings.aliases.extend(aliases);
        }

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: server.port.unwrap_or(DEFAULT_PORT),
            },
            backend: BackendSettings {
                url: backend
                    .url
                    .map(|u| u.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string()),
                api_key: backend.api_key.filter(|k| !k.is_empty()),
                timeout_secs: backend.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
                agent: backend.agent.unwrap_or_else(|| DEFAULT_AGENT.to_string()),
            },
            poll: PollSettings {
                interval_ms: poll.interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
                // A zero ceiling would never fetch; at least one attempt is made.
                max_attempts: poll.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
            },
            stream: StreamSettings {
                window: stream.window.unwrap_or(DEFAULT_WINDOW).max(1),
                pacing_ms: stream.pacing_ms.unwrap_or(DEFAULT_PACING_MS),
                emit_role_frame: stream.emit_role_frame.unwrap_or(true),
            },
            session: SessionSettings {
                title: session
                    .title
                    .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string()),
                on_create_failure: session.on_create_failure.unwrap_or_default(),
            },
            models: model_settings,
        }
    }
}
