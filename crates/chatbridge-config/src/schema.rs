//! On-disk config shape. Every field is optional so that sources can be
//! layered; [`Config::resolve`] fills the gaps with defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Agent name sent with each prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emit_role_frame: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_create_failure: Option<OnCreateFailure>,
}

/// What to do when the backend refuses to create a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnCreateFailure {
    /// Continue with a locally minted id. Turns will fail at submission.
    #[default]
    Local,
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<HashMap<String, String>>,
}

trait DeepMerge {
    fn deep_merge(&mut self, other: Self);
}

fn merge_option_replace<T>(target: &mut Option<T>, source: Option<T>) {
    if let Some(value) = source {
        *target = Some(value);
    }
}

fn merge_option_deep<T: DeepMerge>(target: &mut Option<T>, source: Option<T>) {
    if let Some(source_value) = source {
        if let Some(target_value) = target {
            target_value.deep_merge(source_value);
        } else {
            *target = Some(source_value);
        }
    }
}

fn merge_option_map_overwrite_values<T>(
    target: &mut Option<HashMap<String, T>>,
    source: Option<HashMap<String, T>>,
) {
    if let Some(source_map) = source {
        if let Some(target_map) = target {
            target_map.extend(source_map);
        } else {
            *target = Some(source_map);
        }
    }
}

impl DeepMerge for ServerConfig {
    fn deep_merge(&mut self, other: Self) {
        merge_option_replace(&mut self.host, other.host);
        merge_option_replace(&mut self.port, other.port);
    }
}

impl DeepMerge for BackendConfig {
    fn deep_merge(&mut self, other: Self) {
        merge_option_replace(&mut self.url, other.url);
        merge_option_replace(&mut self.api_key, other.api_key);
        merge_option_replace(&mut self.timeout_secs, other.timeout_secs);
        merge_option_replace(&mut self.agent, other.agent);
    }
}

impl DeepMerge for PollConfig {
    fn deep_merge(&mut self, other: Self) {
        merge_option_replace(&mut self.interval_ms, other.interval_ms);
        merge_option_replace(&mut self.max_attempts, other.max_attempts);
    }
}

impl DeepMerge for StreamConfig {
    fn deep_merge(&mut self, other: Self) {
        merge_option_replace(&mut self.window, other.window);
        merge_option_replace(&mut self.pacing_ms, other.pacing_ms);
        merge_option_replace(&mut self.emit_role_frame, other.emit_role_frame);
    }
}

impl DeepMerge for SessionConfig {
    fn deep_merge(&mut self, other: Self) {
        merge_option_replace(&mut self.title, other.title);
        merge_option_replace(&mut self.on_create_failure, other.on_create_failure);
    }
}

impl DeepMerge for ModelsConfig {
    fn deep_merge(&mut self, other: Self) {
        merge_option_replace(&mut self.default_provider, other.default_provider);
        merge_option_map_overwrite_values(&mut self.aliases, other.aliases);
    }
}

impl Config {
    /// Layers `other` on top of `self`, field by field.
    pub fn merge(&mut self, other: Config) {
        merge_option_replace(&mut self.schema, other.schema);
        merge_option_deep(&mut self.server, other.server);
        merge_option_deep(&mut self.backend, other.backend);
        merge_option_deep(&mut self.poll, other.poll);
        merge_option_deep(&mut self.stream, other.stream);
        merge_option_deep(&mut self.session, other.session);
        merge_option_deep(&mut self.models, other.models);
    }
}
