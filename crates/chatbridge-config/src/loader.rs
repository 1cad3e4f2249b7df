use crate::schema::{BackendConfig, Config, ServerConfig};
use crate::settings::Settings;
use anyhow::{Context, Result};
use jsonc_parser::{parse_to_serde_value, ParseOptions};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const ENV_CONFIG: &str = "CHATBRIDGE_CONFIG";
pub const ENV_CONFIG_CONTENT: &str = "CHATBRIDGE_CONFIG_CONTENT";
pub const ENV_BACKEND_URL: &str = "CHATBRIDGE_BACKEND_URL";
pub const ENV_API_KEY: &str = "CHATBRIDGE_API_KEY";
pub const ENV_PORT: &str = "CHATBRIDGE_PORT";

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{env:([^}]+)\}").expect("env substitution pattern"));

pub struct ConfigLoader {
    config: Config,
    config_paths: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            config_paths: Vec::new(),
        }
    }

    pub fn load_from_str(&mut self, content: &str) -> Result<()> {
        let content = substitute_env_vars(content);
        let config = parse_jsonc(&content).with_context(|| "Failed to parse config content")?;
        self.config.merge(config);
        Ok(())
    }

    /// Missing files are skipped silently.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let content = substitute_env_vars(&content);
        let config = parse_jsonc(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        tracing::debug!(path = %path.display(), "loaded config file");
        self.config.merge(config);
        self.config_paths.push(path.to_path_buf());
        Ok(())
    }

    pub fn load_global(&mut self) -> Result<()> {
        if let Some(base) = global_config_base() {
            self.load_first_of(&base)?;
        }
        Ok(())
    }

    pub fn load_project<P: AsRef<Path>>(&mut self, project_dir: P) -> Result<()> {
        self.load_first_of(&project_dir.as_ref().join("chatbridge"))
    }

    pub fn load_from_env(&mut self) -> Result<()> {
        if let Ok(config_path) = env::var(ENV_CONFIG) {
            let path = PathBuf::from(&config_path);
            if !path.exists() {
                tracing::warn!(path = %config_path, "{} points at a missing file", ENV_CONFIG);
            }
            self.load_from_file(path)?;
        }
        Ok(())
    }

    pub fn load_from_env_content(&mut self) -> Result<()> {
        if let Ok(content) = env::var(ENV_CONFIG_CONTENT) {
            self.load_from_str(&content)?;
        }
        Ok(())
    }

    /// Applies single-value overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.is_empty()) {
            self.backend_mut().url = Some(url);
        }
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
            self.backend_mut().api_key = Some(key);
        }
        if let Some(port) = lookup(ENV_PORT).filter(|v| !v.is_empty()) {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("{} is not a valid port: {}", ENV_PORT, port))?;
            self.config
                .server
                .get_or_insert_with(ServerConfig::default)
                .port = Some(port);
        }
        Ok(())
    }

    /// Merge order, lowest to highest priority:
    /// 1. Global config (`<config_dir>/chatbridge/chatbridge.json{c,}`)
    /// 2. Project config (`<project>/chatbridge.json{c,}`)
    /// 3. Custom config file (`CHATBRIDGE_CONFIG`)
    /// 4. Inline config (`CHATBRIDGE_CONFIG_CONTENT`)
    /// 5. Single-value env overrides
    pub fn load_all<P: AsRef<Path>>(&mut self, project_dir: P) -> Result<Config> {
        self.load_global()?;
        self.load_project(project_dir)?;
        self.load_from_env()?;
        self.load_from_env_content()?;
        self.apply_overrides(|key| env::var(key).ok())?;
        Ok(self.config.clone())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    fn backend_mut(&mut self) -> &mut BackendConfig {
        self.config
            .backend
            .get_or_insert_with(BackendConfig::default)
    }

    fn load_first_of(&mut self, base: &Path) -> Result<()> {
        for ext in ["jsonc", "json"] {
            let path = base.with_extension(ext);
            if path.exists() {
                return self.load_from_file(&path);
            }
        }
        Ok(())
    }
}

/// Loads every source for `project_dir` and resolves defaults.
pub fn load_config<P: AsRef<Path>>(project_dir: P) -> Result<Settings> {
    let mut loader = ConfigLoader::new();
    let config = loader.load_all(project_dir)?;
    Ok(config.resolve())
}

fn global_config_base() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chatbridge").join("chatbridge"))
}

fn substitute_env_vars(text: &str) -> String {
    ENV_VAR_RE
        .replace_all(text, |caps: &regex::Captures| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .to_string()
}

fn parse_jsonc(content: &str) -> Result<Config> {
    let parse_options = ParseOptions {
        allow_trailing_commas: true,
        ..Default::default()
    };
    let parsed = parse_to_serde_value(content, &parse_options)
        .with_context(|| "Failed to parse JSONC")?
        .context("Config content is empty")?;
    serde_json::from_value(parsed).with_context(|| "Failed to parse config JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OnCreateFailure;
    use std::collections::HashMap;
    use std::time::{SystemTime, UNIX_EPOCH};

    struct TestDir {
        path: PathBuf,
    }

    impl TestDir {
        fn new(prefix: &str) -> Self {
            let unique = format!(
                "{}_{}_{}",
                prefix,
                std::process::id(),
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .expect("clock error")
                    .as_nanos()
            );
            let path = std::env::temp_dir().join(unique);
            fs::create_dir_all(&path).expect("failed to create test temp dir");
            Self { path }
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn test_parse_jsonc_with_comments_and_trailing_commas() {
        let content = r#"{
            // backend location
            "backend": { "url": "http://10.0.0.2:4096", },
            /* block */
            "poll": { "interval_ms": 250, "max_attempts": 8 },
        }"#;
        let config = parse_jsonc(content).unwrap();
        assert_eq!(
            config.backend.unwrap().url.as_deref(),
            Some("http://10.0.0.2:4096")
        );
        assert_eq!(config.poll.unwrap().max_attempts, Some(8));
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        assert!(parse_jsonc(r#"{"bakend": {}}"#).is_err());
    }

    #[test]
    fn test_env_substitution() {
        env::set_var("CHATBRIDGE_TEST_SUBST_KEY", "sk-from-env");
        let text = substitute_env_vars(r#"{"backend":{"api_key":"{env:CHATBRIDGE_TEST_SUBST_KEY}"}}"#);
        assert_eq!(text, r#"{"backend":{"api_key":"sk-from-env"}}"#);
        let missing = substitute_env_vars("{env:CHATBRIDGE_TEST_SURELY_UNSET}");
        assert_eq!(missing, "");
    }

    #[test]
    fn test_project_jsonc_wins_over_json() {
        let dir = TestDir::new("chatbridge_project");
        fs::write(
            dir.path.join("chatbridge.jsonc"),
            r#"{"server": {"port": 9001}}"#,
        )
        .unwrap();
        fs::write(
            dir.path.join("chatbridge.json"),
            r#"{"server": {"port": 9002}}"#,
        )
        .unwrap();

        let mut loader = ConfigLoader::new();
        loader.load_project(&dir.path).unwrap();
        assert_eq!(loader.config().server.as_ref().unwrap().port, Some(9001));
        assert_eq!(loader.config_paths(), &[dir.path.join("chatbridge.jsonc")]);
    }

    #[test]
    fn test_later_sources_merge_over_earlier() {
        let dir = TestDir::new("chatbridge_layers");
        let file = dir.path.join("custom.json");
        fs::write(
            &file,
            r#"{"backend": {"url": "http://file", "timeout_secs": 10},
                "session": {"on_create_failure": "fail"}}"#,
        )
        .unwrap();

        let mut loader = ConfigLoader::new();
        loader.load_from_file(&file).unwrap();
        loader
            .load_from_str(r#"{"backend": {"url": "http://inline"}}"#)
            .unwrap();

        let settings = loader.config().resolve();
        assert_eq!(settings.backend.url, "http://inline");
        assert_eq!(settings.backend.timeout_secs, 10);
        assert_eq!(settings.session.on_create_failure, OnCreateFailure::Fail);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let dir = TestDir::new("chatbridge_missing");
        let mut loader = ConfigLoader::new();
        loader.load_from_file(dir.path.join("nope.json")).unwrap();
        assert!(loader.config_paths().is_empty());
        assert_eq!(loader.config(), &Config::default());
    }

    #[test]
    fn test_overrides_apply_last() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_BACKEND_URL, "http://override:1"),
            (ENV_API_KEY, "sk-override"),
            (ENV_PORT, "7070"),
        ]);
        let mut loader = ConfigLoader::new();
        loader
            .load_from_str(r#"{"backend": {"url": "http://file"}, "server": {"port": 1}}"#)
            .unwrap();
        loader
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        let settings = loader.config().resolve();
        assert_eq!(settings.backend.url, "http://override:1");
        assert_eq!(settings.backend.api_key.as_deref(), Some("sk-override"));
        assert_eq!(settings.server.port, 7070);
    }

    #[test]
    fn test_bad_port_override_is_an_error() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_overrides(|k| (k == ENV_PORT).then(|| "eighty".to_string()));
        assert!(result.is_err());
    }
}
