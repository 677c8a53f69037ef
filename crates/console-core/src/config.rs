use std::collections::BTreeMap;

use serde::Deserialize;

pub const DEFAULT_BACKEND_BASE_URL: &str = "http://127.0.0.1:7860";
pub const ENV_BACKEND_BASE_URL: &str = "MANUS_CONSOLE_BACKEND_URL";
pub const BACKEND_BASE_SOURCE_DEFAULT: &str = "default_local";
pub const DEFAULT_AGENT_TYPE: &str = "manus";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("invalid console config: {0}")]
    Parse(String),
    #[error("agent_types must not be empty")]
    NoAgentTypes,
    #[error("default_agent_type {name:?} is not listed in agent_types")]
    UnknownDefaultAgentType { name: String },
    #[error("{field} must be greater than zero")]
    ZeroTiming { field: &'static str },
}

/// Every delay and deadline the controller works with, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsoleTimings {
    pub poll_interval_ms: u64,
    pub logs_timeout_ms: u64,
    pub agent_action_timeout_ms: u64,
    pub chat_timeout_ms: u64,
    pub settings_timeout_ms: u64,
    pub follow_up_refresh_delay_ms: u64,
    pub notification_visible_ms: u64,
    pub notification_fade_ms: u64,
}

impl Default for ConsoleTimings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30_000,
            logs_timeout_ms: 10_000,
            agent_action_timeout_ms: 15_000,
            chat_timeout_ms: 30_000,
            settings_timeout_ms: 10_000,
            follow_up_refresh_delay_ms: 1_000,
            notification_visible_ms: 4_000,
            notification_fade_ms: 300,
        }
    }
}

impl ConsoleTimings {
    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("logs_timeout_ms", self.logs_timeout_ms),
            ("agent_action_timeout_ms", self.agent_action_timeout_ms),
            ("chat_timeout_ms", self.chat_timeout_ms),
            ("settings_timeout_ms", self.settings_timeout_ms),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::ZeroTiming { field });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub backend_base_url: String,
    pub agent_types: Vec<String>,
    pub default_agent_type: String,
    pub timings: ConsoleTimings,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend_base_url: DEFAULT_BACKEND_BASE_URL.to_string(),
            agent_types: vec![DEFAULT_AGENT_TYPE.to_string()],
            default_agent_type: DEFAULT_AGENT_TYPE.to_string(),
            timings: ConsoleTimings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConsoleConfigFile {
    backend_base_url: Option<String>,
    agent_types: Option<Vec<String>>,
    default_agent_type: Option<String>,
    timings: ConsoleTimings,
}

impl ConsoleConfig {
    /// Parses a TOML console config. `${NAME}` placeholders in string values
    /// are replaced through `lookup`; unknown names are left as written.
    pub fn from_toml_str<F>(raw: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value: toml::Value =
            toml::from_str(raw).map_err(|error| ConfigError::Parse(error.to_string()))?;
        let value = interpolate_value(value, &lookup);
        let file = ConsoleConfigFile::deserialize(value)
            .map_err(|error| ConfigError::Parse(error.to_string()))?;

        let defaults = Self::default();
        let backend_base_url = match file.backend_base_url {
            Some(raw) => normalize_base_url(&raw)?,
            None => defaults.backend_base_url,
        };
        let agent_types = match file.agent_types {
            Some(types) => normalize_agent_types(types)?,
            None => defaults.agent_types,
        };
        let default_agent_type = file
            .default_agent_type
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .or_else(|| agent_types.first().cloned())
            .unwrap_or(defaults.default_agent_type);
        if !agent_types.contains(&default_agent_type) {
            return Err(ConfigError::UnknownDefaultAgentType {
                name: default_agent_type,
            });
        }

        file.timings.validate()?;
        Ok(Self {
            backend_base_url,
            agent_types,
            default_agent_type,
            timings: file.timings,
        })
    }

    /// Returns a copy pointing at another backend.
    pub fn with_backend_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.backend_base_url = normalize_base_url(raw)?;
        Ok(self)
    }
}

fn normalize_agent_types(types: Vec<String>) -> Result<Vec<String>, ConfigError> {
    let mut normalized = Vec::with_capacity(types.len());
    for name in types {
        let trimmed = name.trim();
        if !trimmed.is_empty() && !normalized.iter().any(|existing: &String| existing == trimmed) {
            normalized.push(trimmed.to_string());
        }
    }
    if normalized.is_empty() {
        return Err(ConfigError::NoAgentTypes);
    }
    Ok(normalized)
}

fn interpolate_value<F>(value: toml::Value, lookup: &F) -> toml::Value
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        toml::Value::String(raw) => toml::Value::String(interpolate_placeholders(&raw, lookup)),
        toml::Value::Array(items) => toml::Value::Array(
            items
                .into_iter()
                .map(|item| interpolate_value(item, lookup))
                .collect(),
        ),
        toml::Value::Table(table) => toml::Value::Table(
            table
                .into_iter()
                .map(|(key, item)| (key, interpolate_value(item, lookup)))
                .collect(),
        ),
        other => other,
    }
}

/// Replaces `${NAME}` with `lookup(NAME)`; placeholders without a value stay
/// literal so a missing key is visible in the resulting config.
pub fn interpolate_placeholders<F>(raw: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut output = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };
        let name = &after[..end];
        match (!name.is_empty()).then(|| lookup(name)).flatten() {
            Some(value) => output.push_str(&value),
            None => output.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    output
}

/// Resolves the backend base URL from the environment, falling back to the
/// local default. Returns the URL and where it came from.
pub fn resolve_backend_base_url() -> Result<(String, &'static str), ConfigError> {
    if let Some(base_url) = env_non_empty(ENV_BACKEND_BASE_URL) {
        return normalize_base_url(&base_url).map(|normalized| (normalized, ENV_BACKEND_BASE_URL));
    }
    normalize_base_url(DEFAULT_BACKEND_BASE_URL)
        .map(|normalized| (normalized, BACKEND_BASE_SOURCE_DEFAULT))
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Builds a lookup over a fixed map, used for key files and tests.
pub fn map_lookup(values: &BTreeMap<String, String>) -> impl Fn(&str) -> Option<String> + '_ {
    move |name| values.get(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn base_url_normalization_rejects_bad_input() {
        assert_eq!(
            normalize_base_url(" http://localhost:7860/ "),
            Ok("http://localhost:7860".to_string())
        );
        assert_eq!(normalize_base_url("   "), Err(ConfigError::EmptyBaseUrl));
        assert_eq!(
            normalize_base_url("localhost:7860"),
            Err(ConfigError::InvalidBaseUrl)
        );
        assert_eq!(
            normalize_base_url("https:///api"),
            Err(ConfigError::InvalidBaseUrl)
        );
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = ConsoleConfig::from_toml_str("", no_env).expect("empty config parses");
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.timings.poll_interval_ms, 30_000);
        assert_eq!(config.timings.notification_fade_ms, 300);
    }

    #[test]
    fn toml_overrides_and_interpolates_placeholders() {
        let mut env = BTreeMap::new();
        env.insert("BACKEND_HOST".to_string(), "agents.internal:9000".to_string());
        let raw = r#"
            backend_base_url = "http://${BACKEND_HOST}/"
            agent_types = ["browser", " wsl ", "browser", ""]

            [timings]
            poll_interval_ms = 5000
            chat_timeout_ms = 45000
        "#;

        let config = ConsoleConfig::from_toml_str(raw, map_lookup(&env)).expect("config parses");
        assert_eq!(config.backend_base_url, "http://agents.internal:9000");
        assert_eq!(config.agent_types, vec!["browser", "wsl"]);
        assert_eq!(config.default_agent_type, "browser");
        assert_eq!(config.timings.poll_interval_ms, 5_000);
        assert_eq!(config.timings.chat_timeout_ms, 45_000);
        assert_eq!(config.timings.logs_timeout_ms, 10_000);
    }

    #[test]
    fn unknown_placeholders_stay_literal() {
        let env = BTreeMap::new();
        assert_eq!(
            interpolate_placeholders("key=${MISSING} tail", &map_lookup(&env)),
            "key=${MISSING} tail"
        );
        assert_eq!(
            interpolate_placeholders("broken ${OPEN", &map_lookup(&env)),
            "broken ${OPEN"
        );
        assert_eq!(interpolate_placeholders("${}", &map_lookup(&env)), "${}");
    }

    #[test]
    fn zero_timeouts_and_empty_agent_lists_are_rejected() {
        let zero = ConsoleConfig::from_toml_str("[timings]\nchat_timeout_ms = 0", no_env);
        assert_eq!(
            zero,
            Err(ConfigError::ZeroTiming {
                field: "chat_timeout_ms"
            })
        );

        let empty = ConsoleConfig::from_toml_str("agent_types = [\" \"]", no_env);
        assert_eq!(empty, Err(ConfigError::NoAgentTypes));

        let garbage = ConsoleConfig::from_toml_str("agent_types = 3", no_env);
        assert!(matches!(garbage, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn default_agent_type_must_be_listed() {
        let unlisted = ConsoleConfig::from_toml_str(
            "agent_types = [\"manus\"]\ndefault_agent_type = \"x\"",
            no_env,
        );
        assert_eq!(
            unlisted,
            Err(ConfigError::UnknownDefaultAgentType {
                name: "x".to_string()
            })
        );

        let listed = ConsoleConfig::from_toml_str(
            "agent_types = [\"manus\", \"browser\"]\ndefault_agent_type = \" browser \"",
            no_env,
        )
        .expect("listed default parses");
        assert_eq!(listed.default_agent_type, "browser");
    }
}
