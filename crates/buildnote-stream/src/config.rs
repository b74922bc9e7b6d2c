use buildnote_core::{Charset, CharsetError};
use serde::{Deserialize, Serialize};

/// Environment variable that turns annotation on or off.
pub const ENV_ANNOTATE: &str = "BUILDNOTE_ANNOTATE";
/// Environment variable that selects the console charset.
pub const ENV_CHARSET: &str = "BUILDNOTE_CHARSET";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: expected true/false, got `{value}`")]
    InvalidBool { var: &'static str, value: String },
    #[error("{var}: {source}")]
    InvalidCharset {
        var: &'static str,
        #[source]
        source: CharsetError,
    },
}

/// Settings passed to every annotating decorator at construction.
///
/// Stored in `.buildnote/config.json` as the `annotate` and `charset` keys;
/// other keys in that file are ignored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotateConfig {
    #[serde(rename = "annotate", default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub charset: Charset,
}

fn default_enabled() -> bool {
    true
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            charset: Charset::Utf8,
        }
    }
}

impl AnnotateConfig {
    /// Read from a config object. Missing or malformed keys fall back to defaults.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut config = Self::default();
        if let Some(enabled) = value.get("annotate").and_then(|v| v.as_bool()) {
            config.enabled = enabled;
        }
        if let Some(charset) = value
            .get("charset")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
        {
            config.charset = charset;
        }
        config
    }

    /// Apply `BUILDNOTE_ANNOTATE` / `BUILDNOTE_CHARSET` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(ENV_ANNOTATE) {
            self.enabled = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidBool {
                var: ENV_ANNOTATE,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_CHARSET) {
            self.charset = raw.parse().map_err(|source| ConfigError::InvalidCharset {
                var: ENV_CHARSET,
                source,
            })?;
        }
        Ok(self)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
