//! Configuration schema (ddlguard.toml)

use serde::{Deserialize, Serialize};

/// Report rendering format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored terminal summary
    #[default]
    Text,

    /// Stable report.json
    Json,

    /// Markdown, suitable for PR comments
    Markdown,
}

/// Tables whose lossy changes are accepted by the gate
///
/// The verdict itself is never altered; the allowlist only decides
/// whether a lossy verdict fails the gate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowlistRules {
    /// Qualified table names or glob patterns (`staging.*`)
    #[serde(default)]
    pub allow_lossy: Vec<String>,
}

impl AllowlistRules {
    /// Check if a table matches any pattern in the list
    fn matches_pattern(table: &str, patterns: &[String]) -> bool {
        patterns.iter().any(|pattern| glob_match(pattern, table))
    }

    /// Check if lossy changes to a table are accepted
    pub fn is_lossy_allowed(&self, table: &str) -> bool {
        Self::matches_pattern(table, &self.allow_lossy)
    }
}

fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    "warn".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Evaluate with the new collation framework enabled
    #[serde(default = "default_true")]
    pub new_collation_enabled: bool,

    /// Fail the gate (non-zero exit) on a lossy verdict
    #[serde(default = "default_true")]
    pub fail_on_lossy: bool,

    /// Default report format
    #[serde(default)]
    pub output_format: OutputFormat,

    /// `tracing` filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Allowlist rules
    #[serde(default)]
    pub allowlist: AllowlistRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            new_collation_enabled: true,
            fail_on_lossy: true,
            output_format: OutputFormat::default(),
            log_filter: default_log_filter(),
            allowlist: AllowlistRules::default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

/// Case-insensitive glob matching; every `*` matches any run of characters
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let text = text.to_ascii_lowercase();

    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.new_collation_enabled);
        assert!(config.fail_on_lossy);
        assert_eq!(config.output_format, OutputFormat::Text);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            new_collation_enabled = false
            output_format = "json"

            [allowlist]
            allow_lossy = ["scratch.*"]
            "#,
        )
        .unwrap();

        assert!(!config.new_collation_enabled);
        assert!(config.fail_on_lossy);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert!(config.allowlist.is_lossy_allowed("scratch.events"));
        assert!(!config.allowlist.is_lossy_allowed("prod.events"));
    }

    #[test]
    fn invalid_toml_is_rejected() {
        assert!(matches!(
            Config::from_toml("output_format = \"yaml\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("staging.*", "staging.users"));
        assert!(glob_match("*.audit", "Prod.AUDIT"));
        assert!(!glob_match("staging.*", "prod.users"));
        assert!(!glob_match("ab*ba", "aba"));
        assert!(glob_match("**", "shop.users"));
        assert!(glob_match("shop.*_log*", "shop.audit_log_2024"));
        assert!(glob_match("*.tmp_*", "staging.tmp_import"));
        assert!(!glob_match("shop.*_log*", "shop.users"));
        assert!(glob_match("Shop.Users", "shop.users"));
        assert!(!glob_match("shop.users", "shop.users_old"));
    }
}
