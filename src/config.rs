use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub postconf: PostconfConfig,
    pub domains: DomainsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostconfConfig {
    /// Path to the external tool binary.
    pub program: String,
    /// Directory holding the named lock files shared with other processes.
    pub lock_dir: String,
    /// Upper bound on one tool invocation, in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainsConfig {
    /// Primary mail domain, used for mydomain and myhostname.
    pub primary: String,
    /// Additional domains to accept mail for.
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Supported log output formats. Anything else is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::ConfError::Config(e.to_string()))?;

        toml::from_str(&content).map_err(|e| crate::error::ConfError::Config(e.to_string()))
    }

    /// All declared domains: primary first, then the extras.
    pub fn all_domains(&self) -> Vec<String> {
        let mut domains = vec![self.domains.primary.clone()];
        for domain in &self.domains.extra {
            if !domains.contains(domain) {
                domains.push(domain.clone());
            }
        }
        domains
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            postconf: PostconfConfig {
                program: "/sbin/postconf".to_string(),
                lock_dir: "/run/lock/postconf-rs".to_string(),
                timeout_secs: 10,
            },
            domains: DomainsConfig {
                primary: "localhost".to_string(),
                extra: Vec::new(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.postconf.program, "/sbin/postconf");
        assert_eq!(config.postconf.timeout_secs, 10);
        assert_eq!(config.all_domains(), vec!["localhost".to_string()]);
    }

    #[test]
    fn test_from_toml() {
        let raw = r#"
            [postconf]
            program = "/usr/sbin/postconf"
            lock_dir = "/tmp/locks"
            timeout_secs = 5

            [domains]
            primary = "example.com"
            extra = ["example.org"]

            [logging]
            level = "debug"
            format = "pretty"
        "#;

        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.postconf.program, "/usr/sbin/postconf");
        assert_eq!(
            config.all_domains(),
            vec!["example.com".to_string(), "example.org".to_string()]
        );
    }

    #[test]
    fn test_log_format_is_a_closed_set() {
        let json: LoggingConfig =
            toml::from_str("level = \"info\"\nformat = \"json\"").unwrap();
        assert_eq!(json.format, LogFormat::Json);

        let compact: LoggingConfig =
            toml::from_str("level = \"info\"\nformat = \"compact\"").unwrap();
        assert_eq!(compact.format, LogFormat::Compact);

        let bogus: std::result::Result<LoggingConfig, _> =
            toml::from_str("level = \"info\"\nformat = \"fancy\"");
        assert!(bogus.is_err());
    }
}
