use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, SubfillError};

fn default_port() -> u16 {
    6767
}

fn default_request_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub translate: TranslateConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bazarr hostname (no scheme)
    pub hostname: String,
    /// Bazarr port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bazarr API key, sent as the X-API-KEY header
    pub api_key: String,
    /// Request timeout in seconds (translations can be slow)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Target language code subtitles should ultimately exist in
    pub preferred_language: String,
    /// Delay between processing each wanted item in seconds.
    /// Helps avoid hitting translation provider rate limits.
    pub delay_secs: u64,
    /// Maximum retries for the translation request
    pub max_retries: u32,
    /// Initial backoff delay in seconds before the first retry
    pub initial_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Cron expression for scheduled runs (standard 5-field form accepted)
    pub cron: String,
    /// Run immediately once and exit (useful for testing / on-demand runs)
    #[serde(default)]
    pub run_now: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                hostname: String::new(),
                port: 6767,
                api_key: String::new(),
                request_timeout_secs: 120,
            },
            translate: TranslateConfig {
                preferred_language: "pl".to_string(),
                delay_secs: 5,
                max_retries: 5,
                initial_backoff_secs: 60,
            },
            schedule: ScheduleConfig {
                cron: "0 6 * * *".to_string(),
                run_now: false,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubfillError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubfillError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load configuration: explicit file, else `config.toml` in the current
    /// directory, else defaults. Environment variables override in all cases.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => {
                if Path::new("config.toml").exists() {
                    Config::from_file("config.toml")?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env_with(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides through a lookup function, so
    /// tests can exercise the parsing without mutating process environment.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(hostname) = lookup("BAZARR_HOSTNAME") {
            self.server.hostname = hostname;
        }
        if let Some(port) = lookup("BAZARR_PORT") {
            self.server.port = parse_env("BAZARR_PORT", &port)?;
        }
        if let Some(api_key) = lookup("BAZARR_APIKEY") {
            self.server.api_key = api_key;
        }
        if let Some(timeout) = lookup("REQUEST_TIMEOUT") {
            self.server.request_timeout_secs = parse_env("REQUEST_TIMEOUT", &timeout)?;
        }
        if let Some(lang) = lookup("FIRST_LANG") {
            self.translate.preferred_language = lang;
        }
        if let Some(delay) = lookup("TRANSLATE_DELAY") {
            self.translate.delay_secs = parse_env("TRANSLATE_DELAY", &delay)?;
        }
        if let Some(retries) = lookup("MAX_RETRIES") {
            self.translate.max_retries = parse_env("MAX_RETRIES", &retries)?;
        }
        if let Some(backoff) = lookup("INITIAL_BACKOFF") {
            self.translate.initial_backoff_secs = parse_env("INITIAL_BACKOFF", &backoff)?;
        }
        if let Some(cron) = lookup("CRON_SCHEDULE") {
            self.schedule.cron = cron;
        }
        if let Some(run_now) = lookup("RUN_NOW") {
            self.schedule.run_now =
                matches!(run_now.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.server.hostname.is_empty() {
            return Err(SubfillError::Config(
                "Bazarr hostname is not set (BAZARR_HOSTNAME)".to_string(),
            ));
        }
        if self.server.api_key.is_empty() {
            return Err(SubfillError::Config(
                "Bazarr API key is not set (BAZARR_APIKEY)".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| SubfillError::Config(format!("Invalid value for {}: '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("BAZARR_HOSTNAME", "bazarr.local"),
            ("BAZARR_PORT", "7878"),
            ("BAZARR_APIKEY", "secret"),
            ("FIRST_LANG", "de"),
            ("TRANSLATE_DELAY", "2"),
            ("MAX_RETRIES", "3"),
            ("INITIAL_BACKOFF", "10"),
            ("REQUEST_TIMEOUT", "30"),
            ("CRON_SCHEDULE", "*/15 * * * *"),
        ]);

        let mut config = Config::default();
        config
            .apply_env_with(|name| vars.get(name).cloned())
            .unwrap();

        assert_eq!(config.server.hostname, "bazarr.local");
        assert_eq!(config.server.port, 7878);
        assert_eq!(config.server.api_key, "secret");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.translate.preferred_language, "de");
        assert_eq!(config.translate.delay_secs, 2);
        assert_eq!(config.translate.max_retries, 3);
        assert_eq!(config.translate.initial_backoff_secs, 10);
        assert_eq!(config.schedule.cron, "*/15 * * * *");
    }

    #[test]
    fn test_defaults_without_env() {
        let mut config = Config::default();
        config.apply_env_with(|_| None).unwrap();

        assert_eq!(config.server.port, 6767);
        assert_eq!(config.server.request_timeout_secs, 120);
        assert_eq!(config.translate.preferred_language, "pl");
        assert_eq!(config.translate.delay_secs, 5);
        assert_eq!(config.translate.max_retries, 5);
        assert_eq!(config.translate.initial_backoff_secs, 60);
        assert_eq!(config.schedule.cron, "0 6 * * *");
        assert!(!config.schedule.run_now);
    }

    #[test]
    fn test_run_now_parsing() {
        for (value, expected) in [
            ("1", true),
            ("true", true),
            ("TRUE", true),
            ("yes", true),
            ("0", false),
            ("false", false),
            ("", false),
        ] {
            let mut config = Config::default();
            config
                .apply_env_with(|name| (name == "RUN_NOW").then(|| value.to_string()))
                .unwrap();
            assert_eq!(config.schedule.run_now, expected, "RUN_NOW={}", value);
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut config = Config::default();
        let result = config
            .apply_env_with(|name| (name == "BAZARR_PORT").then(|| "not-a-port".to_string()));
        assert!(matches!(result, Err(SubfillError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
hostname = "media-box"
api_key = "abc123"

[translate]
preferred_language = "fr"
delay_secs = 1
max_retries = 2
initial_backoff_secs = 5

[schedule]
cron = "0 4 * * *"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.hostname, "media-box");
        assert_eq!(config.server.port, 6767);
        assert_eq!(config.translate.preferred_language, "fr");
        assert_eq!(config.schedule.cron, "0 4 * * *");
        assert!(!config.schedule.run_now);
    }

    #[test]
    fn test_validate_requires_hostname_and_key() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.hostname = "bazarr".to_string();
        config.server.api_key = "key".to_string();
        assert!(config.validate().is_ok());
    }
}
