use crate::matcher::{FaceMatcher, DEFAULT_TOLERANCE};
use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Image hosts serve browsers; some refuse unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Process-wide configuration, built once at startup.
///
/// Sources, later ones winning: built-in defaults, the TOML file named by
/// `PHOTIER_CONFIG`, then `PHOTIER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Maximum Euclidean distance for two encodings to be the same face.
    pub tolerance: f64,
    /// Endpoint that turns image bytes into face locations and encodings.
    pub encoder_url: String,
    /// Endpoint listing candidate photo URLs. Ingestion is disabled without it.
    pub feed_url: Option<String>,
    /// Sent as the `authorization` header to the feed.
    pub feed_token: Option<String>,
    /// Local time of day at which the daily ingestion batch runs.
    #[serde(deserialize_with = "deserialize_time")]
    pub ingest_at: NaiveTime,
    /// Run one batch immediately at daemon startup.
    pub ingest_on_start: bool,
    /// Timeout for each outgoing HTTP request.
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_data_dir().join("photier.db"),
            tolerance: DEFAULT_TOLERANCE,
            encoder_url: "http://127.0.0.1:8500/encode".to_string(),
            feed_url: None,
            feed_token: None,
            ingest_at: NaiveTime::default(),
            ingest_on_start: false,
            http_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the optional file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("PHOTIER_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.matcher()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from `PHOTIER_*` variables as resolved by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("PHOTIER_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("PHOTIER_TOLERANCE") {
            self.tolerance = parse("PHOTIER_TOLERANCE", v)?;
        }
        if let Some(v) = lookup("PHOTIER_ENCODER_URL") {
            self.encoder_url = v;
        }
        if let Some(v) = lookup("PHOTIER_FEED_URL") {
            self.feed_url = non_empty(v);
        }
        if let Some(v) = lookup("PHOTIER_FEED_TOKEN") {
            self.feed_token = non_empty(v);
        }
        if let Some(v) = lookup("PHOTIER_INGEST_AT") {
            self.ingest_at = parse_time(&v).ok_or(ConfigError::InvalidValue {
                key: "PHOTIER_INGEST_AT",
                value: v,
            })?;
        }
        if let Some(v) = lookup("PHOTIER_INGEST_ON_START") {
            self.ingest_on_start = v != "0" && !v.eq_ignore_ascii_case("false");
        }
        if let Some(v) = lookup("PHOTIER_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = parse("PHOTIER_HTTP_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("PHOTIER_USER_AGENT") {
            self.user_agent = v;
        }
        Ok(())
    }

    /// Comparator for the configured tolerance.
    pub fn matcher(&self) -> Result<FaceMatcher, ConfigError> {
        FaceMatcher::new(self.tolerance).map_err(|_| ConfigError::InvalidValue {
            key: "tolerance",
            value: self.tolerance.to_string(),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("photier")
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    match value.trim().parse() {
        Ok(v) => Ok(v),
        Err(_) => Err(ConfigError::InvalidValue { key, value }),
    }
}

fn non_empty(v: String) -> Option<String> {
    if v.trim().is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn deserialize_time<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveTime, D::Error> {
    let s = String::deserialize(de)?;
    parse_time(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tolerance, 0.6);
        assert_eq!(config.ingest_at, NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert!(config.feed_url.is_none());
        assert!(config.db_path.ends_with("photier/photier.db"));
        assert!(config.user_agent.starts_with("Mozilla/5.0 ("));
        assert!(config.user_agent.contains("Chrome/"));
        assert!(!config.user_agent.contains("  "));
    }

    #[test]
    fn test_toml_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            db_path = "/var/lib/photier/photier.db"
            tolerance = 0.5
            ingest_at = "03:30"
            feed_url = "https://feed.example.com/all-images"
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/photier/photier.db"));
        assert_eq!(config.tolerance, 0.5);
        assert_eq!(config.ingest_at, NaiveTime::from_hms_opt(3, 30, 0).unwrap());
        assert_eq!(config.http_timeout_secs, 30);
    }

    #[test]
    fn test_toml_rejects_unknown_key_and_bad_time() {
        assert!(Config::from_toml_str("tolerence = 0.4").is_err());
        assert!(Config::from_toml_str("ingest_at = \"25:00\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(lookup(&[
                ("PHOTIER_DB_PATH", "/tmp/x.db"),
                ("PHOTIER_TOLERANCE", "0.45"),
                ("PHOTIER_FEED_URL", "https://feed"),
                ("PHOTIER_FEED_TOKEN", ""),
                ("PHOTIER_INGEST_AT", "12:15:30"),
                ("PHOTIER_INGEST_ON_START", "1"),
                ("PHOTIER_HTTP_TIMEOUT_SECS", "5"),
                ("PHOTIER_USER_AGENT", "curl/8.5"),
            ]))
            .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.tolerance, 0.45);
        assert_eq!(config.feed_url.as_deref(), Some("https://feed"));
        assert!(config.feed_token.is_none());
        assert_eq!(config.ingest_at, NaiveTime::from_hms_opt(12, 15, 30).unwrap());
        assert!(config.ingest_on_start);
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.user_agent, "curl/8.5");
    }

    #[test]
    fn test_env_invalid_number() {
        let mut config = Config::default();
        let err = config
            .apply_env(lookup(&[("PHOTIER_TOLERANCE", "close")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key: "PHOTIER_TOLERANCE", .. }
        ));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let config = Config {
            tolerance: -1.0,
            ..Config::default()
        };
        assert!(config.matcher().is_err());
    }
}
