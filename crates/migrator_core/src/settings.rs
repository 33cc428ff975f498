use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 20;
pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const MIN_REQUEST_DELAY_SECONDS: f64 = 0.5;
pub const DEFAULT_REQUEST_DELAY_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("base URL is required")]
    MissingBaseUrl,
    #[error("base URL {0:?} is not an absolute http(s) URL")]
    InvalidBaseUrl(String),
    #[error("source directory is required in file mode")]
    MissingSourceDirectory,
    #[error("content selector is required in http mode")]
    MissingContentSelector,
    #[error("unknown source mode {0:?} (expected \"http\" or \"files\")")]
    UnknownSourceMode(String),
}

/// Where pages are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Scrape rendered pages from the live wiki.
    Http,
    /// Read raw page files from a local `wiki.d` style directory.
    #[default]
    Files,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Http => write!(f, "http"),
            SourceMode::Files => write!(f, "files"),
        }
    }
}

impl FromStr for SourceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(SourceMode::Http),
            "files" | "file" => Ok(SourceMode::Files),
            other => Err(ConfigError::UnknownSourceMode(other.to_string())),
        }
    }
}

/// Operator configuration, snapshotted into the progress record when a run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    pub source_mode: SourceMode,
    pub source_directory: PathBuf,
    pub base_url: String,
    /// Element ID of the content container on rendered pages.
    pub content_selector: String,
    pub request_delay_seconds: f64,
    pub batch_size: usize,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            source_mode: SourceMode::default(),
            source_directory: PathBuf::from("wiki.d"),
            base_url: String::new(),
            content_selector: "wikitext".to_string(),
            request_delay_seconds: DEFAULT_REQUEST_DELAY_SECONDS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl MigrationSettings {
    /// Copy with batch size and request delay forced into their allowed ranges.
    pub fn sanitized(&self) -> Self {
        Self {
            batch_size: self.effective_batch_size(),
            request_delay_seconds: self.effective_request_delay().as_secs_f64(),
            base_url: self.base_url.trim().to_string(),
            content_selector: self.content_selector.trim().to_string(),
            ..self.clone()
        }
    }

    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
    }

    /// Pause before each item: at least 0.5 s, saturating at `Duration::MAX`.
    pub fn effective_request_delay(&self) -> Duration {
        let seconds = if self.request_delay_seconds.is_finite() {
            self.request_delay_seconds.max(MIN_REQUEST_DELAY_SECONDS)
        } else {
            DEFAULT_REQUEST_DELAY_SECONDS
        };
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }

    /// Rejects settings a run cannot start with. Callers validate before touching state.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        match url::Url::parse(base_url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::InvalidBaseUrl(base_url.to_string())),
        }
        match self.source_mode {
            SourceMode::Files if self.source_directory.as_os_str().is_empty() => {
                Err(ConfigError::MissingSourceDirectory)
            }
            SourceMode::Http if self.content_selector.trim().is_empty() => {
                Err(ConfigError::MissingContentSelector)
            }
            _ => Ok(()),
        }
    }

    /// Page listing the whole wiki, used as the discovery root in HTTP mode.
    pub fn sitemap_url(&self) -> String {
        format!("{}?n=Site.SiteMap", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> MigrationSettings {
        MigrationSettings {
            base_url: "https://wiki.example.org/wiki.php".to_string(),
            ..MigrationSettings::default()
        }
    }

    #[test]
    fn batch_size_and_delay_are_clamped() {
        let settings = MigrationSettings {
            batch_size: 0,
            request_delay_seconds: 0.1,
            ..valid()
        };
        assert_eq!(settings.effective_batch_size(), 1);
        assert_eq!(settings.effective_request_delay(), Duration::from_millis(500));

        let settings = MigrationSettings {
            batch_size: 99,
            request_delay_seconds: f64::NAN,
            ..valid()
        };
        let sanitized = settings.sanitized();
        assert_eq!(sanitized.batch_size, 20);
        assert_eq!(sanitized.request_delay_seconds, 1.0);
    }

    #[test]
    fn oversized_delay_saturates() {
        let settings = MigrationSettings {
            request_delay_seconds: 1e20,
            ..valid()
        };
        assert_eq!(settings.effective_request_delay(), Duration::MAX);
        let sanitized = settings.sanitized();
        assert!(sanitized.request_delay_seconds >= 1.8e19);
        assert_eq!(sanitized.effective_request_delay(), Duration::MAX);
    }

    #[test]
    fn missing_base_url_is_rejected() {
        let settings = MigrationSettings::default();
        assert_eq!(settings.validate(), Err(ConfigError::MissingBaseUrl));
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let settings = MigrationSettings {
            base_url: "wiki.php".to_string(),
            ..MigrationSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn http_mode_needs_a_selector() {
        let settings = MigrationSettings {
            source_mode: SourceMode::Http,
            content_selector: "  ".to_string(),
            ..valid()
        };
        assert_eq!(settings.validate(), Err(ConfigError::MissingContentSelector));
    }

    #[test]
    fn source_mode_parses_case_insensitively() {
        assert_eq!("HTTP".parse::<SourceMode>(), Ok(SourceMode::Http));
        assert_eq!("files".parse::<SourceMode>(), Ok(SourceMode::Files));
        assert!("ftp".parse::<SourceMode>().is_err());
    }

    #[test]
    fn sitemap_url_uses_site_map_page() {
        assert_eq!(
            valid().sitemap_url(),
            "https://wiki.example.org/wiki.php?n=Site.SiteMap"
        );
    }
}
