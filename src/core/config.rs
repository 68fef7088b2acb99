//! Configuration management with layered hierarchy

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::document::DocumentFormat;
use crate::core::Project;

/// Default session lifetime after the last wizard activity
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Dilekce configuration with layered hierarchy
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Owner id stamped on documents and sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Name printed in signature blocks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Default export format (txt, docx, html)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_format: Option<String>,

    /// Directory for exported files, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<String>,

    /// Hours of inactivity before a wizard session expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ttl_hours: Option<i64>,
}

impl Config {
    /// Load configuration from all sources, discovering the project from the cwd
    pub fn load() -> Self {
        let project = Project::discover().ok();
        Self::load_for(project.as_ref())
    }

    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // Global user config (~/.config/dilekce/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // Project config (.dilekce/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_dir().join("config.yaml"))
            {
                config.merge(project_config);
            }
        }

        config.merge(Self::from_env());
        config
    }

    fn read_file(path: &std::path::Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    fn from_env() -> Config {
        Config {
            user: std::env::var("DILEKCE_USER").ok(),
            author: std::env::var("DILEKCE_AUTHOR").ok(),
            default_format: std::env::var("DILEKCE_FORMAT").ok(),
            export_dir: std::env::var("DILEKCE_EXPORT_DIR").ok(),
            session_ttl_hours: std::env::var("DILEKCE_SESSION_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dilekce")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.export_dir.is_some() {
            self.export_dir = other.export_dir;
        }
        if other.session_ttl_hours.is_some() {
            self.session_ttl_hours = other.session_ttl_hours;
        }
    }

    /// Owner id for records, falling back to the login name
    pub fn user(&self) -> String {
        if let Some(ref user) = self.user {
            return user.clone();
        }
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Signature name, falling back to the user id
    pub fn author(&self) -> String {
        self.author.clone().unwrap_or_else(|| self.user())
    }

    /// Default export format; unknown values fall back to plain text
    pub fn default_format(&self) -> DocumentFormat {
        self.default_format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    }

    /// Export directory resolved against the project root
    pub fn export_dir(&self, project: &Project) -> PathBuf {
        match self.export_dir {
            Some(ref dir) => project.root().join(dir),
            None => project.exports_dir(),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        let hours = self
            .session_ttl_hours
            .filter(|h| *h > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS);
        Duration::hours(hours)
    }

    /// Look up a key by name for `config show <key>`
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "user" => self.user.clone(),
            "author" => self.author.clone(),
            "default_format" => self.default_format.clone(),
            "export_dir" => self.export_dir.clone(),
            "session_ttl_hours" => self.session_ttl_hours.map(|h| h.to_string()),
            _ => None,
        }
    }
}

/// Valid configuration keys with descriptions
pub const CONFIG_KEYS: &[(&str, &str)] = &[
    ("user", "Owner id stamped on documents and sessions"),
    ("author", "Name printed in signature blocks"),
    ("default_format", "Default export format (txt, docx, html)"),
    ("export_dir", "Directory for exported files"),
    ("session_ttl_hours", "Hours before an idle wizard session expires"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            user: Some("a".into()),
            session_ttl_hours: Some(12),
            ..Default::default()
        };
        base.merge(Config {
            user: Some("b".into()),
            ..Default::default()
        });
        assert_eq!(base.user.as_deref(), Some("b"));
        assert_eq!(base.session_ttl_hours, Some(12));
    }

    #[test]
    fn test_session_ttl_default_and_override() {
        assert_eq!(Config::default().session_ttl(), Duration::hours(24));
        let config = Config {
            session_ttl_hours: Some(2),
            ..Default::default()
        };
        assert_eq!(config.session_ttl(), Duration::hours(2));
        let bogus = Config {
            session_ttl_hours: Some(-5),
            ..Default::default()
        };
        assert_eq!(bogus.session_ttl(), Duration::hours(24));
    }

    #[test]
    fn test_default_format_parsing() {
        let config = Config {
            default_format: Some("docx".into()),
            ..Default::default()
        };
        assert_eq!(config.default_format(), DocumentFormat::Docx);
        let unknown = Config {
            default_format: Some("pdf".into()),
            ..Default::default()
        };
        assert_eq!(unknown.default_format(), DocumentFormat::Txt);
    }

    #[test]
    fn test_author_falls_back_to_user() {
        let config = Config {
            user: Some("ayse".into()),
            ..Default::default()
        };
        assert_eq!(config.author(), "ayse");
    }
}
