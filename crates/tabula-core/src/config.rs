//! Configuration system for Tabula.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Main configuration struct for Tabula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stop all language servers before a session load clears documents
    pub stop_lsp_on_load: bool,
    /// Restore the last loaded session on startup
    pub autoload_last_session: bool,
    /// Only list the documents of the focused group
    pub filter_by_tab: bool,
    /// Stop a group's language servers when leaving it, restart on return
    pub stop_lsp_on_group_leave: bool,
    /// Periodic persistence
    pub autosave: AutosaveConfig,
    /// Where sessions are stored
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stop_lsp_on_load: true,
            autoload_last_session: false,
            filter_by_tab: true,
            stop_lsp_on_group_leave: false,
            autosave: AutosaveConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Enable the periodic timer
    pub enabled: bool,
    /// Save once more when the editor is about to exit
    pub on_exit: bool,
    /// Timer period in milliseconds
    pub interval_ms: u64,
    /// Minimum gap between two saves, measured from the last successful save
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            on_exit: true,
            interval_ms: 60_000,
            debounce_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Session directory; defaults to `<data_dir>/tabula/sessions`
    pub directory: Option<PathBuf>,
}

/// Validation result with multiple issues.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    /// Get only error-level issues.
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Error).collect()
    }

    /// Get only warning-level issues.
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning).collect()
    }

    /// Add an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: IssueSeverity,
    /// Field path (e.g., "autosave.interval_ms")
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

impl Config {
    /// Build the provider chain used by [`Config::load`].
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            // User config
            .merge(Toml::file(Self::config_dir().join("config.toml")))
            // Project config
            .merge(Toml::file(".tabula/config.toml"))
            // Environment variables, e.g. TABULA_AUTOSAVE__INTERVAL_MS
            .merge(Env::prefixed("TABULA_").split("__"))
    }

    /// Load configuration from all sources.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// Load and validate configuration.
    pub fn load_validated() -> Result<Self, Error> {
        let config = Self::load().map_err(|e| Error::Config(e.to_string()))?;
        let result = config.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.autosave.enabled && self.autosave.interval_ms == 0 {
            result.add_error("autosave.interval_ms", "interval_ms must be greater than 0");
        }

        if self.autosave.enabled && self.autosave.debounce_ms > self.autosave.interval_ms {
            result.add_warning(
                "autosave.debounce_ms",
                "debounce_ms is longer than interval_ms, some timer ticks will never save",
            );
        }

        if self.autosave.on_exit && !self.autosave.enabled {
            result.add_warning(
                "autosave.on_exit",
                "on_exit has no effect while autosave is disabled",
            );
        }

        if self.stop_lsp_on_group_leave && !self.filter_by_tab {
            result.add_warning(
                "stop_lsp_on_group_leave",
                "language servers are stopped per group but documents are listed globally",
            );
        }

        if let Some(ref dir) = self.storage.directory {
            if dir.as_os_str().is_empty() {
                result.add_error("storage.directory", "directory cannot be an empty path");
            }
        }

        result
    }

    /// Serialize to TOML for display.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Directory holding stored sessions.
    pub fn sessions_dir(&self) -> PathBuf {
        self.storage
            .directory
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("sessions"))
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("tabula"))
            .unwrap_or_else(|| PathBuf::from("~/.config/tabula"))
    }

    /// Get the data directory (for sessions, etc.).
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("tabula"))
            .unwrap_or_else(|| PathBuf::from("~/.local/share/tabula"))
    }
}
