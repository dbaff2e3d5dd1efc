//! Configuration for the prompt console
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/promptdeck/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Use the mock generation backend instead of a real endpoint
    pub mock: bool,

    /// Simulated latency of the mock backend, in milliseconds
    pub mock_latency_ms: u64,

    /// Base URL of the OpenAI-compatible generation endpoint
    pub api_url: String,

    /// Bearer token for the generation endpoint (PROMPTDECK_API_KEY)
    pub api_key: Option<String>,

    /// Model selected when the session starts
    pub default_model: String,

    /// Optional catalog file; when unset the bundled catalog is used
    pub catalog_path: Option<PathBuf>,

    /// Directory transcript exports are written to
    pub export_dir: PathBuf,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Whether to also write logs to rotating files
    pub file_enabled: bool,

    /// Directory for log files
    pub file_dir: PathBuf,

    /// Log file rotation policy
    pub file_rotation: LogRotation,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mock: true,
            mock_latency_ms: 1500,
            api_url: "http://localhost:11434".to_string(),
            api_key: None,
            default_model: "gpt-4".to_string(),
            catalog_path: None,
            export_dir: PathBuf::from("."),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            file_dir: default_log_dir(),
            file_rotation: LogRotation::Daily,
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("promptdeck").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

// ─────────────────────────────────────────────────────────────────────────────
// File format (all fields optional so partial configs merge over defaults)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub mock: Option<bool>,
    pub mock_latency_ms: Option<u64>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub default_model: Option<String>,
    pub catalog_path: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: FileLogging,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<PathBuf>,
    pub file_rotation: Option<LogRotation>,
}

impl Config {
    /// Path to the config file: ~/.config/promptdeck/config.toml
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("promptdeck").join("config.toml"))
    }

    /// Load configuration: defaults, overlaid by the config file, overlaid
    /// by environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = Self::config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(raw) => match toml::from_str::<FileConfig>(&raw) {
                        Ok(file) => config.apply_file(file),
                        Err(e) => eprintln!("Warning: Could not parse {:?}: {}", path, e),
                    },
                    Err(e) => eprintln!("Warning: Could not read {:?}: {}", path, e),
                }
            }
        }

        config.apply_env();
        config
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.mock {
            self.mock = v;
        }
        if let Some(v) = file.mock_latency_ms {
            self.mock_latency_ms = v;
        }
        if let Some(v) = file.api_url {
            self.api_url = v;
        }
        if let Some(v) = file.api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = file.default_model {
            self.default_model = v;
        }
        if let Some(v) = file.catalog_path {
            self.catalog_path = Some(v);
        }
        if let Some(v) = file.export_dir {
            self.export_dir = v;
        }
        if let Some(v) = file.logging.level {
            self.logging.level = v;
        }
        if let Some(v) = file.logging.file_enabled {
            self.logging.file_enabled = v;
        }
        if let Some(v) = file.logging.file_dir {
            self.logging.file_dir = v;
        }
        if let Some(v) = file.logging.file_rotation {
            self.logging.file_rotation = v;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PROMPTDECK_MOCK") {
            self.mock = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("PROMPTDECK_API_URL") {
            self.api_url = v;
        }
        if let Ok(v) = std::env::var("PROMPTDECK_API_KEY") {
            self.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("PROMPTDECK_MODEL") {
            self.default_model = v;
        }
        if let Ok(v) = std::env::var("PROMPTDECK_EXPORT_DIR") {
            self.export_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PROMPTDECK_LOG_LEVEL") {
            self.logging.level = v;
        }
    }

    /// Render the effective configuration as a commented TOML document
    ///
    /// Used both by `config --show` and to generate the config template on
    /// first run, so every option stays discoverable.
    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        out.push_str("# promptdeck configuration\n");
        out.push_str("# Environment variables (PROMPTDECK_*) override these values.\n\n");

        out.push_str("# Use the built-in mock backend instead of a real endpoint\n");
        out.push_str(&format!("mock = {}\n\n", self.mock));

        out.push_str("# Simulated latency of the mock backend (milliseconds)\n");
        out.push_str(&format!("mock_latency_ms = {}\n\n", self.mock_latency_ms));

        out.push_str("# OpenAI-compatible endpoint used when mock = false\n");
        out.push_str(&format!("api_url = {:?}\n", self.api_url));
        match &self.api_key {
            Some(key) => out.push_str(&format!("api_key = {:?}\n\n", key)),
            None => out.push_str("# api_key = \"sk-...\"\n\n"),
        }

        out.push_str("# Model selected when the session starts\n");
        out.push_str(&format!("default_model = {:?}\n\n", self.default_model));

        out.push_str("# Optional TOML file with [[models]] and [[templates]] tables\n");
        match &self.catalog_path {
            Some(path) => out.push_str(&format!("catalog_path = {:?}\n\n", path.display())),
            None => out.push_str("# catalog_path = \"~/.config/promptdeck/catalog.toml\"\n\n"),
        }

        out.push_str("# Directory transcript exports are written to\n");
        out.push_str(&format!("export_dir = {:?}\n\n", self.export_dir.display()));

        out.push_str("[logging]\n");
        out.push_str(&format!("level = {:?}\n", self.logging.level));
        out.push_str(&format!("file_enabled = {}\n", self.logging.file_enabled));
        out.push_str(&format!(
            "file_dir = {:?}\n",
            self.logging.file_dir.display()
        ));
        let rotation = match self.logging.file_rotation {
            LogRotation::Hourly => "hourly",
            LogRotation::Daily => "daily",
            LogRotation::Never => "never",
        };
        out.push_str(&format!("file_rotation = {:?}\n", rotation));

        out
    }

    /// Write the config template on first run so options are discoverable
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };
        if path.exists() {
            return;
        }
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        if let Err(e) = std::fs::write(&path, Self::default().to_toml()) {
            eprintln!("Warning: Could not write config template {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The generated template must parse back; catches quoting mistakes in
    /// to_toml before a user ever sees them.
    #[test]
    fn default_config_round_trips() {
        let config = Config::default();
        let toml_str = config.to_toml();

        let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
        assert!(
            parsed.is_ok(),
            "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
            toml_str,
            parsed.err()
        );
    }

    #[test]
    fn non_default_config_round_trips() {
        let mut config = Config::default();
        config.mock = false;
        config.api_key = Some("sk-test".into());
        config.catalog_path = Some(PathBuf::from("/tmp/catalog.toml"));
        config.logging.file_enabled = true;
        config.logging.file_rotation = LogRotation::Hourly;

        let parsed: FileConfig = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed.mock, Some(false));
        assert_eq!(parsed.api_key.as_deref(), Some("sk-test"));
        assert_eq!(
            parsed.logging.file_rotation,
            Some(LogRotation::Hourly)
        );
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let file: FileConfig = toml::from_str(
            r#"
mock = false
api_url = "https://api.openai.com"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_file(file);

        assert!(!config.mock);
        assert_eq!(config.api_url, "https://api.openai.com");
        assert_eq!(config.logging.level, "debug");
        // Untouched fields keep their defaults
        assert_eq!(config.default_model, "gpt-4");
        assert_eq!(config.mock_latency_ms, 1500);
    }

    #[test]
    fn empty_file_is_valid() {
        let file: FileConfig = toml::from_str("").unwrap();
        let mut config = Config::default();
        config.apply_file(file);
        assert!(config.mock);
    }
}
