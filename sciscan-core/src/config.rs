//! Configuration system for SciScan.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/sciscan/config.toml` and/or `.sciscan/config.toml`
//! in the workspace directory.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SciscanConfig {
    pub llm: LlmConfig,
    pub analysis: AnalysisConfig,
    pub history: HistoryConfig,
}

/// Hosted model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name. Only "gemini" is supported.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Inline API key; takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature. Kept low for determinism-leaning output.
    pub temperature: f32,
    /// Total request timeout. Unset means no local limit; the service's own
    /// timeout applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-3-pro-preview".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.2,
            timeout_secs: None,
        }
    }
}

impl LlmConfig {
    /// Validate this LLM config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.provider != "gemini" {
            warnings.push(format!(
                "provider '{}' is not supported; requests are sent to the Gemini API",
                self.provider
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            warnings.push(format!(
                "temperature ({}) is outside the typical range 0.0–2.0",
                self.temperature
            ));
        }
        if self.timeout_secs == Some(0) {
            warnings.push("timeout_secs is 0; every request will time out".to_string());
        }
        warnings
    }
}

/// Prompt and flow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Natural language every field of the answer must be written in.
    pub output_language: String,
    /// Pause between the reading and analyzing states, in milliseconds.
    pub reading_delay_ms: u64,
    /// Reject responses with missing summaries/findings or out-of-range scores.
    pub validate_schema: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            output_language: "Brazilian Portuguese".to_string(),
            reading_delay_ms: 800,
            validate_schema: true,
        }
    }
}

/// History cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Directory of the key-value store. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Storage key holding the serialized entry list.
    pub key: String,
    /// `chrono` format string for entry dates.
    pub date_format: String,
    /// Keep at most this many entries, dropping the oldest. 0 means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: None,
            key: "sciscan_history".to_string(),
            date_format: "%d/%m/%Y".to_string(),
            max_entries: None,
        }
    }
}

impl HistoryConfig {
    /// Resolve the store directory: explicit setting, else the platform data dir.
    pub fn resolve_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .or_else(|| project_dirs().map(|d| d.data_dir().join("history")))
            .unwrap_or_else(|| PathBuf::from(".sciscan").join("history"))
    }
}

/// Platform directories for SciScan.
pub fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "sciscan", "sciscan")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `SCISCAN_`)
/// 3. Workspace-local config (`.sciscan/config.toml`)
/// 4. User config (`~/.config/sciscan/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&SciscanConfig>,
) -> Result<SciscanConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(SciscanConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".sciscan").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // SCISCAN_LLM__MODEL, SCISCAN_ANALYSIS__READING_DELAY_MS, etc.
    figment = figment.merge(Env::prefixed("SCISCAN_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

/// Check whether any configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(dirs) = project_dirs()
        && dirs.config_dir().join("config.toml").exists()
    {
        return true;
    }
    workspace.is_some_and(|ws| ws.join(".sciscan").join("config.toml").exists())
}
