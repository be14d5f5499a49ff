//! Runtime settings from the environment and `.env`

use crate::agent::LlmSettings;
use std::path::PathBuf;
use tracing::debug;
use tripcraft_error::{Error, Result};
use tripcraft_llm::ProviderConfig;

pub const DEFAULT_MODEL: &str = "gpt-4-1106-preview";
pub const DEFAULT_SUMMARY_MODEL: &str = "gpt-4";
pub const DEFAULT_SESSION_DIR: &str = ".tripcraft_sessions";
pub const DEFAULT_CONF_DIR: &str = "conf";
pub const DEFAULT_AIRPORTS_PATH: &str = tripcraft_tools::airports::DEFAULT_AIRPORTS_PATH;

/// Everything the planner needs from its surroundings
#[derive(Clone, PartialEq)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub rapid_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub model: String,
    pub summary_model: String,
    pub output_dir: PathBuf,
    pub session_dir: PathBuf,
    pub conf_dir: PathBuf,
    pub airports_path: PathBuf,
}

impl Settings {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL"),
            rapid_api_key: get("RAPID_API_KEY"),
            tavily_api_key: get("TAVILY_API_KEY"),
            model: get("TRIPCRAFT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            summary_model: get("TRIPCRAFT_SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.to_string()),
            output_dir: get("TRIPCRAFT_OUTPUT_DIR").unwrap_or_else(|| ".".into()).into(),
            session_dir: get("TRIPCRAFT_SESSION_DIR")
                .unwrap_or_else(|| DEFAULT_SESSION_DIR.into())
                .into(),
            conf_dir: DEFAULT_CONF_DIR.into(),
            airports_path: DEFAULT_AIRPORTS_PATH.into(),
        }
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.conf_dir.join("tasks_config.yml")
    }

    pub fn agents_path(&self) -> PathBuf {
        self.conf_dir.join("agents_config.yml")
    }

    /// OpenAI provider configuration; fails before anything else runs if the key is absent
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let key = required(&self.openai_api_key, "OPENAI_API_KEY")?;
        Ok(ProviderConfig::openai(key)
            .with_model(&self.model)
            .with_base_url(self.openai_base_url.clone()))
    }

    /// Model settings shared by every agent: temperature 0, seed 41
    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings::new(&self.model)
    }

    pub fn rapid_api_key(&self) -> Result<&str> {
        required(&self.rapid_api_key, "RAPID_API_KEY")
    }

    pub fn tavily_api_key(&self) -> Result<&str> {
        required(&self.tavily_api_key, "TAVILY_API_KEY")
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str> {
    value.as_deref().ok_or_else(|| {
        Error::config_invalid(format!("{} is not set", name))
            .with_operation("settings::required")
            .with_context("variable", name)
    })
}

// Keys stay out of logs
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Settings")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("rapid_api_key", &redact(&self.rapid_api_key))
            .field("tavily_api_key", &redact(&self.tavily_api_key))
            .field("model", &self.model)
            .field("summary_model", &self.summary_model)
            .field("output_dir", &self.output_dir)
            .field("session_dir", &self.session_dir)
            .field("conf_dir", &self.conf_dir)
            .field("airports_path", &self.airports_path)
            .finish()
    }
}
