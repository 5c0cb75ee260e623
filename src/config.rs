//! Startup configuration, read once: toml file next to the executable,
//! falling back to defaults plus environment variables.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Generation provider: "MOCK" or "OPENAI".
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_llm_api_url")]
    pub llm_api_url: String,
    #[serde(default)]
    pub llm_api_key: Option<String>,

    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_llm_provider() -> String {
    "MOCK".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_database_path() -> String {
    "stanpal_memory.db".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            llm_provider: default_llm_provider(),
            llm_model: default_llm_model(),
            llm_api_url: default_llm_api_url(),
            llm_api_key: None,
            database_path: default_database_path(),
            port: default_port(),
        }
    }
}

impl BotConfig {
    /// Get the directory containing the executable
    fn get_base_dir() -> PathBuf {
        match std::env::current_exe() {
            Ok(exe_path) => exe_path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            Err(_) => PathBuf::from("."),
        }
    }

    /// Get the path to the config file (relative to executable)
    pub fn config_path() -> PathBuf {
        Self::get_base_dir().join("stanpal_config.toml")
    }

    /// Load config from stanpal_config.toml (next to executable), falling
    /// back to defaults plus environment variables.
    pub fn load() -> Self {
        let path = Self::config_path();

        if let Ok(contents) = fs::read_to_string(&path) {
            match toml::from_str::<BotConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    tracing::error!("Failed to parse {:?}: {}", path, e);
                }
            }
        }

        tracing::warn!("No config file found, using defaults + env vars");
        Self::from_env()
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(provider) = env::var("LLM_PROVIDER") {
            config.llm_provider = provider;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            config.llm_model = model;
        }

        if let Ok(url) = env::var("LLM_API_URL") {
            config.llm_api_url = url;
        }

        if let Ok(key) = env::var("LLM_API_KEY") {
            config.llm_api_key = Some(key);
        }

        if let Ok(path) = env::var("DB_PATH") {
            config.database_path = path;
        }

        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }

        config
    }
}
