//! Runtime configuration
//!
//! Paths and the AI timeout come from CLI flags, which fall back to their
//! `PRINTFLOW_*` environment variables. A missing Hugging Face key is normal
//! and only disables AI generation.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

/// Environment variables holding the Hugging Face key, in precedence order.
pub const HF_KEY_VARS: [&str; 2] = ["HUGGINGFACE_API_KEY", "HF_TOKEN"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root of the artifact store (mockups, labels, uploads).
    pub data_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub store_file: PathBuf,
    #[serde(skip_serializing)]
    pub hf_api_key: Option<String>,
    pub ai_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            templates_dir: PathBuf::from("assets/templates"),
            store_file: PathBuf::from("printflow.json"),
            hf_api_key: None,
            ai_timeout_secs: DEFAULT_AI_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Defaults plus the Hugging Face key from the process environment.
    pub fn from_env() -> Self {
        Self {
            hf_api_key: hf_api_key_from(|key| std::env::var(key).ok()),
            ..Self::default()
        }
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
}

/// First non-blank value among `HF_KEY_VARS`.
pub fn hf_api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    HF_KEY_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}
