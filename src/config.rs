use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GeminiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            model: default_model(),
            api_key: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 900,
            height: 700,
        }
    }
}

impl GeminiConfig {
    /// The configured key, else the GEMINI_API_KEY environment variable.
    /// A missing key surfaces as a call-time error, not a startup failure.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| env::var("GEMINI_API_KEY").ok().filter(|key| !key.is_empty()))
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        if config_path.exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => eprintln!("Error parsing config.toml: {}. Using defaults.", e),
                },
                Err(e) => eprintln!("Error reading config.toml: {}. Using defaults.", e),
            }
        } else {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
        }

        Config::default()
    }

    pub fn get_config_path() -> PathBuf {
        if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home).join(".config/botanica/config.toml")
        } else {
            PathBuf::from("config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.gemini.model, "gemini-3-pro-preview");
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.window.width, 900);
    }

    #[test]
    fn test_partial_gemini_section() {
        let config: Config = toml::from_str("[gemini]\napi_key = \"abc\"\n").unwrap();
        assert_eq!(config.gemini.model, "gemini-3-pro-preview");
        assert_eq!(config.gemini.api_key.as_deref(), Some("abc"));
    }
}
