use std::{collections::HashMap, fs};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub session_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:4000/api".into(),
            request_timeout_secs: 10,
            session_dir: "./data".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("backoffice.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Ok(v) = std::env::var("SESSION_DIR") {
        settings.session_dir = v;
    }
    if let Ok(v) = std::env::var("APP__SESSION_DIR") {
        settings.session_dir = v;
    }

    if let Ok(v) = std::env::var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("api_base_url") {
            settings.api_base_url = v.clone();
        }
        if let Some(v) = file_cfg.get("session_dir") {
            settings.session_dir = v.clone();
        }
        if let Some(v) = file_cfg.get("request_timeout_secs") {
            if let Ok(parsed) = v.parse::<u64>() {
                settings.request_timeout_secs = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_api() {
        let settings = Settings::default();
        assert_eq!(settings.api_base_url, "http://127.0.0.1:4000/api");
        assert_eq!(settings.request_timeout_secs, 10);
        assert_eq!(settings.session_dir, "./data");
    }

    #[test]
    fn file_config_overrides_defaults() {
        let mut settings = Settings::default();
        apply_file_config(
            &mut settings,
            "api_base_url = \"https://admin.example.com/api\"\nrequest_timeout_secs = \"30\"\n",
        );
        assert_eq!(settings.api_base_url, "https://admin.example.com/api");
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.session_dir, "./data");
    }

    #[test]
    fn malformed_file_config_is_ignored() {
        let mut settings = Settings::default();
        apply_file_config(&mut settings, "not really toml [");
        assert_eq!(settings.api_base_url, Settings::default().api_base_url);
    }
}
