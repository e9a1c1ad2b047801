use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_FILE: &str = "priority_extract";
const ENV_PREFIX: &str = "PX";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub preview_rows: usize,
    pub search: SearchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            preview_rows: 25,
            search: SearchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: String,
    pub region: Option<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub inter_call_delay_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            endpoint: "https://html.duckduckgo.com/html/".into(),
            region: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                .into(),
            timeout_secs: 20,
            max_retries: 3,
            retry_delay_secs: 5,
            inter_call_delay_secs: 2,
        }
    }
}

impl Settings {
    /// Layered: built-in defaults, then `path` (or `priority_extract.toml`
    /// in the working directory when present), then `PX_*` variables with
    /// `__` between sections, e.g. `PX_SEARCH__MAX_RETRIES=5`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_sources() {
        let s: Settings = Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.preview_rows, 25);
        assert_eq!(s.search.max_retries, 3);
        assert_eq!(s.search.retry_delay_secs, 5);
        assert_eq!(s.search.inter_call_delay_secs, 2);
        assert!(s.search.endpoint.starts_with("https://html.duckduckgo.com"));
    }

    #[test]
    fn file_values_override_defaults() {
        let s: Settings = Config::builder()
            .add_source(File::from_str(
                "preview_rows = 5\n[search]\nmax_retries = 7\nregion = \"uk-en\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(s.preview_rows, 5);
        assert_eq!(s.search.max_retries, 7);
        assert_eq!(s.search.region.as_deref(), Some("uk-en"));
        assert_eq!(s.search.timeout_secs, 20);
    }

    #[test]
    fn environment_overrides_nested_values() {
        std::env::set_var("PX_SEARCH__MAX_RETRIES", "5");
        std::env::set_var("PX_PREVIEW_ROWS", "7");
        let loaded = Settings::load(None);
        std::env::remove_var("PX_SEARCH__MAX_RETRIES");
        std::env::remove_var("PX_PREVIEW_ROWS");

        let s = loaded.unwrap();
        assert_eq!(s.search.max_retries, 5);
        assert_eq!(s.preview_rows, 7);
        assert_eq!(s.search.retry_delay_secs, 5);
    }
}
