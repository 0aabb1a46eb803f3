use crate::coordinator::CoordinatorOptions;
use crate::store::{CaseMatching, DEFAULT_RESULT_LIMIT, MatchMode, StoreOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "typeahead";
const CONFIG_FILE: &str = "config.json";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub search: SearchSettings,
}

/// Store and coordinator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub match_mode: MatchMode,

    #[serde(default)]
    pub case_matching: CaseMatching,

    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Delay after the last keystroke before a query runs
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Clear visible results while a query runs
    #[serde(default = "default_true")]
    pub clear_before_query: bool,

    /// Cached (term, limit) results per store; 0 disables the cache
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    #[serde(default = "default_max_term_len")]
    pub max_term_len: usize,

    /// Payload field (e.g. "iata_code") also matched as a substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_field: Option<String>,
}

fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_cache_size() -> usize {
    crate::store::DEFAULT_CACHE_SIZE
}

fn default_max_term_len() -> usize {
    crate::store::DEFAULT_MAX_TERM_LEN
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::default(),
            case_matching: CaseMatching::default(),
            result_limit: default_result_limit(),
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            clear_before_query: default_true(),
            cache_size: default_cache_size(),
            max_term_len: default_max_term_len(),
            code_field: None,
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load config from `path`, or return default if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            match_mode: self.search.match_mode,
            case_matching: self.search.case_matching,
            max_term_len: self.search.max_term_len,
            cache_size: self.search.cache_size,
            code_field: self.search.code_field.clone(),
        }
    }

    pub fn coordinator_options(&self) -> CoordinatorOptions {
        let s = &self.search;
        CoordinatorOptions {
            debounce: Duration::from_millis(s.debounce_ms),
            // A zero poll interval would spin
            poll_interval: Duration::from_millis(s.poll_interval_ms.max(1)),
            result_limit: s.result_limit,
            query_timeout: Duration::from_millis(s.query_timeout_ms),
            clear_before_query: s.clear_before_query,
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create {}", app_dir.display()))?;
    Ok(app_dir)
}
