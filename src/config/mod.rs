use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub org_id: String,
    pub api_token: String,
    pub workbook_dir: PathBuf,
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get_env = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{} is not set", key))
        };

        Ok(Self {
            api_url: get_env("MIST_API_URL", "https://api.eu.mist.com"),
            org_id: required("MIST_ORG_ID")?,
            api_token: required("MIST_API_TOKEN")?,
            workbook_dir: PathBuf::from(get_env("WORKBOOK_DIR", "evpn-mh")),
            timeout: Duration::from_secs(get_env("MIST_TIMEOUT_SECS", "30").parse().unwrap_or(30)),
        })
    }

    /// Command-line workbook path takes precedence over WORKBOOK_DIR
    pub fn with_workbook_dir(mut self, dir: Option<String>) -> Self {
        if let Some(dir) = dir {
            self.workbook_dir = PathBuf::from(dir);
        }
        self
    }
}
