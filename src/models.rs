//! Application Configuration
//! Mission: Resolve runtime settings from the environment with sane defaults

use std::path::PathBuf;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub state_dir: PathBuf,
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let api_base_url = std::env::var("OPPCONSOLE_API_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());

        let state_dir = std::env::var("OPPCONSOLE_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".oppconsole")
            });

        let http_timeout_secs = std::env::var("OPPCONSOLE_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        Ok(Self {
            api_base_url,
            state_dir,
            http_timeout_secs,
        })
    }
}
