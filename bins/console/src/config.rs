use anyhow::Result;
use ctf_console_session::default_token_path;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub api_url: String,
    pub token_file: PathBuf,
    pub request_timeout: Duration,
}

impl ConsoleConfig {
    pub fn load() -> Result<Self> {
        let api_url =
            env::var("CTF_API_URL").unwrap_or_else(|_| "http://localhost:3000/api".to_string());

        let request_timeout = env::var("CTF_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(ctf_console_api_client::DEFAULT_TIMEOUT);

        Ok(Self {
            api_url,
            token_file: default_token_path(),
            request_timeout,
        })
    }
}
