use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL used when building short links, e.g. "https://go.example.com"
    /// Never has a trailing slash.
    pub base_url: String,

    /// JSON file the store is loaded from at startup and saved to after each create.
    pub data_file: PathBuf,

    /// How long in-flight requests may keep running after a shutdown signal
    /// before the final save.
    pub shutdown_grace: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1–65535)")?;

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();

        let shutdown_grace_secs = std::env::var("SHUTDOWN_GRACE_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse::<u64>()
            .unwrap_or(5);

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            base_url,
            data_file: std::env::var("DATA_FILE")
                .unwrap_or_else(|_| "data.json".into())
                .into(),
            shutdown_grace: Duration::from_secs(shutdown_grace_secs),
        })
    }

    /// Full public URL for a short id.
    pub fn short_url(&self, short_id: &str) -> String {
        format!("{}/{}", self.base_url, short_id)
    }
}
