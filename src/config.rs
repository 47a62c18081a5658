use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Allowed clock skew, in both directions, for signature freshness.
    /// Set via AUTHZ_SIGNATURE_TOLERANCE_SECS. Default: 300.
    pub signature_tolerance_secs: i64,
    /// Deadline applied to every repository call. Set via
    /// AUTHZ_REPOSITORY_TIMEOUT_MS. Default: 250.
    pub repository_timeout_ms: u64,
}

impl Config {
    pub fn repository_timeout(&self) -> Duration {
        Duration::from_millis(self.repository_timeout_ms)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/edge_authz".into());

    Ok(Config {
        port: std::env::var("AUTHZ_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url,
        signature_tolerance_secs: std::env::var("AUTHZ_SIGNATURE_TOLERANCE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300),
        repository_timeout_ms: std::env::var("AUTHZ_REPOSITORY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(250),
    })
}
