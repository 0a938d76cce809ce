use clap::Parser;
use std::time::Duration;

use crate::predictor::RetryPolicy;

/// Tennis match prediction service
#[derive(Parser, Debug, Clone)]
#[command(name = "tennis-predictor", version, about)]
pub struct Config {
    /// API listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "predictions.db")]
    pub database_path: String,

    /// Base URL of the model-serving service
    #[arg(long, env = "ML_SERVICE_URL", default_value = "http://localhost:5000")]
    pub ml_service_url: String,

    /// Timeout for each individual call to the model service (milliseconds)
    #[arg(long, env = "ML_SERVICE_TIMEOUT_MS", default_value = "15000")]
    pub ml_service_timeout_ms: u64,

    /// Total attempts per prediction call, including the first
    #[arg(long, env = "RETRY_MAX_ATTEMPTS", default_value = "3")]
    pub retry_max_attempts: u32,

    /// Delay after the first failed attempt (milliseconds)
    #[arg(long, env = "RETRY_BASE_DELAY_MS", default_value = "1000")]
    pub retry_base_delay_ms: u64,

    /// Backoff multiplier applied after each further failure
    #[arg(long, env = "RETRY_MULTIPLIER", default_value = "2.0")]
    pub retry_multiplier: f64,

    /// Interval between background health probes of the model service (0 disables)
    #[arg(long, env = "HEALTH_PROBE_INTERVAL_SECS", default_value = "60")]
    pub health_probe_interval_secs: u64,

    /// JSON array of players loaded into an empty player directory at startup
    #[arg(long, env = "PLAYERS_SEED_PATH")]
    pub players_seed_path: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.ml_service_url.starts_with("http://")
            || self.ml_service_url.starts_with("https://"))
        {
            anyhow::bail!("ml_service_url must start with http:// or https://");
        }
        if self.ml_service_timeout_ms == 0 {
            anyhow::bail!("ml_service_timeout_ms must be positive");
        }
        if self.retry_max_attempts == 0 {
            anyhow::bail!("retry_max_attempts must be at least 1");
        }
        if self.retry_multiplier.is_nan() || self.retry_multiplier < 1.0 {
            anyhow::bail!("retry_multiplier must be at least 1.0");
        }
        Ok(())
    }

    pub fn ml_service_timeout(&self) -> Duration {
        Duration::from_millis(self.ml_service_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            multiplier: self.retry_multiplier,
        }
    }
}
