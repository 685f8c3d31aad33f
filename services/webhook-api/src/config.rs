//! Configuration for the Webhook API service.

use std::time::Duration;

use opsdesk_webhook_core::VerificationMode;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Production,
    Development,
}

impl AppEnv {
    fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "production" => Ok(Self::Production),
            "development" => Ok(Self::Development),
            _ => Err(ConfigError::Invalid("APP_ENV")),
        }
    }
}

/// Webhook API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Invoice Ninja webhook secret (unset means Ninja deliveries are rejected)
    pub ninja_webhook_secret: Option<String>,
    /// Admin bearer token for the replay endpoints
    pub admin_api_key: String,
    /// n8n workflow trigger URL (unset disables the trigger)
    pub n8n_webhook_url: Option<String>,
    /// n8n API key
    pub n8n_api_key: Option<String>,
    /// Deployment environment
    pub app_env: AppEnv,
    /// Signature verification mode
    pub verification_mode: VerificationMode,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        let stripe_webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?;

        let ninja_webhook_secret = std::env::var("INVOICENINJA_WEBHOOK_SECRET").ok();

        let admin_api_key =
            std::env::var("ADMIN_API_KEY").map_err(|_| ConfigError::Missing("ADMIN_API_KEY"))?;

        let n8n_webhook_url = std::env::var("N8N_WEBHOOK_URL").ok();
        let n8n_api_key = std::env::var("N8N_API_KEY").ok();

        let app_env = AppEnv::parse(
            &std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        )?;

        let bypass_requested = std::env::var("WEBHOOK_VERIFY_DISABLED")
            .map(|v| v == "true")
            .unwrap_or(false);
        let verification_mode = verification_mode(app_env, bypass_requested)?;

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            http_port,
            database_url,
            stripe_webhook_secret,
            ninja_webhook_secret,
            admin_api_key,
            n8n_webhook_url,
            n8n_api_key,
            app_env,
            verification_mode,
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

/// Resolve the verification mode. Bypass is a local-development aid and is
/// refused outright in production.
fn verification_mode(
    app_env: AppEnv,
    bypass_requested: bool,
) -> Result<VerificationMode, ConfigError> {
    match (app_env, bypass_requested) {
        (AppEnv::Production, true) => Err(ConfigError::BypassInProduction),
        (_, true) => {
            tracing::warn!("Webhook signature verification is DISABLED");
            Ok(VerificationMode::Bypass)
        }
        (_, false) => Ok(VerificationMode::Enforce),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("WEBHOOK_VERIFY_DISABLED is not allowed when APP_ENV=production")]
    BypassInProduction,
}
