use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub stripe: StripeConfig,
    pub eligibility: EligibilityConfig,
    /// Credit packages sold through Stripe Checkout, keyed by package name.
    /// Settlement amounts are re-derived from this catalog rather than
    /// trusted from checkout metadata.
    pub packages: HashMap<String, PackageConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret with the web app, which issues the access tokens.
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    /// Webhook signing secret (whsec_...) for the configured endpoint.
    pub webhook_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EligibilityConfig {
    /// Fixed credit-to-minutes multiplier.
    pub minutes_per_credit: i32,
    /// Minimum minutes required to start a general-English conversation.
    pub general_english_min_minutes: i32,
    /// Minimum minutes required to start a mock-test conversation.
    /// Mock tests run longer, so the bar is higher.
    pub mock_test_min_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageConfig {
    pub credits: i32,
    pub price_cents: i64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        // Build config from config.yml (required) with environment variable overrides
        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("FLUENTA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
