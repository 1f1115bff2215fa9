use crate::{
    config::Config,
    services::{EligibilityPolicy, JwtService, LedgerService, StripeService},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: Arc<redis::Client>,
    pub ledger_service: Arc<LedgerService>,
    pub eligibility: Arc<EligibilityPolicy>,
    pub stripe_service: Arc<StripeService>,
    pub jwt_service: Arc<JwtService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database
        let db = sea_orm::Database::connect(&config.database.url).await?;

        // Connect to Redis
        let redis = Arc::new(redis::Client::open(config.redis.url.as_str())?);

        // Initialize services
        let ledger_service = Arc::new(LedgerService::new(db.clone()));
        let eligibility = Arc::new(EligibilityPolicy::new(&config.eligibility));
        let stripe_service = Arc::new(StripeService::new(&config.stripe));
        let jwt_service = Arc::new(JwtService::new(&config.auth));

        Ok(Self {
            db,
            redis,
            ledger_service,
            eligibility,
            stripe_service,
            jwt_service,
            config: Arc::new(config),
        })
    }
}
