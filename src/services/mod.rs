// Service modules
pub mod eligibility;
pub mod jwt_service;
pub mod ledger_service;
pub mod stripe_service;

pub use eligibility::EligibilityPolicy;
pub use jwt_service::JwtService;
pub use ledger_service::LedgerService;
pub use stripe_service::StripeService;
