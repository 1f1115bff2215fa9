// Request/Response models
pub mod common;
pub mod credits;
pub mod sessions;
pub mod webhooks;
