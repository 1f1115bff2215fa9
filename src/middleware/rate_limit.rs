//! Rate limiting middleware using Redis
//!
//! Sliding-window counter per user, applied to session-start requests:
//! each start spins up an upstream conversational-AI session, which is
//! the most expensive thing this service can trigger.

use crate::{
    error::{ApiError, Result},
    middleware::jwt_auth::UserIdentity,
};
use axum::{extract::Request, middleware::Next, response::Response};
use entity::sea_orm_active_enums::AccountTier;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use tracing::{debug, warn};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per window for free tier
    pub free_tier_rpm: u32,
    /// Requests per window for premium tier
    pub premium_tier_rpm: u32,
    /// Window size in seconds
    pub window_seconds: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            free_tier_rpm: 10,
            premium_tier_rpm: 60,
            window_seconds: 60,
        }
    }
}

/// Rate limiting middleware
///
/// Returns 429 Too Many Requests when the window budget is exhausted.
pub fn rate_limit_middleware(
    redis_client: Arc<Client>,
    config: RateLimitConfig,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response>> + Send>>
       + Clone {
    move |request: Request, next: Next| {
        let redis_client = redis_client.clone();
        let config = config.clone();

        Box::pin(async move {
            // Identity comes from jwt_auth_middleware, which must run first
            let identity = request.extensions().get::<UserIdentity>().ok_or_else(|| {
                ApiError::Internal(anyhow::anyhow!(
                    "Rate limit middleware requires jwt_auth_middleware"
                ))
            })?;

            let limit = match identity.tier {
                AccountTier::Free => config.free_tier_rpm,
                AccountTier::Premium => config.premium_tier_rpm,
            };

            let allowed = check_rate_limit(
                &redis_client,
                &identity.user_id.to_string(),
                limit,
                config.window_seconds,
            )
            .await?;

            if !allowed {
                warn!(
                    "Rate limit exceeded for user: {} (tier: {:?})",
                    identity.user_id, identity.tier
                );
                return Err(ApiError::RateLimitExceeded);
            }

            debug!(
                "Rate limit check passed for user: {} (tier: {:?})",
                identity.user_id, identity.tier
            );

            Ok(next.run(request).await)
        })
    }
}

/// Check rate limit using Redis sliding window counter
///
/// Returns true if request is allowed, false if rate limit exceeded.
async fn check_rate_limit(
    redis_client: &Client,
    user_id: &str,
    limit: u32,
    window_seconds: u32,
) -> Result<bool> {
    let mut conn = redis_client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis connection failed: {}", e)))?;

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let key = format!("rate_limit:sessions:{}", user_id);
    let window_start = now - window_seconds as u64;

    // Sorted set of request timestamps; trim entries outside the window
    let _: () = conn
        .zrembyscore(&key, 0, window_start as f64)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis ZREMRANGEBYSCORE failed: {}", e)))?;

    let count: u32 = conn
        .zcard(&key)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis ZCARD failed: {}", e)))?;

    if count >= limit {
        return Ok(false);
    }

    let member = format!("{}:{}", now, uuid::Uuid::new_v4());
    let _: () = conn
        .zadd(&key, member, now as f64)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis ZADD failed: {}", e)))?;

    let _: () = conn
        .expire(&key, (window_seconds + 10) as i64)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Redis EXPIRE failed: {}", e)))?;

    Ok(true)
}

/// Create rate limit middleware with default configuration
pub fn create_rate_limiter(
    redis_client: Arc<Client>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response>> + Send>>
       + Clone {
    rate_limit_middleware(redis_client, RateLimitConfig::default())
}
