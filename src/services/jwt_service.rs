use crate::{config::AuthConfig, error::Result};
use entity::sea_orm_active_enums::AccountTier;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// JWT claims structure, shared with the web app that issues the tokens
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user_id)
    pub sub: String,
    /// Account tier
    pub tier: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Validates access tokens minted by the main web app with the shared
/// HS256 secret. This service never issues tokens in production; the
/// encoding half exists for tests and local tooling.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// Mint a short-lived token (tests and local tooling only).
    pub fn generate_token(&self, user_id: Uuid, tier: &AccountTier) -> Result<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            tier: match tier {
                AccountTier::Free => "free".to_string(),
                AccountTier::Premium => "premium".to_string(),
            },
            iat: now,
            exp: now + 15 * 60,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| crate::error::ApiError::Internal(e.into()))?;

        Ok(token)
    }

    /// Validate and decode an access token.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    crate::error::ApiError::ExpiredToken
                }
                _ => crate::error::ApiError::InvalidToken(e.to_string()),
            })?;

        Ok(token_data.claims)
    }

    /// Extract user_id from claims
    pub fn user_id_from_claims(claims: &Claims) -> Result<Uuid> {
        Uuid::parse_str(&claims.sub)
            .map_err(|e| crate::error::ApiError::InvalidToken(format!("Invalid user_id: {}", e)))
    }

    /// Extract account tier from claims
    pub fn tier_from_claims(claims: &Claims) -> Result<AccountTier> {
        match claims.tier.as_str() {
            "free" => Ok(AccountTier::Free),
            "premium" => Ok(AccountTier::Premium),
            _ => Err(crate::error::ApiError::InvalidToken(format!(
                "Invalid account tier: {}",
                claims.tier
            ))),
        }
    }
}
