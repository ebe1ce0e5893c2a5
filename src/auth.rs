use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, Result},
    models::{Role, User},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the HS256 bearer tokens issued at login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    pub email: String,
    /// Role at issue time. Informational only: the extractor re-reads the current role.
    pub role: Role,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// issue_token
///
/// Signs a token for `user` that expires after `config.token_ttl_hours`.
pub fn issue_token(user: &User, config: &AppConfig) -> Result<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(config.token_ttl_hours);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {e}")))
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an argument and
/// hand it to the authorization policy as the subject.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user is accepted.
/// 2. Bearer token extraction and HS256 validation (expiry always checked).
/// 3. User lookup, so deleted users and role changes take effect immediately.
///
/// Rejection: `AppError::Unauthorized` (401) on any authentication failure; a storage
/// failure during the lookup is a 500.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Development bypass, never honoured in production.
        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|id| Uuid::parse_str(id).ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    return Ok(AuthUser {
                        id: user.id,
                        role: user.role,
                    });
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!("rejected bearer token: {:?}", e.kind());
            AppError::Unauthorized
        })?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}
