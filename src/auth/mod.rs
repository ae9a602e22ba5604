pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::authorization::{Authorization, Bearer};
use axum_extra::TypedHeader;
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Verified caller identity, pulled from the bearer token on every
/// protected route.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .decode_claims(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        })
    }
}
