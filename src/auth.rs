//! Caller identity.
//!
//! Handlers take an [`AuthUser`] argument to require a valid bearer token;
//! the value is then passed explicitly into every service call.

use axum::{ extract::FromRequestParts, http::{ header::AUTHORIZATION, request::Parts } };
use uuid::Uuid;

use crate::api::AppState;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts.headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Authentication credentials were not provided".to_string()))?
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(||
                AppError::Unauthorized(
                    "Invalid authorization format. Expected: 'Bearer <token>'".to_string()
                )
            )?;

        let claims = state.token_signer.verify(token.trim())?;

        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}
