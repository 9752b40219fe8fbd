use axum::{ extract::State, http::StatusCode };

use crate::auth::AuthUser;
use crate::error::Result;
use crate::services::user_service::{
    LoginRequest,
    RegisterRequest,
    TokenResponse,
    UpdateProfileRequest,
    UserProfile,
    UserSummary,
};

use super::extract::Json;
use super::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>
) -> Result<(StatusCode, Json<UserSummary>)> {
    let user = state.user_service.register(request).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>
) -> Result<Json<TokenResponse>> {
    let token = state.user_service.login(request).await?;

    Ok(Json(token))
}

pub async fn get_profile(State(state): State<AppState>, user: AuthUser) -> Result<Json<UserProfile>> {
    let profile = state.user_service.get_profile(&user).await?;

    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProfileRequest>
) -> Result<Json<UserProfile>> {
    let profile = state.user_service.update_profile(&user, request).await?;

    Ok(Json(profile))
}
