use axum::{ extract::State, http::StatusCode };
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::services::wallet_service::{ SupportedChain, SyncResult, WalletBalance, WalletRequest };
use crate::services::WalletService;

use super::extract::Json;
use super::AppState;

pub async fn add_wallet(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<WalletRequest>
) -> Result<(StatusCode, Json<WalletBalance>)> {
    let added = state.wallet_service.add_wallet(&user, request).await?;

    let status = if added.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(added.wallet)))
}

pub async fn list_wallets(
    State(state): State<AppState>,
    user: AuthUser
) -> Result<Json<Vec<WalletBalance>>> {
    let wallets = state.wallet_service.list_wallets(&user).await?;

    Ok(Json(wallets))
}

pub async fn sync_wallets(State(state): State<AppState>, user: AuthUser) -> Result<Json<SyncResult>> {
    let result = state.wallet_service.sync_all(&user).await?;

    Ok(Json(result))
}

pub async fn remove_wallet(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<WalletRequest>
) -> Result<Json<MessageResponse>> {
    let message = state.wallet_service.remove_wallet(&user, request).await?;

    Ok(Json(MessageResponse { message }))
}

pub async fn supported_chains() -> Json<SupportedChainsResponse> {
    Json(SupportedChainsResponse {
        supported_chains: WalletService::supported_chains(),
    })
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct SupportedChainsResponse {
    pub supported_chains: Vec<SupportedChain>,
}
