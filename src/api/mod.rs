use std::sync::Arc;

use axum::{
    extract::{ Request, State },
    http::{ header, HeaderName, HeaderValue, Method },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Router,
};
use tower_http::{
    cors::{ AllowOrigin, CorsLayer },
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

pub mod extract;
pub mod user;
pub mod wallet;

use crate::config::Config;
use crate::crypto::TokenSigner;
use crate::error::AppError;
use crate::services::{ UserService, WalletService };

#[derive(Clone)]
pub struct AppState {
    pub wallet_service: Arc<WalletService>,
    pub user_service: Arc<UserService>,
    pub token_signer: Arc<TokenSigner>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        wallet_service: Arc<WalletService>,
        user_service: Arc<UserService>,
        token_signer: Arc<TokenSigner>,
        config: Arc<Config>
    ) -> Self {
        Self {
            wallet_service,
            user_service,
            token_signer,
            config,
        }
    }
}

/// Full application router with CORS, host checking and security headers
/// configured from the active profile.
pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/api/users/register", post(user::register))
        .route("/api/users/login", post(user::login))
        .route("/api/users/me", get(user::get_profile).put(user::update_profile))
        .route("/api/wallets/add", post(wallet::add_wallet).get(wallet::list_wallets))
        .route("/api/wallets/sync", get(wallet::sync_wallets))
        .route("/api/wallets/remove", post(wallet::remove_wallet))
        .route("/api/wallets/supported_chains", get(wallet::supported_chains))
        .with_state(state);

    if !config.allowed_hosts.is_empty() {
        app = app.layer(middleware::from_fn_with_state(config.clone(), host_guard));
    }

    if config.secure {
        app = app
            .layer(
                SetResponseHeaderLayer::if_not_present(
                    header::STRICT_TRANSPORT_SECURITY,
                    HeaderValue::from_static("max-age=31536000; includeSubDomains; preload")
                )
            )
            .layer(
                SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff")
                )
            )
            .layer(
                SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY")
                )
            );
    }

    app.layer(cors_layer(&config)).layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config.allowed_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| tracing::warn!("Ignoring invalid CORS origin: {}", origin))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, HeaderName::from_static("x-requested-with")])
        .allow_credentials(true)
}

/// Reject requests addressed to a host we do not serve.
async fn host_guard(State(config): State<Arc<Config>>, request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string));

    match host {
        Some(host) if config.is_host_allowed(&host) => next.run(request).await,
        host => {
            tracing::warn!("Rejected request for disallowed host: {:?}", host);
            AppError::invalid("Invalid HTTP_HOST header").into_response()
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
