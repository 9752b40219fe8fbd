use std::sync::Arc;

use migration::MigratorTrait;
use portfolio_tracker::{ AppError, Config, Result };
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "portfolio_tracker=debug,tower_http=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    tracing::info!(
        "Starting portfolio-tracker in {:?} mode (debug: {})",
        config.environment,
        config.debug
    );

    if config.moralis_api_key.is_empty() {
        tracing::warn!("MORALIS_API_KEY is not set; balance lookups will be rejected by the provider");
    }

    // Initialize database connection
    let db = sea_orm::Database::connect(&config.database_url).await?;

    tracing::info!("Database connected successfully");

    // Run migrations
    migration::Migrator::up(&db, None).await?;

    tracing::info!("Migrations completed successfully");

    // Balance provider
    let provider = Arc::new(
        portfolio_tracker::providers::MoralisClient::new(
            &config.moralis_base_url,
            &config.moralis_api_key
        )?
    );

    let token_signer = Arc::new(
        portfolio_tracker::crypto::TokenSigner::new(&config.jwt_secret, config.token_ttl_hours)
    );

    // Initialize repositories
    let wallet_repository = Arc::new(portfolio_tracker::db::WalletRepository::new(db.clone()));
    let user_repository = Arc::new(portfolio_tracker::db::UserRepository::new(db));

    // Initialize services
    let wallet_service = Arc::new(
        portfolio_tracker::services::WalletService::new(wallet_repository, provider)
    );
    let user_service = Arc::new(
        portfolio_tracker::services::UserService::new(user_repository, token_signer.clone())
    );

    let config = Arc::new(config);

    // Create app state
    let app_state = portfolio_tracker::api::AppState::new(
        wallet_service,
        user_service,
        token_signer,
        config.clone()
    );

    // Build application router
    let app = portfolio_tracker::api::router(app_state);

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener
        ::bind(&addr).await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    axum::serve(listener, app).await.map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(())
}
