use migration::{ Migrator, MigratorTrait };
use sea_orm::{ ConnectOptions, Database, DatabaseConnection };

use super::entity::user;
use super::UserRepository;

/// Fresh in-memory SQLite database with the real schema applied.
pub async fn setup_db() -> DatabaseConnection {
    // Every pooled connection would get its own empty in-memory database
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub async fn create_user(db: &DatabaseConnection, email: &str) -> user::Model {
    UserRepository::new(db.clone())
        .create(email.to_string(), "not-a-real-hash".to_string()).await
        .expect("create user")
}
