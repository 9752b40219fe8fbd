pub mod config;
pub mod enums;
pub mod error;
pub mod auth;
pub mod crypto;
pub mod db;
pub mod providers;
pub mod services;
pub mod api;

pub use config::Config;
pub use enums::Chain;
pub use error::{ AppError, Result };
