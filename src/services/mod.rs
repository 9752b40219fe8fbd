pub mod user_service;
pub mod wallet_service;

pub use user_service::UserService;
pub use wallet_service::WalletService;
