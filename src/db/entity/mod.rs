pub mod user;
pub mod wallet;
pub mod wallet_user;

pub use user::Entity as User;
pub use wallet::Entity as Wallet;
pub use wallet_user::Entity as WalletUser;
