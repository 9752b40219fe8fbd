pub mod balance_provider;
pub mod moralis;

pub use balance_provider::{ BalanceProvider, ChainNetWorth, NetWorthPayload };
pub use moralis::MoralisClient;
