use std::sync::Arc;

use chrono::{ DateTime, Utc };
use rust_decimal::Decimal;
use serde::{ Deserialize, Serialize };

use crate::auth::AuthUser;
use crate::db::{ entity::wallet, WalletRepository };
use crate::enums::Chain;
use crate::error::{ AppError, Result };
use crate::providers::BalanceProvider;

const MIN_ADDRESS_LEN: usize = 26;
const MAX_ADDRESS_LEN: usize = 255;

pub struct WalletService {
    repository: Arc<WalletRepository>,
    provider: Arc<dyn BalanceProvider>,
}

/// Body of the add and remove endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletRequest {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletBalance {
    pub address: String,
    pub chain: String,
    pub balance_usd: Option<Decimal>,
    pub last_synced_at: DateTime<Utc>,
}

impl From<wallet::Model> for WalletBalance {
    fn from(wallet: wallet::Model) -> Self {
        Self {
            address: wallet.address,
            chain: wallet.chain,
            // Stored as NUMERIC(18, 2); some backends hand it back with a shorter scale
            balance_usd: wallet.balance_usd.map(|mut balance| {
                balance.rescale(2);
                balance
            }),
            last_synced_at: wallet.last_synced_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddedWallet {
    pub wallet: WalletBalance,
    /// False when the wallet was already tracked by someone and only its balance was refreshed.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub wallets: Vec<WalletBalance>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedChain {
    pub id: &'static str,
    pub name: &'static str,
}

impl WalletService {
    pub fn new(repository: Arc<WalletRepository>, provider: Arc<dyn BalanceProvider>) -> Self {
        Self {
            repository,
            provider,
        }
    }

    /// Start tracking a wallet for the user. Doubles as the wallet's first sync.
    pub async fn add_wallet(&self, user: &AuthUser, request: WalletRequest) -> Result<AddedWallet> {
        let (address, chain) = Self::parse_request(&request)?;

        let address_len = address.chars().count();
        if address_len < MIN_ADDRESS_LEN {
            return Err(
                AppError::invalid_field(
                    "address",
                    format!("Ensure this field has at least {} characters.", MIN_ADDRESS_LEN)
                )
            );
        }
        if address_len > MAX_ADDRESS_LEN {
            return Err(
                AppError::invalid_field(
                    "address",
                    format!("Ensure this field has no more than {} characters.", MAX_ADDRESS_LEN)
                )
            );
        }

        if let Some(existing) = self.repository.find_by_address_and_chain(address, chain.as_str()).await? {
            if self.repository.is_linked(user.user_id, existing.id).await? {
                return Err(
                    AppError::invalid("You have already added this wallet address for this blockchain.")
                );
            }
        }

        let payload = self.provider.fetch_net_worth(address, Some(chain)).await?;
        let entry = payload
            .chain_entry(chain)
            .ok_or_else(|| AppError::Provider(format!("No data found for chain: {}", chain)))?;

        let (wallet, created) = self.repository.upsert_and_link(
            user.user_id,
            address,
            chain.as_str(),
            entry.balance_usd()
        ).await?;

        tracing::info!(
            "User {} added wallet {} ({}), created: {}",
            user.user_id,
            wallet.address,
            wallet.chain,
            created
        );

        Ok(AddedWallet {
            wallet: wallet.into(),
            created,
        })
    }

    pub async fn list_wallets(&self, user: &AuthUser) -> Result<Vec<WalletBalance>> {
        let wallets = self.repository.find_by_user(user.user_id).await?;

        Ok(wallets.into_iter().map(WalletBalance::from).collect())
    }

    /// Refresh the balance of every wallet the user tracks, one at a time.
    ///
    /// A wallet the provider cannot report on, or whose new balance cannot be
    /// stored, is logged and left out of the result; it never fails the batch.
    pub async fn sync_all(&self, user: &AuthUser) -> Result<SyncResult> {
        let wallets = self.repository.find_by_user(user.user_id).await?;
        let mut synced = Vec::with_capacity(wallets.len());

        for wallet in wallets {
            let chain = match wallet.chain.parse::<Chain>() {
                Ok(chain) => chain,
                Err(e) => {
                    tracing::warn!("Skipping wallet {} with unknown chain: {}", wallet.address, e);
                    continue;
                }
            };

            let payload = match self.provider.fetch_net_worth(&wallet.address, Some(chain)).await {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!("Failed to sync wallet {} ({}): {}", wallet.address, wallet.chain, e);
                    continue;
                }
            };

            let Some(entry) = payload.chain_entry(chain) else {
                tracing::warn!("No data found for wallet {} on chain {}", wallet.address, wallet.chain);
                continue;
            };

            let address = wallet.address.clone();
            let chain_id = wallet.chain.clone();
            match self.repository.update_balance(wallet, entry.balance_usd()).await {
                Ok(wallet) => synced.push(WalletBalance::from(wallet)),
                Err(e) => {
                    tracing::warn!("Failed to store balance for wallet {} ({}): {}", address, chain_id, e);
                }
            }
        }

        tracing::info!("Synced {} wallets for user {}", synced.len(), user.user_id);

        Ok(SyncResult {
            count: synced.len(),
            wallets: synced,
        })
    }

    /// Stop tracking a wallet. The shared wallet record is kept for other users.
    pub async fn remove_wallet(&self, user: &AuthUser, request: WalletRequest) -> Result<String> {
        let address = request.address.as_deref().map(str::trim).unwrap_or_default();
        let chain = request.chain.as_deref().map(str::trim).unwrap_or_default();

        if address.is_empty() || chain.is_empty() {
            return Err(
                AppError::invalid("Missing required fields: address and chain must be provided")
            );
        }

        // Unknown chains cannot be linked, so they fall through to not-found
        let stored_chain = chain
            .parse::<Chain>()
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|_| chain.to_string());

        let removed = self.repository.unlink(user.user_id, address, &stored_chain).await?;

        if removed == 0 {
            return Err(
                AppError::NotFound(
                    format!(
                        "Wallet with address {} on chain {} not found in your portfolio",
                        address,
                        chain
                    )
                )
            );
        }

        tracing::info!("User {} removed wallet {} ({})", user.user_id, address, stored_chain);

        Ok(format!("Wallet {} ({}) has been removed from your portfolio", address, chain))
    }

    pub fn supported_chains() -> Vec<SupportedChain> {
        Chain::all()
            .iter()
            .map(|chain| SupportedChain {
                id: chain.provider_id(),
                name: chain.display_name(),
            })
            .collect()
    }

    fn parse_request(request: &WalletRequest) -> Result<(&str, Chain)> {
        let address = request.address.as_deref().map(str::trim).unwrap_or_default();
        let chain = request.chain.as_deref().map(str::trim).unwrap_or_default();

        if address.is_empty() || chain.is_empty() {
            return Err(
                AppError::invalid("Missing required fields: address and chain must be provided")
            );
        }

        Ok((address, chain.parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entity::{ Wallet, WalletUser };
    use crate::db::test_support::{ create_user, setup_db };
    use crate::providers::{ ChainNetWorth, NetWorthPayload };
    use async_trait::async_trait;
    use sea_orm::{ ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter };
    use std::collections::HashMap;
    use std::str::FromStr;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves `networth_usd` per address; unknown addresses fail like a provider outage.
    #[derive(Default)]
    struct FakeProvider {
        balances: Mutex<HashMap<String, String>>,
        calls: AtomicUsize,
        /// Wallet row deleted while its balance is being fetched.
        vanishing: Mutex<Option<(DatabaseConnection, String)>>,
    }

    impl FakeProvider {
        fn set(&self, address: &str, networth: &str) {
            self.balances.lock().unwrap().insert(address.to_string(), networth.to_string());
        }

        fn fail(&self, address: &str) {
            self.balances.lock().unwrap().remove(address);
        }

        fn vanish_on_fetch(&self, db: &DatabaseConnection, address: &str) {
            *self.vanishing.lock().unwrap() = Some((db.clone(), address.to_string()));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BalanceProvider for FakeProvider {
        async fn fetch_net_worth(
            &self,
            address: &str,
            chain: Option<Chain>
        ) -> Result<NetWorthPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let vanishing = self.vanishing.lock().unwrap().clone();
            if let Some((db, target)) = vanishing {
                if target == address {
                    Wallet::delete_many()
                        .filter(wallet::Column::Address.eq(address))
                        .exec(&db).await
                        .unwrap();
                }
            }

            let networth = self.balances
                .lock()
                .unwrap()
                .get(address)
                .cloned()
                .ok_or_else(|| AppError::Provider("Moralis API error: 500, upstream down".into()))?;

            let chain = chain.unwrap_or(Chain::Eth);
            Ok(NetWorthPayload {
                chains: vec![ChainNetWorth {
                    chain: chain.provider_id().to_string(),
                    balance_usd: None,
                    networth_usd: Decimal::from_str(&networth).ok(),
                }],
            })
        }
    }

    struct Fixture {
        db: DatabaseConnection,
        provider: Arc<FakeProvider>,
        service: WalletService,
    }

    async fn fixture() -> Fixture {
        let db = setup_db().await;
        let provider = Arc::new(FakeProvider::default());
        let service = WalletService::new(
            Arc::new(WalletRepository::new(db.clone())),
            provider.clone()
        );
        Fixture { db, provider, service }
    }

    async fn user(db: &DatabaseConnection, email: &str) -> AuthUser {
        let user = create_user(db, email).await;
        AuthUser {
            user_id: user.id,
            email: user.email,
        }
    }

    fn address(fill: char) -> String {
        format!("0x{}", fill.to_string().repeat(40))
    }

    fn request(address: &str, chain: &str) -> WalletRequest {
        WalletRequest {
            address: Some(address.to_string()),
            chain: Some(chain.to_string()),
        }
    }

    fn usd(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    async fn stored_balance(db: &DatabaseConnection, address: &str) -> Option<Decimal> {
        Wallet::find()
            .all(db).await
            .unwrap()
            .into_iter()
            .find(|w| w.address == address)
            .and_then(|w| w.balance_usd)
    }

    #[tokio::test]
    async fn test_add_creates_wallet_and_link() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;
        let addr = address('a');
        f.provider.set(&addr, "42.50");

        let added = f.service.add_wallet(&alice, request(&addr, "eth")).await.unwrap();

        assert!(added.created);
        assert_eq!(added.wallet.balance_usd, Some(usd("42.50")));
        assert_eq!(added.wallet.chain, "eth");
        assert_eq!(Wallet::find().count(&f.db).await.unwrap(), 1);
        assert_eq!(WalletUser::find().count(&f.db).await.unwrap(), 1);
        assert_eq!(stored_balance(&f.db, &addr).await, Some(usd("42.50")));
    }

    #[tokio::test]
    async fn test_adding_twice_does_not_duplicate_link() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;
        let addr = address('a');
        f.provider.set(&addr, "1.00");

        f.service.add_wallet(&alice, request(&addr, "eth")).await.unwrap();
        let err = f.service.add_wallet(&alice, request(&addr, "ETH")).await.unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(WalletUser::find().count(&f.db).await.unwrap(), 1);
        assert_eq!(f.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_on_add_writes_nothing() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;

        let err = f.service.add_wallet(&alice, request(&address('b'), "eth")).await.unwrap_err();

        assert!(matches!(err, AppError::Provider(_)));
        assert_eq!(Wallet::find().count(&f.db).await.unwrap(), 0);
        assert_eq!(WalletUser::find().count(&f.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_validates_before_calling_provider() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;

        let err = f.service.add_wallet(&alice, request("0x1234", "eth")).await.unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("address")),
            other => panic!("unexpected error: {:?}", other),
        }

        let err = f.service.add_wallet(&alice, request(&address('c'), "dogechain")).await.unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("chain")),
            other => panic!("unexpected error: {:?}", other),
        }

        let err = f.service.add_wallet(&alice, WalletRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: None, .. }));

        assert_eq!(f.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_remove_unlinked_wallet_is_not_found() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;
        let bob = user(&f.db, "bob@example.com").await;
        let addr = address('a');
        f.provider.set(&addr, "5.00");
        f.service.add_wallet(&bob, request(&addr, "eth")).await.unwrap();

        let err = f.service.remove_wallet(&alice, request(&addr, "eth")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = f.service.remove_wallet(&alice, request(&address('z'), "bsc")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(Wallet::find().count(&f.db).await.unwrap(), 1);
        assert_eq!(WalletUser::find().count(&f.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_remove_requires_address_and_chain() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;

        let err = f.service
            .remove_wallet(&alice, WalletRequest {
                address: Some(address('a')),
                chain: None,
            }).await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_shared_wallet_between_users() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;
        let bob = user(&f.db, "bob@example.com").await;
        let addr = address('a');
        f.provider.set(&addr, "10.00");

        let first = f.service.add_wallet(&alice, request(&addr, "polygon")).await.unwrap();
        f.provider.set(&addr, "12.00");
        let second = f.service.add_wallet(&bob, request(&addr, "polygon")).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.wallet.balance_usd, Some(usd("12.00")));
        assert_eq!(Wallet::find().count(&f.db).await.unwrap(), 1);
        assert_eq!(WalletUser::find().count(&f.db).await.unwrap(), 2);

        let message = f.service.remove_wallet(&alice, request(&addr, "polygon")).await.unwrap();
        assert!(message.contains("has been removed from your portfolio"));

        assert_eq!(Wallet::find().count(&f.db).await.unwrap(), 1);
        assert_eq!(WalletUser::find().count(&f.db).await.unwrap(), 1);
        assert!(f.service.list_wallets(&alice).await.unwrap().is_empty());
        assert_eq!(f.service.list_wallets(&bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_skips_failed_wallets() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;
        let (a, b, c) = (address('a'), address('b'), address('c'));
        f.provider.set(&a, "1.00");
        f.provider.set(&b, "2.00");
        f.provider.set(&c, "3.00");
        for addr in [&a, &b, &c] {
            f.service.add_wallet(&alice, request(addr, "eth")).await.unwrap();
        }

        f.provider.set(&a, "100.00");
        f.provider.fail(&b);
        f.provider.set(&c, "300.00");

        let result = f.service.sync_all(&alice).await.unwrap();

        assert_eq!(result.count, 2);
        assert_eq!(result.wallets.len(), 2);
        assert!(result.wallets.iter().all(|w| w.address != b));
        assert_eq!(stored_balance(&f.db, &a).await, Some(usd("100.00")));
        assert_eq!(stored_balance(&f.db, &b).await, Some(usd("2.00")));
        assert_eq!(stored_balance(&f.db, &c).await, Some(usd("300.00")));
    }

    #[tokio::test]
    async fn test_sync_continues_past_failed_write() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;
        let (a, b, c) = (address('a'), address('b'), address('c'));
        for addr in [&a, &b, &c] {
            f.provider.set(addr, "1.00");
            f.service.add_wallet(&alice, request(addr, "eth")).await.unwrap();
        }

        f.provider.set(&a, "10.00");
        f.provider.set(&b, "20.00");
        f.provider.set(&c, "30.00");
        f.provider.vanish_on_fetch(&f.db, &b);

        let result = f.service.sync_all(&alice).await.unwrap();

        assert_eq!(result.count, 2);
        let synced: Vec<&str> = result.wallets
            .iter()
            .map(|w| w.address.as_str())
            .collect();
        assert_eq!(synced, vec![a.as_str(), c.as_str()]);
        assert_eq!(stored_balance(&f.db, &a).await, Some(usd("10.00")));
        assert_eq!(stored_balance(&f.db, &c).await, Some(usd("30.00")));
    }

    #[tokio::test]
    async fn test_sync_advances_last_synced_at_only_on_success() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;
        let (a, b) = (address('a'), address('b'));
        for addr in [&a, &b] {
            f.provider.set(addr, "1.00");
            f.service.add_wallet(&alice, request(addr, "eth")).await.unwrap();
        }
        let before: HashMap<String, DateTime<Utc>> = f.service
            .list_wallets(&alice).await
            .unwrap()
            .into_iter()
            .map(|w| (w.address, w.last_synced_at))
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        f.provider.fail(&b);
        f.service.sync_all(&alice).await.unwrap();

        let after: HashMap<String, DateTime<Utc>> = f.service
            .list_wallets(&alice).await
            .unwrap()
            .into_iter()
            .map(|w| (w.address, w.last_synced_at))
            .collect();

        assert!(after[&a] > before[&a]);
        assert_eq!(after[&b], before[&b]);
    }

    #[tokio::test]
    async fn test_sync_only_touches_callers_wallets() {
        let f = fixture().await;
        let alice = user(&f.db, "alice@example.com").await;
        let bob = user(&f.db, "bob@example.com").await;
        let addr = address('d');
        f.provider.set(&addr, "8.00");
        f.service.add_wallet(&bob, request(&addr, "arbitrum")).await.unwrap();

        let result = f.service.sync_all(&alice).await.unwrap();

        assert_eq!(result.count, 0);
        assert!(result.wallets.is_empty());
        assert_eq!(f.provider.calls(), 1);
    }

    #[test]
    fn test_supported_chains() {
        let chains = WalletService::supported_chains();

        assert_eq!(chains.len(), 7);
        assert_eq!(chains[0], SupportedChain { id: "eth", name: "Ethereum" });
    }
}
