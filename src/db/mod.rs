use sea_orm::{
    entity::prelude::*,
    DatabaseConnection,
    QueryOrder,
    Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::error::Result;

pub mod entity;
pub use entity::*;

mod user_repository;
pub use user_repository::UserRepository;

#[cfg(test)]
pub(crate) mod test_support;

pub struct WalletRepository {
    db: DatabaseConnection,
}

impl WalletRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_address_and_chain(
        &self,
        address: &str,
        chain: &str
    ) -> Result<Option<entity::wallet::Model>> {
        let wallet = entity::wallet::Entity
            ::find()
            .filter(entity::wallet::Column::Address.eq(address))
            .filter(entity::wallet::Column::Chain.eq(chain))
            .one(&self.db).await?;

        Ok(wallet)
    }

    /// Every wallet the user tracks, ordered by chain then address.
    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<entity::wallet::Model>> {
        let wallets = entity::wallet::Entity
            ::find()
            .inner_join(entity::wallet_user::Entity)
            .filter(entity::wallet_user::Column::UserId.eq(user_id))
            .order_by_asc(entity::wallet::Column::Chain)
            .order_by_asc(entity::wallet::Column::Address)
            .all(&self.db).await?;

        Ok(wallets)
    }

    pub async fn is_linked(&self, user_id: Uuid, wallet_id: Uuid) -> Result<bool> {
        let link = entity::wallet_user::Entity
            ::find()
            .filter(entity::wallet_user::Column::UserId.eq(user_id))
            .filter(entity::wallet_user::Column::WalletId.eq(wallet_id))
            .one(&self.db).await?;

        Ok(link.is_some())
    }

    /// Store a freshly fetched balance for `(address, chain)` and make sure the
    /// user is linked to it. Returns the wallet and whether the row was created.
    pub async fn upsert_and_link(
        &self,
        user_id: Uuid,
        address: &str,
        chain: &str,
        balance_usd: Decimal
    ) -> Result<(entity::wallet::Model, bool)> {
        let txn = self.db.begin().await?;
        let now = chrono::Utc::now();

        let existing = entity::wallet::Entity
            ::find()
            .filter(entity::wallet::Column::Address.eq(address))
            .filter(entity::wallet::Column::Chain.eq(chain))
            .one(&txn).await?;

        let (wallet, created) = match existing {
            Some(wallet) => {
                let mut active: entity::wallet::ActiveModel = wallet.into();
                active.balance_usd = Set(Some(balance_usd));
                active.last_synced_at = Set(now);
                (active.update(&txn).await?, false)
            }
            None => {
                let wallet = entity::wallet::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    address: Set(address.to_string()),
                    chain: Set(chain.to_string()),
                    balance_usd: Set(Some(balance_usd)),
                    last_synced_at: Set(now),
                };
                (wallet.insert(&txn).await?, true)
            }
        };

        let link = entity::wallet_user::Entity
            ::find()
            .filter(entity::wallet_user::Column::UserId.eq(user_id))
            .filter(entity::wallet_user::Column::WalletId.eq(wallet.id))
            .one(&txn).await?;

        if link.is_none() {
            entity::wallet_user::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                wallet_id: Set(wallet.id),
            }
                .insert(&txn).await?;
        }

        txn.commit().await?;

        Ok((wallet, created))
    }

    pub async fn update_balance(
        &self,
        wallet: entity::wallet::Model,
        balance_usd: Decimal
    ) -> Result<entity::wallet::Model> {
        let mut active: entity::wallet::ActiveModel = wallet.into();
        active.balance_usd = Set(Some(balance_usd));
        active.last_synced_at = Set(chrono::Utc::now());

        let wallet = active.update(&self.db).await?;
        Ok(wallet)
    }

    /// Drop the user's link to `(address, chain)`. The wallet row itself is
    /// left in place. Returns the number of links removed.
    pub async fn unlink(&self, user_id: Uuid, address: &str, chain: &str) -> Result<u64> {
        let Some(wallet) = self.find_by_address_and_chain(address, chain).await? else {
            return Ok(0);
        };

        let result = entity::wallet_user::Entity
            ::delete_many()
            .filter(entity::wallet_user::Column::UserId.eq(user_id))
            .filter(entity::wallet_user::Column::WalletId.eq(wallet.id))
            .exec(&self.db).await?;

        if result.rows_affected > 0 {
            let remaining = entity::wallet_user::Entity
                ::find()
                .filter(entity::wallet_user::Column::WalletId.eq(wallet.id))
                .count(&self.db).await?;

            if remaining == 0 {
                // TODO: prune orphaned wallets once we decide whether cached balances should outlive their last tracker
                tracing::debug!("Wallet {} ({}) has no remaining users", address, chain);
            }
        }

        Ok(result.rows_affected)
    }
}
