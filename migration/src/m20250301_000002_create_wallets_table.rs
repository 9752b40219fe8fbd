use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite caps decimal precision at 16 digits
        let mut balance_usd = ColumnDef::new(Wallet::BalanceUsd);
        match manager.get_database_backend() {
            DatabaseBackend::Sqlite => balance_usd.decimal_len(16, 2),
            _ => balance_usd.decimal_len(18, 2),
        };
        balance_usd.null();

        manager.create_table(
            Table::create()
                .table(Wallet::Table)
                .if_not_exists()
                .col(ColumnDef::new(Wallet::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Wallet::Address).string_len(255).not_null())
                .col(ColumnDef::new(Wallet::Chain).string_len(50).not_null())
                .col(&mut balance_usd)
                .col(
                    ColumnDef::new(Wallet::LastSyncedAt)
                        .timestamp_with_time_zone()
                        .not_null()
                        .default(Expr::current_timestamp())
                )
                .to_owned()
        ).await?;

        // One wallet row per address per chain, shared by every user tracking it
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_wallet_address_chain")
                .table(Wallet::Table)
                .col(Wallet::Address)
                .col(Wallet::Chain)
                .unique()
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Wallet::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Wallet {
    Table,
    Id,
    Address,
    Chain,
    BalanceUsd,
    LastSyncedAt,
}
