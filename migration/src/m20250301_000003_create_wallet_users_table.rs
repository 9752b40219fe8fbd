use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(WalletUser::Table)
                .if_not_exists()
                .col(ColumnDef::new(WalletUser::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(WalletUser::UserId).uuid().not_null())
                .col(ColumnDef::new(WalletUser::WalletId).uuid().not_null())
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_wallet_user_user")
                        .from(WalletUser::Table, WalletUser::UserId)
                        .to(Users::Table, Users::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_wallet_user_wallet")
                        .from(WalletUser::Table, WalletUser::WalletId)
                        .to(Wallet::Table, Wallet::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_wallet_user_user_wallet")
                .table(WalletUser::Table)
                .col(WalletUser::UserId)
                .col(WalletUser::WalletId)
                .unique()
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_wallet_user_wallet_id")
                .table(WalletUser::Table)
                .col(WalletUser::WalletId)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(WalletUser::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum WalletUser {
    Table,
    Id,
    UserId,
    WalletId,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Wallet {
    Table,
    Id,
}
