use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_tenancy::Tenants;
use crate::m20250301_000002_create_ledger::Categories;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create budgets table
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(pk_auto(Budgets::Id))
                    .col(integer(Budgets::TenantId))
                    .col(integer(Budgets::CategoryId))
                    .col(integer(Budgets::Year))
                    .col(integer(Budgets::Month))
                    .col(decimal_len(Budgets::LimitAmount, 19, 4))
                    .col(integer(Budgets::AlertThreshold).default(80))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budgets_tenant")
                            .from(Budgets::Table, Budgets::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_budgets_category")
                            .from(Budgets::Table, Budgets::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_budgets_category_month")
                    .table(Budgets::Table)
                    .col(Budgets::TenantId)
                    .col(Budgets::CategoryId)
                    .col(Budgets::Year)
                    .col(Budgets::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create goals table
        manager
            .create_table(
                Table::create()
                    .table(Goals::Table)
                    .if_not_exists()
                    .col(pk_auto(Goals::Id))
                    .col(integer(Goals::TenantId))
                    .col(string(Goals::Name))
                    .col(decimal_len(Goals::TargetAmount, 19, 4))
                    .col(decimal_len(Goals::CurrentAmount, 19, 4).default(0))
                    .col(date_null(Goals::Deadline))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_goals_tenant")
                            .from(Goals::Table, Goals::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Goals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Budgets {
    Table,
    Id,
    TenantId,
    CategoryId,
    Year,
    Month,
    LimitAmount,
    AlertThreshold,
}

#[derive(DeriveIden)]
enum Goals {
    Table,
    Id,
    TenantId,
    Name,
    TargetAmount,
    CurrentAmount,
    Deadline,
}
