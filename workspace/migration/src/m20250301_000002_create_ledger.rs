use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_tenancy::Tenants;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create accounts table
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(pk_auto(Accounts::Id))
                    .col(integer(Accounts::TenantId))
                    .col(string(Accounts::Name))
                    .col(string_len(Accounts::Kind, 20))
                    .col(string_len(Accounts::CurrencyCode, 3))
                    .col(decimal_len_null(Accounts::CreditLimit, 19, 4))
                    .col(boolean(Accounts::IncludeInStatistics).default(true))
                    .col(boolean(Accounts::Archived).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_accounts_tenant")
                            .from(Accounts::Table, Accounts::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create categories table
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(integer(Categories::TenantId))
                    .col(string(Categories::Name))
                    .col(string_len(Categories::Kind, 10))
                    .col(integer_null(Categories::ParentId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_categories_tenant")
                            .from(Categories::Table, Categories::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_categories_parent")
                            .from(Categories::Table, Categories::ParentId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_categories_tenant_name")
                    .table(Categories::Table)
                    .col(Categories::TenantId)
                    .col(Categories::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create rules table
        manager
            .create_table(
                Table::create()
                    .table(Rules::Table)
                    .if_not_exists()
                    .col(pk_auto(Rules::Id))
                    .col(integer(Rules::TenantId))
                    .col(string(Rules::Name))
                    .col(string(Rules::Pattern))
                    .col(integer(Rules::CategoryId))
                    .col(integer_null(Rules::AccountId))
                    .col(string_null(Rules::Tags))
                    .col(integer(Rules::Position).default(0))
                    .col(boolean(Rules::Active).default(true))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rules_tenant")
                            .from(Rules::Table, Rules::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rules_category")
                            .from(Rules::Table, Rules::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rules_account")
                            .from(Rules::Table, Rules::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create recurring_transactions table
        manager
            .create_table(
                Table::create()
                    .table(RecurringTransactions::Table)
                    .if_not_exists()
                    .col(pk_auto(RecurringTransactions::Id))
                    .col(integer(RecurringTransactions::TenantId))
                    .col(integer(RecurringTransactions::AccountId))
                    .col(integer_null(RecurringTransactions::CategoryId))
                    .col(string(RecurringTransactions::Description))
                    .col(decimal_len(RecurringTransactions::Amount, 19, 4))
                    .col(string_len(RecurringTransactions::Frequency, 10))
                    .col(integer_null(RecurringTransactions::DayOfMonth))
                    .col(integer_null(RecurringTransactions::DayOfWeek))
                    .col(integer_null(RecurringTransactions::MonthOfYear))
                    .col(date(RecurringTransactions::StartDate))
                    .col(date_null(RecurringTransactions::EndDate))
                    .col(boolean(RecurringTransactions::Active).default(true))
                    .col(date_null(RecurringTransactions::LastProcessedOn))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recurring_transactions_tenant")
                            .from(RecurringTransactions::Table, RecurringTransactions::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recurring_transactions_account")
                            .from(RecurringTransactions::Table, RecurringTransactions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recurring_transactions_category")
                            .from(RecurringTransactions::Table, RecurringTransactions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create transactions table
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(integer(Transactions::TenantId))
                    .col(integer(Transactions::AccountId))
                    .col(integer_null(Transactions::CategoryId))
                    .col(date(Transactions::Date))
                    .col(string(Transactions::Description))
                    .col(decimal_len(Transactions::Amount, 19, 4))
                    .col(string_null(Transactions::Tags))
                    .col(integer_null(Transactions::RecurringTransactionId))
                    .col(integer_null(Transactions::RuleId))
                    .col(date_time(Transactions::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_tenant")
                            .from(Transactions::Table, Transactions::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_account")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_category")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_recurring")
                            .from(Transactions::Table, Transactions::RecurringTransactionId)
                            .to(RecurringTransactions::Table, RecurringTransactions::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_rule")
                            .from(Transactions::Table, Transactions::RuleId)
                            .to(Rules::Table, Rules::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_tenant_date")
                    .table(Transactions::Table)
                    .col(Transactions::TenantId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        // Create recurring_runs table
        manager
            .create_table(
                Table::create()
                    .table(RecurringRuns::Table)
                    .if_not_exists()
                    .col(pk_auto(RecurringRuns::Id))
                    .col(integer(RecurringRuns::RecurringTransactionId))
                    .col(date(RecurringRuns::OccurrenceDate))
                    .col(integer(RecurringRuns::TransactionId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recurring_runs_recurring")
                            .from(RecurringRuns::Table, RecurringRuns::RecurringTransactionId)
                            .to(RecurringTransactions::Table, RecurringTransactions::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_recurring_runs_transaction")
                            .from(RecurringRuns::Table, RecurringRuns::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_recurring_runs_occurrence")
                    .table(RecurringRuns::Table)
                    .col(RecurringRuns::RecurringTransactionId)
                    .col(RecurringRuns::OccurrenceDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RecurringRuns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    TenantId,
    Name,
    Kind,
    CurrencyCode,
    CreditLimit,
    IncludeInStatistics,
    Archived,
}

#[derive(DeriveIden)]
pub(crate) enum Categories {
    Table,
    Id,
    TenantId,
    Name,
    Kind,
    ParentId,
}

#[derive(DeriveIden)]
enum Rules {
    Table,
    Id,
    TenantId,
    Name,
    Pattern,
    CategoryId,
    AccountId,
    Tags,
    Position,
    Active,
}

#[derive(DeriveIden)]
enum RecurringTransactions {
    Table,
    Id,
    TenantId,
    AccountId,
    CategoryId,
    Description,
    Amount,
    Frequency,
    DayOfMonth,
    DayOfWeek,
    MonthOfYear,
    StartDate,
    EndDate,
    Active,
    LastProcessedOn,
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    TenantId,
    AccountId,
    CategoryId,
    Date,
    Description,
    Amount,
    Tags,
    RecurringTransactionId,
    RuleId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RecurringRuns {
    Table,
    Id,
    RecurringTransactionId,
    OccurrenceDate,
    TransactionId,
}
