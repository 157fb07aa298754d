use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// The kind of account
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum AccountKind {
    #[sea_orm(string_value = "Checking")]
    Checking,
    #[sea_orm(string_value = "Savings")]
    Savings,
    #[sea_orm(string_value = "Cash")]
    Cash,
    #[sea_orm(string_value = "Investment")]
    Investment,
    #[sea_orm(string_value = "CreditCard")]
    CreditCard,
}

/// Represents a financial account, like a bank account, credit card, or cash wallet.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub name: String,
    pub kind: AccountKind,
    /// ISO 4217 currency code, e.g., "BRL", "EUR".
    pub currency_code: String,
    /// Spending limit, only meaningful for credit cards.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub credit_limit: Option<Decimal>,
    /// If false, this account is ignored in analytics.
    #[sea_orm(default_value = "true")]
    pub include_in_statistics: bool,
    #[sea_orm(default_value = "false")]
    pub archived: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_delete = "Cascade"
    )]
    Tenant,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transaction,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
