use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{account, category, recurring_transaction, rule, tenant};

/// A single booked transaction.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    /// The account affected by this transaction.
    pub account_id: i32,
    /// Null means uncategorized.
    pub category_id: Option<i32>,
    pub date: NaiveDate,
    pub description: String,
    /// The value of the transaction. Positive for income, negative for expense.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    /// Comma separated free-form labels.
    pub tags: Option<String>,
    /// Set when the transaction was generated from a recurring definition.
    pub recurring_transaction_id: Option<i32>,
    /// Set when a categorization rule assigned the category.
    pub rule_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "tenant::Entity",
        from = "Column::TenantId",
        to = "tenant::Column::Id",
        on_delete = "Cascade"
    )]
    Tenant,
    #[sea_orm(
        belongs_to = "account::Entity",
        from = "Column::AccountId",
        to = "account::Column::Id",
        on_delete = "Cascade"
    )]
    Account,
    #[sea_orm(
        belongs_to = "category::Entity",
        from = "Column::CategoryId",
        to = "category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(
        belongs_to = "recurring_transaction::Entity",
        from = "Column::RecurringTransactionId",
        to = "recurring_transaction::Column::Id",
        on_delete = "SetNull"
    )]
    RecurringTransaction,
    #[sea_orm(
        belongs_to = "rule::Entity",
        from = "Column::RuleId",
        to = "rule::Column::Id",
        on_delete = "SetNull"
    )]
    Rule,
}

impl Related<account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Splits the stored tag string into trimmed, non-empty labels.
    pub fn tag_list(&self) -> Vec<String> {
        split_tags(self.tags.as_deref())
    }
}

/// Splits a comma separated tag string into trimmed, non-empty labels.
pub fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Joins labels back into the stored representation. Empty input stores NULL.
pub fn join_tags(tags: &[String]) -> Option<String> {
    let cleaned: Vec<&str> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.join(","))
    }
}
