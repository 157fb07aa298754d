use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{account, category, tenant};

/// How often a recurring definition fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum Frequency {
    #[sea_orm(string_value = "Daily")]
    Daily,
    #[sea_orm(string_value = "Weekly")]
    Weekly,
    #[sea_orm(string_value = "Monthly")]
    Monthly,
    #[sea_orm(string_value = "Yearly")]
    Yearly,
}

/// A template that generates a transaction on a schedule.
/// Can be used for both income (salary) and expenses (rent, subscriptions).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub account_id: i32,
    /// When null, the tenant's rules categorize the generated transaction.
    pub category_id: Option<i32>,
    pub description: String,
    /// The value of each occurrence. Positive for income, negative for expense.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub frequency: Frequency,
    /// Day of month for monthly and yearly schedules (1-31).
    pub day_of_month: Option<i32>,
    /// Day of week for weekly schedules, 0 = Monday.
    pub day_of_week: Option<i32>,
    /// Month for yearly schedules (1-12).
    pub month_of_year: Option<i32>,
    /// The first day the definition may fire.
    pub start_date: NaiveDate,
    /// The last day the definition may fire. If null, it repeats indefinitely.
    pub end_date: Option<NaiveDate>,
    #[sea_orm(default_value = "true")]
    pub active: bool,
    pub last_processed_on: Option<NaiveDate>,
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
    #[sea_orm(has_many = "super::recurring_run::Entity")]
    RecurringRun,
}

impl Related<super::recurring_run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringRun.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
