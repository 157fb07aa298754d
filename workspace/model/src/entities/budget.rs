use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{category, tenant};

/// A monthly spending limit for one category.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub category_id: i32,
    pub year: i32,
    /// Calendar month, 1-12.
    pub month: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub limit_amount: Decimal,
    /// Percentage of the limit at which an alert is raised.
    #[sea_orm(default_value = "80")]
    pub alert_threshold: i32,
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
        belongs_to = "category::Entity",
        from = "Column::CategoryId",
        to = "category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
}

impl ActiveModelBehavior for ActiveModel {}
