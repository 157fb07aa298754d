use sea_orm::entity::prelude::*;

use super::{account, category, tenant};

/// An auto-categorization rule. Rules are evaluated by ascending `position`
/// and the first one whose pattern occurs in a description wins.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_id: i32,
    pub name: String,
    /// Case-insensitive substring looked up in transaction descriptions.
    pub pattern: String,
    pub category_id: i32,
    /// Optional account the matching transaction is moved to.
    pub account_id: Option<i32>,
    /// Optional comma separated tags added to the matching transaction.
    pub tags: Option<String>,
    pub position: i32,
    #[sea_orm(default_value = "true")]
    pub active: bool,
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
    #[sea_orm(
        belongs_to = "account::Entity",
        from = "Column::AccountId",
        to = "account::Column::Id",
        on_delete = "SetNull"
    )]
    Account,
}

impl ActiveModelBehavior for ActiveModel {}
