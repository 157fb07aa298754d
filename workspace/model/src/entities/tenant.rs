use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;

/// Subscription plan of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Plan {
    #[sea_orm(string_value = "Free")]
    Free,
    #[sea_orm(string_value = "Pro")]
    Pro,
    #[sea_orm(string_value = "Business")]
    Business,
}

/// An isolated organisation. Every business record points at exactly one tenant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// URL-safe identifier, unique across the installation.
    #[sea_orm(unique)]
    pub slug: String,
    /// ISO 4217 code used as the default for new accounts.
    pub currency_code: String,
    pub plan: Plan,
    /// Branding: primary colour as `#rrggbb`.
    pub brand_color: Option<String>,
    /// Branding: absolute URL of the logo.
    pub logo_url: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    User,
    #[sea_orm(has_many = "super::account::Entity")]
    Account,
    #[sea_orm(has_many = "super::category::Entity")]
    Category,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
