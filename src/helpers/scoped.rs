//! Tenant-scoped lookups.
//!
//! `find_*` is used for the record named in the path and answers 404.
//! `ensure_*` is used for ids referenced from a request body and answers 400.
//! A record of another tenant is treated exactly like a missing one.

use model::entities::{
    account, budget, category, goal, recurring_transaction, rule, transaction, user,
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::warn;

use crate::error::{ApiError, ApiResult};

macro_rules! scoped_lookup {
    ($find:ident, $entity:ident, $label:literal, $not_found:literal) => {
        pub async fn $find<C: ConnectionTrait>(
            db: &C,
            tenant_id: i32,
            id: i32,
        ) -> ApiResult<$entity::Model> {
            $entity::Entity::find_by_id(id)
                .filter($entity::Column::TenantId.eq(tenant_id))
                .one(db)
                .await?
                .ok_or_else(|| {
                    warn!("{} {} not found for tenant {}", $label, id, tenant_id);
                    ApiError::not_found($not_found, format!("{} {} not found", $label, id))
                })
        }
    };
    ($find:ident, $ensure:ident, $entity:ident, $label:literal, $not_found:literal, $invalid:literal) => {
        scoped_lookup!($find, $entity, $label, $not_found);

        pub async fn $ensure<C: ConnectionTrait>(
            db: &C,
            tenant_id: i32,
            id: i32,
        ) -> ApiResult<$entity::Model> {
            $find(db, tenant_id, id).await.map_err(|err| match err {
                ApiError::NotFound { .. } => ApiError::bad_request(
                    $invalid,
                    format!("{} {} does not exist", $label, id),
                ),
                other => other,
            })
        }
    };
}

scoped_lookup!(find_user, user, "User", "USER_NOT_FOUND");
scoped_lookup!(find_account, ensure_account, account, "Account", "ACCOUNT_NOT_FOUND", "INVALID_ACCOUNT_ID");
scoped_lookup!(find_category, ensure_category, category, "Category", "CATEGORY_NOT_FOUND", "INVALID_CATEGORY_ID");
scoped_lookup!(find_transaction, transaction, "Transaction", "TRANSACTION_NOT_FOUND");
scoped_lookup!(find_rule, rule, "Rule", "RULE_NOT_FOUND");
scoped_lookup!(
    find_recurring_transaction,
    recurring_transaction,
    "Recurring transaction",
    "RECURRING_TRANSACTION_NOT_FOUND"
);
scoped_lookup!(find_budget, budget, "Budget", "BUDGET_NOT_FOUND");
scoped_lookup!(find_goal, goal, "Goal", "GOAL_NOT_FOUND");

/// Validates an optional category reference.
pub async fn ensure_optional_category<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    id: Option<i32>,
) -> ApiResult<Option<category::Model>> {
    match id {
        Some(id) => Ok(Some(ensure_category(db, tenant_id, id).await?)),
        None => Ok(None),
    }
}

/// Validates an optional account reference.
pub async fn ensure_optional_account<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    id: Option<i32>,
) -> ApiResult<Option<account::Model>> {
    match id {
        Some(id) => Ok(Some(ensure_account(db, tenant_id, id).await?)),
        None => Ok(None),
    }
}
