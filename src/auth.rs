//! Tenant resolution and role checks.
//!
//! Every `/api/v1` route except registration identifies the caller with the
//! `X-Tenant-ID` and `X-User-ID` headers. The user must belong to the tenant.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use model::entities::{tenant, user, user::Role};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::{debug, trace, warn};

use crate::error::ApiError;
use crate::schemas::AppState;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// The tenant and user a request acts as.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: tenant::Model,
    pub user: user::Model,
}

/// Actions guarded by a minimum role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read any tenant data
    Read,
    /// Create and change transactions, recurring definitions, budgets and goals
    WriteLedger,
    /// Manage accounts, categories, rules, users and tenant settings
    ManageTenant,
    /// Grant or revoke the owner role
    ManageOwners,
}

impl Permission {
    pub fn required_role(self) -> Role {
        match self {
            Permission::Read => Role::Viewer,
            Permission::WriteLedger => Role::Member,
            Permission::ManageTenant => Role::Admin,
            Permission::ManageOwners => Role::Owner,
        }
    }
}

impl TenantContext {
    pub fn tenant_id(&self) -> i32 {
        self.tenant.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.user.role.at_least(permission.required_role())
    }

    /// Fails with 403 unless the user's role grants `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.can(permission) {
            Ok(())
        } else {
            warn!(
                tenant_id = self.tenant.id,
                user_id = self.user.id,
                role = ?self.user.role,
                ?permission,
                "Permission denied"
            );
            Err(ApiError::forbidden(format!(
                "role {:?} cannot perform this action",
                self.user.role
            )))
        }
    }
}

fn header_id(parts: &Parts, name: &str) -> Result<i32, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i32>().ok())
        .ok_or_else(|| {
            debug!("Missing or malformed {} header", name);
            ApiError::Unauthorized
        })
}

#[async_trait]
impl FromRequestParts<AppState> for TenantContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let tenant_id = header_id(parts, TENANT_HEADER)?;
        let user_id = header_id(parts, USER_HEADER)?;
        trace!(tenant_id, user_id, "Resolving tenant context");

        let tenant = tenant::Entity::find_by_id(tenant_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| {
                warn!("Unknown tenant {}", tenant_id);
                ApiError::Unauthorized
            })?;

        let user = user::Entity::find_by_id(user_id)
            .filter(user::Column::TenantId.eq(tenant.id))
            .one(&state.db)
            .await?
            .ok_or_else(|| {
                warn!("User {} does not belong to tenant {}", user_id, tenant_id);
                ApiError::Unauthorized
            })?;

        debug!(tenant_id = tenant.id, user_id = user.id, role = ?user.role, "Resolved tenant context");
        Ok(TenantContext { tenant, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn context(role: Role) -> TenantContext {
        let now = Utc::now().naive_utc();
        TenantContext {
            tenant: tenant::Model {
                id: 1,
                name: "Acme".to_string(),
                slug: "acme".to_string(),
                currency_code: "BRL".to_string(),
                plan: tenant::Plan::Free,
                brand_color: None,
                logo_url: None,
                created_at: now,
            },
            user: user::Model {
                id: 7,
                tenant_id: 1,
                username: "someone".to_string(),
                email: "someone@acme.test".to_string(),
                role,
                created_at: now,
            },
        }
    }

    #[test]
    fn test_viewer_can_only_read() {
        let ctx = context(Role::Viewer);
        assert!(ctx.require(Permission::Read).is_ok());
        assert!(ctx.require(Permission::WriteLedger).is_err());
        assert!(ctx.require(Permission::ManageTenant).is_err());
    }

    #[test]
    fn test_member_writes_ledger() {
        let ctx = context(Role::Member);
        assert!(ctx.can(Permission::WriteLedger));
        assert!(!ctx.can(Permission::ManageTenant));
    }

    #[test]
    fn test_admin_is_not_owner() {
        let ctx = context(Role::Admin);
        assert!(ctx.can(Permission::ManageTenant));
        assert!(!ctx.can(Permission::ManageOwners));
        assert!(context(Role::Owner).can(Permission::ManageOwners));
    }
}
