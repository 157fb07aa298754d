use std::collections::HashMap;

use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::handlers::tenants::resolve_currency;
use crate::helpers::cache::invalidate_tenant;
use crate::helpers::converters::{double_option, enum_name, parse_enum, parse_optional_enum};
use crate::helpers::scoped::find_account;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use model::entities::account::{self, AccountKind};
use model::entities::transaction;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a new account
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateAccountRequest {
    /// Account name
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Checking, Savings, Cash, Investment or CreditCard
    pub kind: String,
    /// ISO 4217 currency code (default: the tenant's currency)
    pub currency_code: Option<String>,
    /// Spending limit, credit cards only
    pub credit_limit: Option<Decimal>,
    /// Whether to include in statistics (default: true)
    pub include_in_statistics: Option<bool>,
}

/// Request body for updating an account
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub kind: Option<String>,
    pub currency_code: Option<String>,
    /// `null` removes the limit
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub credit_limit: Option<Option<Decimal>>,
    pub include_in_statistics: Option<bool>,
    pub archived: Option<bool>,
}

/// Account response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    pub id: i32,
    pub name: String,
    pub kind: String,
    pub currency_code: String,
    pub credit_limit: Option<Decimal>,
    pub include_in_statistics: bool,
    pub archived: bool,
    /// Sum of all transactions booked to the account
    pub balance: Decimal,
}

impl AccountResponse {
    fn new(model: account::Model, balance: Decimal) -> Self {
        Self {
            id: model.id,
            name: model.name,
            kind: enum_name(&model.kind),
            currency_code: model.currency_code,
            credit_limit: model.credit_limit,
            include_in_statistics: model.include_in_statistics,
            archived: model.archived,
            balance,
        }
    }
}

/// Balance per account id for the tenant.
async fn balances<C: ConnectionTrait>(db: &C, tenant_id: i32) -> ApiResult<HashMap<i32, Decimal>> {
    let transactions = transaction::Entity::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .all(db)
        .await?;
    let mut totals: HashMap<i32, Decimal> = HashMap::new();
    for t in transactions {
        *totals.entry(t.account_id).or_default() += t.amount;
    }
    Ok(totals)
}

fn check_credit_limit(kind: AccountKind, credit_limit: Option<Decimal>) -> ApiResult<()> {
    match credit_limit {
        Some(_) if kind != AccountKind::CreditCard => Err(ApiError::bad_request(
            "INVALID_CREDIT_LIMIT",
            "only credit card accounts have a credit limit",
        )),
        Some(limit) if limit < Decimal::ZERO => Err(ApiError::bad_request(
            "INVALID_CREDIT_LIMIT",
            "credit limit must not be negative",
        )),
        _ => Ok(()),
    }
}

/// Create a new account
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    tag = "accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created successfully", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn create_account(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<CreateAccountRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<AccountResponse>>)> {
    ctx.require(Permission::ManageTenant)?;
    trace!("Entering create_account function");

    let kind = parse_enum::<AccountKind>(&request.kind, "INVALID_ACCOUNT_KIND")?;
    check_credit_limit(kind, request.credit_limit)?;
    let currency_code =
        resolve_currency(request.currency_code.as_deref(), &ctx.tenant.currency_code)?;
    debug!(
        "Creating {:?} account '{}' in {}",
        kind, request.name, currency_code
    );

    let created = account::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        name: Set(request.name.trim().to_string()),
        kind: Set(kind),
        currency_code: Set(currency_code),
        credit_limit: Set(request.credit_limit),
        include_in_statistics: Set(request.include_in_statistics.unwrap_or(true)),
        archived: Set(false),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(
        "Account created successfully with ID: {}, name: {}",
        created.id, created.name
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            AccountResponse::new(created, Decimal::ZERO),
            "Account created successfully",
        )),
    ))
}

/// Get all accounts
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    tag = "accounts",
    responses(
        (status = 200, description = "Accounts retrieved successfully", body = ApiResponse<Vec<AccountResponse>>),
        (status = 401, description = "Missing or invalid identity headers", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_accounts(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<ApiResponse<Vec<AccountResponse>>>> {
    ctx.require(Permission::Read)?;

    let accounts = account::Entity::find()
        .filter(account::Column::TenantId.eq(ctx.tenant_id()))
        .order_by_asc(account::Column::Id)
        .all(&state.db)
        .await?;
    let totals = balances(&state.db, ctx.tenant_id()).await?;
    debug!("Retrieved {} accounts from database", accounts.len());

    let responses = accounts
        .into_iter()
        .map(|a| {
            let balance = totals.get(&a.id).copied().unwrap_or_default();
            AccountResponse::new(a, balance)
        })
        .collect();
    Ok(Json(ApiResponse::ok(responses, "Accounts retrieved successfully")))
}

/// Get a specific account by ID
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
    ),
    responses(
        (status = 200, description = "Account retrieved successfully", body = ApiResponse<AccountResponse>),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_account(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(account_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<AccountResponse>>> {
    ctx.require(Permission::Read)?;
    let found = find_account(&state.db, ctx.tenant_id(), account_id).await?;
    let balance = balances(&state.db, ctx.tenant_id())
        .await?
        .remove(&found.id)
        .unwrap_or_default();
    Ok(Json(ApiResponse::ok(
        AccountResponse::new(found, balance),
        "Account retrieved successfully",
    )))
}

/// Update an account
#[utoipa::path(
    put,
    path = "/api/v1/accounts/{account_id}",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
    ),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated successfully", body = ApiResponse<AccountResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn update_account(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(account_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateAccountRequest>>,
) -> ApiResult<Json<ApiResponse<AccountResponse>>> {
    ctx.require(Permission::ManageTenant)?;
    let existing = find_account(&state.db, ctx.tenant_id(), account_id).await?;

    let kind = parse_optional_enum::<AccountKind>(request.kind.as_deref(), "INVALID_ACCOUNT_KIND")?
        .unwrap_or(existing.kind);
    let credit_limit = match request.credit_limit {
        Some(limit) => limit,
        None if kind == AccountKind::CreditCard => existing.credit_limit,
        None => None,
    };
    check_credit_limit(kind, credit_limit)?;

    let statistics_changed = request
        .include_in_statistics
        .is_some_and(|v| v != existing.include_in_statistics);

    let mut active: account::ActiveModel = existing.into();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(code) = request.currency_code.as_deref() {
        active.currency_code = Set(resolve_currency(Some(code), &ctx.tenant.currency_code)?);
    }
    if let Some(include) = request.include_in_statistics {
        active.include_in_statistics = Set(include);
    }
    if let Some(archived) = request.archived {
        active.archived = Set(archived);
    }
    active.kind = Set(kind);
    active.credit_limit = Set(credit_limit);

    let updated = active.update(&state.db).await?;
    if statistics_changed {
        invalidate_tenant(&state.cache, ctx.tenant_id());
    }
    let balance = balances(&state.db, ctx.tenant_id())
        .await?
        .remove(&updated.id)
        .unwrap_or_default();

    info!("Account {} updated successfully", updated.id);
    Ok(Json(ApiResponse::ok(
        AccountResponse::new(updated, balance),
        "Account updated successfully",
    )))
}

/// Delete an account and its transactions
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/{account_id}",
    tag = "accounts",
    params(
        ("account_id" = i32, Path, description = "Account ID"),
    ),
    responses(
        (status = 200, description = "Account deleted successfully", body = ApiResponse<String>),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn delete_account(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(account_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<String>>> {
    ctx.require(Permission::ManageTenant)?;
    let existing = find_account(&state.db, ctx.tenant_id(), account_id).await?;

    existing.delete(&state.db).await?;
    invalidate_tenant(&state.cache, ctx.tenant_id());

    info!("Account {} deleted successfully", account_id);
    Ok(Json(ApiResponse::ok(
        format!("Account {} deleted", account_id),
        "Account deleted successfully",
    )))
}
