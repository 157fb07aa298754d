use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::helpers::cache::invalidate_tenant;
use crate::helpers::converters::double_option;
use crate::helpers::rules::{assignment_for, load_categorizer};
use crate::helpers::scoped::{ensure_account, ensure_optional_category, find_transaction};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use model::entities::transaction;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Request body for creating a transaction
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateTransactionRequest {
    pub account_id: i32,
    /// Leave empty to let the tenant's rules categorize the transaction
    pub category_id: Option<i32>,
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    /// Positive for income, negative for expense
    pub amount: Decimal,
    pub tags: Option<Vec<String>>,
}

/// Request body for updating a transaction
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateTransactionRequest {
    pub account_id: Option<i32>,
    /// `null` makes the transaction uncategorized
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub category_id: Option<Option<i32>>,
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    /// Replaces all tags
    pub tags: Option<Vec<String>>,
}

/// Transaction response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i32,
    pub account_id: i32,
    pub category_id: Option<i32>,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub tags: Vec<String>,
    pub recurring_transaction_id: Option<i32>,
    /// Rule that categorized the transaction, if any
    pub rule_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

impl From<transaction::Model> for TransactionResponse {
    fn from(model: transaction::Model) -> Self {
        let tags = model.tag_list();
        Self {
            id: model.id,
            account_id: model.account_id,
            category_id: model.category_id,
            date: model.date,
            description: model.description,
            amount: model.amount,
            tags,
            recurring_transaction_id: model.recurring_transaction_id,
            rule_id: model.rule_id,
            created_at: model.created_at,
        }
    }
}

/// Query parameters for listing transactions
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams, Validate)]
pub struct TransactionQuery {
    pub account_id: Option<i32>,
    pub category_id: Option<i32>,
    /// First day to include (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
    /// Only transactions without a category
    pub uncategorized: Option<bool>,
    /// Page number (default: 1)
    #[validate(range(min = 1, max = 100000))]
    pub page: Option<u64>,
    /// Page size (default: 50)
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u64>,
}

/// One page of transactions, newest first
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionPage {
    pub items: Vec<TransactionResponse>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

fn ensure_nonzero(amount: Decimal) -> ApiResult<()> {
    if amount.is_zero() {
        return Err(ApiError::bad_request(
            "INVALID_AMOUNT",
            "amount must not be zero",
        ));
    }
    Ok(())
}

/// Create a transaction
///
/// Without a category the first matching rule assigns category, account and tags.
#[utoipa::path(
    post,
    path = "/api/v1/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Member role required", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn create_transaction(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<CreateTransactionRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<TransactionResponse>>)> {
    ctx.require(Permission::WriteLedger)?;
    trace!("Entering create_transaction function");

    ensure_nonzero(request.amount)?;
    let tenant_id = ctx.tenant_id();
    ensure_account(&state.db, tenant_id, request.account_id).await?;
    ensure_optional_category(&state.db, tenant_id, request.category_id).await?;

    let mut account_id = request.account_id;
    let mut category_id = request.category_id;
    let mut tags = transaction::join_tags(request.tags.as_deref().unwrap_or_default());
    let mut rule_id = None;

    if category_id.is_none() {
        let categorizer = load_categorizer(&state.db, tenant_id).await?;
        if let Some(matched) = categorizer.categorize(&request.description) {
            let assignment =
                assignment_for(&state.db, tenant_id, &matched, account_id, tags.as_deref()).await?;
            account_id = assignment.account_id;
            category_id = Some(assignment.category_id);
            tags = assignment.tags;
            rule_id = Some(assignment.rule_id);
        } else {
            debug!("No rule matched '{}', leaving uncategorized", request.description);
        }
    }

    let created = transaction::ActiveModel {
        tenant_id: Set(tenant_id),
        account_id: Set(account_id),
        category_id: Set(category_id),
        date: Set(request.date),
        description: Set(request.description.trim().to_string()),
        amount: Set(request.amount),
        tags: Set(tags),
        recurring_transaction_id: Set(None),
        rule_id: Set(rule_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;
    invalidate_tenant(&state.cache, tenant_id);

    info!(
        "Transaction created successfully with ID: {}, amount: {}",
        created.id, created.amount
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            TransactionResponse::from(created),
            "Transaction created successfully",
        )),
    ))
}

/// List transactions with filters and pagination
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    tag = "transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Transactions retrieved successfully", body = ApiResponse<TransactionPage>),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_transactions(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<TransactionQuery>>,
) -> ApiResult<Json<ApiResponse<TransactionPage>>> {
    ctx.require(Permission::Read)?;

    let mut select = transaction::Entity::find()
        .filter(transaction::Column::TenantId.eq(ctx.tenant_id()));
    if let Some(account_id) = query.account_id {
        select = select.filter(transaction::Column::AccountId.eq(account_id));
    }
    if let Some(category_id) = query.category_id {
        select = select.filter(transaction::Column::CategoryId.eq(category_id));
    }
    if query.uncategorized.unwrap_or(false) {
        select = select.filter(transaction::Column::CategoryId.is_null());
    }
    if let Some(start) = query.start_date {
        select = select.filter(transaction::Column::Date.gte(start));
    }
    if let Some(end) = query.end_date {
        select = select.filter(transaction::Column::Date.lte(end));
    }

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let paginator = select
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .paginate(&state.db, limit);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;
    debug!("Retrieved {} of {} transactions", items.len(), total);

    Ok(Json(ApiResponse::ok(
        TransactionPage {
            items: items.into_iter().map(TransactionResponse::from).collect(),
            page,
            limit,
            total,
        },
        "Transactions retrieved successfully",
    )))
}

/// Get a transaction by ID
#[utoipa::path(
    get,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Transaction retrieved successfully", body = ApiResponse<TransactionResponse>),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_transaction(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(transaction_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<TransactionResponse>>> {
    ctx.require(Permission::Read)?;
    let found = find_transaction(&state.db, ctx.tenant_id(), transaction_id).await?;
    Ok(Json(ApiResponse::ok(
        TransactionResponse::from(found),
        "Transaction retrieved successfully",
    )))
}

/// Update a transaction
#[utoipa::path(
    put,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated successfully", body = ApiResponse<TransactionResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn update_transaction(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(transaction_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateTransactionRequest>>,
) -> ApiResult<Json<ApiResponse<TransactionResponse>>> {
    ctx.require(Permission::WriteLedger)?;
    let tenant_id = ctx.tenant_id();
    let existing = find_transaction(&state.db, tenant_id, transaction_id).await?;

    let mut active: transaction::ActiveModel = existing.into();
    if let Some(account_id) = request.account_id {
        ensure_account(&state.db, tenant_id, account_id).await?;
        active.account_id = Set(account_id);
    }
    if let Some(category_id) = request.category_id {
        ensure_optional_category(&state.db, tenant_id, category_id).await?;
        active.category_id = Set(category_id);
        // a manual choice replaces whatever a rule decided
        active.rule_id = Set(None);
    }
    if let Some(date) = request.date {
        active.date = Set(date);
    }
    if let Some(description) = request.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(amount) = request.amount {
        ensure_nonzero(amount)?;
        active.amount = Set(amount);
    }
    if let Some(tags) = request.tags {
        active.tags = Set(transaction::join_tags(&tags));
    }

    let updated = active.update(&state.db).await?;
    invalidate_tenant(&state.cache, tenant_id);

    info!("Transaction {} updated successfully", updated.id);
    Ok(Json(ApiResponse::ok(
        TransactionResponse::from(updated),
        "Transaction updated successfully",
    )))
}

/// Delete a transaction
#[utoipa::path(
    delete,
    path = "/api/v1/transactions/{transaction_id}",
    tag = "transactions",
    params(
        ("transaction_id" = i32, Path, description = "Transaction ID"),
    ),
    responses(
        (status = 200, description = "Transaction deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(transaction_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<String>>> {
    ctx.require(Permission::WriteLedger)?;
    let existing = find_transaction(&state.db, ctx.tenant_id(), transaction_id).await?;

    existing.delete(&state.db).await?;
    invalidate_tenant(&state.cache, ctx.tenant_id());

    info!("Transaction {} deleted successfully", transaction_id);
    Ok(Json(ApiResponse::ok(
        format!("Transaction {} deleted", transaction_id),
        "Transaction deleted successfully",
    )))
}
