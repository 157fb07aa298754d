use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::helpers::cache::invalidate_tenant;
use crate::helpers::converters::double_option;
use crate::helpers::rules::{assignment_for, load_categorizer};
use crate::helpers::scoped::{ensure_category, ensure_optional_account, find_rule};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use compute::categorize::is_valid_pattern;
use model::entities::{category, rule, transaction};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a rule
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Case-insensitive text looked up in descriptions
    #[validate(length(max = 255))]
    pub pattern: String,
    pub category_id: i32,
    /// Account matching transactions are moved to
    pub account_id: Option<i32>,
    /// Tags added to matching transactions
    pub tags: Option<Vec<String>>,
    /// Evaluation order, lowest first (default: after the last rule)
    pub position: Option<i32>,
    pub active: Option<bool>,
}

/// Request body for updating a rule
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateRuleRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub pattern: Option<String>,
    pub category_id: Option<i32>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub account_id: Option<Option<i32>>,
    pub tags: Option<Vec<String>>,
    pub position: Option<i32>,
    pub active: Option<bool>,
}

/// Rule response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RuleResponse {
    pub id: i32,
    pub name: String,
    pub pattern: String,
    pub category_id: i32,
    pub account_id: Option<i32>,
    pub tags: Vec<String>,
    pub position: i32,
    pub active: bool,
}

impl From<rule::Model> for RuleResponse {
    fn from(model: rule::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            pattern: model.pattern,
            category_id: model.category_id,
            account_id: model.account_id,
            tags: transaction::split_tags(model.tags.as_deref()),
            position: model.position,
            active: model.active,
        }
    }
}

/// Description to run through the rules
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct TestRuleRequest {
    #[validate(length(min = 1, max = 255))]
    pub description: String,
}

/// Which rule, if any, would categorize a description
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TestRuleResponse {
    pub matched: bool,
    pub rule_id: Option<i32>,
    pub rule_name: Option<String>,
    pub category_id: Option<i32>,
    pub category_name: Option<String>,
    pub account_id: Option<i32>,
    pub tags: Vec<String>,
}

/// Outcome of applying the rules to uncategorized transactions
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplyRulesResponse {
    /// Uncategorized transactions looked at
    pub examined: usize,
    /// Transactions that received a category
    pub categorized: usize,
}

fn check_pattern(pattern: &str) -> ApiResult<String> {
    if !is_valid_pattern(pattern) {
        return Err(ApiError::bad_request(
            "INVALID_PATTERN",
            "pattern must contain at least one non-blank character",
        ));
    }
    Ok(pattern.trim().to_string())
}

/// Create a rule
#[utoipa::path(
    post,
    path = "/api/v1/rules",
    tag = "rules",
    request_body = CreateRuleRequest,
    responses(
        (status = 201, description = "Rule created successfully", body = ApiResponse<RuleResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn create_rule(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<CreateRuleRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RuleResponse>>)> {
    ctx.require(Permission::ManageTenant)?;
    let tenant_id = ctx.tenant_id();

    let pattern = check_pattern(&request.pattern)?;
    ensure_category(&state.db, tenant_id, request.category_id).await?;
    ensure_optional_account(&state.db, tenant_id, request.account_id).await?;

    let position = match request.position {
        Some(position) => position,
        None => {
            let last: Option<i32> = rule::Entity::find()
                .select_only()
                .column(rule::Column::Position)
                .filter(rule::Column::TenantId.eq(tenant_id))
                .order_by_desc(rule::Column::Position)
                .into_tuple()
                .one(&state.db)
                .await?;
            last.map(|p| p + 1).unwrap_or(0)
        }
    };

    let created = rule::ActiveModel {
        tenant_id: Set(tenant_id),
        name: Set(request.name.trim().to_string()),
        pattern: Set(pattern),
        category_id: Set(request.category_id),
        account_id: Set(request.account_id),
        tags: Set(transaction::join_tags(request.tags.as_deref().unwrap_or_default())),
        position: Set(position),
        active: Set(request.active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Rule created successfully with ID: {} at position {}", created.id, created.position);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(RuleResponse::from(created), "Rule created successfully")),
    ))
}

/// Get all rules in evaluation order
#[utoipa::path(
    get,
    path = "/api/v1/rules",
    tag = "rules",
    responses(
        (status = 200, description = "Rules retrieved successfully", body = ApiResponse<Vec<RuleResponse>>)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_rules(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<ApiResponse<Vec<RuleResponse>>>> {
    ctx.require(Permission::Read)?;
    let rules = rule::Entity::find()
        .filter(rule::Column::TenantId.eq(ctx.tenant_id()))
        .order_by_asc(rule::Column::Position)
        .order_by_asc(rule::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(
        rules.into_iter().map(RuleResponse::from).collect(),
        "Rules retrieved successfully",
    )))
}

/// Get a rule by ID
#[utoipa::path(
    get,
    path = "/api/v1/rules/{rule_id}",
    tag = "rules",
    params(
        ("rule_id" = i32, Path, description = "Rule ID"),
    ),
    responses(
        (status = 200, description = "Rule retrieved successfully", body = ApiResponse<RuleResponse>),
        (status = 404, description = "Rule not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_rule(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(rule_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<RuleResponse>>> {
    ctx.require(Permission::Read)?;
    let found = find_rule(&state.db, ctx.tenant_id(), rule_id).await?;
    Ok(Json(ApiResponse::ok(RuleResponse::from(found), "Rule retrieved successfully")))
}

/// Update a rule
#[utoipa::path(
    put,
    path = "/api/v1/rules/{rule_id}",
    tag = "rules",
    params(
        ("rule_id" = i32, Path, description = "Rule ID"),
    ),
    request_body = UpdateRuleRequest,
    responses(
        (status = 200, description = "Rule updated successfully", body = ApiResponse<RuleResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Rule not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn update_rule(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(rule_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateRuleRequest>>,
) -> ApiResult<Json<ApiResponse<RuleResponse>>> {
    ctx.require(Permission::ManageTenant)?;
    let tenant_id = ctx.tenant_id();
    let existing = find_rule(&state.db, tenant_id, rule_id).await?;

    let mut active: rule::ActiveModel = existing.into();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(pattern) = request.pattern.as_deref() {
        active.pattern = Set(check_pattern(pattern)?);
    }
    if let Some(category_id) = request.category_id {
        ensure_category(&state.db, tenant_id, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(account_id) = request.account_id {
        ensure_optional_account(&state.db, tenant_id, account_id).await?;
        active.account_id = Set(account_id);
    }
    if let Some(tags) = request.tags {
        active.tags = Set(transaction::join_tags(&tags));
    }
    if let Some(position) = request.position {
        active.position = Set(position);
    }
    if let Some(is_active) = request.active {
        active.active = Set(is_active);
    }

    let updated = active.update(&state.db).await?;
    info!("Rule {} updated successfully", updated.id);
    Ok(Json(ApiResponse::ok(RuleResponse::from(updated), "Rule updated successfully")))
}

/// Delete a rule
#[utoipa::path(
    delete,
    path = "/api/v1/rules/{rule_id}",
    tag = "rules",
    params(
        ("rule_id" = i32, Path, description = "Rule ID"),
    ),
    responses(
        (status = 200, description = "Rule deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Rule not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn delete_rule(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(rule_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<String>>> {
    ctx.require(Permission::ManageTenant)?;
    let existing = find_rule(&state.db, ctx.tenant_id(), rule_id).await?;
    existing.delete(&state.db).await?;

    info!("Rule {} deleted successfully", rule_id);
    Ok(Json(ApiResponse::ok(
        format!("Rule {} deleted", rule_id),
        "Rule deleted successfully",
    )))
}

/// Show which rule would categorize a description
#[utoipa::path(
    post,
    path = "/api/v1/rules/test",
    tag = "rules",
    request_body = TestRuleRequest,
    responses(
        (status = 200, description = "Rules evaluated", body = ApiResponse<TestRuleResponse>)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn test_rules(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<TestRuleRequest>>,
) -> ApiResult<Json<ApiResponse<TestRuleResponse>>> {
    ctx.require(Permission::Read)?;
    let categorizer = load_categorizer(&state.db, ctx.tenant_id()).await?;

    let response = match categorizer.categorize(&request.description) {
        Some(matched) => {
            let rule_name = categorizer
                .rules()
                .iter()
                .find(|r| r.id == matched.rule_id)
                .map(|r| r.name.clone());
            let category_name = category::Entity::find_by_id(matched.category_id)
                .one(&state.db)
                .await?
                .map(|c| c.name);
            TestRuleResponse {
                matched: true,
                rule_id: Some(matched.rule_id),
                rule_name,
                category_id: Some(matched.category_id),
                category_name,
                account_id: matched.account_id,
                tags: matched.tags,
            }
        }
        None => TestRuleResponse {
            matched: false,
            rule_id: None,
            rule_name: None,
            category_id: None,
            category_name: None,
            account_id: None,
            tags: Vec::new(),
        },
    };

    Ok(Json(ApiResponse::ok(response, "Rules evaluated")))
}

/// Apply the rules to every uncategorized transaction
#[utoipa::path(
    post,
    path = "/api/v1/rules/apply",
    tag = "rules",
    responses(
        (status = 200, description = "Rules applied", body = ApiResponse<ApplyRulesResponse>),
        (status = 403, description = "Member role required", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn apply_rules(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<ApiResponse<ApplyRulesResponse>>> {
    ctx.require(Permission::WriteLedger)?;
    let tenant_id = ctx.tenant_id();
    let categorizer = load_categorizer(&state.db, tenant_id).await?;

    let txn = state.db.begin().await?;
    let uncategorized = transaction::Entity::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(transaction::Column::CategoryId.is_null())
        .order_by_asc(transaction::Column::Id)
        .all(&txn)
        .await?;

    let examined = uncategorized.len();
    let mut categorized = 0;
    if !categorizer.is_empty() {
        for found in uncategorized {
            let Some(matched) = categorizer.categorize(&found.description) else {
                continue;
            };
            let assignment =
                assignment_for(&txn, tenant_id, &matched, found.account_id, found.tags.as_deref())
                    .await?;
            let mut active: transaction::ActiveModel = found.into();
            active.category_id = Set(Some(assignment.category_id));
            active.account_id = Set(assignment.account_id);
            active.tags = Set(assignment.tags);
            active.rule_id = Set(Some(assignment.rule_id));
            active.update(&txn).await?;
            categorized += 1;
        }
    }
    txn.commit().await?;

    if categorized > 0 {
        invalidate_tenant(&state.cache, tenant_id);
    }
    debug!("Examined {} uncategorized transactions", examined);
    info!("Rules categorized {} transactions", categorized);

    Ok(Json(ApiResponse::ok(
        ApplyRulesResponse {
            examined,
            categorized,
        },
        "Rules applied",
    )))
}
