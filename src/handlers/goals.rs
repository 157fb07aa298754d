use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::helpers::converters::double_option;
use crate::helpers::scoped::find_goal;
use crate::helpers::stats::today;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::NaiveDate;
use common::GoalProgress;
use compute::goal::goal_progress;
use model::entities::goal;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a savings goal
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateGoalRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub target_amount: Decimal,
    /// Amount already saved, defaults to zero
    pub current_amount: Option<Decimal>,
    pub deadline: Option<NaiveDate>,
}

/// Request body for updating a savings goal
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateGoalRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub target_amount: Option<Decimal>,
    pub current_amount: Option<Decimal>,
    /// `null` removes the deadline
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<NaiveDate>)]
    pub deadline: Option<Option<NaiveDate>>,
}

/// Money added to (or withdrawn from) a goal
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ContributionRequest {
    /// Negative amounts withdraw
    pub amount: Decimal,
}

/// Goal response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GoalResponse {
    pub id: i32,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub deadline: Option<NaiveDate>,
    pub progress: GoalProgress,
}

impl GoalResponse {
    fn build(model: goal::Model, on: NaiveDate) -> Self {
        let progress = goal_progress(model.target_amount, model.current_amount, model.deadline, on);
        Self {
            id: model.id,
            name: model.name,
            target_amount: model.target_amount,
            current_amount: model.current_amount,
            deadline: model.deadline,
            progress,
        }
    }
}

impl From<goal::Model> for GoalResponse {
    fn from(model: goal::Model) -> Self {
        Self::build(model, today())
    }
}

fn check_amounts(target: Decimal, current: Decimal) -> ApiResult<()> {
    if target <= Decimal::ZERO {
        return Err(ApiError::bad_request(
            "INVALID_TARGET_AMOUNT",
            "target_amount must be greater than zero",
        ));
    }
    if current < Decimal::ZERO {
        return Err(ApiError::bad_request(
            "INVALID_CURRENT_AMOUNT",
            "current_amount must not be negative",
        ));
    }
    Ok(())
}

/// Create a savings goal
#[utoipa::path(
    post,
    path = "/api/v1/goals",
    tag = "goals",
    request_body = CreateGoalRequest,
    responses(
        (status = 201, description = "Goal created successfully", body = ApiResponse<GoalResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn create_goal(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<CreateGoalRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<GoalResponse>>)> {
    ctx.require(Permission::WriteLedger)?;

    let current = request.current_amount.unwrap_or(Decimal::ZERO);
    check_amounts(request.target_amount, current)?;

    let created = goal::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        name: Set(request.name.trim().to_string()),
        target_amount: Set(request.target_amount),
        current_amount: Set(current),
        deadline: Set(request.deadline),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Goal created successfully with ID: {}", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(GoalResponse::from(created), "Goal created successfully")),
    ))
}

/// Get all savings goals
#[utoipa::path(
    get,
    path = "/api/v1/goals",
    tag = "goals",
    responses(
        (status = 200, description = "Goals retrieved successfully", body = ApiResponse<Vec<GoalResponse>>)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_goals(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<ApiResponse<Vec<GoalResponse>>>> {
    ctx.require(Permission::Read)?;
    let goals = goal::Entity::find()
        .filter(goal::Column::TenantId.eq(ctx.tenant_id()))
        .order_by_asc(goal::Column::Id)
        .all(&state.db)
        .await?;

    debug!("Retrieved {} goals", goals.len());
    let on = today();
    Ok(Json(ApiResponse::ok(
        goals.into_iter().map(|g| GoalResponse::build(g, on)).collect(),
        "Goals retrieved successfully",
    )))
}

/// Get a savings goal by ID
#[utoipa::path(
    get,
    path = "/api/v1/goals/{goal_id}",
    tag = "goals",
    params(
        ("goal_id" = i32, Path, description = "Goal ID"),
    ),
    responses(
        (status = 200, description = "Goal retrieved successfully", body = ApiResponse<GoalResponse>),
        (status = 404, description = "Goal not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_goal(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(goal_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<GoalResponse>>> {
    ctx.require(Permission::Read)?;
    let found = find_goal(&state.db, ctx.tenant_id(), goal_id).await?;
    Ok(Json(ApiResponse::ok(
        GoalResponse::from(found),
        "Goal retrieved successfully",
    )))
}

/// Update a savings goal
#[utoipa::path(
    put,
    path = "/api/v1/goals/{goal_id}",
    tag = "goals",
    params(
        ("goal_id" = i32, Path, description = "Goal ID"),
    ),
    request_body = UpdateGoalRequest,
    responses(
        (status = 200, description = "Goal updated successfully", body = ApiResponse<GoalResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn update_goal(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(goal_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateGoalRequest>>,
) -> ApiResult<Json<ApiResponse<GoalResponse>>> {
    ctx.require(Permission::WriteLedger)?;
    let existing = find_goal(&state.db, ctx.tenant_id(), goal_id).await?;

    let target = request.target_amount.unwrap_or(existing.target_amount);
    let current = request.current_amount.unwrap_or(existing.current_amount);
    check_amounts(target, current)?;

    let mut active: goal::ActiveModel = existing.into();
    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(deadline) = request.deadline {
        active.deadline = Set(deadline);
    }
    active.target_amount = Set(target);
    active.current_amount = Set(current);

    let updated = active.update(&state.db).await?;
    info!("Goal {} updated successfully", updated.id);
    Ok(Json(ApiResponse::ok(
        GoalResponse::from(updated),
        "Goal updated successfully",
    )))
}

/// Delete a savings goal
#[utoipa::path(
    delete,
    path = "/api/v1/goals/{goal_id}",
    tag = "goals",
    params(
        ("goal_id" = i32, Path, description = "Goal ID"),
    ),
    responses(
        (status = 200, description = "Goal deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Goal not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn delete_goal(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(goal_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<String>>> {
    ctx.require(Permission::WriteLedger)?;
    let existing = find_goal(&state.db, ctx.tenant_id(), goal_id).await?;
    existing.delete(&state.db).await?;

    info!("Goal {} deleted successfully", goal_id);
    Ok(Json(ApiResponse::ok(
        format!("Goal {} deleted", goal_id),
        "Goal deleted successfully",
    )))
}

/// Add a contribution to a savings goal
#[utoipa::path(
    post,
    path = "/api/v1/goals/{goal_id}/contributions",
    tag = "goals",
    params(
        ("goal_id" = i32, Path, description = "Goal ID"),
    ),
    request_body = ContributionRequest,
    responses(
        (status = 200, description = "Contribution added", body = ApiResponse<GoalResponse>),
        (status = 400, description = "Contribution would leave a negative balance", body = ErrorResponse),
        (status = 404, description = "Goal not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn add_contribution(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(goal_id): Path<i32>,
    Valid(Json(request)): Valid<Json<ContributionRequest>>,
) -> ApiResult<Json<ApiResponse<GoalResponse>>> {
    ctx.require(Permission::WriteLedger)?;
    if request.amount.is_zero() {
        return Err(ApiError::bad_request("INVALID_AMOUNT", "amount must not be zero"));
    }

    let existing = find_goal(&state.db, ctx.tenant_id(), goal_id).await?;
    let balance = existing.current_amount + request.amount;
    if balance < Decimal::ZERO {
        return Err(ApiError::bad_request(
            "INVALID_CONTRIBUTION",
            format!("goal {} holds only {}", goal_id, existing.current_amount),
        ));
    }

    let mut active: goal::ActiveModel = existing.into();
    active.current_amount = Set(balance);
    let updated = active.update(&state.db).await?;

    info!("Goal {} now holds {}", updated.id, updated.current_amount);
    Ok(Json(ApiResponse::ok(GoalResponse::from(updated), "Contribution added")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_amounts() {
        assert!(check_amounts(Decimal::ONE_HUNDRED, Decimal::ZERO).is_ok());
        assert_eq!(
            check_amounts(Decimal::ZERO, Decimal::ZERO).unwrap_err().status_and_code().1,
            "INVALID_TARGET_AMOUNT"
        );
        assert_eq!(
            check_amounts(Decimal::ONE, Decimal::NEGATIVE_ONE).unwrap_err().status_and_code().1,
            "INVALID_CURRENT_AMOUNT"
        );
    }

    #[test]
    fn test_response_carries_progress() {
        let model = goal::Model {
            id: 1,
            tenant_id: 1,
            name: "Viagem".to_string(),
            target_amount: Decimal::new(1000, 0),
            current_amount: Decimal::new(250, 0),
            deadline: NaiveDate::from_ymd_opt(2025, 6, 30),
        };
        let response = GoalResponse::build(model, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        assert_eq!(response.progress.percentage, 25.0);
        assert_eq!(response.progress.months_left, Some(4));
        assert_eq!(response.progress.monthly_needed, Some(Decimal::new(18750, 2)));
    }
}
