use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::helpers::converters::{enum_name, parse_optional_enum};
use crate::helpers::scoped::find_user;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use model::entities::user::{self, Role};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a new user
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Display name
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    /// Email address (must be unique)
    #[validate(email)]
    pub email: String,
    /// Owner, Admin, Member or Viewer (default: Member)
    pub role: Option<String>,
}

/// Request body for updating a user
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
}

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub tenant_id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: NaiveDateTime,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            tenant_id: model.tenant_id,
            username: model.username,
            email: model.email,
            role: enum_name(&model.role),
            created_at: model.created_at,
        }
    }
}

async fn owner_count<C: ConnectionTrait>(db: &C, tenant_id: i32) -> ApiResult<u64> {
    Ok(user::Entity::find()
        .filter(user::Column::TenantId.eq(tenant_id))
        .filter(user::Column::Role.eq(Role::Owner))
        .count(db)
        .await?)
}

async fn ensure_email_free<C: ConnectionTrait>(db: &C, email: &str, except: Option<i32>) -> ApiResult<()> {
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;
    match existing {
        Some(found) if Some(found.id) != except => Err(ApiError::conflict(
            "DUPLICATE_EMAIL",
            format!("email '{}' is already registered", email),
        )),
        _ => Ok(()),
    }
}

/// Create a new user in the current tenant
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Role not allowed", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn create_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<CreateUserRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    ctx.require(Permission::ManageTenant)?;
    trace!("Entering create_user function");

    let role = parse_optional_enum::<Role>(request.role.as_deref(), "INVALID_ROLE")?
        .unwrap_or(Role::Member);
    if role == Role::Owner {
        ctx.require(Permission::ManageOwners)?;
    }

    let email = request.email.trim().to_lowercase();
    ensure_email_free(&state.db, &email, None).await?;

    let created = user::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        username: Set(request.username.trim().to_string()),
        email: Set(email),
        role: Set(role),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(
        "User created successfully with ID: {}, role: {:?}",
        created.id, created.role
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserResponse::from(created), "User created successfully")),
    ))
}

/// Get all users of the current tenant
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 401, description = "Missing or invalid identity headers", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_users(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<ApiResponse<Vec<UserResponse>>>> {
    ctx.require(Permission::Read)?;

    let users = user::Entity::find()
        .filter(user::Column::TenantId.eq(ctx.tenant_id()))
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?;
    debug!("Retrieved {} users", users.len());

    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
        "Users retrieved successfully",
    )))
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(user_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    ctx.require(Permission::Read)?;
    let found = find_user(&state.db, ctx.tenant_id(), user_id).await?;
    Ok(Json(ApiResponse::ok(
        UserResponse::from(found),
        "User retrieved successfully",
    )))
}

/// Update a user
///
/// Changing an owner, or granting the owner role, requires an owner.
#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Role not allowed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email in use or last owner", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn update_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(user_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateUserRequest>>,
) -> ApiResult<Json<ApiResponse<UserResponse>>> {
    ctx.require(Permission::ManageTenant)?;

    let existing = find_user(&state.db, ctx.tenant_id(), user_id).await?;
    let new_role = parse_optional_enum::<Role>(request.role.as_deref(), "INVALID_ROLE")?;

    if existing.role == Role::Owner || new_role == Some(Role::Owner) {
        ctx.require(Permission::ManageOwners)?;
    }
    if existing.role == Role::Owner
        && new_role.is_some_and(|r| r != Role::Owner)
        && owner_count(&state.db, ctx.tenant_id()).await? <= 1
    {
        warn!("Refusing to demote the last owner of tenant {}", ctx.tenant_id());
        return Err(ApiError::conflict(
            "LAST_OWNER",
            "a tenant must keep at least one owner",
        ));
    }

    let mut active: user::ActiveModel = existing.into();
    if let Some(username) = request.username {
        active.username = Set(username.trim().to_string());
    }
    if let Some(email) = request.email {
        let email = email.trim().to_lowercase();
        ensure_email_free(&state.db, &email, Some(user_id)).await?;
        active.email = Set(email);
    }
    if let Some(role) = new_role {
        active.role = Set(role);
    }

    let updated = active.update(&state.db).await?;
    info!("User {} updated successfully", updated.id);
    Ok(Json(ApiResponse::ok(
        UserResponse::from(updated),
        "User updated successfully",
    )))
}

/// Delete a user
///
/// Deleting an admin or an owner requires an owner. Users cannot delete themselves.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 400, description = "Cannot delete yourself", body = ErrorResponse),
        (status = 403, description = "Role not allowed", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Last owner", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn delete_user(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(user_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<String>>> {
    ctx.require(Permission::ManageTenant)?;

    if user_id == ctx.user.id {
        return Err(ApiError::bad_request(
            "CANNOT_DELETE_SELF",
            "users cannot delete their own account",
        ));
    }

    let existing = find_user(&state.db, ctx.tenant_id(), user_id).await?;
    if existing.role.at_least(Role::Admin) {
        ctx.require(Permission::ManageOwners)?;
    }
    if existing.role == Role::Owner && owner_count(&state.db, ctx.tenant_id()).await? <= 1 {
        return Err(ApiError::conflict(
            "LAST_OWNER",
            "a tenant must keep at least one owner",
        ));
    }

    existing.delete(&state.db).await?;
    info!("User {} deleted successfully", user_id);
    Ok(Json(ApiResponse::ok(
        format!("User {} deleted", user_id),
        "User deleted successfully",
    )))
}
