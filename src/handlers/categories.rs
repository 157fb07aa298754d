use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::helpers::cache::invalidate_tenant;
use crate::helpers::converters::{double_option, enum_name, parse_enum, parse_optional_enum};
use crate::helpers::scoped::{ensure_category, find_category};
use crate::helpers::stats::tenant_categories;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use model::entities::category::{self, CategoryKind};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for creating a category
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateCategoryRequest {
    /// Category name, unique inside the tenant
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Income, Need, Want or Savings
    pub kind: String,
    /// Parent category ID
    pub parent_id: Option<i32>,
}

/// Request body for updating a category
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub kind: Option<String>,
    /// `null` turns the category into a root
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<i32>)]
    pub parent_id: Option<Option<i32>>,
}

/// Category response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub kind: String,
    pub parent_id: Option<i32>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            kind: enum_name(&model.kind),
            parent_id: model.parent_id,
        }
    }
}

async fn ensure_name_free<C: ConnectionTrait>(
    db: &C,
    tenant_id: i32,
    name: &str,
    except: Option<i32>,
) -> ApiResult<()> {
    let clash = category::Entity::find()
        .filter(category::Column::TenantId.eq(tenant_id))
        .filter(category::Column::Name.eq(name))
        .one(db)
        .await?;
    match clash {
        Some(found) if Some(found.id) != except => Err(ApiError::conflict(
            "DUPLICATE_CATEGORY_NAME",
            format!("category '{}' already exists", name),
        )),
        _ => Ok(()),
    }
}

async fn ensure_parent<C: ConnectionTrait>(db: &C, tenant_id: i32, parent_id: i32) -> ApiResult<()> {
    ensure_category(db, tenant_id, parent_id)
        .await
        .map(|_| ())
        .map_err(|err| match err {
            ApiError::BadRequest { message, .. } => ApiError::bad_request("INVALID_PARENT_ID", message),
            other => other,
        })
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created successfully", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Name already used", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn create_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<CreateCategoryRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CategoryResponse>>)> {
    ctx.require(Permission::ManageTenant)?;

    let kind = parse_enum::<CategoryKind>(&request.kind, "INVALID_CATEGORY_KIND")?;
    let name = request.name.trim().to_string();
    ensure_name_free(&state.db, ctx.tenant_id(), &name, None).await?;
    if let Some(parent_id) = request.parent_id {
        ensure_parent(&state.db, ctx.tenant_id(), parent_id).await?;
    }

    let created = category::ActiveModel {
        tenant_id: Set(ctx.tenant_id()),
        name: Set(name),
        kind: Set(kind),
        parent_id: Set(request.parent_id),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Category created successfully with ID: {}", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            CategoryResponse::from(created),
            "Category created successfully",
        )),
    ))
}

/// Get all categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "categories",
    responses(
        (status = 200, description = "Categories retrieved successfully", body = ApiResponse<Vec<CategoryResponse>>)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_categories(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Json<ApiResponse<Vec<CategoryResponse>>>> {
    ctx.require(Permission::Read)?;
    let categories = tenant_categories(&state.db, ctx.tenant_id()).await?;
    debug!("Retrieved {} categories", categories.len());
    Ok(Json(ApiResponse::ok(
        categories.into_iter().map(CategoryResponse::from).collect(),
        "Categories retrieved successfully",
    )))
}

/// Get a category by ID
#[utoipa::path(
    get,
    path = "/api/v1/categories/{category_id}",
    tag = "categories",
    params(
        ("category_id" = i32, Path, description = "Category ID"),
    ),
    responses(
        (status = 200, description = "Category retrieved successfully", body = ApiResponse<CategoryResponse>),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(category_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<CategoryResponse>>> {
    ctx.require(Permission::Read)?;
    let found = find_category(&state.db, ctx.tenant_id(), category_id).await?;
    Ok(Json(ApiResponse::ok(
        CategoryResponse::from(found),
        "Category retrieved successfully",
    )))
}

/// Get the direct children of a category
#[utoipa::path(
    get,
    path = "/api/v1/categories/{category_id}/children",
    tag = "categories",
    params(
        ("category_id" = i32, Path, description = "Category ID"),
    ),
    responses(
        (status = 200, description = "Children retrieved successfully", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_category_children(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(category_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<Vec<CategoryResponse>>>> {
    ctx.require(Permission::Read)?;
    let parent = find_category(&state.db, ctx.tenant_id(), category_id).await?;
    let children = parent.get_children(&state.db).await?;
    Ok(Json(ApiResponse::ok(
        children.into_iter().map(CategoryResponse::from).collect(),
        "Children retrieved successfully",
    )))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/api/v1/categories/{category_id}",
    tag = "categories",
    params(
        ("category_id" = i32, Path, description = "Category ID"),
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated successfully", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid parent or cycle", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 409, description = "Name already used", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn update_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(category_id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateCategoryRequest>>,
) -> ApiResult<Json<ApiResponse<CategoryResponse>>> {
    ctx.require(Permission::ManageTenant)?;
    let existing = find_category(&state.db, ctx.tenant_id(), category_id).await?;

    if let Some(Some(parent_id)) = request.parent_id {
        ensure_parent(&state.db, ctx.tenant_id(), parent_id).await?;
        if existing.would_create_cycle(&state.db, parent_id).await? {
            warn!("Parent {} would create a cycle for category {}", parent_id, category_id);
            return Err(ApiError::bad_request(
                "CATEGORY_CYCLE",
                format!("category {} cannot be its own ancestor", category_id),
            ));
        }
    }

    let kind = parse_optional_enum::<CategoryKind>(request.kind.as_deref(), "INVALID_CATEGORY_KIND")?;
    let kind_changed = kind.is_some_and(|k| k != existing.kind);

    let mut active: category::ActiveModel = existing.into();
    if let Some(name) = request.name {
        let name = name.trim().to_string();
        ensure_name_free(&state.db, ctx.tenant_id(), &name, Some(category_id)).await?;
        active.name = Set(name);
    }
    if let Some(kind) = kind {
        active.kind = Set(kind);
    }
    if let Some(parent_id) = request.parent_id {
        active.parent_id = Set(parent_id);
    }

    let updated = active.update(&state.db).await?;
    // names and kinds show up in cached reports
    invalidate_tenant(&state.cache, ctx.tenant_id());
    info!("Category {} updated successfully (kind changed: {})", updated.id, kind_changed);

    Ok(Json(ApiResponse::ok(
        CategoryResponse::from(updated),
        "Category updated successfully",
    )))
}

/// Delete a category. Its transactions become uncategorized.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{category_id}",
    tag = "categories",
    params(
        ("category_id" = i32, Path, description = "Category ID"),
    ),
    responses(
        (status = 200, description = "Category deleted successfully", body = ApiResponse<String>),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn delete_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(category_id): Path<i32>,
) -> ApiResult<Json<ApiResponse<String>>> {
    ctx.require(Permission::ManageTenant)?;
    let existing = find_category(&state.db, ctx.tenant_id(), category_id).await?;

    existing.delete(&state.db).await?;
    invalidate_tenant(&state.cache, ctx.tenant_id());

    info!("Category {} deleted successfully", category_id);
    Ok(Json(ApiResponse::ok(
        format!("Category {} deleted", category_id),
        "Category deleted successfully",
    )))
}
