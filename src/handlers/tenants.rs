use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::handlers::categories::CategoryResponse;
use crate::handlers::users::UserResponse;
use crate::helpers::converters::{enum_name, parse_optional_enum};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{extract::State, http::StatusCode, response::Json};
use axum_valid::Valid;
use chrono::{NaiveDateTime, Utc};
use model::entities::category::{self, CategoryKind};
use model::entities::tenant::{self, Plan};
use model::entities::user::{self, Role};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

/// Categories every new tenant starts with.
pub const DEFAULT_CATEGORIES: [(&str, CategoryKind); 8] = [
    ("Salário", CategoryKind::Income),
    ("Moradia", CategoryKind::Need),
    ("Alimentação", CategoryKind::Need),
    ("Transporte", CategoryKind::Need),
    ("Saúde", CategoryKind::Need),
    ("Lazer", CategoryKind::Want),
    ("Compras", CategoryKind::Want),
    ("Investimentos", CategoryKind::Savings),
];

pub const DEFAULT_CURRENCY: &str = "BRL";

/// Request body for registering a new tenant with its owner
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterTenantRequest {
    /// Organisation name
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// URL-safe identifier: lowercase letters, digits and dashes
    #[validate(length(min = 3, max = 50))]
    pub slug: String,
    /// ISO 4217 currency code (default: BRL)
    pub currency_code: Option<String>,
    /// Free, Pro or Business (default: Free)
    pub plan: Option<String>,
    /// Username of the owner account
    #[validate(length(min = 1, max = 50))]
    pub owner_username: String,
    /// Email of the owner account (must be unique)
    #[validate(email)]
    pub owner_email: String,
}

/// Request body for updating tenant settings
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub currency_code: Option<String>,
    pub plan: Option<String>,
    /// Primary colour as `#rrggbb`; an empty string clears it
    pub brand_color: Option<String>,
    /// Absolute logo URL; an empty string clears it
    pub logo_url: Option<String>,
}

/// Tenant response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub currency_code: String,
    pub plan: String,
    pub brand_color: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<tenant::Model> for TenantResponse {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            currency_code: model.currency_code,
            plan: enum_name(&model.plan),
            brand_color: model.brand_color,
            logo_url: model.logo_url,
            created_at: model.created_at,
        }
    }
}

/// Everything created by a registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub tenant: TenantResponse,
    pub owner: UserResponse,
    pub categories: Vec<CategoryResponse>,
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

pub fn is_valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn is_valid_logo_url(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://")) && url.len() <= 500
}

pub fn resolve_currency(code: Option<&str>, fallback: &str) -> ApiResult<String> {
    let raw = code.unwrap_or(fallback);
    common::normalize_currency_code(raw).ok_or_else(|| {
        ApiError::bad_request(
            "INVALID_CURRENCY_CODE",
            format!("'{}' is not an ISO 4217 currency code", raw),
        )
    })
}

/// Creates a tenant, its owner and the default categories in one database transaction.
pub async fn register(
    db: &DatabaseConnection,
    request: &RegisterTenantRequest,
) -> ApiResult<RegistrationResponse> {
    let slug = request.slug.trim().to_lowercase();
    if !is_valid_slug(&slug) {
        return Err(ApiError::bad_request(
            "INVALID_SLUG",
            "slug may only contain lowercase letters, digits and dashes",
        ));
    }
    let currency_code = resolve_currency(request.currency_code.as_deref(), DEFAULT_CURRENCY)?;
    let plan = parse_optional_enum::<Plan>(request.plan.as_deref(), "INVALID_PLAN")?
        .unwrap_or(Plan::Free);
    let email = request.owner_email.trim().to_lowercase();

    if tenant::Entity::find()
        .filter(tenant::Column::Slug.eq(slug.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict(
            "DUPLICATE_SLUG",
            format!("slug '{}' is already taken", slug),
        ));
    }
    if user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict(
            "DUPLICATE_EMAIL",
            format!("email '{}' is already registered", email),
        ));
    }

    let now = Utc::now().naive_utc();
    let txn = db.begin().await?;

    let tenant_model = tenant::ActiveModel {
        name: Set(request.name.trim().to_string()),
        slug: Set(slug),
        currency_code: Set(currency_code),
        plan: Set(plan),
        brand_color: Set(None),
        logo_url: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    trace!("Inserted tenant {}", tenant_model.id);

    let owner = user::ActiveModel {
        tenant_id: Set(tenant_model.id),
        username: Set(request.owner_username.trim().to_string()),
        email: Set(email),
        role: Set(Role::Owner),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut categories = Vec::with_capacity(DEFAULT_CATEGORIES.len());
    for (name, kind) in DEFAULT_CATEGORIES {
        let created = category::ActiveModel {
            tenant_id: Set(tenant_model.id),
            name: Set(name.to_string()),
            kind: Set(kind),
            parent_id: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        categories.push(CategoryResponse::from(created));
    }

    txn.commit().await?;

    info!(
        "Registered tenant {} ('{}') with owner {}",
        tenant_model.id, tenant_model.slug, owner.id
    );
    Ok(RegistrationResponse {
        tenant: TenantResponse::from(tenant_model),
        owner: UserResponse::from(owner),
        categories,
    })
}

/// Register a tenant together with its owner
#[utoipa::path(
    post,
    path = "/api/v1/tenants/register",
    tag = "tenants",
    request_body = RegisterTenantRequest,
    responses(
        (status = 201, description = "Tenant registered successfully", body = ApiResponse<RegistrationResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Slug or email already in use", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn register_tenant(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<RegisterTenantRequest>>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RegistrationResponse>>)> {
    debug!("Registering tenant with slug: {}", request.slug);
    let registration = register(&state.db, &request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(registration, "Tenant registered successfully")),
    ))
}

/// Get the current tenant
#[utoipa::path(
    get,
    path = "/api/v1/tenant",
    tag = "tenants",
    responses(
        (status = 200, description = "Tenant retrieved successfully", body = ApiResponse<TenantResponse>),
        (status = 401, description = "Missing or invalid identity headers", body = ErrorResponse)
    )
)]
#[instrument(skip(ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn get_current_tenant(ctx: TenantContext) -> ApiResult<Json<ApiResponse<TenantResponse>>> {
    ctx.require(Permission::Read)?;
    Ok(Json(ApiResponse::ok(
        TenantResponse::from(ctx.tenant),
        "Tenant retrieved successfully",
    )))
}

/// Update branding, plan and currency of the current tenant
#[utoipa::path(
    put,
    path = "/api/v1/tenant",
    tag = "tenants",
    request_body = UpdateTenantRequest,
    responses(
        (status = 200, description = "Tenant updated successfully", body = ApiResponse<TenantResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn update_current_tenant(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<UpdateTenantRequest>>,
) -> ApiResult<Json<ApiResponse<TenantResponse>>> {
    ctx.require(Permission::ManageTenant)?;

    let mut active: tenant::ActiveModel = ctx.tenant.clone().into();

    if let Some(name) = request.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(code) = request.currency_code.as_deref() {
        active.currency_code = Set(resolve_currency(Some(code), DEFAULT_CURRENCY)?);
    }
    if let Some(plan) = parse_optional_enum::<Plan>(request.plan.as_deref(), "INVALID_PLAN")? {
        active.plan = Set(plan);
    }
    if let Some(color) = request.brand_color {
        let color = color.trim().to_lowercase();
        if color.is_empty() {
            active.brand_color = Set(None);
        } else if is_valid_color(&color) {
            active.brand_color = Set(Some(color));
        } else {
            warn!("Rejected brand colour '{}'", color);
            return Err(ApiError::bad_request(
                "INVALID_BRAND_COLOR",
                "brand_color must look like #1a2b3c",
            ));
        }
    }
    if let Some(url) = request.logo_url {
        let url = url.trim().to_string();
        if url.is_empty() {
            active.logo_url = Set(None);
        } else if is_valid_logo_url(&url) {
            active.logo_url = Set(Some(url));
        } else {
            return Err(ApiError::bad_request(
                "INVALID_LOGO_URL",
                "logo_url must be an absolute http(s) URL",
            ));
        }
    }

    let updated = active.update(&state.db).await?;
    info!("Updated settings of tenant {}", updated.id);
    Ok(Json(ApiResponse::ok(
        TenantResponse::from(updated),
        "Tenant updated successfully",
    )))
}
