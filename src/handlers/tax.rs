use crate::auth::{Permission, TenantContext};
use crate::error::ApiResult;
use crate::schemas::{ApiResponse, ErrorResponse};
use axum::response::Json;
use axum_valid::Valid;
use common::TaxEstimate;
use compute::tax::estimate_irpf;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Monthly income to estimate IRPF for
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct IrpfRequest {
    /// Gross monthly income
    pub income: Decimal,
    #[validate(range(max = 50))]
    pub dependents: Option<u32>,
    /// Other monthly deductions such as social security
    pub other_deductions: Option<Decimal>,
}

/// Estimate the monthly income tax (IRPF) withheld on an income
#[utoipa::path(
    post,
    path = "/api/v1/tax/irpf",
    tag = "tax",
    request_body = IrpfRequest,
    responses(
        (status = 200, description = "Tax estimated", body = ApiResponse<TaxEstimate>),
        (status = 400, description = "Negative income or deductions", body = ErrorResponse)
    )
)]
#[instrument(skip(ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn estimate_tax(
    ctx: TenantContext,
    Valid(Json(request)): Valid<Json<IrpfRequest>>,
) -> ApiResult<Json<ApiResponse<TaxEstimate>>> {
    ctx.require(Permission::Read)?;
    let estimate = estimate_irpf(
        request.income,
        request.dependents.unwrap_or(0),
        request.other_deductions.unwrap_or(Decimal::ZERO),
    )?;
    debug!("IRPF at {}%: {}", estimate.rate, estimate.monthly_tax);
    Ok(Json(ApiResponse::ok(estimate, "Tax estimated successfully")))
}
