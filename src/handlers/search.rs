use crate::auth::{Permission, TenantContext};
use crate::error::{ApiError, ApiResult};
use crate::handlers::transactions::TransactionResponse;
use crate::helpers::stats::{period_bounds, tenant_categories, today};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};
use axum::{
    extract::{Query, State},
    response::Json,
};
use axum_valid::Valid;
use chrono::Datelike;
use common::{ParsedQuery, TimePeriod};
use compute::search::parse_query;
use model::entities::{category, transaction};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct SearchQuery {
    /// Free text, e.g. "gastos com alimentação em março acima de 50"
    #[validate(length(min = 1, max = 200))]
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub query: String,
    pub parsed: ParsedQuery,
    /// Category the text resolved to, if any
    pub category_id: Option<i32>,
    pub year: i32,
    pub transactions: Vec<TransactionResponse>,
    pub count: usize,
    /// Sum of the matching amounts
    pub total: Decimal,
}

/// How the parsed category narrows the results.
#[derive(Debug, PartialEq)]
enum TextFilter {
    None,
    Category(i32),
    Description(String),
}

fn text_filter(parsed: &ParsedQuery, categories: &[category::Model]) -> TextFilter {
    let Some(wanted) = parsed.category.as_deref().map(str::to_lowercase) else {
        return TextFilter::None;
    };
    categories
        .iter()
        .find(|c| c.name.trim().to_lowercase() == wanted)
        .map(|c| TextFilter::Category(c.id))
        .unwrap_or(TextFilter::Description(wanted))
}

fn within_bounds(amount: Decimal, parsed: &ParsedQuery) -> bool {
    let value = amount.abs();
    parsed.min_amount.is_none_or(|min| value >= min) && parsed.max_amount.is_none_or(|max| value <= max)
}

/// Search transactions with a Portuguese free-text query
///
/// Month names, a year, a category and `acima de` / `abaixo de` amounts are
/// recognised. The year defaults to the current one.
#[utoipa::path(
    get,
    path = "/api/v1/search",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search completed", body = ApiResponse<SearchResponse>),
        (status = 400, description = "Invalid query", body = ErrorResponse)
    )
)]
#[instrument(skip(state, ctx), fields(tenant_id = ctx.tenant_id()))]
pub async fn search_transactions(
    State(state): State<AppState>,
    ctx: TenantContext,
    Valid(Query(query)): Valid<Query<SearchQuery>>,
) -> ApiResult<Json<ApiResponse<SearchResponse>>> {
    ctx.require(Permission::Read)?;
    let tenant_id = ctx.tenant_id();

    let categories = tenant_categories(&state.db, tenant_id).await?;
    let names: Vec<String> = categories.iter().map(|c| c.name.clone()).collect();
    let parsed = parse_query(&query.q, &names);
    if parsed.is_empty() {
        return Err(ApiError::bad_request(
            "UNRECOGNIZED_QUERY",
            format!("no filters found in '{}'", query.q),
        ));
    }

    let year = parsed.year.unwrap_or_else(|| today().year());
    let period = match parsed.month {
        Some(month) => TimePeriod::month(year, month),
        None => TimePeriod::year(year),
    };
    let range = period_bounds(&period)?;
    let filter = text_filter(&parsed, &categories);

    let mut select = transaction::Entity::find()
        .filter(transaction::Column::TenantId.eq(tenant_id))
        .filter(transaction::Column::Date.gte(range.start))
        .filter(transaction::Column::Date.lte(range.end));
    if let TextFilter::Category(category_id) = filter {
        select = select.filter(transaction::Column::CategoryId.eq(category_id));
    }
    let found = select
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::Id)
        .all(&state.db)
        .await?;

    let matching: Vec<transaction::Model> = found
        .into_iter()
        .filter(|t| match &filter {
            TextFilter::Description(text) => t.description.to_lowercase().contains(text.as_str()),
            _ => true,
        })
        .filter(|t| within_bounds(t.amount, &parsed))
        .collect();

    let total: Decimal = matching.iter().map(|t| t.amount).sum();
    debug!("Search '{}' matched {} transactions", query.q, matching.len());

    let category_id = match filter {
        TextFilter::Category(id) => Some(id),
        _ => None,
    };
    Ok(Json(ApiResponse::ok(
        SearchResponse {
            query: query.q,
            parsed,
            category_id,
            year,
            count: matching.len(),
            transactions: matching.into_iter().map(TransactionResponse::from).collect(),
            total,
        },
        "Search completed successfully",
    )))
}
