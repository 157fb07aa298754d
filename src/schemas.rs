use chrono::NaiveDate;
use common::{
    BucketReport, BucketStatus, BudgetProgress, CategoryTotal, DashboardSummary, DateRange,
    Forecast, GoalProgress, MonthlyTotal, MovingAveragePoint, ParsedQuery, Percentiles, RatioReport,
    TaxEstimate, TimePeriod, Trend, WeekdayTotal,
};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};
use validator::Validate;

use crate::handlers::{
    accounts::{AccountResponse, CreateAccountRequest, UpdateAccountRequest},
    analytics::MovingAveragesResponse,
    budgets::{BudgetResponse, BudgetStatusResponse, CreateBudgetRequest, UpdateBudgetRequest},
    categories::{CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest},
    goals::{ContributionRequest, CreateGoalRequest, GoalResponse, UpdateGoalRequest},
    recurring::{
        CreateRecurringTransactionRequest, ProcessRecurringRequest, RecurringTransactionResponse,
        UpdateRecurringTransactionRequest,
    },
    rules::{
        ApplyRulesResponse, CreateRuleRequest, RuleResponse, TestRuleRequest, TestRuleResponse,
        UpdateRuleRequest,
    },
    search::SearchResponse,
    tax::IrpfRequest,
    tenants::{RegisterTenantRequest, RegistrationResponse, TenantResponse, UpdateTenantRequest},
    transactions::{
        CreateTransactionRequest, TransactionPage, TransactionResponse, UpdateTransactionRequest,
    },
    users::{CreateUserRequest, UpdateUserRequest, UserResponse},
};
use crate::helpers::recurring::ProcessReport;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for expensive operations
    pub cache: Cache<String, CachedData>,
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    Summary(DashboardSummary),
    Monthly(Vec<MonthlyTotal>),
}

/// Query parameters selecting the period a report covers
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams, Validate)]
pub struct PeriodQuery {
    /// Year (e.g., 2025)
    #[validate(range(min = 1900, max = 2200))]
    pub year: Option<i32>,
    /// Month (1-12)
    #[validate(range(min = 1, max = 12))]
    pub month: Option<u32>,
    /// Start date for custom range (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// End date for custom range (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::tenants::register_tenant,
        crate::handlers::tenants::get_current_tenant,
        crate::handlers::tenants::update_current_tenant,
        crate::handlers::users::create_user,
        crate::handlers::users::get_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::accounts::create_account,
        crate::handlers::accounts::get_accounts,
        crate::handlers::accounts::get_account,
        crate::handlers::accounts::update_account,
        crate::handlers::accounts::delete_account,
        crate::handlers::categories::create_category,
        crate::handlers::categories::get_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::get_category_children,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,
        crate::handlers::transactions::create_transaction,
        crate::handlers::transactions::get_transactions,
        crate::handlers::transactions::get_transaction,
        crate::handlers::transactions::update_transaction,
        crate::handlers::transactions::delete_transaction,
        crate::handlers::rules::create_rule,
        crate::handlers::rules::get_rules,
        crate::handlers::rules::get_rule,
        crate::handlers::rules::update_rule,
        crate::handlers::rules::delete_rule,
        crate::handlers::rules::test_rules,
        crate::handlers::rules::apply_rules,
        crate::handlers::recurring::create_recurring_transaction,
        crate::handlers::recurring::get_recurring_transactions,
        crate::handlers::recurring::get_recurring_transaction,
        crate::handlers::recurring::update_recurring_transaction,
        crate::handlers::recurring::delete_recurring_transaction,
        crate::handlers::recurring::process_recurring_transactions,
        crate::handlers::budgets::create_budget,
        crate::handlers::budgets::get_budgets,
        crate::handlers::budgets::get_budget,
        crate::handlers::budgets::update_budget,
        crate::handlers::budgets::delete_budget,
        crate::handlers::budgets::get_budget_status,
        crate::handlers::budgets::get_budgets_status,
        crate::handlers::goals::create_goal,
        crate::handlers::goals::get_goals,
        crate::handlers::goals::get_goal,
        crate::handlers::goals::update_goal,
        crate::handlers::goals::delete_goal,
        crate::handlers::goals::add_contribution,
        crate::handlers::analytics::get_monthly_totals,
        crate::handlers::analytics::get_weekday_totals,
        crate::handlers::analytics::get_category_totals,
        crate::handlers::analytics::get_moving_averages,
        crate::handlers::analytics::get_forecast,
        crate::handlers::analytics::get_budget_rule,
        crate::handlers::analytics::get_summary,
        crate::handlers::search::search_transactions,
        crate::handlers::tax::estimate_tax,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            PeriodQuery,
            RegisterTenantRequest,
            UpdateTenantRequest,
            TenantResponse,
            RegistrationResponse,
            CreateUserRequest,
            UpdateUserRequest,
            UserResponse,
            CreateAccountRequest,
            UpdateAccountRequest,
            AccountResponse,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            CategoryResponse,
            CreateTransactionRequest,
            UpdateTransactionRequest,
            TransactionResponse,
            TransactionPage,
            CreateRuleRequest,
            UpdateRuleRequest,
            RuleResponse,
            TestRuleRequest,
            TestRuleResponse,
            ApplyRulesResponse,
            CreateRecurringTransactionRequest,
            UpdateRecurringTransactionRequest,
            RecurringTransactionResponse,
            ProcessRecurringRequest,
            ProcessReport,
            CreateBudgetRequest,
            UpdateBudgetRequest,
            BudgetResponse,
            BudgetStatusResponse,
            BudgetProgress,
            CreateGoalRequest,
            UpdateGoalRequest,
            ContributionRequest,
            GoalResponse,
            GoalProgress,
            MonthlyTotal,
            WeekdayTotal,
            CategoryTotal,
            MovingAveragePoint,
            MovingAveragesResponse,
            Percentiles,
            Forecast,
            Trend,
            RatioReport,
            BucketReport,
            BucketStatus,
            DashboardSummary,
            ParsedQuery,
            SearchResponse,
            IrpfRequest,
            TaxEstimate,
            TimePeriod,
            DateRange,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "tenants", description = "Tenant registration and settings"),
        (name = "users", description = "Tenant user management"),
        (name = "accounts", description = "Account management endpoints"),
        (name = "categories", description = "Category management endpoints"),
        (name = "transactions", description = "Transaction management endpoints"),
        (name = "rules", description = "Auto-categorization rules"),
        (name = "recurring-transactions", description = "Recurring transaction definitions and processing"),
        (name = "budgets", description = "Monthly budgets"),
        (name = "goals", description = "Savings goals"),
        (name = "analytics", description = "Aggregated reports and forecasts"),
        (name = "search", description = "Natural-language transaction search"),
        (name = "tax", description = "Tax estimates"),
    ),
    info(
        title = "FinHub API",
        description = "Multi-tenant finance API for households and small businesses",
        version = "0.1.0",
        contact(
            name = "FinHub Team",
            email = "contact@finhub.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
