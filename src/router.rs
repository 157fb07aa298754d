use crate::handlers::{
    accounts::{create_account, delete_account, get_account, get_accounts, update_account},
    analytics::{
        get_budget_rule, get_category_totals, get_forecast, get_monthly_totals,
        get_moving_averages, get_summary, get_weekday_totals,
    },
    budgets::{
        create_budget, delete_budget, get_budget, get_budget_status, get_budgets,
        get_budgets_status, update_budget,
    },
    categories::{
        create_category, delete_category, get_categories, get_category, get_category_children,
        update_category,
    },
    goals::{add_contribution, create_goal, delete_goal, get_goal, get_goals, update_goal},
    health::health_check,
    recurring::{
        create_recurring_transaction, delete_recurring_transaction, get_recurring_transaction,
        get_recurring_transactions, process_recurring_transactions, update_recurring_transaction,
    },
    rules::{apply_rules, create_rule, delete_rule, get_rule, get_rules, test_rules, update_rule},
    search::search_transactions,
    tax::estimate_tax,
    tenants::{get_current_tenant, register_tenant, update_current_tenant},
    transactions::{
        create_transaction, delete_transaction, get_transaction, get_transactions,
        update_transaction,
    },
    users::{create_user, delete_user, get_user, get_users, update_user},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use axum_prometheus::PrometheusMetricLayer;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Tenant registration and settings
        .route("/api/v1/tenants/register", post(register_tenant))
        .route("/api/v1/tenant", get(get_current_tenant))
        .route("/api/v1/tenant", put(update_current_tenant))
        // User CRUD routes
        .route("/api/v1/users", post(create_user))
        .route("/api/v1/users", get(get_users))
        .route("/api/v1/users/:user_id", get(get_user))
        .route("/api/v1/users/:user_id", put(update_user))
        .route("/api/v1/users/:user_id", delete(delete_user))
        // Account CRUD routes
        .route("/api/v1/accounts", post(create_account))
        .route("/api/v1/accounts", get(get_accounts))
        .route("/api/v1/accounts/:account_id", get(get_account))
        .route("/api/v1/accounts/:account_id", put(update_account))
        .route("/api/v1/accounts/:account_id", delete(delete_account))
        // Category routes
        .route("/api/v1/categories", post(create_category))
        .route("/api/v1/categories", get(get_categories))
        .route("/api/v1/categories/:category_id", get(get_category))
        .route("/api/v1/categories/:category_id", put(update_category))
        .route("/api/v1/categories/:category_id", delete(delete_category))
        .route("/api/v1/categories/:category_id/children", get(get_category_children))
        // Transaction CRUD routes
        .route("/api/v1/transactions", post(create_transaction))
        .route("/api/v1/transactions", get(get_transactions))
        .route("/api/v1/transactions/:transaction_id", get(get_transaction))
        .route("/api/v1/transactions/:transaction_id", put(update_transaction))
        .route("/api/v1/transactions/:transaction_id", delete(delete_transaction))
        // Categorization rules
        .route("/api/v1/rules", post(create_rule))
        .route("/api/v1/rules", get(get_rules))
        .route("/api/v1/rules/test", post(test_rules))
        .route("/api/v1/rules/apply", post(apply_rules))
        .route("/api/v1/rules/:rule_id", get(get_rule))
        .route("/api/v1/rules/:rule_id", put(update_rule))
        .route("/api/v1/rules/:rule_id", delete(delete_rule))
        // Recurring transaction routes
        .route("/api/v1/recurring-transactions", post(create_recurring_transaction))
        .route("/api/v1/recurring-transactions", get(get_recurring_transactions))
        .route(
            "/api/v1/recurring-transactions/process",
            post(process_recurring_transactions),
        )
        .route(
            "/api/v1/recurring-transactions/:recurring_transaction_id",
            get(get_recurring_transaction),
        )
        .route(
            "/api/v1/recurring-transactions/:recurring_transaction_id",
            put(update_recurring_transaction),
        )
        .route(
            "/api/v1/recurring-transactions/:recurring_transaction_id",
            delete(delete_recurring_transaction),
        )
        // Budgets
        .route("/api/v1/budgets", post(create_budget))
        .route("/api/v1/budgets", get(get_budgets))
        .route("/api/v1/budgets/status", get(get_budgets_status))
        .route("/api/v1/budgets/:budget_id", get(get_budget))
        .route("/api/v1/budgets/:budget_id", put(update_budget))
        .route("/api/v1/budgets/:budget_id", delete(delete_budget))
        .route("/api/v1/budgets/:budget_id/status", get(get_budget_status))
        // Savings goals
        .route("/api/v1/goals", post(create_goal))
        .route("/api/v1/goals", get(get_goals))
        .route("/api/v1/goals/:goal_id", get(get_goal))
        .route("/api/v1/goals/:goal_id", put(update_goal))
        .route("/api/v1/goals/:goal_id", delete(delete_goal))
        .route("/api/v1/goals/:goal_id/contributions", post(add_contribution))
        // Analytics
        .route("/api/v1/analytics/monthly", get(get_monthly_totals))
        .route("/api/v1/analytics/weekdays", get(get_weekday_totals))
        .route("/api/v1/analytics/categories", get(get_category_totals))
        .route("/api/v1/analytics/moving-averages", get(get_moving_averages))
        .route("/api/v1/analytics/forecast", get(get_forecast))
        .route("/api/v1/analytics/budget-rule", get(get_budget_rule))
        .route("/api/v1/analytics/summary", get(get_summary))
        // Search and tax
        .route("/api/v1/search", get(search_transactions))
        .route("/api/v1/tax/irpf", post(estimate_tax))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Adds request metrics and exposes them at `/metrics`.
///
/// The Prometheus recorder is process-global, so this is called once per process.
pub fn with_metrics(router: Router) -> Router {
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
    router
        .route("/metrics", get(move || async move { metric_handle.render() }))
        .layer(prometheus_layer)
}
