#[cfg(test)]
mod integration_tests {
    use crate::handlers::accounts::AccountResponse;
    use crate::handlers::budgets::{BudgetResponse, BudgetStatusResponse, CreateBudgetRequest};
    use crate::handlers::categories::{CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest};
    use crate::handlers::goals::{ContributionRequest, CreateGoalRequest, GoalResponse};
    use crate::handlers::recurring::{
        CreateRecurringTransactionRequest, ProcessRecurringRequest, RecurringTransactionResponse,
    };
    use crate::handlers::analytics::MovingAveragesResponse;
    use crate::handlers::rules::{
        ApplyRulesResponse, CreateRuleRequest, RuleResponse, TestRuleRequest, TestRuleResponse,
    };
    use crate::handlers::search::SearchResponse;
    use crate::handlers::tax::IrpfRequest;
    use crate::handlers::tenants::{RegisterTenantRequest, RegistrationResponse};
    use crate::handlers::transactions::{
        CreateTransactionRequest, TransactionPage, TransactionResponse,
    };
    use crate::handlers::users::{CreateUserRequest, UpdateUserRequest, UserResponse};
    use crate::helpers::recurring::ProcessReport;
    use crate::helpers::stats::today;
    use crate::schemas::{ApiResponse, ErrorResponse};
    use crate::test_utils::test_utils::{
        SeededTenant, add_user, identity_headers, init_test_tracing, seed_tenant, setup_test_app,
    };
    use axum::http::StatusCode;
    use axum_test::{TestRequest, TestServer};
    use chrono::{Datelike, NaiveDate};
    use common::{DashboardSummary, Forecast, TaxEstimate, Trend};
    use model::entities::user::Role;
    use rust_decimal::Decimal;

    fn with_identity(request: TestRequest, tenant_id: i32, user_id: i32) -> TestRequest {
        identity_headers(tenant_id, user_id)
            .into_iter()
            .fold(request, |request, (name, value)| request.add_header(name, value))
    }

    fn as_owner(request: TestRequest, seeded: &SeededTenant) -> TestRequest {
        with_identity(request, seeded.tenant.id, seeded.owner.id)
    }

    fn assert_error(response: &axum_test::TestResponse, status: StatusCode, code: &str) {
        response.assert_status(status);
        let body: ErrorResponse = response.json();
        assert!(!body.success);
        assert_eq!(body.code, code);
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn setup() -> (TestServer, crate::schemas::AppState) {
        let (app, state) = setup_test_app().await;
        (TestServer::new(app).unwrap(), state)
    }

    async fn create_transaction(
        server: &TestServer,
        seeded: &SeededTenant,
        request: &CreateTransactionRequest,
    ) -> TransactionResponse {
        let response = as_owner(server.post("/api/v1/transactions"), seeded)
            .json(request)
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<TransactionResponse> = response.json();
        body.data
    }

    fn expense(seeded: &SeededTenant, on: NaiveDate, description: &str, amount: i64) -> CreateTransactionRequest {
        CreateTransactionRequest {
            account_id: seeded.account.id,
            category_id: None,
            date: on,
            description: description.to_string(),
            amount: Decimal::new(-amount, 0),
            tags: None,
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let _guard = init_test_tracing();
        let (server, _) = setup().await;

        let response = server.get("/health").await;

        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }

    #[tokio::test]
    async fn test_metrics_not_exposed_without_serve() {
        let (server, _) = setup().await;
        server.get("/metrics").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_register_tenant() {
        let (server, _) = setup().await;
        let request = RegisterTenantRequest {
            name: "Padaria Central".to_string(),
            slug: "padaria-central".to_string(),
            currency_code: None,
            plan: Some("pro".to_string()),
            owner_username: "maria".to_string(),
            owner_email: "maria@padaria.example.com".to_string(),
        };

        let response = server.post("/api/v1/tenants/register").json(&request).await;

        response.assert_status(StatusCode::CREATED);
        let body: ApiResponse<RegistrationResponse> = response.json();
        assert!(body.success);
        assert_eq!(body.data.tenant.slug, "padaria-central");
        assert_eq!(body.data.tenant.currency_code, "BRL");
        assert_eq!(body.data.tenant.plan, "Pro");
        assert_eq!(body.data.owner.role, "Owner");
        assert_eq!(body.data.categories.len(), 8);

        let again = server.post("/api/v1/tenants/register").json(&request).await;
        assert_error(&again, StatusCode::CONFLICT, "DUPLICATE_SLUG");
    }

    #[tokio::test]
    async fn test_register_rejects_bad_slug() {
        let (server, _) = setup().await;
        let response = server
            .post("/api/v1/tenants/register")
            .json(&RegisterTenantRequest {
                name: "Bad".to_string(),
                slug: "Not A Slug!".to_string(),
                currency_code: None,
                plan: None,
                owner_username: "bad".to_string(),
                owner_email: "bad@example.com".to_string(),
            })
            .await;
        assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_SLUG");
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let (server, _) = setup().await;
        let response = server.get("/api/v1/accounts").await;
        assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_user_of_other_tenant_is_unauthorized() {
        let (server, state) = setup().await;
        let first = seed_tenant(&state.db, "first").await;
        let second = seed_tenant(&state.db, "second").await;

        let response = with_identity(server.get("/api/v1/accounts"), first.tenant.id, second.owner.id).await;
        assert_error(&response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_viewer_cannot_create_transaction() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "viewers").await;
        let viewer = add_user(&state.db, seeded.tenant.id, "olivia", Role::Viewer).await;

        let response = with_identity(server.post("/api/v1/transactions"), seeded.tenant.id, viewer.id)
            .json(&expense(&seeded, date(2025, 3, 1), "Padaria", 12))
            .await;
        assert_error(&response, StatusCode::FORBIDDEN, "FORBIDDEN");

        let listing = with_identity(server.get("/api/v1/transactions"), seeded.tenant.id, viewer.id).await;
        listing.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_tenant_account_is_not_found() {
        let (server, state) = setup().await;
        let first = seed_tenant(&state.db, "alpha").await;
        let second = seed_tenant(&state.db, "beta").await;

        let response = as_owner(
            server.get(&format!("/api/v1/accounts/{}", second.account.id)),
            &first,
        )
        .await;
        assert_error(&response, StatusCode::NOT_FOUND, "ACCOUNT_NOT_FOUND");

        let own = as_owner(server.get(&format!("/api/v1/accounts/{}", first.account.id)), &first).await;
        own.assert_status(StatusCode::OK);
        let body: ApiResponse<AccountResponse> = own.json();
        assert_eq!(body.data.name, "Conta Corrente");
    }

    #[tokio::test]
    async fn test_transaction_with_foreign_account_is_rejected() {
        let (server, state) = setup().await;
        let first = seed_tenant(&state.db, "gamma").await;
        let second = seed_tenant(&state.db, "delta").await;

        let mut request = expense(&first, date(2025, 3, 1), "Mercado", 80);
        request.account_id = second.account.id;
        let response = as_owner(server.post("/api/v1/transactions"), &first)
            .json(&request)
            .await;
        assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_ACCOUNT_ID");
    }

    #[tokio::test]
    async fn test_zero_amount_is_rejected() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "zero").await;
        let response = as_owner(server.post("/api/v1/transactions"), &seeded)
            .json(&expense(&seeded, date(2025, 3, 1), "Nada", 0))
            .await;
        assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_AMOUNT");
    }

    #[tokio::test]
    async fn test_rules_categorize_new_transactions() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "rules").await;
        let transport = seeded.category("Transporte");
        let food = seeded.category("Alimentação");

        let rule = as_owner(server.post("/api/v1/rules"), &seeded)
            .json(&CreateRuleRequest {
                name: "Uber".to_string(),
                pattern: "uber".to_string(),
                category_id: transport,
                account_id: None,
                tags: Some(vec!["mobilidade".to_string()]),
                position: None,
                active: None,
            })
            .await;
        rule.assert_status(StatusCode::CREATED);
        let rule: ApiResponse<RuleResponse> = rule.json();

        let matched = create_transaction(
            &server,
            &seeded,
            &expense(&seeded, date(2025, 3, 2), "UBER TRIP 123", 25),
        )
        .await;
        assert_eq!(matched.category_id, Some(transport));
        assert_eq!(matched.rule_id, Some(rule.data.id));
        assert_eq!(matched.tags, vec!["mobilidade".to_string()]);

        let mut explicit = expense(&seeded, date(2025, 3, 2), "UBER EATS", 40);
        explicit.category_id = Some(food);
        let explicit = create_transaction(&server, &seeded, &explicit).await;
        assert_eq!(explicit.category_id, Some(food));
        assert_eq!(explicit.rule_id, None);

        let unmatched = create_transaction(
            &server,
            &seeded,
            &expense(&seeded, date(2025, 3, 2), "Padaria", 9),
        )
        .await;
        assert_eq!(unmatched.category_id, None);
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "order").await;

        for (name, pattern, category) in [
            ("Mercado", "mercado", "Alimentação"),
            ("Mercado Livre", "mercado livre", "Compras"),
        ] {
            as_owner(server.post("/api/v1/rules"), &seeded)
                .json(&CreateRuleRequest {
                    name: name.to_string(),
                    pattern: pattern.to_string(),
                    category_id: seeded.category(category),
                    account_id: None,
                    tags: None,
                    position: None,
                    active: None,
                })
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = as_owner(server.post("/api/v1/rules/test"), &seeded)
            .json(&TestRuleRequest {
                description: "MERCADO LIVRE *PEDIDO".to_string(),
            })
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<TestRuleResponse> = response.json();
        assert!(body.data.matched);
        assert_eq!(body.data.category_name.as_deref(), Some("Alimentação"));
    }

    #[tokio::test]
    async fn test_blank_rule_pattern_is_rejected() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "blank").await;
        let response = as_owner(server.post("/api/v1/rules"), &seeded)
            .json(&CreateRuleRequest {
                name: "Vazio".to_string(),
                pattern: "   ".to_string(),
                category_id: seeded.category("Lazer"),
                account_id: None,
                tags: None,
                position: None,
                active: None,
            })
            .await;
        assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_PATTERN");
    }

    #[tokio::test]
    async fn test_process_recurring_is_idempotent() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "recurring").await;

        let created = as_owner(server.post("/api/v1/recurring-transactions"), &seeded)
            .json(&CreateRecurringTransactionRequest {
                account_id: seeded.account.id,
                category_id: Some(seeded.category("Moradia")),
                description: "Aluguel".to_string(),
                amount: Decimal::new(-1500, 0),
                frequency: "monthly".to_string(),
                day_of_month: Some(5),
                day_of_week: None,
                month_of_year: None,
                start_date: date(2025, 1, 1),
                end_date: None,
                active: None,
            })
            .await;
        created.assert_status(StatusCode::CREATED);
        let definition: ApiResponse<RecurringTransactionResponse> = created.json();
        assert_eq!(definition.data.frequency, "Monthly");

        let process = ProcessRecurringRequest {
            date: Some(date(2025, 3, 5)),
        };
        let first = as_owner(server.post("/api/v1/recurring-transactions/process"), &seeded)
            .json(&process)
            .await;
        first.assert_status(StatusCode::OK);
        let first: ApiResponse<ProcessReport> = first.json();
        assert_eq!(first.data.created, 1);

        let second = as_owner(server.post("/api/v1/recurring-transactions/process"), &seeded)
            .json(&process)
            .await;
        let second: ApiResponse<ProcessReport> = second.json();
        assert_eq!(second.data.created, 0);
        assert_eq!(second.data.skipped, 1);

        let listing = as_owner(server.get("/api/v1/transactions"), &seeded).await;
        let page: ApiResponse<TransactionPage> = listing.json();
        assert_eq!(page.data.total, 1);
        assert_eq!(page.data.items[0].recurring_transaction_id, Some(definition.data.id));
    }

    #[tokio::test]
    async fn test_weekly_definition_requires_weekday() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "weekly").await;
        let response = as_owner(server.post("/api/v1/recurring-transactions"), &seeded)
            .json(&CreateRecurringTransactionRequest {
                account_id: seeded.account.id,
                category_id: None,
                description: "Feira".to_string(),
                amount: Decimal::new(-60, 0),
                frequency: "Weekly".to_string(),
                day_of_month: None,
                day_of_week: None,
                month_of_year: None,
                start_date: date(2025, 1, 1),
                end_date: None,
                active: None,
            })
            .await;
        assert_error(&response, StatusCode::BAD_REQUEST, "INVALID_SCHEDULE");
    }

    #[tokio::test]
    async fn test_budget_status_over_limit() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "budget").await;
        let food = seeded.category("Alimentação");

        let created = as_owner(server.post("/api/v1/budgets"), &seeded)
            .json(&CreateBudgetRequest {
                category_id: food,
                year: 2025,
                month: 3,
                limit_amount: Decimal::new(100, 0),
                alert_threshold: None,
            })
            .await;
        created.assert_status(StatusCode::CREATED);
        let budget: ApiResponse<BudgetResponse> = created.json();
        assert_eq!(budget.data.alert_threshold, 80);

        let mut groceries = expense(&seeded, date(2025, 3, 10), "Supermercado", 150);
        groceries.category_id = Some(food);
        create_transaction(&server, &seeded, &groceries).await;
        // outside the budget month
        let mut april = expense(&seeded, date(2025, 4, 1), "Supermercado", 70);
        april.category_id = Some(food);
        create_transaction(&server, &seeded, &april).await;

        let response = as_owner(
            server.get(&format!("/api/v1/budgets/{}/status", budget.data.id)),
            &seeded,
        )
        .await;
        response.assert_status(StatusCode::OK);
        let status: ApiResponse<BudgetStatusResponse> = response.json();
        let progress = status.data.progress;
        assert_eq!(progress.spent, Decimal::new(150, 0));
        assert_eq!(progress.percentage, 150.0);
        assert_eq!(progress.display_percentage, 100.0);
        assert!(progress.alert);
        assert!(progress.exceeded);

        let duplicate = as_owner(server.post("/api/v1/budgets"), &seeded)
            .json(&CreateBudgetRequest {
                category_id: food,
                year: 2025,
                month: 3,
                limit_amount: Decimal::new(200, 0),
                alert_threshold: Some(90),
            })
            .await;
        assert_error(&duplicate, StatusCode::CONFLICT, "DUPLICATE_BUDGET");
    }

    #[tokio::test]
    async fn test_irpf_estimate() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "tax").await;

        let response = as_owner(server.post("/api/v1/tax/irpf"), &seeded)
            .json(&IrpfRequest {
                income: Decimal::new(3000, 0),
                dependents: None,
                other_deductions: None,
            })
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<TaxEstimate> = response.json();
        assert_eq!(body.data.monthly_tax, Decimal::new(6856, 2));

        let exempt = as_owner(server.post("/api/v1/tax/irpf"), &seeded)
            .json(&IrpfRequest {
                income: Decimal::new(2000, 0),
                dependents: None,
                other_deductions: None,
            })
            .await;
        let exempt: ApiResponse<TaxEstimate> = exempt.json();
        assert_eq!(exempt.data.monthly_tax, Decimal::ZERO);

        let negative = as_owner(server.post("/api/v1/tax/irpf"), &seeded)
            .json(&IrpfRequest {
                income: Decimal::new(-1, 0),
                dependents: None,
                other_deductions: None,
            })
            .await;
        assert_error(&negative, StatusCode::BAD_REQUEST, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_natural_language_search() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "search").await;
        let year = today().year();
        let food = seeded.category("Alimentação");

        let mut march = expense(&seeded, date(year, 3, 12), "Restaurante", 90);
        march.category_id = Some(food);
        create_transaction(&server, &seeded, &march).await;
        let mut small = expense(&seeded, date(year, 3, 15), "Café", 8);
        small.category_id = Some(food);
        create_transaction(&server, &seeded, &small).await;
        let mut february = expense(&seeded, date(year, 2, 12), "Restaurante", 50);
        february.category_id = Some(food);
        create_transaction(&server, &seeded, &february).await;

        let response = as_owner(server.get("/api/v1/search"), &seeded)
            .add_query_param("q", "gastos com alimentação em março")
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<SearchResponse> = response.json();
        assert_eq!(body.data.parsed.month, Some(3));
        assert_eq!(body.data.category_id, Some(food));
        assert_eq!(body.data.year, year);
        assert_eq!(body.data.count, 2);
        assert_eq!(body.data.total, Decimal::new(-98, 0));

        let above = as_owner(server.get("/api/v1/search"), &seeded)
            .add_query_param("q", "alimentação em março acima de 50")
            .await;
        let above: ApiResponse<SearchResponse> = above.json();
        assert_eq!(above.data.count, 1);
    }

    #[tokio::test]
    async fn test_summary_is_invalidated_by_writes() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "summary").await;

        create_transaction(&server, &seeded, &expense(&seeded, date(2025, 3, 3), "Farmácia", 40)).await;
        let first = as_owner(server.get("/api/v1/analytics/summary"), &seeded)
            .add_query_param("year", 2025)
            .add_query_param("month", 3)
            .await;
        first.assert_status(StatusCode::OK);
        let first: ApiResponse<DashboardSummary> = first.json();
        assert_eq!(first.data.transaction_count, 1);
        assert_eq!(first.data.uncategorized_count, 1);

        create_transaction(&server, &seeded, &expense(&seeded, date(2025, 3, 4), "Farmácia", 10)).await;
        let second = as_owner(server.get("/api/v1/analytics/summary"), &seeded)
            .add_query_param("year", 2025)
            .add_query_param("month", 3)
            .await;
        let second: ApiResponse<DashboardSummary> = second.json();
        assert_eq!(second.data.transaction_count, 2);
        assert_eq!(second.data.expenses, 50.0);
    }

    #[tokio::test]
    async fn test_summary_is_scoped_to_tenant() {
        let (server, state) = setup().await;
        let first = seed_tenant(&state.db, "one").await;
        let second = seed_tenant(&state.db, "two").await;
        create_transaction(&server, &first, &expense(&first, date(2025, 3, 3), "Mercado", 40)).await;

        let response = as_owner(server.get("/api/v1/analytics/summary"), &second)
            .add_query_param("year", 2025)
            .add_query_param("month", 3)
            .await;
        let body: ApiResponse<DashboardSummary> = response.json();
        assert_eq!(body.data.transaction_count, 0);
    }

    #[tokio::test]
    async fn test_transactions_pagination() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "pages").await;
        for day in 1..=5 {
            create_transaction(&server, &seeded, &expense(&seeded, date(2025, 1, day), "Ônibus", 5)).await;
        }

        let response = as_owner(server.get("/api/v1/transactions"), &seeded)
            .add_query_param("page", 2)
            .add_query_param("limit", 2)
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<TransactionPage> = response.json();
        assert_eq!(body.data.total, 5);
        assert_eq!(body.data.items.len(), 2);
        assert_eq!(body.data.page, 2);
    }

    #[tokio::test]
    async fn test_last_owner_cannot_be_demoted() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "owners").await;

        let response = as_owner(server.put(&format!("/api/v1/users/{}", seeded.owner.id)), &seeded)
            .json(&UpdateUserRequest {
                role: Some("Admin".to_string()),
                ..Default::default()
            })
            .await;
        assert_error(&response, StatusCode::CONFLICT, "LAST_OWNER");
    }

    #[tokio::test]
    async fn test_admin_cannot_create_owner() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "admins").await;
        let admin = add_user(&state.db, seeded.tenant.id, "ana", Role::Admin).await;

        let owner_attempt = with_identity(server.post("/api/v1/users"), seeded.tenant.id, admin.id)
            .json(&CreateUserRequest {
                username: "bruno".to_string(),
                email: "bruno@example.com".to_string(),
                role: Some("Owner".to_string()),
            })
            .await;
        assert_error(&owner_attempt, StatusCode::FORBIDDEN, "FORBIDDEN");

        let member = with_identity(server.post("/api/v1/users"), seeded.tenant.id, admin.id)
            .json(&CreateUserRequest {
                username: "bruno".to_string(),
                email: "bruno@example.com".to_string(),
                role: None,
            })
            .await;
        member.assert_status(StatusCode::CREATED);
        let member: ApiResponse<UserResponse> = member.json();
        assert_eq!(member.data.role, "Member");
    }

    #[tokio::test]
    async fn test_category_cycle_is_rejected() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "cycles").await;
        let housing = seeded.category("Moradia");

        let child = as_owner(server.post("/api/v1/categories"), &seeded)
            .json(&CreateCategoryRequest {
                name: "Condomínio".to_string(),
                kind: "need".to_string(),
                parent_id: Some(housing),
            })
            .await;
        child.assert_status(StatusCode::CREATED);
        let child: ApiResponse<CategoryResponse> = child.json();

        let response = as_owner(server.put(&format!("/api/v1/categories/{}", housing)), &seeded)
            .json(&UpdateCategoryRequest {
                parent_id: Some(Some(child.data.id)),
                ..Default::default()
            })
            .await;
        assert_error(&response, StatusCode::BAD_REQUEST, "CATEGORY_CYCLE");

        let children = as_owner(
            server.get(&format!("/api/v1/categories/{}/children", housing)),
            &seeded,
        )
        .await;
        let children: ApiResponse<Vec<CategoryResponse>> = children.json();
        assert_eq!(children.data.len(), 1);
    }

    #[tokio::test]
    async fn test_goal_contributions() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "goals").await;

        let created = as_owner(server.post("/api/v1/goals"), &seeded)
            .json(&CreateGoalRequest {
                name: "Reserva de emergência".to_string(),
                target_amount: Decimal::new(1000, 0),
                current_amount: None,
                deadline: None,
            })
            .await;
        created.assert_status(StatusCode::CREATED);
        let goal: ApiResponse<GoalResponse> = created.json();

        let response = as_owner(
            server.post(&format!("/api/v1/goals/{}/contributions", goal.data.id)),
            &seeded,
        )
        .json(&ContributionRequest {
            amount: Decimal::new(250, 0),
        })
        .await;
        response.assert_status(StatusCode::OK);
        let updated: ApiResponse<GoalResponse> = response.json();
        assert_eq!(updated.data.current_amount, Decimal::new(250, 0));
        assert_eq!(updated.data.progress.percentage, 25.0);

        let overdraw = as_owner(
            server.post(&format!("/api/v1/goals/{}/contributions", goal.data.id)),
            &seeded,
        )
        .json(&ContributionRequest {
            amount: Decimal::new(-300, 0),
        })
        .await;
        assert_error(&overdraw, StatusCode::BAD_REQUEST, "INVALID_CONTRIBUTION");
    }

    #[tokio::test]
    async fn test_budget_rule_report() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "ratio").await;

        let mut salary = expense(&seeded, date(2025, 3, 1), "Salário", 0);
        salary.amount = Decimal::new(5000, 0);
        salary.category_id = Some(seeded.category("Salário"));
        create_transaction(&server, &seeded, &salary).await;
        let mut rent = expense(&seeded, date(2025, 3, 5), "Aluguel", 2500);
        rent.category_id = Some(seeded.category("Moradia"));
        create_transaction(&server, &seeded, &rent).await;

        let response = as_owner(server.get("/api/v1/analytics/budget-rule"), &seeded)
            .add_query_param("year", 2025)
            .add_query_param("month", 3)
            .await;
        response.assert_status(StatusCode::OK);
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["needs"]["percentage"], 50.0);
        assert_eq!(body["data"]["needs"]["status"], "on_target");
        assert_eq!(body["data"]["wants"]["status"], "under");
    }

    #[tokio::test]
    async fn test_unknown_goal_is_not_found() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "missing").await;
        let response = as_owner(server.get("/api/v1/goals/999"), &seeded).await;
        assert_error(&response, StatusCode::NOT_FOUND, "GOAL_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_apply_rules_to_uncategorized_transactions() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "apply").await;
        let transport = seeded.category("Transporte");

        let mut tagged = expense(&seeded, date(2025, 3, 2), "99 POP corrida", 18);
        tagged.tags = Some(vec!["trabalho".to_string()]);
        let first = create_transaction(&server, &seeded, &tagged).await;
        let second = create_transaction(
            &server,
            &seeded,
            &expense(&seeded, date(2025, 3, 3), "99 pop aeroporto", 60),
        )
        .await;
        let other = create_transaction(
            &server,
            &seeded,
            &expense(&seeded, date(2025, 3, 4), "Farmácia", 30),
        )
        .await;
        assert_eq!(first.category_id, None);

        let rule = as_owner(server.post("/api/v1/rules"), &seeded)
            .json(&CreateRuleRequest {
                name: "99".to_string(),
                pattern: "99 pop".to_string(),
                category_id: transport,
                account_id: None,
                tags: Some(vec!["mobilidade".to_string()]),
                position: None,
                active: None,
            })
            .await;
        rule.assert_status(StatusCode::CREATED);
        let rule: ApiResponse<RuleResponse> = rule.json();

        let response = as_owner(server.post("/api/v1/rules/apply"), &seeded).await;
        response.assert_status(StatusCode::OK);
        let applied: ApiResponse<ApplyRulesResponse> = response.json();
        assert_eq!(applied.data.examined, 3);
        assert_eq!(applied.data.categorized, 2);

        let fetch = |id: i32| as_owner(server.get(&format!("/api/v1/transactions/{}", id)), &seeded);
        let first: ApiResponse<TransactionResponse> = fetch(first.id).await.json();
        assert_eq!(first.data.category_id, Some(transport));
        assert_eq!(first.data.rule_id, Some(rule.data.id));
        assert_eq!(
            first.data.tags,
            vec!["trabalho".to_string(), "mobilidade".to_string()]
        );
        let second: ApiResponse<TransactionResponse> = fetch(second.id).await.json();
        assert_eq!(second.data.category_id, Some(transport));
        assert_eq!(second.data.tags, vec!["mobilidade".to_string()]);
        let other: ApiResponse<TransactionResponse> = fetch(other.id).await.json();
        assert_eq!(other.data.category_id, None);
        assert_eq!(other.data.rule_id, None);

        // nothing is left for the rule
        let again = as_owner(server.post("/api/v1/rules/apply"), &seeded).await;
        let again: ApiResponse<ApplyRulesResponse> = again.json();
        assert_eq!(again.data.examined, 1);
        assert_eq!(again.data.categorized, 0);
    }

    #[tokio::test]
    async fn test_month_budget_statuses() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "budgets").await;
        let food = seeded.category("Alimentação");
        let leisure = seeded.category("Lazer");

        for (category_id, limit) in [(food, 1000), (leisure, 200)] {
            as_owner(server.post("/api/v1/budgets"), &seeded)
                .json(&CreateBudgetRequest {
                    category_id,
                    year: 2025,
                    month: 5,
                    limit_amount: Decimal::new(limit, 0),
                    alert_threshold: None,
                })
                .await
                .assert_status(StatusCode::CREATED);
        }
        // another month is not reported
        as_owner(server.post("/api/v1/budgets"), &seeded)
            .json(&CreateBudgetRequest {
                category_id: food,
                year: 2025,
                month: 6,
                limit_amount: Decimal::new(500, 0),
                alert_threshold: None,
            })
            .await
            .assert_status(StatusCode::CREATED);

        let mut groceries = expense(&seeded, date(2025, 5, 8), "Supermercado", 300);
        groceries.category_id = Some(food);
        create_transaction(&server, &seeded, &groceries).await;
        let mut cinema = expense(&seeded, date(2025, 5, 9), "Cinema", 180);
        cinema.category_id = Some(leisure);
        create_transaction(&server, &seeded, &cinema).await;

        let response = as_owner(server.get("/api/v1/budgets/status"), &seeded)
            .add_query_param("year", 2025)
            .add_query_param("month", 5)
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Vec<BudgetStatusResponse>> = response.json();
        assert_eq!(body.data.len(), 2);

        let food_status = body.data.iter().find(|s| s.category_id == food).unwrap();
        assert_eq!(food_status.category_name, "Alimentação");
        assert_eq!(food_status.progress.spent, Decimal::new(300, 0));
        assert_eq!(food_status.progress.percentage, 30.0);
        assert!(!food_status.progress.alert);
        assert!(!food_status.progress.exceeded);

        let leisure_status = body.data.iter().find(|s| s.category_id == leisure).unwrap();
        assert_eq!(leisure_status.progress.percentage, 90.0);
        assert!(leisure_status.progress.alert);
        assert!(!leisure_status.progress.exceeded);

        let empty = as_owner(server.get("/api/v1/budgets/status"), &seeded)
            .add_query_param("year", 2024)
            .add_query_param("month", 1)
            .await;
        let empty: ApiResponse<Vec<BudgetStatusResponse>> = empty.json();
        assert!(empty.data.is_empty());
    }

    #[tokio::test]
    async fn test_forecast_endpoint() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "forecast").await;
        for (month, amount) in [(1, 100), (2, 200), (3, 300)] {
            create_transaction(
                &server,
                &seeded,
                &expense(&seeded, date(2025, month, 10), "Mercado", amount),
            )
            .await;
        }

        let response = as_owner(server.get("/api/v1/analytics/forecast"), &seeded)
            .add_query_param("year", 2025)
            .add_query_param("month", 3)
            .add_query_param("window", 3)
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<Forecast> = response.json();
        assert_eq!(body.data.month, "2025-04");
        assert_eq!(body.data.estimate, 200.0);
        assert_eq!(body.data.lower, 100.0);
        assert_eq!(body.data.upper, 300.0);
        assert_eq!(body.data.trend, Trend::Up);
        assert_eq!(body.data.window.len(), 3);

        let invalid = as_owner(server.get("/api/v1/analytics/forecast"), &seeded)
            .add_query_param("window", 0)
            .await;
        invalid.assert_status(StatusCode::BAD_REQUEST);
        let too_wide = as_owner(server.get("/api/v1/analytics/forecast"), &seeded)
            .add_query_param("window", 25)
            .await;
        too_wide.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_moving_averages_endpoint() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "averages").await;
        create_transaction(
            &server,
            &seeded,
            &expense(&seeded, date(2025, 3, 7), "Mercado", 70),
        )
        .await;

        let response = as_owner(server.get("/api/v1/analytics/moving-averages"), &seeded)
            .add_query_param("start_date", "2025-03-01")
            .add_query_param("end_date", "2025-03-07")
            .await;
        response.assert_status(StatusCode::OK);
        let body: ApiResponse<MovingAveragesResponse> = response.json();
        assert_eq!(body.data.points.len(), 7);
        assert_eq!(body.data.points[0].date, date(2025, 3, 1));
        assert_eq!(body.data.points[6].total, 70.0);
        assert_eq!(body.data.points[5].total, 0.0);

        let unbounded = as_owner(server.get("/api/v1/analytics/moving-averages"), &seeded)
            .add_query_param("start_date", "0001-01-01")
            .add_query_param("end_date", "9999-12-31")
            .await;
        assert_error(&unbounded, StatusCode::BAD_REQUEST, "INVALID_DATE_RANGE");
    }

    #[tokio::test]
    async fn test_period_totals_endpoints() {
        let (server, state) = setup().await;
        let seeded = seed_tenant(&state.db, "totals").await;
        let mut rent = expense(&seeded, date(2025, 3, 3), "Aluguel", 1500);
        rent.category_id = Some(seeded.category("Moradia"));
        create_transaction(&server, &seeded, &rent).await;
        let mut salary = expense(&seeded, date(2025, 3, 5), "Salário", 0);
        salary.amount = Decimal::new(4000, 0);
        create_transaction(&server, &seeded, &salary).await;

        let monthly = as_owner(server.get("/api/v1/analytics/monthly"), &seeded)
            .add_query_param("year", 2025)
            .await;
        monthly.assert_status(StatusCode::OK);
        let monthly: serde_json::Value = monthly.json();
        assert_eq!(monthly["data"][0]["month"], "2025-03");
        assert_eq!(monthly["data"][0]["income"], 4000.0);
        assert_eq!(monthly["data"][0]["expenses"], 1500.0);

        let weekdays = as_owner(server.get("/api/v1/analytics/weekdays"), &seeded)
            .add_query_param("year", 2025)
            .add_query_param("month", 3)
            .await;
        weekdays.assert_status(StatusCode::OK);
        let weekdays: serde_json::Value = weekdays.json();
        assert_eq!(weekdays["data"].as_array().map(|a| a.len()), Some(7));

        let categories = as_owner(server.get("/api/v1/analytics/categories"), &seeded)
            .add_query_param("year", 2025)
            .add_query_param("month", 3)
            .await;
        categories.assert_status(StatusCode::OK);
        let categories: serde_json::Value = categories.json();
        assert_eq!(categories["data"][0]["category"], "Moradia");

        let bad_month = as_owner(server.get("/api/v1/analytics/monthly"), &seeded)
            .add_query_param("month", 13)
            .await;
        bad_month.assert_status(StatusCode::BAD_REQUEST);
    }
}
