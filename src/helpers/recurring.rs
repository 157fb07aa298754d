//! Turns due recurring definitions into transactions.
//!
//! Each occurrence is written in its own database transaction together with
//! its `recurring_runs` row, so a date is processed at most once per
//! definition even when the processor runs concurrently.

use chrono::{NaiveDate, Utc};
use compute::categorize::Categorizer;
use compute::schedule;
use model::entities::{recurring_run, recurring_transaction, tenant, transaction};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::helpers::rules::{assignment_for, load_categorizer};

/// Outcome of processing one tenant for one date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProcessReport {
    pub date: NaiveDate,
    /// Definitions whose schedule matched the date
    pub due: usize,
    /// Transactions created by this run
    pub created: usize,
    /// Occurrences that had already been processed
    pub skipped: usize,
    pub transaction_ids: Vec<i32>,
}

/// Processes every due definition of a tenant for `date`.
#[instrument(skip(db))]
pub async fn process_tenant(
    db: &DatabaseConnection,
    tenant_id: i32,
    date: NaiveDate,
) -> Result<ProcessReport, DbErr> {
    let definitions = recurring_transaction::Entity::find()
        .filter(recurring_transaction::Column::TenantId.eq(tenant_id))
        .filter(recurring_transaction::Column::Active.eq(true))
        .order_by_asc(recurring_transaction::Column::Id)
        .all(db)
        .await?;

    let due = schedule::due_on(&definitions, date);
    let mut report = ProcessReport {
        date,
        due: due.len(),
        ..Default::default()
    };
    if due.is_empty() {
        debug!("No recurring definitions due on {} for tenant {}", date, tenant_id);
        return Ok(report);
    }

    let categorizer = load_categorizer(db, tenant_id).await?;

    for definition in due {
        let already_processed = recurring_run::Entity::find()
            .filter(recurring_run::Column::RecurringTransactionId.eq(definition.id))
            .filter(recurring_run::Column::OccurrenceDate.eq(date))
            .one(db)
            .await?
            .is_some();
        if already_processed {
            debug!("Definition {} already processed for {}", definition.id, date);
            report.skipped += 1;
            continue;
        }

        match create_occurrence(db, definition, date, &categorizer).await {
            Ok(transaction_id) => {
                report.created += 1;
                report.transaction_ids.push(transaction_id);
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                warn!(
                    "Occurrence of definition {} on {} was recorded concurrently",
                    definition.id, date
                );
                report.skipped += 1;
            }
            Err(err) => {
                error!("Failed to process definition {} on {}: {}", definition.id, date, err);
                return Err(err);
            }
        }
    }

    info!(
        "Processed recurring transactions for tenant {} on {}: {} due, {} created, {} skipped",
        tenant_id, date, report.due, report.created, report.skipped
    );
    Ok(report)
}

async fn create_occurrence(
    db: &DatabaseConnection,
    definition: &recurring_transaction::Model,
    date: NaiveDate,
    categorizer: &Categorizer,
) -> Result<i32, DbErr> {
    let txn = db.begin().await?;

    let mut category_id = definition.category_id;
    let mut account_id = definition.account_id;
    let mut tags = None;
    let mut rule_id = None;
    if category_id.is_none() {
        if let Some(matched) = categorizer.categorize(&definition.description) {
            let assignment =
                assignment_for(&txn, definition.tenant_id, &matched, account_id, None).await?;
            category_id = Some(assignment.category_id);
            account_id = assignment.account_id;
            tags = assignment.tags;
            rule_id = Some(assignment.rule_id);
        }
    }

    let created = transaction::ActiveModel {
        tenant_id: Set(definition.tenant_id),
        account_id: Set(account_id),
        category_id: Set(category_id),
        date: Set(date),
        description: Set(definition.description.clone()),
        amount: Set(definition.amount),
        tags: Set(tags),
        recurring_transaction_id: Set(Some(definition.id)),
        rule_id: Set(rule_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    recurring_run::ActiveModel {
        recurring_transaction_id: Set(definition.id),
        occurrence_date: Set(date),
        transaction_id: Set(created.id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active: recurring_transaction::ActiveModel = definition.clone().into();
    if definition.last_processed_on.is_none_or(|last| last < date) {
        active.last_processed_on = Set(Some(date));
        active.update(&txn).await?;
    }

    txn.commit().await?;
    debug!(
        "Created transaction {} from definition {} for {}",
        created.id, definition.id, date
    );
    Ok(created.id)
}

/// Processes all tenants for `date`. Used by the `process-recurring` command.
pub async fn process_all_tenants(
    db: &DatabaseConnection,
    date: NaiveDate,
) -> Result<Vec<(i32, ProcessReport)>, DbErr> {
    let tenants = tenant::Entity::find()
        .order_by_asc(tenant::Column::Id)
        .all(db)
        .await?;

    let mut reports = Vec::with_capacity(tenants.len());
    for tenant in tenants {
        let report = process_tenant(db, tenant.id, date).await?;
        reports.push((tenant.id, report));
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{seed_tenant, setup_test_db};
    use model::entities::{account, rule};
    use rust_decimal::Decimal;

    async fn definition(
        db: &DatabaseConnection,
        tenant_id: i32,
        account_id: i32,
        description: &str,
        day_of_month: i32,
    ) -> recurring_transaction::Model {
        recurring_transaction::ActiveModel {
            tenant_id: Set(tenant_id),
            account_id: Set(account_id),
            category_id: Set(None),
            description: Set(description.to_string()),
            amount: Set(Decimal::new(-150000, 2)),
            frequency: Set(recurring_transaction::Frequency::Monthly),
            day_of_month: Set(Some(day_of_month)),
            day_of_week: Set(None),
            month_of_year: Set(None),
            start_date: Set(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            end_date: Set(None),
            active: Set(true),
            last_processed_on: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn first_account(db: &DatabaseConnection, tenant_id: i32) -> account::Model {
        account::Entity::find()
            .filter(account::Column::TenantId.eq(tenant_id))
            .one(db)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_processing_twice_creates_one_transaction() {
        let db = setup_test_db().await;
        let seeded = seed_tenant(&db, "twice").await;
        let account = first_account(&db, seeded.tenant.id).await;
        let rent = definition(&db, seeded.tenant.id, account.id, "Aluguel", 5).await;
        let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();

        let first = process_tenant(&db, seeded.tenant.id, date).await.unwrap();
        assert_eq!(first.due, 1);
        assert_eq!(first.created, 1);

        let second = process_tenant(&db, seeded.tenant.id, date).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 1);

        let generated = transaction::Entity::find()
            .filter(transaction::Column::RecurringTransactionId.eq(rent.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].amount, Decimal::new(-150000, 2));

        let stored = recurring_transaction::Entity::find_by_id(rent.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.last_processed_on, Some(date));
    }

    #[tokio::test]
    async fn test_day_31_fires_on_last_day_of_april() {
        let db = setup_test_db().await;
        let seeded = seed_tenant(&db, "clamp").await;
        let account = first_account(&db, seeded.tenant.id).await;
        definition(&db, seeded.tenant.id, account.id, "Fatura", 31).await;

        let april_30 = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        let may_1 = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert_eq!(process_tenant(&db, seeded.tenant.id, april_30).await.unwrap().created, 1);
        assert_eq!(process_tenant(&db, seeded.tenant.id, may_1).await.unwrap().due, 0);
    }

    #[tokio::test]
    async fn test_uncategorized_definition_uses_rules() {
        let db = setup_test_db().await;
        let seeded = seed_tenant(&db, "rules").await;
        let account = first_account(&db, seeded.tenant.id).await;
        let housing = seeded.category("Moradia");

        rule::ActiveModel {
            tenant_id: Set(seeded.tenant.id),
            name: Set("Aluguel".to_string()),
            pattern: Set("aluguel".to_string()),
            category_id: Set(housing),
            account_id: Set(None),
            tags: Set(Some("casa".to_string())),
            position: Set(1),
            active: Set(true),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        definition(&db, seeded.tenant.id, account.id, "ALUGUEL APTO", 5).await;

        let date = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        let report = process_tenant(&db, seeded.tenant.id, date).await.unwrap();
        let created = transaction::Entity::find_by_id(report.transaction_ids[0])
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.category_id, Some(housing));
        assert_eq!(created.tags.as_deref(), Some("casa"));
        assert!(created.rule_id.is_some());
    }

    #[tokio::test]
    async fn test_process_all_tenants_keeps_tenants_apart() {
        let db = setup_test_db().await;
        let first = seed_tenant(&db, "first").await;
        let second = seed_tenant(&db, "second").await;
        let account = first_account(&db, first.tenant.id).await;
        definition(&db, first.tenant.id, account.id, "Internet", 10).await;

        let date = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
        let reports = process_all_tenants(&db, date).await.unwrap();
        assert_eq!(reports.len(), 2);
        let created: Vec<(i32, usize)> = reports.iter().map(|(id, r)| (*id, r.created)).collect();
        assert!(created.contains(&(first.tenant.id, 1)));
        assert!(created.contains(&(second.tenant.id, 0)));
    }
}
