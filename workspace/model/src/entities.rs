//! This file serves as the root for all SeaORM entity modules.
//! Every business table carries a `tenant_id`; queries must always be scoped by it.

pub mod account;
pub mod budget;
pub mod category;
pub mod goal;
pub mod recurring_run;
pub mod recurring_transaction;
pub mod rule;
pub mod tenant;
pub mod transaction;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::account::Entity as Account;
    pub use super::budget::Entity as Budget;
    pub use super::category::Entity as Category;
    pub use super::goal::Entity as Goal;
    pub use super::recurring_run::Entity as RecurringRun;
    pub use super::recurring_transaction::Entity as RecurringTransaction;
    pub use super::rule::Entity as Rule;
    pub use super::tenant::Entity as Tenant;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
}

#[cfg(test)]
mod test {
    use chrono::{NaiveDate, Utc};
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{
        ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
        EntityTrait, ModelTrait, QueryFilter, Set,
    };

    use super::*;
    use prelude::*;

    async fn setup_db() -> Result<DatabaseConnection, DbErr> {
        let db = Database::connect("sqlite::memory:").await?;

        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;

        Migrator::up(&db, None).await.expect("Migrations failed.");
        Ok(db)
    }

    async fn create_tenant(db: &DatabaseConnection, slug: &str) -> Result<tenant::Model, DbErr> {
        tenant::ActiveModel {
            name: Set(format!("Tenant {}", slug)),
            slug: Set(slug.to_string()),
            currency_code: Set("BRL".to_string()),
            plan: Set(tenant::Plan::Free),
            brand_color: Set(None),
            logo_url: Set(None),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    #[tokio::test]
    async fn test_entity_integration() -> Result<(), DbErr> {
        let db = setup_db().await?;

        let acme = create_tenant(&db, "acme").await?;

        let owner = user::ActiveModel {
            tenant_id: Set(acme.id),
            username: Set("owner".to_string()),
            email: Set("owner@acme.test".to_string()),
            role: Set(user::Role::Owner),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        assert_eq!(owner.role, user::Role::Owner);

        let checking = account::ActiveModel {
            tenant_id: Set(acme.id),
            name: Set("Conta corrente".to_string()),
            kind: Set(account::AccountKind::Checking),
            currency_code: Set("BRL".to_string()),
            credit_limit: Set(None),
            include_in_statistics: Set(true),
            archived: Set(false),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let transport = category::ActiveModel {
            tenant_id: Set(acme.id),
            name: Set("Transporte".to_string()),
            kind: Set(category::CategoryKind::Need),
            parent_id: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let rule = rule::ActiveModel {
            tenant_id: Set(acme.id),
            name: Set("Uber".to_string()),
            pattern: Set("UBER".to_string()),
            category_id: Set(transport.id),
            account_id: Set(None),
            tags: Set(Some("mobilidade".to_string())),
            position: Set(0),
            active: Set(true),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let rent = recurring_transaction::ActiveModel {
            tenant_id: Set(acme.id),
            account_id: Set(checking.id),
            category_id: Set(None),
            description: Set("Aluguel".to_string()),
            amount: Set(Decimal::new(-150000, 2)),
            frequency: Set(recurring_transaction::Frequency::Monthly),
            day_of_month: Set(Some(5)),
            day_of_week: Set(None),
            month_of_year: Set(None),
            start_date: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            end_date: Set(None),
            active: Set(true),
            last_processed_on: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let trip = transaction::ActiveModel {
            tenant_id: Set(acme.id),
            account_id: Set(checking.id),
            category_id: Set(Some(transport.id)),
            date: Set(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()),
            description: Set("UBER TRIP 123".to_string()),
            amount: Set(Decimal::new(-2350, 2)),
            tags: Set(Some("mobilidade".to_string())),
            recurring_transaction_id: Set(None),
            rule_id: Set(Some(rule.id)),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let rent_tx = transaction::ActiveModel {
            tenant_id: Set(acme.id),
            account_id: Set(checking.id),
            category_id: Set(None),
            date: Set(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
            description: Set("Aluguel".to_string()),
            amount: Set(Decimal::new(-150000, 2)),
            tags: Set(None),
            recurring_transaction_id: Set(Some(rent.id)),
            rule_id: Set(None),
            created_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        recurring_run::ActiveModel {
            recurring_transaction_id: Set(rent.id),
            occurrence_date: Set(rent_tx.date),
            transaction_id: Set(rent_tx.id),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        // The same occurrence cannot be recorded twice
        let duplicate = recurring_run::ActiveModel {
            recurring_transaction_id: Set(rent.id),
            occurrence_date: Set(rent_tx.date),
            transaction_id: Set(rent_tx.id),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(duplicate.is_err());

        let runs = rent.find_related(RecurringRun).all(&db).await?;
        assert_eq!(runs.len(), 1);

        let found = Transaction::find()
            .filter(transaction::Column::TenantId.eq(acme.id))
            .filter(transaction::Column::CategoryId.eq(transport.id))
            .all(&db)
            .await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, trip.id);
        assert_eq!(found[0].amount, Decimal::new(-2350, 2));
        assert_eq!(found[0].tag_list(), vec!["mobilidade"]);

        // Deleting the tenant cascades to its records
        acme.delete(&db).await?;
        assert!(Account::find().all(&db).await?.is_empty());
        assert!(Transaction::find().all(&db).await?.is_empty());
        assert!(User::find().all(&db).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_category_name_unique_per_tenant() -> Result<(), DbErr> {
        let db = setup_db().await?;
        let first = create_tenant(&db, "first").await?;
        let second = create_tenant(&db, "second").await?;

        for tenant_id in [first.id, second.id] {
            category::ActiveModel {
                tenant_id: Set(tenant_id),
                name: Set("Lazer".to_string()),
                kind: Set(category::CategoryKind::Want),
                parent_id: Set(None),
                ..Default::default()
            }
            .insert(&db)
            .await?;
        }

        let duplicate = category::ActiveModel {
            tenant_id: Set(first.id),
            name: Set("Lazer".to_string()),
            kind: Set(category::CategoryKind::Want),
            parent_id: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(duplicate.is_err());

        Ok(())
    }
}
