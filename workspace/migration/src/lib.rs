pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_tenancy;
mod m20250301_000002_create_ledger;
mod m20250301_000003_create_planning;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_tenancy::Migration),
            Box::new(m20250301_000002_create_ledger::Migration),
            Box::new(m20250301_000003_create_planning::Migration),
        ]
    }
}
