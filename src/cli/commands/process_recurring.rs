use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::Database;
use tracing::{info, warn};

use crate::helpers::recurring::process_all_tenants;
use crate::helpers::stats::today;

pub async fn process_recurring(database_url: &str, date: Option<NaiveDate>) -> Result<()> {
    let date = date.unwrap_or_else(today);
    info!("Processing recurring transactions due on {}", date);

    let db = Database::connect(database_url).await?;
    let reports = process_all_tenants(&db, date).await?;

    let mut created = 0;
    for (tenant_id, report) in &reports {
        if report.skipped > 0 {
            warn!(
                "Tenant {}: {} definitions were already processed for {}",
                tenant_id, report.skipped, date
            );
        }
        info!(
            "Tenant {}: {} due, {} created",
            tenant_id, report.due, report.created
        );
        created += report.created;
    }

    info!(
        "Processed {} tenants, created {} transactions",
        reports.len(),
        created
    );
    Ok(())
}
