use moka::future::Cache;
use tracing::{debug, warn};

use crate::schemas::CachedData;

pub fn tenant_prefix(tenant_id: i32) -> String {
    format!("tenant:{}:", tenant_id)
}

pub fn summary_key(tenant_id: i32, year: i32, month: u32) -> String {
    format!("{}summary:{}-{:02}", tenant_prefix(tenant_id), year, month)
}

pub fn monthly_key(tenant_id: i32, start: &str, end: &str) -> String {
    format!("{}monthly:{}:{}", tenant_prefix(tenant_id), start, end)
}

/// Drops every cached report of a tenant. Called after writes that touch transactions.
pub fn invalidate_tenant(cache: &Cache<String, CachedData>, tenant_id: i32) {
    let prefix = tenant_prefix(tenant_id);
    match cache.invalidate_entries_if(move |key, _| key.starts_with(&prefix)) {
        Ok(_) => debug!("Invalidated cached reports for tenant {}", tenant_id),
        Err(err) => warn!("Failed to invalidate cache for tenant {}: {}", tenant_id, err),
    }
}
