//! Transport types shared by the compute crate and the HTTP API.

mod period;
mod reports;

pub use period::{DateRange, TimePeriod, last_day_of_month};
pub use reports::{
    BucketReport, BucketStatus, BudgetProgress, CategoryTotal, DashboardSummary, Forecast,
    GoalProgress, MonthlyTotal, MovingAveragePoint, ParsedQuery, Percentiles, RatioReport, TaxEstimate, Trend,
    WeekdayTotal,
};

/// Normalizes an ISO 4217 code, returning `None` for unknown currencies.
pub fn normalize_currency_code(code: &str) -> Option<String> {
    let code = code.trim().to_uppercase();
    match rusty_money::iso::find(&code) {
        Some(currency) => Some(currency.iso_alpha_code.to_string()),
        None => {
            tracing::debug!("Unknown currency code: {}", code);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_currency_code() {
        assert_eq!(normalize_currency_code("brl"), Some("BRL".to_string()));
        assert_eq!(normalize_currency_code(" USD "), Some("USD".to_string()));
        assert_eq!(normalize_currency_code("XYZ"), None);
        assert_eq!(normalize_currency_code(""), None);
    }
}
