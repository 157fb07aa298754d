use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::entities::category::{self, CategoryKind};
use crate::entities::transaction;

/// Category information attached to a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: i32,
    pub name: String,
    pub kind: CategoryKind,
}

impl From<&category::Model> for CategoryRef {
    fn from(model: &category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            kind: model.kind,
        }
    }
}

/// A booked transaction flattened for analytics.
///
/// Entries are detached from the database: the analytics code only ever sees
/// rows that were already fetched for one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    date: NaiveDate,
    amount: Decimal,
    account: i32,
    description: String,
    category: Option<CategoryRef>,
}

impl LedgerEntry {
    /// Creates a new uncategorized entry.
    pub fn new(date: NaiveDate, amount: Decimal, account: i32) -> Self {
        Self {
            date,
            amount,
            account,
            description: String::new(),
            category: None,
        }
    }

    /// Builds an entry from a stored transaction, resolving its category from `categories`.
    pub fn from_model(model: &transaction::Model, categories: &[category::Model]) -> Self {
        let category = model
            .category_id
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(CategoryRef::from);
        Self {
            date: model.date,
            amount: model.amount,
            account: model.account_id,
            description: model.description.clone(),
            category,
        }
    }

    pub fn with_category(mut self, category: CategoryRef) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn account(&self) -> i32 {
        self.account
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> Option<&CategoryRef> {
        self.category.as_ref()
    }

    /// Income entries have a positive amount.
    pub fn is_income(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Expense entries have a negative amount.
    pub fn is_expense(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}
