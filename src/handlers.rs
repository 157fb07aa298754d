pub mod accounts;
pub mod analytics;
pub mod budgets;
pub mod categories;
pub mod goals;
pub mod health;
pub mod recurring;
pub mod rules;
pub mod search;
pub mod tax;
pub mod tenants;
pub mod transactions;
pub mod users;
