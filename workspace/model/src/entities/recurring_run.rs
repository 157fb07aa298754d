use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

use super::{recurring_transaction, transaction};

/// Records that a recurring definition was processed for a given date.
/// The unique (recurring_transaction_id, occurrence_date) index makes processing idempotent.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub recurring_transaction_id: i32,
    pub occurrence_date: NaiveDate,
    /// The transaction generated for this occurrence.
    pub transaction_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "recurring_transaction::Entity",
        from = "Column::RecurringTransactionId",
        to = "recurring_transaction::Column::Id",
        on_delete = "Cascade"
    )]
    RecurringTransaction,
    #[sea_orm(
        belongs_to = "transaction::Entity",
        from = "Column::TransactionId",
        to = "transaction::Column::Id",
        on_delete = "Cascade"
    )]
    Transaction,
}

impl Related<recurring_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
