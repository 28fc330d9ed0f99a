//! Persistence layer: database drivers, entities and schema migrations.
pub mod driver;
pub mod entity;
pub mod migrations;

use sea_orm::DatabaseTransaction;
use tracing::error;

use crate::error::LedgerError;
use crate::types::Result;

pub mod prelude {
    pub use super::entity::*;
}

/// Commit `txn` if `outcome` is a success, roll it back otherwise.
///
/// A failed rollback means the store may be left with a partial effect of the operation. It is reported as
/// [`LedgerError::ConsistencyFailure`] and is never downgraded to the original error.
pub async fn conclude<T>(txn: DatabaseTransaction, what: &str, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rb_err) = txn.rollback().await {
                error!(%err, %rb_err, "Rollback of {what} failed");
                return Err(LedgerError::ConsistencyFailure {
                    details: format!("{what}: rollback after '{err}' failed: {rb_err}"),
                });
            }
            Err(err)
        }
    }
}
