//! Transactional storage for inventory items and recipes.

pub mod r#trait;
pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryDatabase, InMemoryTransaction};
pub use postgres::{PostgresDatabase, PostgresTransaction, MIGRATION_SQL};
pub use r#trait::{Database, InventoryStore, RecipeStore, StoreError, Transaction};

use tracing::error;

use crate::errors::ServiceResult;

/// Commit on success, roll back on failure.
///
/// A failed rollback is logged; the original error is what the caller sees.
pub(crate) async fn settle<T>(tx: Box<dyn Transaction>, result: ServiceResult<T>) -> ServiceResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
