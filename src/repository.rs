//! Repository contract and transactional batch operations

use tracing::warn;

use crate::error::OrmResult;
use crate::transaction::TransactionManager;

/// Write-side contract for one entity type.
///
/// Single-item operations accept an optional transaction and enlist in it
/// when given one. The batch operations wrap the whole sequence in a
/// transaction when the caller supplies none: any item's failure rolls the
/// transaction back in full and the item's error is re-raised; success
/// commits exactly once.
pub trait Repository {
    type Item;
    type Id;

    /// Registered connection configuration the repository writes through
    fn connection_name(&self) -> &str;

    fn create(&self, item: &Self::Item, transaction: Option<&TransactionManager>) -> OrmResult<()>;

    fn update(&self, item: &Self::Item, transaction: Option<&TransactionManager>) -> OrmResult<()>;

    fn delete(&self, id: &Self::Id, transaction: Option<&TransactionManager>) -> OrmResult<()>;

    fn create_batch(
        &self,
        items: &[Self::Item],
        transaction: Option<&TransactionManager>,
    ) -> OrmResult<()>
    where
        Self: Sized,
    {
        run_batch(self, items, transaction, Self::create)
    }

    fn update_batch(
        &self,
        items: &[Self::Item],
        transaction: Option<&TransactionManager>,
    ) -> OrmResult<()>
    where
        Self: Sized,
    {
        run_batch(self, items, transaction, Self::update)
    }

    fn delete_batch(
        &self,
        ids: &[Self::Id],
        transaction: Option<&TransactionManager>,
    ) -> OrmResult<()>
    where
        Self: Sized,
    {
        run_batch(self, ids, transaction, Self::delete)
    }
}

fn run_batch<R, T>(
    repository: &R,
    units: &[T],
    transaction: Option<&TransactionManager>,
    apply: impl Fn(&R, &T, Option<&TransactionManager>) -> OrmResult<()>,
) -> OrmResult<()>
where
    R: Repository,
{
    // In a caller-owned transaction the caller also owns commit/rollback.
    if let Some(tx) = transaction {
        for unit in units {
            apply(repository, unit, Some(tx))?;
        }
        return Ok(());
    }

    let mut tx = TransactionManager::new(repository.connection_name())?;
    tx.begin()?;
    for unit in units {
        if let Err(error) = apply(repository, unit, Some(&tx)) {
            if let Err(rollback_error) = tx.rollback() {
                warn!(%rollback_error, "batch rollback failed");
            }
            return Err(error);
        }
    }
    tx.commit()
}
