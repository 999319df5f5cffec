//! Deferred write composition.
//!
//! Business functions prepare a write (validation, external calls, building
//! the active model) and hand back a [`PendingWrite`] instead of executing it.
//! Callers collect pending writes from several components and commit them with
//! [`run_atomic`] as one all-or-nothing transaction. Preparation always happens
//! before the transaction is opened, so a failed preparation writes nothing.

use crate::error::AppResult;
use futures_util::future::BoxFuture;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

/// A prepared-but-not-yet-executed storage write.
pub type PendingWrite =
    Box<dyn for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, AppResult<()>> + Send>;

/// Coercion helper so services can return `deferred(move |txn| Box::pin(async move { .. }))`.
pub fn deferred<F>(f: F) -> PendingWrite
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, AppResult<()>> + Send + 'static,
{
    Box::new(f)
}

/// Applies every pending write inside a single transaction, in order.
///
/// Any failure aborts the whole batch; the transaction is rolled back on drop
/// and the caller must treat the operation as not applied. An empty batch
/// opens no transaction.
pub async fn run_atomic(pool: &DatabaseConnection, writes: Vec<PendingWrite>) -> AppResult<()> {
    if writes.is_empty() {
        return Ok(());
    }

    let txn = pool.begin().await?;
    for write in writes {
        write(&txn).await?;
    }

    txn.commit().await?;
    Ok(())
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::error::AppError;
    use sea_orm::{ConnectionTrait, DatabaseBackend, MockDatabase, MockExecResult, Statement};

    fn exec_write(sql: &'static str) -> PendingWrite {
        deferred(move |txn| {
            Box::pin(async move {
                txn.execute(Statement::from_string(
                    DatabaseBackend::Postgres,
                    sql.to_owned(),
                ))
                .await?;
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn commits_all_writes_in_one_transaction() {
        let pool = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        let writes = vec![
            exec_write("UPDATE phones SET used_at = NOW()"),
            exec_write("DELETE FROM sessions"),
        ];
        run_atomic(&pool, writes).await.unwrap();

        // Both statements ran inside a single transaction.
        let log = pool.into_transaction_log();
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn aborts_batch_when_a_write_fails() {
        let pool = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let writes = vec![
            exec_write("UPDATE phones SET used_at = NOW()"),
            deferred(|_txn| {
                Box::pin(async { Err(AppError::InvalidError("constraint violated".into())) })
            }),
        ];

        let result = run_atomic(&pool, writes).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_batch_opens_no_transaction() {
        let pool = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        run_atomic(&pool, vec![]).await.unwrap();
        assert!(pool.into_transaction_log().is_empty());
    }
}
