//! Sessions.
//!
//! [`Database`] and [`Transaction`] expose the same statement surface
//! through [`Session`], so code taking `&impl Session` runs unchanged on a
//! plain connection or inside a transaction.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_core::future::BoxFuture;
use futures_util::FutureExt;

use crate::dialect::{Dialect, MySql};
use crate::driver::{Connection, TxHandle};
use crate::error::{Error, Result};
use crate::exec::Core;
use crate::middleware::Middleware;
use crate::model::Entity;
use crate::qb::delete::Deleter;
use crate::qb::insert::Inserter;
use crate::qb::raw::RawQuerier;
use crate::qb::select::Selector;
use crate::qb::update::Updater;
use crate::registry::Registry;
use crate::row::{ExecResult, Rows};
use crate::value::Value;
use crate::valuer::Strategy;

/// A context statements can run against.
pub trait Session: Send + Sync {
    fn core(&self) -> &Arc<Core>;

    /// Raw fetch entry point, called at the bottom of the middleware chain.
    fn query(&self, sql: &str, args: &[Value]) -> impl Future<Output = Result<Rows>> + Send;

    /// Raw execute entry point, called at the bottom of the middleware
    /// chain.
    fn execute(&self, sql: &str, args: &[Value])
    -> impl Future<Output = Result<ExecResult>> + Send;

    fn select<T: Entity>(&self) -> Selector<T>
    where
        Self: Sized,
    {
        Selector::new(self)
    }

    fn insert<T: Entity>(&self) -> Inserter<T>
    where
        Self: Sized,
    {
        Inserter::new(self)
    }

    fn update<T: Entity>(&self, entity: T) -> Updater<T>
    where
        Self: Sized,
    {
        Updater::new(self, entity)
    }

    fn delete<T: Entity>(&self) -> Deleter<T>
    where
        Self: Sized,
    {
        Deleter::new(self)
    }

    fn raw_query<T: Entity>(&self, sql: impl Into<String>) -> RawQuerier<T>
    where
        Self: Sized,
    {
        RawQuerier::new(self, sql)
    }
}

/// Configures and opens a [`Database`].
pub struct DatabaseBuilder {
    dialect: Arc<dyn Dialect>,
    strategy: Strategy,
    middlewares: Vec<Arc<dyn Middleware>>,
    registry: Registry,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        DatabaseBuilder {
            dialect: Arc::new(MySql),
            strategy: Strategy::default(),
            middlewares: Vec::new(),
            registry: Registry::new(),
        }
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        DatabaseBuilder::default()
    }

    pub fn dialect(mut self, dialect: impl Dialect + 'static) -> Self {
        self.dialect = Arc::new(dialect);
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Registers a middleware. The last registered middleware becomes the
    /// outermost link of the chain.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// An existing registry to share model metadata with.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn connect(self, conn: impl Connection + 'static) -> Database {
        Database {
            core: Arc::new(Core::new(
                self.registry,
                self.dialect,
                self.strategy,
                self.middlewares,
            )),
            conn: Arc::new(conn),
        }
    }
}

/// A database handle: a driver connection plus the execution core.
#[derive(Clone)]
pub struct Database {
    core: Arc<Core>,
    conn: Arc<dyn Connection>,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub fn registry(&self) -> &Registry {
        self.core.registry()
    }

    /// Opens a transaction. The caller owns the handle and must commit or
    /// roll back; prefer [`Database::transaction`] where possible.
    pub async fn begin(&self) -> Result<Transaction> {
        let tx = self.conn.begin().await?;
        Ok(Transaction {
            core: Arc::clone(&self.core),
            tx,
        })
    }

    /// Runs `f` inside a transaction. Commits on `Ok`, rolls back on `Err`
    /// and on panic; a panic is resumed after the rollback. When the
    /// rollback itself fails the combined [`Error::FailedRollback`] is
    /// returned instead.
    pub async fn transaction<R, F>(&self, f: F) -> Result<R>
    where
        F: for<'t> FnOnce(&'t Transaction) -> BoxFuture<'t, Result<R>>,
    {
        let tx = self.begin().await?;
        match AssertUnwindSafe(f(&tx)).catch_unwind().await {
            Ok(Ok(value)) => {
                tx.commit().await?;
                Ok(value)
            }
            Ok(Err(err)) => match tx.rollback().await {
                Ok(()) => Err(err),
                Err(rollback) => Err(Error::FailedRollback {
                    cause: err.to_string(),
                    rollback: Box::new(rollback),
                    panicked: false,
                }),
            },
            Err(panic) => match tx.rollback().await {
                Ok(()) => std::panic::resume_unwind(panic),
                Err(rollback) => Err(Error::FailedRollback {
                    cause: panic_message(panic.as_ref()),
                    rollback: Box::new(rollback),
                    panicked: true,
                }),
            },
        }
    }
}

impl Session for Database {
    fn core(&self) -> &Arc<Core> {
        &self.core
    }

    fn query(&self, sql: &str, args: &[Value]) -> impl Future<Output = Result<Rows>> + Send {
        async move { self.conn.query(sql, args).await }
    }

    fn execute(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<ExecResult>> + Send {
        async move { self.conn.execute(sql, args).await }
    }
}

/// An open transaction, usable wherever a [`Session`] is expected.
pub struct Transaction {
    core: Arc<Core>,
    tx: Box<dyn TxHandle>,
}

impl Transaction {
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await
    }
}

impl Session for Transaction {
    fn core(&self) -> &Arc<Core> {
        &self.core
    }

    fn query(&self, sql: &str, args: &[Value]) -> impl Future<Output = Result<Rows>> + Send {
        async move { self.tx.query(sql, args).await }
    }

    fn execute(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<ExecResult>> + Send {
        async move { self.tx.execute(sql, args).await }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use futures_util::FutureExt;

    use super::*;
    use crate::testutil::{TestModel, memory_db, sample_rows};

    #[tokio::test]
    async fn transaction_commits_on_success() {
        let (db, state) = memory_db();
        state.push_rows(sample_rows());
        let entity = db
            .transaction(|tx| {
                async move { tx.select::<TestModel>().get(tx).await }.boxed()
            })
            .await
            .unwrap();
        assert_eq!(entity, TestModel::sample());
        assert!(state.committed.load(Ordering::SeqCst));
        assert!(!state.rolled_back.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_error() {
        let (db, state) = memory_db();
        let err = db
            .transaction::<(), _>(|tx| {
                async move {
                    // Empty result set, so this fails with NoRows.
                    tx.select::<TestModel>().get(tx).await?;
                    Ok(())
                }
                .boxed()
            })
            .await
            .unwrap_err();
        assert!(err.is_no_rows());
        assert!(state.rolled_back.load(Ordering::SeqCst));
        assert!(!state.committed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_rollback_combines_both_errors() {
        let (db, state) = memory_db();
        state.fail_rollback.store(true, Ordering::SeqCst);
        let err = db
            .transaction::<(), _>(|_tx| async move { Err(Error::NoRows) }.boxed())
            .await
            .unwrap_err();
        match err {
            Error::FailedRollback {
                cause,
                rollback,
                panicked,
            } => {
                assert_eq!(cause, "no rows in result set");
                assert!(rollback.is_database());
                assert!(!panicked);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn panic_after_failed_rollback_is_reported() {
        let (db, state) = memory_db();
        state.fail_rollback.store(true, Ordering::SeqCst);
        let err = db
            .transaction::<(), _>(|_tx| async move { panic!("kaput") }.boxed())
            .await
            .unwrap_err();
        match err {
            Error::FailedRollback {
                cause, panicked, ..
            } => {
                assert_eq!(cause, "kaput");
                assert!(panicked);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    #[should_panic(expected = "kaput")]
    async fn panic_resumes_after_successful_rollback() {
        let (db, _state) = memory_db();
        let _ = db
            .transaction::<(), _>(|_tx| async move { panic!("kaput") }.boxed())
            .await;
    }

    #[tokio::test]
    async fn manual_transaction_handles_work() {
        let (db, state) = memory_db();
        state.push_rows(sample_rows());
        let tx = db.begin().await.unwrap();
        let entity = tx.select::<TestModel>().get(&tx).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(entity.id, 1);
        assert!(state.committed.load(Ordering::SeqCst));
    }
}
