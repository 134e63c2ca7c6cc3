//! The execution core.
//!
//! [`Core`] carries the pieces every statement needs: the model registry,
//! the active dialect, the value-mapping strategy and the middleware chain.
//! The dispatch helpers here render nothing; they receive an already built
//! [`QueryContext`], thread it through the middleware chain and decode the
//! outcome. Both connection and transaction sessions share this path.

use std::any::Any;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::middleware::{Handler, Middleware, QueryContext, QueryOutput, chain};
use crate::model::Entity;
use crate::registry::Registry;
use crate::row::{ExecResult, Rows};
use crate::session::Session;
use crate::valuer::{Creator, Strategy};

pub struct Core {
    registry: Registry,
    dialect: Arc<dyn Dialect>,
    strategy: Strategy,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Core {
    pub(crate) fn new(
        registry: Registry,
        dialect: Arc<dyn Dialect>,
        strategy: Strategy,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> Self {
        Core {
            registry,
            dialect,
            strategy,
            middlewares,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn dialect(&self) -> Arc<dyn Dialect> {
        Arc::clone(&self.dialect)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub(crate) fn creator(&self) -> Creator {
        self.strategy.creator()
    }

    pub(crate) fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }
}

/// Runs a fetch through the middleware chain down to the session's query
/// entry point.
pub(crate) async fn fetch<S: Session>(sess: &S, core: &Core, ctx: QueryContext) -> Result<Rows> {
    let endpoint: Handler<'_> = Arc::new(move |ctx: Arc<QueryContext>| {
        async move {
            sess.query(&ctx.query.sql, &ctx.query.args)
                .await
                .map(QueryOutput::Rows)
        }
        .boxed()
    });
    let handler = chain(core.middlewares(), endpoint);
    match handler(Arc::new(ctx)).await? {
        QueryOutput::Rows(rows) => Ok(rows),
        QueryOutput::Exec(_) => Err(Error::database(
            "middleware produced an execution result for a fetch",
        )),
    }
}

/// Runs a modifying statement through the middleware chain down to the
/// session's execute entry point.
pub(crate) async fn execute<S: Session>(
    sess: &S,
    core: &Core,
    ctx: QueryContext,
) -> Result<ExecResult> {
    let endpoint: Handler<'_> = Arc::new(move |ctx: Arc<QueryContext>| {
        async move {
            sess.execute(&ctx.query.sql, &ctx.query.args)
                .await
                .map(QueryOutput::Exec)
        }
        .boxed()
    });
    let handler = chain(core.middlewares(), endpoint);
    match handler(Arc::new(ctx)).await? {
        QueryOutput::Exec(result) => Ok(result),
        QueryOutput::Rows(_) => Err(Error::database(
            "middleware produced rows for an execution",
        )),
    }
}

/// Fetches and maps exactly one entity. [`Error::NoRows`] when the result
/// set is empty; surplus rows are ignored.
pub(crate) async fn fetch_one<T, S>(sess: &S, core: &Core, ctx: QueryContext) -> Result<T>
where
    T: Entity + Default,
    S: Session,
{
    let model = Arc::clone(&ctx.model);
    let mut rows = fetch(sess, core, ctx).await?;
    let row = rows.next().ok_or(Error::NoRows)?;
    let mut entity = T::default();
    {
        let mut valuer = (core.creator())(&mut entity as &mut dyn Any, &model);
        valuer.scan_row(&row)?;
    }
    Ok(entity)
}

/// Fetches and maps every row, preserving result-set order. An empty result
/// set maps to an empty vector.
pub(crate) async fn fetch_all<T, S>(sess: &S, core: &Core, ctx: QueryContext) -> Result<Vec<T>>
where
    T: Entity + Default,
    S: Session,
{
    let model = Arc::clone(&ctx.model);
    let rows = fetch(sess, core, ctx).await?;
    let creator = core.creator();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut entity = T::default();
        {
            let mut valuer = creator(&mut entity as &mut dyn Any, &model);
            valuer.scan_row(&row)?;
        }
        out.push(entity);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::Error;
    use crate::middleware::LogMiddleware;
    use crate::row::ExecResult;
    use crate::session::{Database, Session};
    use crate::testutil::{TestModel, build_db, memory_db, sample_rows};
    use crate::value::Value;
    use crate::{expr::col, middleware::QueryContext};

    struct Label {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Label {
        fn wrap<'s>(&self, next: Handler<'s>) -> Handler<'s> {
            let name = self.name;
            let log = Arc::clone(&self.log);
            Arc::new(move |ctx: Arc<QueryContext>| {
                let next = Arc::clone(&next);
                let log = Arc::clone(&log);
                async move {
                    log.lock().unwrap().push(format!("{name}-enter"));
                    let out = next(ctx).await;
                    log.lock().unwrap().push(format!("{name}-exit"));
                    out
                }
                .boxed()
            })
        }
    }

    #[tokio::test]
    async fn get_maps_one_row() {
        let (db, state) = memory_db();
        state.push_rows(sample_rows());
        let entity = db.select::<TestModel>().get(&db).await.unwrap();
        assert_eq!(entity, TestModel::sample());
        let calls = state.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "SELECT * FROM `test_model`;");
    }

    #[tokio::test]
    async fn get_on_empty_result_is_no_rows() {
        let (db, state) = memory_db();
        let _ = state;
        let err = db.select::<TestModel>().get(&db).await.unwrap_err();
        assert!(err.is_no_rows());
    }

    #[tokio::test]
    async fn get_multi_preserves_row_order() {
        let (db, state) = memory_db();
        state.push_rows(crate::row::Rows::new(
            vec!["id".to_string()],
            vec![
                vec![Value::Integer(3)],
                vec![Value::Integer(1)],
                vec![Value::Integer(2)],
            ],
        ));
        let entities = db.select::<TestModel>().get_multi(&db).await.unwrap();
        let ids: Vec<i64> = entities.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn get_multi_on_empty_result_is_empty() {
        let (db, _state) = memory_db();
        let entities = db.select::<TestModel>().get_multi(&db).await.unwrap();
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn exec_returns_driver_outcome() {
        let (db, state) = memory_db();
        state.push_exec(ExecResult {
            rows_affected: 1,
            last_insert_id: 42,
        });
        let outcome = db
            .insert::<TestModel>()
            .values([TestModel::sample()])
            .exec(&db)
            .await
            .unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id, 42);
    }

    #[tokio::test]
    async fn last_registered_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (db, _state) = build_db(
            Database::builder()
                .middleware(Label {
                    name: "a",
                    log: Arc::clone(&log),
                })
                .middleware(Label {
                    name: "b",
                    log: Arc::clone(&log),
                }),
        );
        let _ = db.select::<TestModel>().get_multi(&db).await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["b-enter", "a-enter", "a-exit", "b-exit"]
        );
    }

    #[tokio::test]
    async fn middleware_sees_rendered_sql() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        struct Recorder {
            seen: Arc<Mutex<Vec<(String, usize)>>>,
        }

        impl Middleware for Recorder {
            fn wrap<'s>(&self, next: Handler<'s>) -> Handler<'s> {
                let seen = Arc::clone(&self.seen);
                Arc::new(move |ctx: Arc<QueryContext>| {
                    let next = Arc::clone(&next);
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.lock()
                            .unwrap()
                            .push((ctx.query.sql.clone(), ctx.query.args.len()));
                        next(ctx).await
                    }
                    .boxed()
                })
            }
        }

        let (db, _state) = build_db(Database::builder().middleware(Recorder {
            seen: Arc::clone(&seen),
        }));
        let _ = db
            .select::<TestModel>()
            .filter([col("id").eq(1)])
            .get_multi(&db)
            .await
            .unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("SELECT * FROM `test_model` WHERE `id` = ?;".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        struct Refuse;

        impl Middleware for Refuse {
            fn wrap<'s>(&self, _next: Handler<'s>) -> Handler<'s> {
                Arc::new(move |_ctx| {
                    async move { Err(Error::database("refused")) }.boxed()
                })
            }
        }

        let (db, state) = build_db(Database::builder().middleware(Refuse));
        let err = db.select::<TestModel>().get_multi(&db).await.unwrap_err();
        assert!(err.is_database());
        // The driver was never reached.
        assert!(state.calls().is_empty());
    }

    #[tokio::test]
    async fn log_middleware_passes_results_through() {
        let (db, state) = build_db(Database::builder().middleware(LogMiddleware::new()));
        state.push_rows(sample_rows());
        let entity = db.select::<TestModel>().get(&db).await.unwrap();
        assert_eq!(entity, TestModel::sample());
    }

    #[tokio::test]
    async fn driver_errors_surface() {
        let (db, state) = memory_db();
        *state.fail.lock().unwrap() = Some("boom".to_string());
        let err = db.select::<TestModel>().get(&db).await.unwrap_err();
        assert!(matches!(err, Error::Database(message) if message == "boom"));
    }
}
