//! Hand-written statements.
//!
//! A [`RawQuerier`] ships caller-provided SQL through the same middleware
//! chain and mapping machinery as the built statements.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::{Query, QueryBuilder};
use crate::error::Result;
use crate::exec::{self, Core};
use crate::middleware::{QueryContext, StatementKind};
use crate::model::Entity;
use crate::row::ExecResult;
use crate::session::Session;
use crate::value::Value;

/// Runs verbatim SQL, mapping fetched rows into `T`.
pub struct RawQuerier<T: Entity> {
    core: Arc<Core>,
    sql: String,
    args: Vec<Value>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> RawQuerier<T> {
    pub fn new(sess: &impl Session, sql: impl Into<String>) -> Self {
        RawQuerier {
            core: Arc::clone(sess.core()),
            sql: sql.into(),
            args: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Binds the next `?` placeholder.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    fn context(&mut self) -> Result<QueryContext> {
        let query = self.build()?;
        let model = self.core.registry().get::<T>()?;
        Ok(QueryContext {
            kind: StatementKind::Raw,
            query,
            model,
        })
    }

    /// Fetches exactly one entity. [`crate::Error::NoRows`] when nothing
    /// matches.
    pub async fn get(mut self, sess: &impl Session) -> Result<T>
    where
        T: Default,
    {
        let core = Arc::clone(&self.core);
        let ctx = self.context()?;
        exec::fetch_one(sess, &core, ctx).await
    }

    /// Fetches every row in result-set order.
    pub async fn get_multi(mut self, sess: &impl Session) -> Result<Vec<T>>
    where
        T: Default,
    {
        let core = Arc::clone(&self.core);
        let ctx = self.context()?;
        exec::fetch_all(sess, &core, ctx).await
    }

    /// Runs the statement as a modification.
    pub async fn exec(mut self, sess: &impl Session) -> Result<ExecResult> {
        let core = Arc::clone(&self.core);
        let ctx = self.context()?;
        exec::execute(sess, &core, ctx).await
    }
}

impl<T: Entity> QueryBuilder for RawQuerier<T> {
    /// Raw SQL passes through untouched.
    fn build(&mut self) -> Result<Query> {
        Ok(Query {
            sql: std::mem::take(&mut self.sql),
            args: std::mem::take(&mut self.args),
        })
    }
}
