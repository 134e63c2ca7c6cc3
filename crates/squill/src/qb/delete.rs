//! DELETE statements.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::{Query, QueryBuilder, SqlBuilder};
use crate::error::Result;
use crate::exec::{self, Core};
use crate::expr::Predicate;
use crate::middleware::{QueryContext, StatementKind};
use crate::model::Entity;
use crate::row::ExecResult;
use crate::session::Session;
use crate::table::TableRef;

/// Builds DELETE statements over `T`.
pub struct Deleter<T: Entity> {
    core: Arc<Core>,
    table: Option<TableRef>,
    filters: Vec<Predicate>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Deleter<T> {
    pub fn new(sess: &impl Session) -> Self {
        Deleter {
            core: Arc::clone(sess.core()),
            table: None,
            filters: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Deletes from something other than the root model's table.
    pub fn from(mut self, table: impl Into<TableRef>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Replaces the WHERE predicates; entries are AND-folded.
    pub fn filter(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.filters = predicates.into_iter().collect();
        self
    }

    pub async fn exec(mut self, sess: &impl Session) -> Result<ExecResult> {
        let core = Arc::clone(&self.core);
        let query = self.build()?;
        let model = core.registry().get::<T>()?;
        let ctx = QueryContext {
            kind: StatementKind::Delete,
            query,
            model,
        };
        exec::execute(sess, &core, ctx).await
    }
}

impl<T: Entity> QueryBuilder for Deleter<T> {
    fn build(&mut self) -> Result<Query> {
        let model = self.core.registry().get::<T>()?;
        let dialect = self.core.dialect();
        let mut b = SqlBuilder::new(model, self.core.registry().clone(), dialect.as_ref());

        b.push("DELETE FROM ");
        b.build_table_ref(self.table.take().unwrap_or_default())?;

        if !self.filters.is_empty() {
            b.push(" WHERE ");
            b.build_predicates(std::mem::take(&mut self.filters))?;
        }

        Ok(b.finish())
    }
}
