//! SELECT statements.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::builder::{Query, QueryBuilder, SqlBuilder};
use crate::error::Result;
use crate::exec::{self, Core};
use crate::expr::{Column, Expression, Predicate};
use crate::middleware::{QueryContext, StatementKind};
use crate::model::Entity;
use crate::registry::Registry;
use crate::session::Session;
use crate::table::{Subquery, TableRef};
use crate::value::Value;

/// One ORDER BY entry.
#[derive(Debug, Clone)]
pub struct OrderBy {
    field: String,
    desc: bool,
}

/// Orders ascending by the named field.
pub fn asc(field: impl Into<String>) -> OrderBy {
    OrderBy {
        field: field.into(),
        desc: false,
    }
}

/// Orders descending by the named field.
pub fn desc(field: impl Into<String>) -> OrderBy {
    OrderBy {
        field: field.into(),
        desc: true,
    }
}

/// Builds SELECT statements over `T` and fetches them as `T` values.
pub struct Selector<T: Entity> {
    core: Arc<Core>,
    table: Option<TableRef>,
    selects: Vec<Expression>,
    filters: Vec<Predicate>,
    group_by: Vec<Column>,
    having: Vec<Predicate>,
    order_by: Vec<OrderBy>,
    limit: Option<i64>,
    offset: Option<i64>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Selector<T> {
    pub fn new(sess: &impl Session) -> Self {
        Selector {
            core: Arc::clone(sess.core()),
            table: None,
            selects: Vec::new(),
            filters: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            _entity: PhantomData,
        }
    }

    /// Replaces the select list. An empty list renders `*`.
    pub fn select(mut self, items: impl IntoIterator<Item = Expression>) -> Self {
        self.selects = items.into_iter().collect();
        self
    }

    /// Selects from something other than the root model's table: an aliased
    /// table, a join or a subquery.
    pub fn from(mut self, table: impl Into<TableRef>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Replaces the WHERE predicates; entries are AND-folded.
    pub fn filter(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.filters = predicates.into_iter().collect();
        self
    }

    pub fn group_by(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.group_by = columns.into_iter().collect();
        self
    }

    /// Replaces the HAVING predicates; entries are AND-folded.
    pub fn having(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.having = predicates.into_iter().collect();
        self
    }

    pub fn order_by(mut self, orders: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by = orders.into_iter().collect();
        self
    }

    /// Renders as `LIMIT ?` with a bound argument.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Renders as `OFFSET ?` with a bound argument.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Turns the selector into a subquery usable in FROM position or as an
    /// expression operand.
    pub fn as_subquery(self, alias: impl Into<String>) -> Subquery {
        Subquery {
            inner: Box::new(self),
            alias: Some(alias.into()),
            resolve: Registry::get::<T>,
        }
    }

    /// Fetches exactly one entity. [`crate::Error::NoRows`] when nothing
    /// matches.
    pub async fn get(mut self, sess: &impl Session) -> Result<T>
    where
        T: Default,
    {
        let core = Arc::clone(&self.core);
        let query = self.build()?;
        let model = core.registry().get::<T>()?;
        let ctx = QueryContext {
            kind: StatementKind::Select,
            query,
            model,
        };
        exec::fetch_one(sess, &core, ctx).await
    }

    /// Fetches every matching entity in result-set order.
    pub async fn get_multi(mut self, sess: &impl Session) -> Result<Vec<T>>
    where
        T: Default,
    {
        let core = Arc::clone(&self.core);
        let query = self.build()?;
        let model = core.registry().get::<T>()?;
        let ctx = QueryContext {
            kind: StatementKind::Select,
            query,
            model,
        };
        exec::fetch_all(sess, &core, ctx).await
    }
}

impl<T: Entity> QueryBuilder for Selector<T> {
    fn build(&mut self) -> Result<Query> {
        let model = self.core.registry().get::<T>()?;
        let dialect = self.core.dialect();
        let mut b = SqlBuilder::new(model, self.core.registry().clone(), dialect.as_ref());

        b.push("SELECT ");
        if self.selects.is_empty() {
            b.push("*");
        } else {
            for (i, item) in std::mem::take(&mut self.selects).into_iter().enumerate() {
                if i > 0 {
                    b.push(",");
                }
                b.build_selectable(item)?;
            }
        }

        b.push(" FROM ");
        b.build_table_ref(self.table.take().unwrap_or_default())?;

        if !self.filters.is_empty() {
            b.push(" WHERE ");
            b.build_predicates(std::mem::take(&mut self.filters))?;
        }

        if !self.group_by.is_empty() {
            b.push(" GROUP BY ");
            for (i, column) in std::mem::take(&mut self.group_by).into_iter().enumerate() {
                if i > 0 {
                    b.push(",");
                }
                b.build_column(column.src.as_ref(), &column.name)?;
            }
        }

        if !self.having.is_empty() {
            b.push(" HAVING ");
            b.build_predicates(std::mem::take(&mut self.having))?;
        }

        if !self.order_by.is_empty() {
            b.push(" ORDER BY ");
            for (i, order) in std::mem::take(&mut self.order_by).into_iter().enumerate() {
                if i > 0 {
                    b.push(",");
                }
                b.build_column(None, &order.field)?;
                b.push(if order.desc { " DESC" } else { " ASC" });
            }
        }

        if let Some(limit) = self.limit.take() {
            b.push(" LIMIT ");
            b.push_placeholder(Value::Integer(limit));
        }
        if let Some(offset) = self.offset.take() {
            b.push(" OFFSET ");
            b.push_placeholder(Value::Integer(offset));
        }

        Ok(b.finish())
    }
}
