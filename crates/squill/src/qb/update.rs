//! UPDATE statements.

use std::any::Any;
use std::sync::Arc;

use crate::builder::{Query, QueryBuilder, SqlBuilder};
use crate::error::{Error, Result};
use crate::exec::{self, Core};
use crate::expr::{Assignable, Predicate};
use crate::middleware::{QueryContext, StatementKind};
use crate::model::Entity;
use crate::row::ExecResult;
use crate::session::Session;

/// Builds UPDATE statements. Plain column assignables pull their value from
/// the entity the updater was created with.
pub struct Updater<T: Entity> {
    core: Arc<Core>,
    entity: T,
    assigns: Vec<Assignable>,
    filters: Vec<Predicate>,
}

impl<T: Entity> Updater<T> {
    pub fn new(sess: &impl Session, entity: T) -> Self {
        Updater {
            core: Arc::clone(sess.core()),
            entity,
            assigns: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Replaces the SET list.
    pub fn set(mut self, assigns: impl IntoIterator<Item = impl Into<Assignable>>) -> Self {
        self.assigns = assigns.into_iter().map(Into::into).collect();
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
            kind: StatementKind::Update,
            query,
            model,
        };
        exec::execute(sess, &core, ctx).await
    }
}

impl<T: Entity> QueryBuilder for Updater<T> {
    fn build(&mut self) -> Result<Query> {
        if self.assigns.is_empty() {
            return Err(Error::NoUpdatedColumns);
        }
        let model = self.core.registry().get::<T>()?;
        let dialect = self.core.dialect();
        let mut b = SqlBuilder::new(
            Arc::clone(&model),
            self.core.registry().clone(),
            dialect.as_ref(),
        );

        b.push("UPDATE ");
        let table = model.table_name().to_string();
        b.quote_ident(&table);
        b.push(" SET ");

        let assigns = std::mem::take(&mut self.assigns);
        let creator = self.core.creator();
        let valuer = creator(&mut self.entity as &mut dyn Any, &model);
        for (i, assignable) in assigns.into_iter().enumerate() {
            if i > 0 {
                b.push(",");
            }
            match assignable {
                Assignable::Column(c) => {
                    b.build_column(c.src.as_ref(), &c.name)?;
                    b.push("=");
                    b.push_placeholder(valuer.field(&c.name)?);
                }
                Assignable::Assign(a) => {
                    b.build_column(None, &a.field)?;
                    b.push("=");
                    b.build_expression(a.value)?;
                }
                Assignable::Raw(r) => {
                    b.push(&r.sql);
                    for arg in r.args {
                        b.add_arg(arg);
                    }
                }
            }
        }

        if !self.filters.is_empty() {
            b.push(" WHERE ");
            b.build_predicates(std::mem::take(&mut self.filters))?;
        }

        Ok(b.finish())
    }
}
