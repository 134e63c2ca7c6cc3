//! INSERT statements.

use std::any::Any;
use std::sync::Arc;

use crate::builder::{Query, QueryBuilder, SqlBuilder};
use crate::error::{Error, Result};
use crate::exec::{self, Core};
use crate::expr::Assignable;
use crate::middleware::{QueryContext, StatementKind};
use crate::model::{Entity, Field};
use crate::row::ExecResult;
use crate::session::Session;

/// The upsert clause handed to the dialect: the conflict target (field
/// names, may be empty) and the update list.
#[derive(Debug)]
pub struct Upsert {
    pub conflict_fields: Vec<String>,
    pub assigns: Vec<Assignable>,
}

/// Builds INSERT statements from entity values.
pub struct Inserter<T: Entity> {
    core: Arc<Core>,
    values: Vec<T>,
    columns: Vec<String>,
    upsert: Option<Upsert>,
}

impl<T: Entity> Inserter<T> {
    pub fn new(sess: &impl Session) -> Self {
        Inserter {
            core: Arc::clone(sess.core()),
            values: Vec::new(),
            columns: Vec::new(),
            upsert: None,
        }
    }

    /// Replaces the rows to insert.
    pub fn values(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.values = values.into_iter().collect();
        self
    }

    /// Restricts the insert to the named fields. An empty list means all
    /// fields in declaration order.
    pub fn columns(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Starts an upsert clause.
    pub fn on_duplicate_key(self) -> UpsertBuilder<T> {
        UpsertBuilder {
            inserter: self,
            conflict_fields: Vec::new(),
        }
    }

    pub async fn exec(mut self, sess: &impl Session) -> Result<ExecResult> {
        let core = Arc::clone(&self.core);
        // Built before the model is resolved so that a zero-row insert
        // fails the same way on any entity type.
        let query = self.build()?;
        let model = core.registry().get::<T>()?;
        let ctx = QueryContext {
            kind: StatementKind::Insert,
            query,
            model,
        };
        exec::execute(sess, &core, ctx).await
    }
}

/// Collects the upsert clause of an [`Inserter`].
pub struct UpsertBuilder<T: Entity> {
    inserter: Inserter<T>,
    conflict_fields: Vec<String>,
}

impl<T: Entity> UpsertBuilder<T> {
    /// Names the conflict target fields. MySQL ignores these; SQLite renders
    /// them as `ON CONFLICT(...)`.
    pub fn conflict_columns(
        mut self,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.conflict_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the update list and returns to the inserter.
    pub fn update(
        mut self,
        assigns: impl IntoIterator<Item = impl Into<Assignable>>,
    ) -> Inserter<T> {
        self.inserter.upsert = Some(Upsert {
            conflict_fields: self.conflict_fields,
            assigns: assigns.into_iter().map(Into::into).collect(),
        });
        self.inserter
    }
}

impl<T: Entity> QueryBuilder for Inserter<T> {
    fn build(&mut self) -> Result<Query> {
        if self.values.is_empty() {
            return Err(Error::InsertZeroRow);
        }
        let model = self.core.registry().get::<T>()?;
        let dialect = self.core.dialect();
        let mut b = SqlBuilder::new(
            Arc::clone(&model),
            self.core.registry().clone(),
            dialect.as_ref(),
        );

        b.push("INSERT INTO ");
        let table = model.table_name().to_string();
        b.quote_ident(&table);
        b.push(" (");
        let fields: Vec<&Field> = if self.columns.is_empty() {
            model.fields().iter().collect()
        } else {
            self.columns
                .iter()
                .map(|name| model.field(name).ok_or_else(|| Error::unknown_field(name)))
                .collect::<Result<_>>()?
        };
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                b.push(",");
            }
            b.quote_ident(&field.column);
        }
        b.push(") VALUES ");

        let creator = self.core.creator();
        let mut values = std::mem::take(&mut self.values);
        for (ri, row) in values.iter_mut().enumerate() {
            if ri > 0 {
                b.push(",");
            }
            let valuer = creator(row as &mut dyn Any, &model);
            b.push("(");
            for (fi, field) in fields.iter().enumerate() {
                if fi > 0 {
                    b.push(",");
                }
                let value = valuer.field(field.name)?;
                b.push_placeholder(value);
            }
            b.push(")");
        }

        if let Some(upsert) = self.upsert.take() {
            dialect.build_upsert(&mut b, upsert)?;
        }

        Ok(b.finish())
    }
}
