//! Table references: named tables, joins and subqueries in FROM position.

use std::fmt;
use std::sync::Arc;

use crate::builder::QueryBuilder;
use crate::error::Result;
use crate::expr::{Aggregate, Column, Predicate};
use crate::model::{Entity, Model};
use crate::registry::Registry;

/// Resolves the model a column source belongs to. Stored as a plain fn
/// pointer so expression nodes stay `Send` and carry no registry handle.
pub(crate) type ModelResolver = fn(&Registry) -> Result<Arc<Model>>;

/// Where a qualified column comes from: the alias to print (if any) and the
/// model its field names resolve against.
#[derive(Debug, Clone)]
pub(crate) struct ColumnSrc {
    pub(crate) alias: Option<String>,
    pub(crate) resolve: ModelResolver,
}

/// A named table bound to an entity type, optionally aliased.
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) alias: Option<String>,
    pub(crate) resolve: ModelResolver,
}

impl Table {
    /// A reference to the table that stores `T`.
    pub fn of<T: Entity>() -> Table {
        Table {
            alias: None,
            resolve: Registry::get::<T>,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    fn src(&self) -> ColumnSrc {
        ColumnSrc {
            alias: self.alias.clone(),
            resolve: self.resolve,
        }
    }

    /// A column of this table, addressed by struct-field name.
    pub fn c(&self, field: impl Into<String>) -> Column {
        Column::with_src(self.src(), field.into())
    }

    pub fn join(self, right: impl Into<TableRef>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), "JOIN")
    }

    pub fn left_join(self, right: impl Into<TableRef>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), "LEFT JOIN")
    }

    pub fn right_join(self, right: impl Into<TableRef>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), "RIGHT JOIN")
    }
}

impl Aggregate {
    /// Qualifies the aggregated field with a table.
    pub fn of_table(mut self, table: &Table) -> Self {
        self.set_src(table.src());
        self
    }
}

/// What a statement selects from.
#[derive(Debug, Default)]
pub enum TableRef {
    /// The root model's own table.
    #[default]
    Base,
    Table(Table),
    Join(Box<Join>),
    Subquery(Subquery),
}

impl From<Table> for TableRef {
    fn from(t: Table) -> Self {
        TableRef::Table(t)
    }
}

impl From<Join> for TableRef {
    fn from(j: Join) -> Self {
        TableRef::Join(Box::new(j))
    }
}

impl From<Subquery> for TableRef {
    fn from(s: Subquery) -> Self {
        TableRef::Subquery(s)
    }
}

/// A completed join, itself joinable again.
#[derive(Debug)]
pub struct Join {
    pub(crate) left: TableRef,
    pub(crate) right: TableRef,
    pub(crate) kind: &'static str,
    pub(crate) on: Vec<Predicate>,
    pub(crate) using: Vec<String>,
}

impl Join {
    pub fn join(self, right: impl Into<TableRef>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), "JOIN")
    }

    pub fn left_join(self, right: impl Into<TableRef>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), "LEFT JOIN")
    }

    pub fn right_join(self, right: impl Into<TableRef>) -> JoinBuilder {
        JoinBuilder::new(self.into(), right.into(), "RIGHT JOIN")
    }
}

/// A join waiting for its ON or USING clause.
#[derive(Debug)]
pub struct JoinBuilder {
    left: TableRef,
    right: TableRef,
    kind: &'static str,
}

impl JoinBuilder {
    fn new(left: TableRef, right: TableRef, kind: &'static str) -> Self {
        JoinBuilder { left, right, kind }
    }

    pub fn on(self, predicates: impl IntoIterator<Item = Predicate>) -> Join {
        Join {
            left: self.left,
            right: self.right,
            kind: self.kind,
            on: predicates.into_iter().collect(),
            using: Vec::new(),
        }
    }

    pub fn using(self, fields: impl IntoIterator<Item = impl Into<String>>) -> Join {
        Join {
            left: self.left,
            right: self.right,
            kind: self.kind,
            on: Vec::new(),
            using: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// A SELECT used as a table or as an expression. Holds the inner builder
/// unrendered; it is built when the outer statement is.
pub struct Subquery {
    pub(crate) inner: Box<dyn QueryBuilder + Send>,
    pub(crate) alias: Option<String>,
    pub(crate) resolve: ModelResolver,
}

impl fmt::Debug for Subquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subquery")
            .field("alias", &self.alias)
            .finish_non_exhaustive()
    }
}

impl Subquery {
    /// A column of the subquery's result, addressed by struct-field name of
    /// the inner entity.
    pub fn c(&self, field: impl Into<String>) -> Column {
        Column::with_src(
            ColumnSrc {
                alias: self.alias.clone(),
                resolve: self.resolve,
            },
            field.into(),
        )
    }
}
