//! One-stop imports for typical usage.

pub use crate::dialect::{MySql, Sqlite, StandardSql};
pub use crate::error::{Error, Result};
pub use crate::expr::{
    Assignable, Column, IntoExpr, Predicate, all_of, any_of, assign, avg, col, count, max, min,
    not, raw, some_of, sum,
};
pub use crate::middleware::{LogMiddleware, Middleware, QueryContext, QueryOutput, StatementKind};
pub use crate::model::Entity;
pub use crate::qb::select::{asc, desc};
pub use crate::registry::{Registry, with_column_name, with_table_name};
pub use crate::session::{Database, Session, Transaction};
pub use crate::table::Table;
pub use crate::value::{FromValue, Value};
pub use crate::valuer::Strategy;

#[cfg(feature = "derive")]
pub use squill_derive::Entity;
