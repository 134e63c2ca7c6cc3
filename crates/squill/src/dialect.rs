//! SQL dialects.
//!
//! A dialect contributes the identifier quote character and the rendering of
//! upsert clauses, which is where the supported backends diverge.

use std::fmt;

use crate::builder::SqlBuilder;
use crate::error::{Error, Result};
use crate::expr::Assignable;
use crate::qb::insert::Upsert;

pub trait Dialect: Send + Sync + fmt::Debug {
    /// The identifier quote character.
    fn quote(&self) -> char;

    /// Renders the upsert clause of an INSERT statement.
    fn build_upsert(&self, b: &mut SqlBuilder, upsert: Upsert) -> Result<()>;
}

fn build_upsert_assign(
    b: &mut SqlBuilder,
    assignable: Assignable,
    conflict_value: fn(&mut SqlBuilder, &str) -> Result<()>,
) -> Result<()> {
    match assignable {
        Assignable::Column(c) => {
            b.build_column(None, &c.name)?;
            b.push("=");
            conflict_value(b, &c.name)
        }
        Assignable::Assign(a) => {
            b.build_column(None, &a.field)?;
            b.push("=");
            b.build_expression(a.value)
        }
        raw @ Assignable::Raw(_) => Err(Error::UnsupportedAssignable(raw.node_name())),
    }
}

/// MySQL: upserts render as `ON DUPLICATE KEY UPDATE`; conflict targets are
/// implicit, so any given conflict columns are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn quote(&self) -> char {
        '`'
    }

    fn build_upsert(&self, b: &mut SqlBuilder, upsert: Upsert) -> Result<()> {
        b.push(" ON DUPLICATE KEY UPDATE ");
        for (i, assignable) in upsert.assigns.into_iter().enumerate() {
            if i > 0 {
                b.push(",");
            }
            build_upsert_assign(b, assignable, |b, field| {
                b.push("VALUES(");
                b.build_column(None, field)?;
                b.push(")");
                Ok(())
            })?;
        }
        Ok(())
    }
}

/// SQLite: upserts render as `ON CONFLICT(...) DO UPDATE SET`, with carried
/// column values spelled `excluded.col`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn quote(&self) -> char {
        '`'
    }

    fn build_upsert(&self, b: &mut SqlBuilder, upsert: Upsert) -> Result<()> {
        b.push(" ON CONFLICT");
        if !upsert.conflict_fields.is_empty() {
            b.push("(");
            for (i, field) in upsert.conflict_fields.iter().enumerate() {
                if i > 0 {
                    b.push(",");
                }
                b.build_column(None, field)?;
            }
            b.push(")");
        }
        b.push(" DO UPDATE SET ");
        for (i, assignable) in upsert.assigns.into_iter().enumerate() {
            if i > 0 {
                b.push(",");
            }
            build_upsert_assign(b, assignable, |b, field| {
                b.push("excluded.");
                b.build_column(None, field)
            })?;
        }
        Ok(())
    }
}

/// Placeholder for ANSI SQL. No portable upsert or quoting rules are
/// defined, so every entry point is fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSql;

impl Dialect for StandardSql {
    fn quote(&self) -> char {
        unimplemented!("standard SQL defines no identifier quoting here")
    }

    fn build_upsert(&self, _b: &mut SqlBuilder, _upsert: Upsert) -> Result<()> {
        unimplemented!("standard SQL defines no upsert clause")
    }
}
