//! SQL rendering.
//!
//! [`SqlBuilder`] walks expression trees and table references, appending SQL
//! text and collecting `?` placeholder arguments in order. Statement
//! builders drive it through [`QueryBuilder::build`].

use std::sync::Arc;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::expr::{Aggregate, Expression, Op, Predicate};
use crate::model::Model;
use crate::registry::Registry;
use crate::table::{ColumnSrc, Join, Subquery, TableRef};
use crate::value::Value;

/// A rendered statement: SQL text with `?` placeholders and the arguments
/// bound to them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Anything that can render itself into a [`Query`]. Building consumes the
/// builder's clauses; a second call is not meaningful.
pub trait QueryBuilder: Send {
    fn build(&mut self) -> Result<Query>;
}

/// Accumulates one statement's SQL text and arguments.
pub struct SqlBuilder {
    buf: String,
    args: Vec<Value>,
    model: Arc<Model>,
    registry: Registry,
    quote: char,
}

impl SqlBuilder {
    pub fn new(model: Arc<Model>, registry: Registry, dialect: &dyn Dialect) -> Self {
        SqlBuilder {
            buf: String::new(),
            args: Vec::new(),
            model,
            registry,
            quote: dialect.quote(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn push(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub fn add_arg(&mut self, value: Value) {
        self.args.push(value);
    }

    /// Appends `?` and binds `value` to it.
    pub fn push_placeholder(&mut self, value: Value) {
        self.buf.push('?');
        self.args.push(value);
    }

    pub fn quote_ident(&mut self, ident: &str) {
        self.buf.push(self.quote);
        self.buf.push_str(ident);
        self.buf.push(self.quote);
    }

    /// Terminates the statement and yields the rendered query.
    pub fn finish(mut self) -> Query {
        self.buf.push(';');
        Query {
            sql: self.buf,
            args: self.args,
        }
    }

    /// Renders a field reference. Unqualified names resolve against the root
    /// model; qualified ones against their source's model, prefixed with the
    /// source alias when present.
    pub fn build_column(&mut self, src: Option<&ColumnSrc>, field: &str) -> Result<()> {
        match src {
            None => {
                let column = self
                    .model
                    .field(field)
                    .ok_or_else(|| Error::unknown_field(field))?
                    .column
                    .clone();
                self.quote_ident(&column);
            }
            Some(src) => {
                let model = (src.resolve)(&self.registry)?;
                let column = model
                    .field(field)
                    .ok_or_else(|| Error::unknown_field(field))?
                    .column
                    .clone();
                if let Some(alias) = src.alias.clone() {
                    self.quote_ident(&alias);
                    self.buf.push('.');
                }
                self.quote_ident(&column);
            }
        }
        Ok(())
    }

    /// Renders one expression node in operand position.
    pub fn build_expression(&mut self, expr: Expression) -> Result<()> {
        match expr {
            Expression::Column(c) => self.build_column(c.src.as_ref(), &c.name),
            Expression::Value(v) => {
                self.push_placeholder(v);
                Ok(())
            }
            Expression::Raw(r) => {
                self.buf.push_str(&r.sql);
                self.args.extend(r.args);
                Ok(())
            }
            Expression::Aggregate(a) => self.build_aggregate(a, false),
            Expression::Math(m) => self.build_binary(Some(m.left), Some(m.op), Some(m.right)),
            Expression::Predicate(p) => self.build_binary(p.left, p.op, p.right),
            Expression::Subquery(s) => self.build_subquery(s, false),
            Expression::SubqueryExpr(se) => {
                self.buf.push_str(se.keyword);
                self.buf.push(' ');
                self.build_subquery(se.sub, false)
            }
        }
    }

    /// Renders `left op right`, parenthesizing composite operands. Either
    /// side and the operator itself may be absent.
    fn build_binary(
        &mut self,
        left: Option<Expression>,
        op: Option<Op>,
        right: Option<Expression>,
    ) -> Result<()> {
        if let Some(left) = left {
            if matches!(left, Expression::SubqueryExpr(_)) {
                return Err(Error::UnsupportedExpression(left.node_name()));
            }
            self.build_operand(left)?;
        }
        let Some(op) = op else {
            return Ok(());
        };
        self.buf.push(' ');
        self.buf.push_str(op.as_str());
        self.buf.push(' ');
        if let Some(right) = right {
            self.build_operand(right)?;
        }
        Ok(())
    }

    fn build_operand(&mut self, expr: Expression) -> Result<()> {
        let wrap = expr.is_composite();
        if wrap {
            self.buf.push('(');
        }
        self.build_expression(expr)?;
        if wrap {
            self.buf.push(')');
        }
        Ok(())
    }

    /// Renders a predicate list, folding the entries with AND.
    pub fn build_predicates(&mut self, predicates: Vec<Predicate>) -> Result<()> {
        let mut iter = predicates.into_iter();
        let Some(mut folded) = iter.next() else {
            return Ok(());
        };
        for p in iter {
            folded = folded.and(p);
        }
        self.build_binary(folded.left, folded.op, folded.right)
    }

    fn build_aggregate(&mut self, agg: Aggregate, select_position: bool) -> Result<()> {
        self.buf.push_str(agg.func);
        self.buf.push('(');
        self.build_column(agg.src.as_ref(), &agg.arg)?;
        self.buf.push(')');
        if select_position {
            if let Some(alias) = agg.alias {
                self.buf.push_str(" AS ");
                self.quote_ident(&alias);
            }
        }
        Ok(())
    }

    /// Renders one select-list item. Only columns, aggregates and raw
    /// fragments may appear there.
    pub fn build_selectable(&mut self, expr: Expression) -> Result<()> {
        match expr {
            Expression::Column(c) => {
                self.build_column(c.src.as_ref(), &c.name)?;
                if let Some(alias) = c.alias {
                    self.buf.push_str(" AS ");
                    self.quote_ident(&alias);
                }
                Ok(())
            }
            Expression::Aggregate(a) => self.build_aggregate(a, true),
            Expression::Raw(r) => {
                self.buf.push_str(&r.sql);
                self.args.extend(r.args);
                Ok(())
            }
            other => Err(Error::UnsupportedSelectable(other.node_name())),
        }
    }

    /// Renders a FROM-position table reference.
    pub fn build_table_ref(&mut self, table: TableRef) -> Result<()> {
        match table {
            TableRef::Base => {
                let name = self.model.table_name().to_string();
                self.quote_ident(&name);
            }
            TableRef::Table(t) => {
                let model = (t.resolve)(&self.registry)?;
                let name = model.table_name().to_string();
                self.quote_ident(&name);
                if let Some(alias) = t.alias {
                    self.buf.push_str(" AS ");
                    self.quote_ident(&alias);
                }
            }
            TableRef::Join(j) => self.build_join(*j)?,
            TableRef::Subquery(s) => self.build_subquery(s, true)?,
        }
        Ok(())
    }

    fn build_join(&mut self, join: Join) -> Result<()> {
        let Join {
            left,
            right,
            kind,
            on,
            using,
        } = join;
        self.buf.push('(');
        self.build_table_ref(left)?;
        self.buf.push(' ');
        self.buf.push_str(kind);
        self.buf.push(' ');
        self.build_table_ref(right)?;
        if !using.is_empty() {
            self.buf.push_str(" USING (");
            for (i, field) in using.iter().enumerate() {
                if i > 0 {
                    self.buf.push(',');
                }
                self.build_column(None, field)?;
            }
            self.buf.push(')');
        } else if !on.is_empty() {
            self.buf.push_str(" ON ");
            self.build_predicates(on)?;
        }
        self.buf.push(')');
        Ok(())
    }

    /// Renders a subquery in parentheses, splicing its arguments into the
    /// outer statement's in order. The inner statement terminator is
    /// dropped.
    pub fn build_subquery(&mut self, mut sub: Subquery, with_alias: bool) -> Result<()> {
        let inner = sub.inner.build()?;
        let sql = inner.sql.strip_suffix(';').unwrap_or(&inner.sql);
        self.buf.push('(');
        self.buf.push_str(sql);
        self.buf.push(')');
        self.args.extend(inner.args);
        if with_alias {
            if let Some(alias) = sub.alias {
                self.buf.push_str(" AS ");
                self.quote_ident(&alias);
            }
        }
        Ok(())
    }
}
