//! The driver boundary.
//!
//! Backends plug in by implementing [`Connection`]. Statements arrive fully
//! rendered, with `?` placeholders and their arguments as [`Value`]s, and
//! results come back as materialized [`Rows`] or an [`ExecResult`].

use async_trait::async_trait;

use crate::error::Result;
use crate::row::{ExecResult, Rows};
use crate::value::Value;

#[async_trait]
pub trait Connection: Send + Sync {
    /// Runs a statement that returns rows.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows>;

    /// Runs a statement that modifies rows.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    /// Opens a transaction.
    async fn begin(&self) -> Result<Box<dyn TxHandle>>;
}

/// An open transaction. Dropping a handle without committing must roll the
/// transaction back as far as the backend allows.
#[async_trait]
pub trait TxHandle: Send + Sync {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows>;

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
