//! Statement middleware.
//!
//! Every statement execution passes through a chain of middlewares wrapped
//! around the driver endpoint. A middleware receives the next handler and
//! returns its own; registration order matters, the last registered
//! middleware sees the statement first and its result last.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_core::future::BoxFuture;
use futures_util::FutureExt;

use crate::builder::Query;
use crate::error::Result;
use crate::model::Model;
use crate::row::{ExecResult, Rows};

/// The statement family an execution belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Raw,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Raw => "RAW",
        }
    }
}

/// Everything known about a statement when it enters the chain. The SQL is
/// already rendered. A middleware that wants to run a different statement
/// passes a fresh context to the next handler.
#[derive(Debug)]
pub struct QueryContext {
    pub kind: StatementKind,
    pub query: Query,
    pub model: Arc<Model>,
}

/// What the endpoint produced: rows for fetches, a result for executes.
#[derive(Debug)]
pub enum QueryOutput {
    Rows(Rows),
    Exec(ExecResult),
}

/// One link of the chain: takes a context, produces an output.
pub type Handler<'s> =
    Arc<dyn Fn(Arc<QueryContext>) -> BoxFuture<'s, Result<QueryOutput>> + Send + Sync + 's>;

pub trait Middleware: Send + Sync {
    /// Wraps the next handler, returning the handler this middleware exposes
    /// upstream.
    fn wrap<'s>(&self, next: Handler<'s>) -> Handler<'s>;
}

/// Folds the registered middlewares around the endpoint. Iteration order is
/// registration order, so the last registered middleware ends up outermost.
pub(crate) fn chain<'s>(middlewares: &[Arc<dyn Middleware>], endpoint: Handler<'s>) -> Handler<'s> {
    let mut handler = endpoint;
    for m in middlewares {
        handler = m.wrap(handler);
    }
    handler
}

/// Middleware that logs every statement through `tracing`, with an optional
/// slow-statement threshold that upgrades the record to a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMiddleware {
    slow_threshold: Option<Duration>,
}

impl LogMiddleware {
    pub fn new() -> Self {
        LogMiddleware::default()
    }

    /// Statements slower than `threshold` are logged at WARN.
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }
}

impl Middleware for LogMiddleware {
    fn wrap<'s>(&self, next: Handler<'s>) -> Handler<'s> {
        let slow_threshold = self.slow_threshold;
        Arc::new(move |ctx: Arc<QueryContext>| {
            let next = Arc::clone(&next);
            async move {
                let started = Instant::now();
                tracing::debug!(
                    kind = ctx.kind.as_str(),
                    sql = %ctx.query.sql,
                    args = ctx.query.args.len(),
                    "executing statement"
                );
                let result = next(Arc::clone(&ctx)).await;
                let elapsed = started.elapsed();
                match &result {
                    Err(err) => {
                        tracing::error!(
                            kind = ctx.kind.as_str(),
                            sql = %ctx.query.sql,
                            ?elapsed,
                            %err,
                            "statement failed"
                        );
                    }
                    Ok(_) if slow_threshold.is_some_and(|t| elapsed > t) => {
                        tracing::warn!(
                            kind = ctx.kind.as_str(),
                            sql = %ctx.query.sql,
                            ?elapsed,
                            "slow statement"
                        );
                    }
                    Ok(_) => {
                        tracing::debug!(kind = ctx.kind.as_str(), ?elapsed, "statement finished");
                    }
                }
                result
            }
            .boxed()
        })
    }
}
