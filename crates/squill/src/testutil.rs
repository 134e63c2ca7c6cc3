//! Shared fixtures for unit tests: sample entities and a scripted fake
//! driver.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use squill_derive::Entity;

use crate::driver::{Connection, TxHandle};
use crate::error::{Error, Result};
use crate::row::{ExecResult, Rows};
use crate::session::{Database, DatabaseBuilder};
use crate::value::Value;

#[derive(Entity, Debug, Default, Clone, PartialEq)]
pub(crate) struct TestModel {
    pub id: i64,
    pub first_name: String,
    pub age: i8,
    pub last_name: Option<String>,
}

impl TestModel {
    pub(crate) fn sample() -> Self {
        TestModel {
            id: 1,
            first_name: "Tom".to_string(),
            age: 18,
            last_name: Some("Jerry".to_string()),
        }
    }
}

#[derive(Entity, Debug, Default, Clone, PartialEq)]
pub(crate) struct OrderModel {
    pub id: i64,
    pub buyer_id: i64,
}

/// Observable state of the fake driver, shared with the test body.
#[derive(Default)]
pub(crate) struct FakeState {
    pub rows: Mutex<VecDeque<Rows>>,
    pub execs: Mutex<VecDeque<ExecResult>>,
    pub calls: Mutex<Vec<(String, Vec<Value>)>>,
    pub fail: Mutex<Option<String>>,
    pub committed: AtomicBool,
    pub rolled_back: AtomicBool,
    pub fail_rollback: AtomicBool,
}

impl FakeState {
    pub(crate) fn push_rows(&self, rows: Rows) {
        self.rows.lock().unwrap().push_back(rows);
    }

    pub(crate) fn push_exec(&self, result: ExecResult) {
        self.execs.lock().unwrap().push_back(result);
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, args: &[Value]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), args.to_vec()));
        if let Some(message) = self.fail.lock().unwrap().clone() {
            return Err(Error::database(message));
        }
        Ok(())
    }

    fn next_rows(&self) -> Rows {
        self.rows.lock().unwrap().pop_front().unwrap_or_default()
    }

    fn next_exec(&self) -> ExecResult {
        self.execs.lock().unwrap().pop_front().unwrap_or_default()
    }
}

pub(crate) struct FakeConn {
    pub state: Arc<FakeState>,
}

#[async_trait]
impl Connection for FakeConn {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows> {
        self.state.record(sql, args)?;
        Ok(self.state.next_rows())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        self.state.record(sql, args)?;
        Ok(self.state.next_exec())
    }

    async fn begin(&self) -> Result<Box<dyn TxHandle>> {
        Ok(Box::new(FakeTx {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeTx {
    state: Arc<FakeState>,
}

#[async_trait]
impl TxHandle for FakeTx {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows> {
        self.state.record(sql, args)?;
        Ok(self.state.next_rows())
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        self.state.record(sql, args)?;
        Ok(self.state.next_exec())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.state.committed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        if self.state.fail_rollback.load(Ordering::SeqCst) {
            return Err(Error::database("rollback refused"));
        }
        self.state.rolled_back.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A database over the fake driver with default settings.
pub(crate) fn memory_db() -> (Database, Arc<FakeState>) {
    build_db(Database::builder())
}

/// A database over the fake driver with a caller-tuned builder.
pub(crate) fn build_db(builder: DatabaseBuilder) -> (Database, Arc<FakeState>) {
    let state = Arc::new(FakeState::default());
    let db = builder.connect(FakeConn {
        state: Arc::clone(&state),
    });
    (db, state)
}

/// The column header and one row for [`TestModel::sample`].
pub(crate) fn sample_rows() -> Rows {
    Rows::new(
        vec![
            "id".to_string(),
            "first_name".to_string(),
            "age".to_string(),
            "last_name".to_string(),
        ],
        vec![vec![
            Value::Integer(1),
            Value::Text("Tom".to_string()),
            Value::Integer(18),
            Value::Text("Jerry".to_string()),
        ]],
    )
}
