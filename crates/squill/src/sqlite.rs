//! SQLite driver, backed by `rusqlite`.
//!
//! The connection is synchronous and guarded by a mutex; statements run on
//! the calling task. Transactions are driven with explicit BEGIN, COMMIT
//! and ROLLBACK statements so the handle carries no borrow of the
//! connection.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::driver::{Connection, TxHandle};
use crate::error::{Error, Result};
use crate::row::{ExecResult, Rows};
use crate::value::Value;

/// A connection to a SQLite database file or an in-memory database.
pub struct SqliteConnection {
    inner: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteConnection {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = rusqlite::Connection::open(path).map_err(db_err)?;
        Ok(SqliteConnection {
            inner: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(db_err)?;
        Ok(SqliteConnection {
            inner: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows> {
        let conn = self.inner.lock().expect("sqlite lock poisoned");
        run_query(&conn, sql, args)
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        let conn = self.inner.lock().expect("sqlite lock poisoned");
        run_execute(&conn, sql, args)
    }

    async fn begin(&self) -> Result<Box<dyn TxHandle>> {
        {
            let conn = self.inner.lock().expect("sqlite lock poisoned");
            conn.execute_batch("BEGIN").map_err(db_err)?;
        }
        Ok(Box::new(SqliteTx {
            inner: Arc::clone(&self.inner),
            done: AtomicBool::new(false),
        }))
    }
}

struct SqliteTx {
    inner: Arc<Mutex<rusqlite::Connection>>,
    done: AtomicBool,
}

impl SqliteTx {
    fn finish(&self, stmt: &str) -> Result<()> {
        let conn = self.inner.lock().expect("sqlite lock poisoned");
        conn.execute_batch(stmt).map_err(db_err)?;
        self.done.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TxHandle for SqliteTx {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Rows> {
        let conn = self.inner.lock().expect("sqlite lock poisoned");
        run_query(&conn, sql, args)
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        let conn = self.inner.lock().expect("sqlite lock poisoned");
        run_execute(&conn, sql, args)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.finish("COMMIT")
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTx {
    fn drop(&mut self) {
        if !self.done.load(Ordering::SeqCst) {
            if let Ok(conn) = self.inner.lock() {
                let _ = conn.execute_batch("ROLLBACK");
            }
        }
    }
}

fn db_err(err: rusqlite::Error) -> Error {
    Error::database(err.to_string())
}

fn to_sql(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(*b as i64),
        Value::Integer(i) => Sql::Integer(*i),
        Value::Real(r) => Sql::Real(*r),
        Value::Text(s) => Sql::Text(s.clone()),
        Value::Blob(b) => Sql::Blob(b.clone()),
    }
}

fn from_sql(value: rusqlite::types::ValueRef<'_>) -> Result<Value> {
    use rusqlite::types::ValueRef;
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(
            std::str::from_utf8(t)
                .map_err(|e| Error::database(format!("invalid utf-8 in text column: {e}")))?
                .to_string(),
        ),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    })
}

fn run_query(conn: &rusqlite::Connection, sql: &str, args: &[Value]) -> Result<Rows> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let params = rusqlite::params_from_iter(args.iter().map(to_sql));
    let mut rows = stmt.query(params).map_err(db_err)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(db_err)? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(from_sql(row.get_ref(i).map_err(db_err)?)?);
        }
        out.push(values);
    }
    Ok(Rows::new(columns, out))
}

fn run_execute(conn: &rusqlite::Connection, sql: &str, args: &[Value]) -> Result<ExecResult> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let params = rusqlite::params_from_iter(args.iter().map(to_sql));
    let rows_affected = stmt.execute(params).map_err(db_err)? as u64;
    Ok(ExecResult {
        rows_affected,
        last_insert_id: conn.last_insert_rowid(),
    })
}
