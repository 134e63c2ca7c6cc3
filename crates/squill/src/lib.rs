//! A dialect-aware SQL statement builder with derive-based struct mapping.
//!
//! Statements are assembled from typed building blocks and rendered to SQL
//! with `?` placeholders, then executed through a pluggable driver behind a
//! middleware chain. Structs opt in with `#[derive(Entity)]`; their table
//! and column names default to snake case and can be overridden with
//! `#[orm("...")]` tags or at registration time.
//!
//! ```no_run
//! use squill::prelude::*;
//! use squill::sqlite::SqliteConnection;
//!
//! #[derive(Entity, Debug, Default, Clone)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! async fn demo() -> squill::Result<()> {
//!     let db = Database::builder()
//!         .dialect(Sqlite)
//!         .middleware(LogMiddleware::new())
//!         .connect(SqliteConnection::open_in_memory()?);
//!
//!     db.insert::<User>()
//!         .values([User { id: 1, name: "ada".into() }])
//!         .exec(&db)
//!         .await?;
//!
//!     let user = db
//!         .select::<User>()
//!         .filter([col("id").eq(1)])
//!         .get(&db)
//!         .await?;
//!     println!("{user:?}");
//!     Ok(())
//! }
//! ```

// Lets code generated by the derive macro refer to `::squill` from inside
// this crate's own tests.
extern crate self as squill;

pub mod builder;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod exec;
pub mod expr;
pub mod middleware;
pub mod model;
pub mod prelude;
pub mod qb;
pub mod registry;
pub mod row;
pub mod session;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod table;
pub mod value;
pub mod valuer;

#[cfg(test)]
pub(crate) mod testutil;

pub use builder::{Query, QueryBuilder};
pub use error::{Error, Result};
pub use exec::Core;
pub use model::{Entity, FieldSpec, Model};
pub use row::{ExecResult, Row, Rows};
pub use session::{Database, DatabaseBuilder, Session, Transaction};
pub use value::{FromValue, Value};
pub use valuer::Strategy;

/// Derives [`Entity`] for a named-field struct.
#[cfg(feature = "derive")]
pub use squill_derive::Entity;
