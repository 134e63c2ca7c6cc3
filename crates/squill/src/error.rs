//! Error types for statement building, mapping and execution.

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All failure modes surfaced by the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A metadata tag entry was not of the `key=value` form.
    #[error("invalid tag content: {0:?}")]
    InvalidTagContent(String),

    /// A fluent-API reference named a struct field the model does not have.
    #[error("unknown field: {0:?}")]
    UnknownField(String),

    /// A result-set column has no counterpart field on the model.
    #[error("unknown column: {0:?}")]
    UnknownColumn(String),

    /// An expression node appeared in a position the renderer does not accept.
    #[error("unsupported expression node: {0}")]
    UnsupportedExpression(&'static str),

    /// An expression node appeared in a select list where it is not allowed.
    #[error("unsupported select item: {0}")]
    UnsupportedSelectable(&'static str),

    /// An assignment form the active dialect cannot render.
    #[error("unsupported assignable: {0}")]
    UnsupportedAssignable(&'static str),

    /// `INSERT` was asked to build with no rows.
    #[error("insert statement has zero rows")]
    InsertZeroRow,

    /// `UPDATE` was asked to build with an empty SET list.
    #[error("update statement has no assigned columns")]
    NoUpdatedColumns,

    /// The result set carries more columns than the model has fields.
    #[error("result set has more columns than the model has fields")]
    TooManyReturnedColumns,

    /// A single-row fetch matched nothing.
    #[error("no rows in result set")]
    NoRows,

    /// A column value could not be converted into the target field type.
    #[error("cannot decode column {column:?}: {message}")]
    Decode { column: String, message: String },

    /// An error reported by the underlying driver.
    #[error("database error: {0}")]
    Database(String),

    /// A transaction failed and the subsequent rollback failed as well.
    #[error(
        "failed to roll back transaction: {rollback} (caused by: {cause}, panicked: {panicked})"
    )]
    FailedRollback {
        cause: String,
        rollback: Box<Error>,
        panicked: bool,
    },
}

impl Error {
    pub fn invalid_tag(pair: impl Into<String>) -> Self {
        Error::InvalidTagContent(pair.into())
    }

    pub fn unknown_field(name: impl Into<String>) -> Self {
        Error::UnknownField(name.into())
    }

    pub fn unknown_column(name: impl Into<String>) -> Self {
        Error::UnknownColumn(name.into())
    }

    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Error::Database(message.into())
    }

    /// Fills in the column name on a [`Error::Decode`] raised below the point
    /// where the column was known.
    pub(crate) fn at_column(self, col: &str) -> Self {
        match self {
            Error::Decode { column, message } if column.is_empty() => Error::Decode {
                column: col.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Returns true if this is the no-rows sentinel.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Error::NoRows)
    }

    /// Returns true if the error came from the underlying driver.
    pub fn is_database(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}
