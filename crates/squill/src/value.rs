//! Driver-neutral scalar values.
//!
//! Every statement argument and every result-set cell passes through
//! [`Value`]. Rust field types convert in with [`Into<Value>`] and back out
//! with [`FromValue`].

use crate::error::{Error, Result};

/// A scalar value exchanged with the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Short name of the variant, used in decode error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Conversion from a [`Value`] back into a Rust field type.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! impl_value_from_int {
    ($($t:ty)*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(v as i64)
            }
        }
    )*};
}

impl_value_from_int!(i8 i16 i32 i64 u8 u16 u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

fn mismatch(expected: &str, got: &Value) -> Error {
    Error::decode("", format!("expected {expected}, got {}", got.kind()))
}

macro_rules! impl_from_value_narrow_int {
    ($($t:ty)*) => {$(
        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Integer(i) => <$t>::try_from(i).map_err(|_| {
                        Error::decode(
                            "",
                            format!("integer {i} out of range for {}", stringify!($t)),
                        )
                    }),
                    other => Err(mismatch("INTEGER", &other)),
                }
            }
        }
    )*};
}

impl_from_value_narrow_int!(i8 i16 i32 u8 u16 u32);

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(mismatch("INTEGER", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => Err(mismatch("BOOL", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Real(r) => Ok(r),
            Value::Integer(i) => Ok(i as f64),
            other => Err(mismatch("REAL", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|r| r as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("TEXT", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch("BLOB", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_round_trip() {
        assert_eq!(Value::from(42i8), Value::Integer(42));
        assert_eq!(i8::from_value(Value::Integer(42)).unwrap(), 42);
        assert!(i8::from_value(Value::Integer(300)).is_err());
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(
            Option::<String>::from_value(Value::Null).unwrap(),
            None::<String>
        );
        assert_eq!(
            Option::<String>::from_value(Value::Text("x".into())).unwrap(),
            Some("x".to_string())
        );
    }

    #[test]
    fn mismatch_reports_kinds() {
        let err = String::from_value(Value::Integer(7)).unwrap_err();
        match err {
            Error::Decode { message, .. } => {
                assert_eq!(message, "expected TEXT, got INTEGER");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
