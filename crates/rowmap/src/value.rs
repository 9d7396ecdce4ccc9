//! Dynamic column values.
//!
//! Rows are mapped into [`Value`]s rather than into per-model Rust types, so a
//! single [`Value`] has to bind against whatever column type the statement
//! infers. Binding is type-directed: an `Int` narrows to `int2`/`int4` when the
//! server asks for one, a `Float` narrows to `real`, and a mismatch (text into
//! a `bigint` column, say) is reported by the driver instead of writing bytes
//! of the wrong shape. `numeric` results, which Postgres returns for `sum` and
//! `avg`, decode into [`Value::Decimal`]. `NULL` binds to any column type.

use bytes::BytesMut;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A single column value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// `numeric`; serialized as a string so no precision is lost.
    Decimal(Decimal),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float view; integers widen and decimals round.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Decimal(v) => v.to_string().parse().ok(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(v) => Some(*v),
            Value::Int(v) => Some(Decimal::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Variant name, used in bind errors and log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Decimal(_) => "decimal",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Decimal(v) => write!(f, "{v}"),
        }
    }
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {} value to column of type {}", value.kind(), ty).into()
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) if <bool as ToSql>::accepts(ty) => v.to_sql(ty, out),
            Value::Int(v) => {
                if <i64 as ToSql>::accepts(ty) {
                    v.to_sql(ty, out)
                } else if <i32 as ToSql>::accepts(ty) {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else if <i16 as ToSql>::accepts(ty) {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if <f64 as ToSql>::accepts(ty) {
                    (*v as f64).to_sql(ty, out)
                } else if <f32 as ToSql>::accepts(ty) {
                    (*v as f32).to_sql(ty, out)
                } else if <Decimal as ToSql>::accepts(ty) {
                    Decimal::from(*v).to_sql(ty, out)
                } else {
                    Err(mismatch(self, ty))
                }
            }
            Value::Float(v) => {
                if <f64 as ToSql>::accepts(ty) {
                    v.to_sql(ty, out)
                } else if <f32 as ToSql>::accepts(ty) {
                    (*v as f32).to_sql(ty, out)
                } else if <Decimal as ToSql>::accepts(ty) {
                    Decimal::try_from(*v)?.to_sql(ty, out)
                } else {
                    Err(mismatch(self, ty))
                }
            }
            Value::Text(v) if <String as ToSql>::accepts(ty) => v.to_sql(ty, out),
            Value::Decimal(v) if <Decimal as ToSql>::accepts(ty) => v.to_sql(ty, out),
            _ => Err(mismatch(self, ty)),
        }
    }

    // Every type passes here; a mismatch is reported by `to_sql`, after
    // `NULL` has had the chance to bind.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        if <bool as FromSql>::accepts(ty) {
            <bool as FromSql>::from_sql(ty, raw).map(Value::Bool)
        } else if <i16 as FromSql>::accepts(ty) {
            <i16 as FromSql>::from_sql(ty, raw).map(|v| Value::Int(v.into()))
        } else if <i32 as FromSql>::accepts(ty) {
            <i32 as FromSql>::from_sql(ty, raw).map(|v| Value::Int(v.into()))
        } else if <i64 as FromSql>::accepts(ty) {
            <i64 as FromSql>::from_sql(ty, raw).map(Value::Int)
        } else if <f32 as FromSql>::accepts(ty) {
            <f32 as FromSql>::from_sql(ty, raw).map(|v| Value::Float(v.into()))
        } else if <f64 as FromSql>::accepts(ty) {
            <f64 as FromSql>::from_sql(ty, raw).map(Value::Float)
        } else if <Decimal as FromSql>::accepts(ty) {
            <Decimal as FromSql>::from_sql(ty, raw).map(Value::Decimal)
        } else {
            <String as FromSql>::from_sql(ty, raw).map(Value::Text)
        }
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(ty: &Type) -> bool {
        <bool as FromSql>::accepts(ty)
            || <i16 as FromSql>::accepts(ty)
            || <i32 as FromSql>::accepts(ty)
            || <i64 as FromSql>::accepts(ty)
            || <f32 as FromSql>::accepts(ty)
            || <f64 as FromSql>::accepts(ty)
            || <Decimal as FromSql>::accepts(ty)
            || <String as FromSql>::accepts(ty)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v.into())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
