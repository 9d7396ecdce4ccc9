//! Field descriptors: per-column metadata declared on a model.
//!
//! A [`Field`] carries a column type, a primary-key flag and an optional
//! default. The constructors fix the column type and constrain the rest:
//!
//! | Constructor          | column type    | primary key     | default   |
//! |----------------------|----------------|-----------------|-----------|
//! | [`Field::string`]    | `varchar(100)` | allowed         | none      |
//! | [`Field::integer`]   | `bigint`       | allowed         | `0`       |
//! | [`Field::boolean`]   | `boolean`      | always `false`  | `false`   |
//! | [`Field::float`]     | `real`         | allowed         | `0.0`     |
//! | [`Field::text`]      | `text`         | always `false`  | none      |
//!
//! # Example
//!
//! ```
//! use rowmap::Field;
//!
//! let id = Field::string().primary_key().default_with(|| "generated".into());
//! let email = Field::string().ddl("varchar(50)");
//! let admin = Field::boolean();
//! assert!(id.is_primary_key());
//! assert_eq!(email.column_type(), "varchar(50)");
//! assert_eq!(admin.resolve_default(), Some(false.into()));
//! ```

use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// The declared flavour of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    Float,
    Text,
}

impl FieldKind {
    fn column_type(self) -> &'static str {
        match self {
            FieldKind::String => "varchar(100)",
            FieldKind::Integer => "bigint",
            FieldKind::Boolean => "boolean",
            FieldKind::Float => "real",
            FieldKind::Text => "text",
        }
    }

    fn allows_primary_key(self) -> bool {
        !matches!(self, FieldKind::Boolean | FieldKind::Text)
    }

    fn label(self) -> &'static str {
        match self {
            FieldKind::String => "StringField",
            FieldKind::Integer => "IntegerField",
            FieldKind::Boolean => "BooleanField",
            FieldKind::Float => "FloatField",
            FieldKind::Text => "TextField",
        }
    }
}

/// A default value: either a fixed value or a zero-argument factory.
///
/// Factories run lazily, the first time an absent value is requested.
#[derive(Clone)]
pub enum FieldDefault {
    Static(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl FieldDefault {
    /// Produce the default value, invoking the factory if there is one.
    pub fn resolve(&self) -> Value {
        match self {
            FieldDefault::Static(value) => value.clone(),
            FieldDefault::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Static(value) => f.debug_tuple("Static").field(value).finish(),
            FieldDefault::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Column metadata for one model attribute.
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    name: Option<String>,
    column_type: String,
    primary_key: bool,
    default: Option<FieldDefault>,
}

impl Field {
    fn new(kind: FieldKind, default: Option<Value>) -> Self {
        Self {
            kind,
            name: None,
            column_type: kind.column_type().to_string(),
            primary_key: false,
            default: default.map(FieldDefault::Static),
        }
    }

    /// `varchar(100)`, no default.
    pub fn string() -> Self {
        Self::new(FieldKind::String, None)
    }

    /// `bigint`, defaults to `0`.
    pub fn integer() -> Self {
        Self::new(FieldKind::Integer, Some(Value::Int(0)))
    }

    /// `boolean`, defaults to `false`; never a primary key.
    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean, Some(Value::Bool(false)))
    }

    /// `real`, defaults to `0.0`.
    pub fn float() -> Self {
        Self::new(FieldKind::Float, Some(Value::Float(0.0)))
    }

    /// `text`, no default; never a primary key.
    pub fn text() -> Self {
        Self::new(FieldKind::Text, None)
    }

    /// Mark this field as the primary key.
    ///
    /// Has no effect on boolean and text fields.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = self.kind.allows_primary_key();
        self
    }

    /// Set a fixed default value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Static(value.into()));
        self
    }

    /// Set a default computed on demand (ids, timestamps).
    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Factory(Arc::new(factory)));
        self
    }

    /// Drop the constructor's default.
    pub fn no_default(mut self) -> Self {
        self.default = None;
        self
    }

    /// Store this attribute under a different column name.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the column type used in DDL (e.g. `varchar(50)`).
    pub fn ddl(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Explicit column name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn column_type(&self) -> &str {
        &self.column_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn default_value(&self) -> Option<&FieldDefault> {
        self.default.as_ref()
    }

    /// Evaluate the default, if any.
    pub fn resolve_default(&self) -> Option<Value> {
        self.default.as_ref().map(FieldDefault::resolve)
    }

    /// Column name, falling back to the attribute it is declared under.
    pub fn column_name<'a>(&'a self, attr: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(attr)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}, {}:{}>",
            self.kind.label(),
            self.column_type,
            self.name.as_deref().unwrap_or("")
        )
    }
}
