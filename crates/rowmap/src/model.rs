//! Row models: records with CRUD shaped by their schema.
//!
//! A model is a thin wrapper over a [`Record`] whose [`Schema`] is built once
//! and shared by every instance. Implement [`Model`] by hand, or declare the
//! type with [`model!`](crate::model!):
//!
//! ```ignore
//! use rowmap::{Field, FindAll, Model, model};
//!
//! model! {
//!     pub struct User in "users" {
//!         id: Field::integer().primary_key().no_default(),
//!         name: Field::string().default("anon"),
//!         admin: Field::boolean(),
//!     }
//! }
//!
//! let mut user = User::new().with("id", 1);
//! user.save(&pool).await?;                      // binds ["anon", false, 1]
//!
//! let admins = User::find_all(&pool, FindAll::new().filter("admin = ?").bind(true)).await?;
//! let found = User::find(&pool, 1).await?;
//! ```
//!
//! `save`, `update` and `remove` are best-effort about row counts: when the
//! statement does not affect exactly one row they log a warning and return
//! `Ok(())`. Driver errors still propagate.

use crate::error::{OrmError, OrmResult};
use crate::executor::Executor;
use crate::record::Record;
use crate::schema::Schema;
use crate::value::Value;
use std::future::Future;

/// Row limit for [`FindAll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// `LIMIT ?`
    Count(i64),
    /// `OFFSET ? LIMIT ?`, bound as `offset, count`.
    Window { offset: i64, count: i64 },
}

impl Limit {
    fn validate(self) -> OrmResult<Self> {
        match self {
            Limit::Count(n) if n < 0 => Err(OrmError::invalid_limit(n)),
            Limit::Window { offset, count } if offset < 0 || count < 0 => {
                Err(OrmError::invalid_limit(format!("({offset}, {count})")))
            }
            limit => Ok(limit),
        }
    }
}

impl From<i32> for Limit {
    fn from(n: i32) -> Self {
        Limit::Count(n.into())
    }
}

impl From<i64> for Limit {
    fn from(n: i64) -> Self {
        Limit::Count(n)
    }
}

impl From<(i32, i32)> for Limit {
    fn from((offset, count): (i32, i32)) -> Self {
        Limit::Window {
            offset: offset.into(),
            count: count.into(),
        }
    }
}

impl From<(i64, i64)> for Limit {
    fn from((offset, count): (i64, i64)) -> Self {
        Limit::Window { offset, count }
    }
}

impl TryFrom<&Value> for Limit {
    type Error = OrmError;

    fn try_from(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Int(n) => Limit::Count(*n).validate(),
            other => Err(OrmError::invalid_limit(other)),
        }
    }
}

impl TryFrom<&[Value]> for Limit {
    type Error = OrmError;

    /// One integer is a count; two are `(offset, count)`.
    fn try_from(values: &[Value]) -> OrmResult<Self> {
        match values {
            [Value::Int(n)] => Limit::Count(*n).validate(),
            [Value::Int(offset), Value::Int(count)] => Limit::Window {
                offset: *offset,
                count: *count,
            }
            .validate(),
            other => Err(OrmError::invalid_limit(format!("{other:?}"))),
        }
    }
}

impl TryFrom<&serde_json::Value> for Limit {
    type Error = OrmError;

    /// Accepts `5` or `[10, 5]`, as found in request parameters.
    fn try_from(value: &serde_json::Value) -> OrmResult<Self> {
        let invalid = || OrmError::invalid_limit(value);
        match value {
            serde_json::Value::Number(n) => Limit::Count(n.as_i64().ok_or_else(invalid)?).validate(),
            serde_json::Value::Array(items) => match items.as_slice() {
                [offset, count] => Limit::Window {
                    offset: offset.as_i64().ok_or_else(invalid)?,
                    count: count.as_i64().ok_or_else(invalid)?,
                }
                .validate(),
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

/// Options for [`Model::find_all`].
///
/// `filter` and `order_by` fragments are inserted verbatim; only values
/// passed through `bind` are parameters.
#[derive(Debug, Clone, Default)]
pub struct FindAll {
    filter: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindAll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicate appended after `WHERE`, written with `?` markers.
    pub fn filter(mut self, fragment: impl Into<String>) -> Self {
        self.filter = Some(fragment.into());
        self
    }

    /// Bind the next `?` of the filter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn order_by(mut self, fragment: impl Into<String>) -> Self {
        self.order_by = Some(fragment.into());
        self
    }

    /// `5` for a count, `(10, 5)` for offset and count.
    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Render onto `select`, returning the SQL and its arguments in order.
    pub fn build(self, select: &str) -> OrmResult<(String, Vec<Value>)> {
        let mut sql = String::from(select);
        let mut args = self.args;

        if let Some(filter) = self.filter.filter(|f| !f.trim().is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        if let Some(order_by) = self.order_by.filter(|o| !o.trim().is_empty()) {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by);
        }
        match self.limit.map(Limit::validate).transpose()? {
            Some(Limit::Count(count)) => {
                sql.push_str(" LIMIT ?");
                args.push(Value::Int(count));
            }
            Some(Limit::Window { offset, count }) => {
                sql.push_str(" OFFSET ? LIMIT ?");
                args.push(Value::Int(offset));
                args.push(Value::Int(count));
            }
            None => {}
        }
        Ok((sql, args))
    }
}

/// A database row bound to a [`Schema`].
pub trait Model: Sized + Send + Sync {
    /// The model's schema, built on first call and cached.
    ///
    /// Declaration errors (no primary key, two primary keys) surface here;
    /// call it at startup to fail early.
    fn schema() -> OrmResult<&'static Schema>;

    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// Name used in error messages.
    fn model_name() -> &'static str {
        Self::schema()
            .map(Schema::model)
            .unwrap_or_else(|_| std::any::type_name::<Self>())
    }

    /// Chainable setter for keyword-style construction.
    fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Attribute read; fails with [`OrmError::AttributeNotFound`] when the
    /// row has no such column.
    fn get(&self, key: &str) -> OrmResult<&Value> {
        self.record()
            .get(key)
            .ok_or_else(|| OrmError::attribute_not_found(Self::model_name(), key))
    }

    /// Attribute write.
    fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.record_mut().insert(key, value);
    }

    /// Raw read: `None` when absent, never a default.
    fn get_value(&self, key: &str) -> Option<Value> {
        self.record().get(key).cloned()
    }

    /// Stored value, or the field's default when absent or `NULL`.
    ///
    /// A resolved default is written back onto the row, so a factory default
    /// runs at most once per instance.
    fn get_value_or_default(&mut self, key: &str) -> OrmResult<Option<Value>> {
        if let Some(value) = self.record().get(key).filter(|v| !v.is_null()) {
            return Ok(Some(value.clone()));
        }

        let schema = Self::schema()?;
        let field = schema
            .field(key)
            .ok_or_else(|| OrmError::attribute_not_found(schema.model(), key))?;

        match field.resolve_default() {
            Some(value) => {
                tracing::debug!(model = schema.model(), attr = key, value = %value, "using default value");
                self.set(key, value.clone());
                Ok(Some(value))
            }
            None => Ok(self.get_value(key)),
        }
    }

    /// Load one row by primary key; `None` when nothing matches.
    fn find<E: Executor>(
        executor: &E,
        pk: impl Into<Value>,
    ) -> impl Future<Output = OrmResult<Option<Self>>> + Send {
        let pk = pk.into();
        async move {
            let schema = Self::schema()?;
            let rows = executor
                .select(&schema.select_by_key_sql(), &[pk], Some(1))
                .await?;
            Ok(rows.into_iter().next().map(Self::from_record))
        }
    }

    /// Load every row matching `query`.
    fn find_all<E: Executor>(
        executor: &E,
        query: FindAll,
    ) -> impl Future<Output = OrmResult<Vec<Self>>> + Send {
        async move {
            let schema = Self::schema()?;
            let (sql, args) = query.build(schema.select_sql())?;
            let rows = executor.select(&sql, &args, None).await?;
            Ok(rows.into_iter().map(Self::from_record).collect())
        }
    }

    /// Scalar aggregate such as `count(id)`; `None` when no row comes back.
    fn find_number<E: Executor>(
        executor: &E,
        select_field: &str,
        filter: Option<&str>,
        args: Vec<Value>,
    ) -> impl Future<Output = OrmResult<Option<Value>>> + Send {
        let filter = filter.map(str::to_string);
        let select_field = select_field.to_string();
        async move {
            let schema = Self::schema()?;
            let mut sql = format!(
                "SELECT {} AS \"_num_\" FROM {}",
                select_field,
                schema.table_ident()
            );
            if let Some(filter) = filter.filter(|f| !f.trim().is_empty()) {
                sql.push_str(" WHERE ");
                sql.push_str(&filter);
            }
            let rows = executor.select(&sql, &args, Some(1)).await?;
            Ok(rows
                .into_iter()
                .next()
                .and_then(|row| row.get("_num_").cloned()))
        }
    }

    /// Insert this row, filling absent fields from their defaults.
    fn save<E: Executor>(&mut self, executor: &E) -> impl Future<Output = OrmResult<()>> + Send {
        async move {
            let schema = Self::schema()?;
            let mut args = Vec::with_capacity(schema.fields().len() + 1);
            for attr in insert_order(schema) {
                args.push(self.get_value_or_default(attr)?.unwrap_or_default());
            }
            let rows = executor.execute(schema.insert_sql(), &args).await?;
            if rows != 1 {
                tracing::warn!(model = schema.model(), affected = rows, "failed to insert record");
            }
            Ok(())
        }
    }

    /// Write every field back by primary key. Absent fields are written as
    /// `NULL`; defaults are not applied.
    fn update<E: Executor>(&self, executor: &E) -> impl Future<Output = OrmResult<()>> + Send {
        async move {
            let schema = Self::schema()?;
            let args: Vec<Value> = insert_order(schema)
                .map(|attr| self.get_value(attr).unwrap_or_default())
                .collect();
            let rows = executor.execute(schema.update_sql(), &args).await?;
            if rows != 1 {
                tracing::warn!(model = schema.model(), affected = rows, "failed to update by primary key");
            }
            Ok(())
        }
    }

    /// Delete this row by primary key.
    fn remove<E: Executor>(&self, executor: &E) -> impl Future<Output = OrmResult<()>> + Send {
        async move {
            let schema = Self::schema()?;
            let pk = self.get_value(schema.primary_key()).unwrap_or_default();
            let rows = executor.execute(schema.delete_sql(), &[pk]).await?;
            if rows != 1 {
                tracing::warn!(model = schema.model(), affected = rows, "failed to remove by primary key");
            }
            Ok(())
        }
    }
}

/// Non-key fields in declaration order, then the primary key: the argument
/// order of the insert and update templates.
fn insert_order(schema: &'static Schema) -> impl Iterator<Item = &'static str> {
    schema
        .fields()
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(schema.primary_key()))
}
