//! # rowmap
//!
//! A declarative row-mapping layer for PostgreSQL.
//!
//! ## Features
//!
//! - **Declared, not derived**: a model is a list of [`Field`]s; the
//!   [`Schema`] built from it validates the declaration and renders fixed
//!   CRUD templates once
//! - **Dynamic rows**: instances are ordered [`Record`]s of [`Value`]s with
//!   attribute-style get/set
//! - **Lazy defaults**: static or factory defaults, resolved on insert and
//!   cached on the row
//! - **Pooled, async execution**: everything goes through an [`Executor`],
//!   implemented for a `deadpool-postgres` pool and for held connections
//! - **`?` placeholders**: templates and caller fragments use `?`, rewritten to
//!   `$1, $2, ...` just before execution
//!
//! ## Example
//!
//! ```ignore
//! use rowmap::{Field, FindAll, Model, PoolConfig, create_pool, model};
//!
//! model! {
//!     pub struct User in "users" {
//!         id: Field::integer().primary_key().no_default(),
//!         name: Field::string().default("anon"),
//!     }
//! }
//!
//! let pool = create_pool(PoolConfig::from_env()?).await?;
//! User::schema()?; // fail at startup on a bad declaration
//!
//! let mut user = User::new().with("id", 1);
//! user.save(&pool).await?;
//!
//! let page = User::find_all(&pool, FindAll::new().order_by("id").limit((10, 5))).await?;
//! let total = User::find_number(&pool, "count(id)", None, vec![]).await?;
//! ```
//!
//! Row-count anomalies in `save`/`update`/`remove` are logged as warnings
//! (target `rowmap::model`), not returned as errors. Filter and ordering fragments
//! passed to `find_all`/`find_number` are spliced into SQL verbatim and must
//! not contain untrusted input.

pub mod error;
pub mod executor;
pub mod field;
mod macros;
pub mod model;
pub mod placeholder;
pub mod pool;
pub mod record;
pub mod schema;
pub mod value;

pub use error::{OrmError, OrmResult, SchemaError};
pub use executor::Executor;
pub use field::{Field, FieldDefault, FieldKind};
pub use model::{FindAll, Limit, Model};
pub use pool::{PoolConfig, create_pool};
pub use record::Record;
pub use schema::{Schema, SchemaBuilder};
pub use value::Value;

// Re-export driver crates so applications can name their types
pub use deadpool_postgres;
pub use rust_decimal;
pub use tokio_postgres;
