//! Schema metadata and the builder that produces it.
//!
//! A [`Schema`] is built once per model from its field declarations. Building
//! validates the declarations (exactly one primary key, plain identifiers)
//! and renders the four CRUD templates. Templates use `?` markers; argument
//! order is always the non-key fields in declaration order, then the primary
//! key (except `select`, which takes no arguments, and `delete`, which takes
//! only the key).
//!
//! # Example
//!
//! ```
//! use rowmap::{Field, Schema};
//!
//! let schema = Schema::builder("User")
//!     .table("users")
//!     .field("id", Field::integer().primary_key())
//!     .field("name", Field::string().default("anon"))
//!     .build()?;
//!
//! assert_eq!(schema.insert_sql(), r#"INSERT INTO "users" ("name", "id") VALUES (?, ?)"#);
//! # Ok::<(), rowmap::SchemaError>(())
//! ```

use crate::error::SchemaError;
use crate::field::Field;
use crate::placeholder;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Validated mapping metadata for one model, with its CRUD templates.
#[derive(Debug, Clone)]
pub struct Schema {
    model: String,
    table: String,
    primary_key: String,
    mappings: IndexMap<String, Field>,
    fields: Vec<String>,
    select: String,
    insert: String,
    update: String,
    delete: String,
}

impl Schema {
    /// Start declaring the schema of `model`. The table name defaults to
    /// the model name.
    pub fn builder(model: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            model: model.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Quoted table name, ready to splice into SQL.
    pub fn table_ident(&self) -> String {
        quote(&self.table)
    }

    /// Attribute name of the primary key.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Non-key attribute names, in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// All declared fields, in declaration order.
    pub fn mappings(&self) -> &IndexMap<String, Field> {
        &self.mappings
    }

    pub fn field(&self, attr: &str) -> Option<&Field> {
        self.mappings.get(attr)
    }

    /// `SELECT <pk>, <fields...> FROM <table>`; no arguments.
    pub fn select_sql(&self) -> &str {
        &self.select
    }

    /// Arguments: fields in order, then the primary key.
    pub fn insert_sql(&self) -> &str {
        &self.insert
    }

    /// Arguments: fields in order, then the primary key.
    pub fn update_sql(&self) -> &str {
        &self.update
    }

    /// Arguments: the primary key.
    pub fn delete_sql(&self) -> &str {
        &self.delete
    }

    /// Select template restricted to one primary key value.
    pub fn select_by_key_sql(&self) -> String {
        format!("{} WHERE {} = ?", self.select, quote(self.key_column()))
    }

    /// `CREATE TABLE IF NOT EXISTS` for the declared columns.
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .mappings
            .iter()
            .map(|(attr, field)| {
                let mut col = format!("{} {}", quote(field.column_name(attr)), field.column_type());
                if field.is_primary_key() {
                    col.push_str(" PRIMARY KEY");
                }
                col
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote(&self.table),
            columns.join(", ")
        )
    }

    fn key_column(&self) -> &str {
        self.mappings[&self.primary_key].column_name(&self.primary_key)
    }
}

/// Collects field declarations and validates them into a [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    model: String,
    table: Option<String>,
    fields: Vec<(String, Field)>,
}

impl SchemaBuilder {
    /// Override the table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Declare an attribute. Declaration order is column order.
    pub fn field(mut self, attr: impl Into<String>, field: Field) -> Self {
        self.fields.push((attr.into(), field));
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let table = self.table.unwrap_or_else(|| self.model.clone());
        validate_ident(&table)?;
        tracing::info!(model = %self.model, table = %table, "found model");

        let mut mappings = IndexMap::with_capacity(self.fields.len());
        let mut primary_key: Option<String> = None;
        let mut fields = Vec::new();
        let mut columns = HashSet::with_capacity(self.fields.len());

        for (attr, field) in self.fields {
            validate_ident(&attr)?;
            if let Some(name) = field.name() {
                validate_ident(name)?;
            }
            tracing::debug!(model = %self.model, attr = %attr, field = %field, "found mapping");

            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        model: self.model,
                        field: attr,
                    });
                }
                primary_key = Some(attr.clone());
            } else if !mappings.contains_key(&attr) {
                fields.push(attr.clone());
            }

            if mappings.contains_key(&attr) {
                return Err(SchemaError::DuplicateField {
                    model: self.model,
                    field: attr,
                });
            }
            if !columns.insert(field.column_name(&attr).to_string()) {
                return Err(SchemaError::DuplicateColumn {
                    model: self.model,
                    column: field.column_name(&attr).to_string(),
                });
            }
            mappings.insert(attr, field);
        }

        let Some(primary_key) = primary_key else {
            return Err(SchemaError::MissingPrimaryKey { model: self.model });
        };

        let column = |attr: &str| quote(mappings[attr].column_name(attr));
        let project = |attr: &str| {
            let col = mappings[attr].column_name(attr);
            if col == attr {
                quote(col)
            } else {
                format!("{} AS {}", quote(col), quote(attr))
            }
        };

        let qtable = quote(&table);
        let pk_col = column(primary_key.as_str());

        let projection: Vec<String> = std::iter::once(primary_key.as_str())
            .chain(fields.iter().map(String::as_str))
            .map(project)
            .collect();
        let select = format!("SELECT {} FROM {}", projection.join(", "), qtable);

        let insert_cols: Vec<String> = fields
            .iter()
            .map(|f| column(f.as_str()))
            .chain(std::iter::once(pk_col.clone()))
            .collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            qtable,
            insert_cols.join(", "),
            placeholder::markers(insert_cols.len())
        );

        let mut assignments: Vec<String> = fields
            .iter()
            .map(|f| format!("{} = ?", column(f.as_str())))
            .collect();
        // A key-only model still gets a valid statement that touches the row.
        if assignments.is_empty() {
            assignments.push(format!("{pk_col} = {pk_col}"));
        }
        let update = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            qtable,
            assignments.join(", "),
            pk_col
        );

        let delete = format!("DELETE FROM {} WHERE {} = ?", qtable, pk_col);

        Ok(Schema {
            model: self.model,
            table,
            primary_key,
            mappings,
            fields,
            select,
            insert,
            update,
            delete,
        })
    }
}

/// Accept only `[A-Za-z_][A-Za-z0-9_]*`.
fn validate_ident(ident: &str) -> Result<(), SchemaError> {
    let mut chars = ident.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(ident.to_string()))
    }
}

fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_schema() -> Schema {
        Schema::builder("User")
            .table("users")
            .field("id", Field::string().primary_key())
            .field("email", Field::string().ddl("varchar(50)"))
            .field("admin", Field::boolean())
            .field("name", Field::string())
            .field("created_at", Field::float())
            .build()
            .unwrap()
    }

    #[test]
    fn renders_all_templates() {
        let s = user_schema();
        assert_eq!(
            s.select_sql(),
            r#"SELECT "id", "email", "admin", "name", "created_at" FROM "users""#
        );
        assert_eq!(
            s.insert_sql(),
            r#"INSERT INTO "users" ("email", "admin", "name", "created_at", "id") VALUES (?, ?, ?, ?, ?)"#
        );
        assert_eq!(
            s.update_sql(),
            r#"UPDATE "users" SET "email" = ?, "admin" = ?, "name" = ?, "created_at" = ? WHERE "id" = ?"#
        );
        assert_eq!(s.delete_sql(), r#"DELETE FROM "users" WHERE "id" = ?"#);
        assert_eq!(
            s.select_by_key_sql(),
            r#"SELECT "id", "email", "admin", "name", "created_at" FROM "users" WHERE "id" = ?"#
        );
    }

    #[test]
    fn records_key_and_ordered_fields() {
        let s = user_schema();
        assert_eq!(s.primary_key(), "id");
        assert_eq!(s.fields(), ["email", "admin", "name", "created_at"]);
        assert_eq!(s.mappings().len(), 5);
    }

    #[test]
    fn templates_mention_each_column_once() {
        let s = user_schema();
        for sql in [s.select_sql(), s.insert_sql(), s.update_sql()] {
            assert_eq!(sql.matches(r#""users""#).count(), 1, "{sql}");
            for attr in s.mappings().keys() {
                assert_eq!(sql.matches(&format!("\"{attr}\"")).count(), 1, "{attr} in {sql}");
            }
        }
        assert_eq!(placeholder::count(s.insert_sql()), s.fields().len() + 1);
        assert_eq!(placeholder::count(s.update_sql()), s.fields().len() + 1);
        assert_eq!(placeholder::count(s.delete_sql()), 1);
        assert_eq!(placeholder::count(s.select_sql()), 0);
    }

    #[test]
    fn missing_primary_key_fails() {
        let err = Schema::builder("Blog")
            .field("name", Field::string())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingPrimaryKey {
                model: "Blog".into()
            }
        );
    }

    #[test]
    fn second_primary_key_fails() {
        let err = Schema::builder("Blog")
            .field("id", Field::string().primary_key())
            .field("slug", Field::string().primary_key())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicatePrimaryKey {
                model: "Blog".into(),
                field: "slug".into()
            }
        );
    }

    #[test]
    fn two_attributes_on_one_column_fail() {
        let err = Schema::builder("User")
            .field("id", Field::integer().primary_key())
            .field("email", Field::string().column("mail"))
            .field("backup_email", Field::string().column("mail"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateColumn {
                model: "User".into(),
                column: "mail".into()
            }
        );

        let err = Schema::builder("User")
            .field("id", Field::integer().primary_key())
            .field("user_id", Field::integer().column("id"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateColumn { column, .. } if column == "id"));
    }

    #[test]
    fn key_only_model_renders_valid_update() {
        let s = Schema::builder("Tag")
            .field("id", Field::integer().primary_key())
            .build()
            .unwrap();
        assert!(s.fields().is_empty());
        assert_eq!(s.update_sql(), r#"UPDATE "Tag" SET "id" = "id" WHERE "id" = ?"#);
        assert_eq!(placeholder::count(s.update_sql()), 1);
        assert_eq!(s.insert_sql(), r#"INSERT INTO "Tag" ("id") VALUES (?)"#);
    }

    #[test]
    fn redeclared_attribute_fails() {
        let err = Schema::builder("Blog")
            .field("id", Field::integer().primary_key())
            .field("name", Field::string())
            .field("name", Field::text())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { field, .. } if field == "name"));
    }

    #[test]
    fn boolean_primary_key_does_not_count() {
        let err = Schema::builder("Flag")
            .field("on", Field::boolean().primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn table_defaults_to_model_name() {
        let s = Schema::builder("Comment")
            .field("id", Field::integer().primary_key())
            .build()
            .unwrap();
        assert_eq!(s.table(), "Comment");
        assert_eq!(s.select_sql(), r#"SELECT "id" FROM "Comment""#);
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        let err = Schema::builder("User")
            .table("users; drop table users")
            .field("id", Field::integer().primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier(_)));

        let err = Schema::builder("User")
            .field("id", Field::integer().primary_key().column("1id"))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::InvalidIdentifier("1id".into()));
    }

    #[test]
    fn renamed_columns_are_aliased_back_to_attributes() {
        let s = Schema::builder("User")
            .table("users")
            .field("id", Field::integer().primary_key().column("user_id"))
            .field("email", Field::string().column("mail"))
            .build()
            .unwrap();
        assert_eq!(
            s.select_sql(),
            r#"SELECT "user_id" AS "id", "mail" AS "email" FROM "users""#
        );
        assert_eq!(
            s.insert_sql(),
            r#"INSERT INTO "users" ("mail", "user_id") VALUES (?, ?)"#
        );
        assert_eq!(
            s.update_sql(),
            r#"UPDATE "users" SET "mail" = ? WHERE "user_id" = ?"#
        );
        assert_eq!(s.delete_sql(), r#"DELETE FROM "users" WHERE "user_id" = ?"#);
    }

    #[test]
    fn create_table_uses_declared_types() {
        assert_eq!(
            user_schema().create_table_sql(),
            r#"CREATE TABLE IF NOT EXISTS "users" ("id" varchar(100) PRIMARY KEY, "email" varchar(50), "admin" boolean, "name" varchar(100), "created_at" real)"#
        );
    }
}
