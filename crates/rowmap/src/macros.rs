/// Declare a model type backed by a [`Record`](crate::Record).
///
/// Generates the struct, a `new()` constructor and a [`Model`](crate::Model)
/// impl whose schema is built once, on first use, from the listed fields in
/// declaration order. The table name defaults to the struct name.
///
/// ```
/// use rowmap::{Field, Model, model};
///
/// model! {
///     /// A blog post.
///     pub struct Blog in "blogs" {
///         id: Field::string().primary_key().default_with(|| "b-1".into()),
///         name: Field::string().ddl("varchar(50)"),
///         content: Field::text(),
///         created_at: Field::float(),
///     }
/// }
///
/// let schema = Blog::schema()?;
/// assert_eq!(schema.table(), "blogs");
/// assert_eq!(schema.fields(), ["name", "content", "created_at"]);
///
/// let blog = Blog::new().with("name", "hello");
/// assert_eq!(blog.get("name")?.as_str(), Some("hello"));
/// assert!(blog.get("title").is_err());
/// # Ok::<(), rowmap::OrmError>(())
/// ```
#[macro_export]
macro_rules! model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(in $table:literal)? {
            $($attr:ident : $field:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            record: $crate::Record,
        }

        impl $name {
            /// An empty row.
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl $crate::Model for $name {
            fn schema() -> $crate::OrmResult<&'static $crate::Schema> {
                static SCHEMA: ::std::sync::OnceLock<
                    ::std::result::Result<$crate::Schema, $crate::SchemaError>,
                > = ::std::sync::OnceLock::new();

                SCHEMA
                    .get_or_init(|| {
                        let builder = $crate::Schema::builder(stringify!($name));
                        $(let builder = builder.table($table);)?
                        builder $(.field(stringify!($attr), $field))+ .build()
                    })
                    .as_ref()
                    .map_err(|e| e.clone().into())
            }

            fn from_record(record: $crate::Record) -> Self {
                Self { record }
            }

            fn record(&self) -> &$crate::Record {
                &self.record
            }

            fn record_mut(&mut self) -> &mut $crate::Record {
                &mut self.record
            }
        }
    };
}
