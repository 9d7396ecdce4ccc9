//! CRUD against a live database.
//!
//! Skipped unless `DB_USER`, `DB_PASSWORD` and `DB_DATABASE` are set (a `.env`
//! file is honoured).

use rowmap::{Field, FindAll, Model, OrmResult, PoolConfig, Value, create_pool, model};
use std::time::{SystemTime, UNIX_EPOCH};

model! {
    pub struct Note in "rowmap_test_notes" {
        id: Field::integer().primary_key().no_default(),
        title: Field::string().default("untitled"),
        body: Field::text(),
        pinned: Field::boolean(),
        score: Field::float(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn unique_id() -> i64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    (nanos % 1_000_000_000) as i64 * 1000 + i64::from(std::process::id() % 1000)
}

#[tokio::test]
async fn crud_roundtrip() -> OrmResult<()> {
    init_tracing();
    dotenvy::dotenv().ok();
    let config = match PoolConfig::from_env() {
        Ok(config) => config.max_size(2),
        Err(_) => {
            eprintln!("DB_* variables are not set; skipping crud_roundtrip");
            return Ok(());
        }
    };

    let pool = create_pool(config).await?;
    let schema = Note::schema()?;
    rowmap::Executor::execute(&pool, &schema.create_table_sql(), &[]).await?;

    let id = unique_id();
    assert!(Note::find(&pool, id).await?.is_none());

    let mut note = Note::new().with("id", id).with("body", "hello");
    note.save(&pool).await?;

    let loaded = Note::find(&pool, id).await?.expect("saved note");
    assert_eq!(loaded.get("title")?, &Value::from("untitled"));
    assert_eq!(loaded.get("body")?, &Value::from("hello"));
    assert_eq!(loaded.get("pinned")?, &Value::Bool(false));
    assert_eq!(loaded.get("score")?.as_f64(), Some(0.0));

    note.set("title", "renamed");
    note.set("score", 1.5);
    note.update(&pool).await?;

    let found = Note::find_all(
        &pool,
        FindAll::new()
            .filter("id = ? AND title = ?")
            .bind(id)
            .bind("renamed")
            .order_by("id")
            .limit(1),
    )
    .await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("score")?.as_f64(), Some(1.5));

    let count = Note::find_number(&pool, "count(id)", Some("id = ?"), vec![id.into()]).await?;
    assert_eq!(count, Some(Value::Int(1)));

    // `sum` over bigint comes back as numeric.
    let total = Note::find_number(&pool, "sum(id)", Some("id = ?"), vec![id.into()]).await?;
    assert_eq!(total, Some(Value::Decimal(id.into())));

    note.remove(&pool).await?;
    assert!(Note::find(&pool, id).await?.is_none());

    // Removing again touches no rows: logged, not an error.
    note.remove(&pool).await?;
    Ok(())
}
