use querhaus::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Querhaus Filter & Pagination Demo\n");

    let config = AppConfig::load()
        .map(|app| app.database)
        .unwrap_or_else(|_| {
            DatabaseConfig::new(
                "localhost".to_string(),
                5432,
                "querhaus".to_string(),
                "postgres".to_string(),
                "password".to_string(),
                1,
                5,
                30,
                600,
                3600,
            )
        });

    let graph = EntityGraph::new().register(
        EntityDef::new("User", "users")
            .column("id", ColumnType::Uuid)
            .column("name", ColumnType::Varchar)
            .column("point", ColumnType::Integer)
            .column("isDeleted", ColumnType::Boolean),
    );

    let querhaus = Querhaus::new(config, graph).await?;

    // Parameters as they would arrive from an HTTP query string
    let params: QueryObject = [
        ("name__icontains".to_string(), json!("roy")),
        ("point__gte".to_string(), json!("10")),
        ("order".to_string(), json!("-point,^name")),
        ("page".to_string(), json!("2")),
        ("limit".to_string(), json!("20")),
    ]
    .into_iter()
    .collect();

    let composer = querhaus
        .composer("User", "t1", params)?
        .map_field("name__icontains", "t1.name")
        .map_field("point__gte", "t1.point")
        .map_field("isDeleted", "t1.is_deleted")
        .apply_filter_pagination(None)?;

    let (sql, bound) = composer.get_sql();
    println!("📜 SQL: {sql}");
    println!("📜 Params: {bound:?}");

    let rows = composer.exec(querhaus.pool()).await?;
    println!("✅ Page 2 returned {} rows", rows.len());

    let count = composer.get_count(querhaus.pool()).await?;
    println!("✅ Total matching rows: {count}");

    // Stream the same result set, transforming each row
    let mut stream = composer.stream(querhaus.pool().clone(), |row| {
        let name: String = row.try_get("name")?;
        Ok(name)
    });
    use futures::StreamExt;
    while let Some(name) = stream.next().await {
        println!("🔹 {}", name?);
    }

    Ok(())
}
