use querhaus::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Querhaus Demo\n");

    // Database setup
    let config = DatabaseConfig::new(
        "localhost".to_string(), // host
        5432,                    // port
        "querhaus".to_string(),  // database
        "postgres".to_string(),  // username
        "password".to_string(),  // password
        1,                       // min_connections
        5,                       // max_connections
        30,                      // connection_timeout_seconds
        600,                     // idle_timeout_seconds
        3600,                    // max_lifetime_seconds
    );

    // Entity model the composers resolve against
    let graph = EntityGraph::new()
        .register(
            EntityDef::new("User", "users")
                .column("id", ColumnType::Uuid)
                .column("name", ColumnType::Varchar)
                .column("point", ColumnType::Integer)
                .column("isDeleted", ColumnType::Boolean)
                .column("createDateTime", ColumnType::Timestamp)
                .relation("photos", "Photos", Cardinality::OneToMany),
        )
        .register(
            EntityDef::new("Photos", "photos")
                .column("id", ColumnType::Uuid)
                .column("url", ColumnType::Text)
                .column("isDeleted", ColumnType::Boolean),
        );

    let querhaus = Querhaus::new(config, graph).await?;
    querhaus.health_check().await?;
    println!("✅ Database connected");

    // Compose a query: join a relation, filter, group conditions
    let composer = querhaus
        .composer("User", "t1", QueryObject::empty())?
        .select_raw(&[("t1.id", Some("id")), ("t1.name", Some("name"))])?
        .inner_join(PropertyPath::relation("photos").into_path(), "t2")?
        .and_where(PropertyPath::field("isDeleted"), |c, _| Ok(c.is_false()))?
        .or_where_isolated(|q| {
            q.and_where(PropertyPath::field("point"), |c, _| Ok(c.greater_than(100)))?
                .and_where(PropertyPath::relation("photos").field("url"), |c, _| {
                    Ok(c.ends_with("png", true))
                })
        })?;

    println!("📜 Query: {}", composer.get_query());

    let rows = composer.exec(querhaus.pool()).await?;
    println!("✅ Fetched {} rows", rows.len());

    // Aggregates run on an isolated copy of the statement
    let total = composer
        .get_sum(querhaus.pool(), PropertyPath::field("point"))
        .await?;
    println!("✅ Total points: {total}");

    Ok(())
}
