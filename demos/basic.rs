use postgrest_http::{Filterable, PostgrestClient};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("POSTGREST_URL")?;
    let token = std::env::var("POSTGREST_TOKEN")?;

    let db = PostgrestClient::new(url)?.with_bearer_auth(token);

    db.from("users")
        .insert(&json!({ "name": "Kit" }))
        .execute_discard()
        .await?;

    let users: Option<Vec<User>> = db
        .from("users")
        .select(["id", "name"])
        .ilike("name", "k*")
        .limit(10)
        .execute()
        .await?;

    for user in users.unwrap_or_default() {
        println!("{} {}", user.id, user.name);
    }

    Ok(())
}
