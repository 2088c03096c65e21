use std::time::{SystemTime, UNIX_EPOCH};

use postgrest_http::{Filterable, PostgrestClient, PostgrestError};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Row {
    name: String,
}

/// Reads `POSTGREST_URL` (+ optional `POSTGREST_TOKEN`) and the name of a
/// scratch table with a text `name` column from `POSTGREST_LIVE_TABLE`.
fn load_live_target() -> Result<(PostgrestClient, String), String> {
    let table = std::env::var("POSTGREST_LIVE_TABLE")
        .map_err(|_| "POSTGREST_LIVE_TABLE is required".to_owned())?;
    let client = PostgrestClient::from_env().map_err(|err| err.to_string())?;
    Ok((client, table))
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be after epoch")
        .as_millis()
}

#[tokio::test]
async fn live_insert_select_delete_roundtrip() {
    let (db, table) = match load_live_target() {
        Ok(values) => values,
        Err(_) => {
            eprintln!("skipping live test: POSTGREST_URL / POSTGREST_LIVE_TABLE not set");
            return;
        }
    };
    let name = format!("live-{}", unique_suffix());

    let inserted: Option<Vec<Row>> = db
        .from(&table)
        .insert(&json!({ "name": name }))
        .execute()
        .await
        .expect("insert must succeed");
    assert_eq!(inserted.map(|rows| rows.len()), Some(1));

    let rows: Option<Vec<Row>> = db
        .from(&table)
        .select(["name"])
        .eq("name", &name)
        .limit(5)
        .execute()
        .await
        .expect("select must succeed");
    let rows = rows.expect("select must return rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, name);

    db.from(&table)
        .delete()
        .eq("name", &name)
        .execute_discard()
        .await
        .expect("delete must succeed");

    let err = db
        .from(&format!("{table}_does_not_exist"))
        .select(["*"])
        .execute::<serde_json::Value>()
        .await
        .expect_err("unknown table must fail");
    assert!(matches!(err, PostgrestError::Api(_)));
}
