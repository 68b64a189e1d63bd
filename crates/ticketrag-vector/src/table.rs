//! LanceDB connection helpers.

use anyhow::Result;
use lancedb::{connect, Connection};
use std::path::Path;

use ticketrag_core::error::Error;

pub const INDEX_HINT: &str = "Run `ticketrag index` to generate it first.";

pub async fn open_db(uri: &Path) -> Result<Connection> {
    Ok(connect(uri.to_string_lossy().as_ref()).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|t| t == name))
}

/// Open an existing index directory; a missing one names the step that builds it.
pub async fn open_existing(uri: &Path, table: &str) -> Result<lancedb::Table> {
    let missing = || Error::MissingFile { path: uri.join(format!("{table}.lance")), hint: INDEX_HINT.to_string() };
    if !uri.is_dir() {
        return Err(missing().into());
    }
    let conn = open_db(uri).await?;
    if !table_exists(&conn, table).await? {
        return Err(missing().into());
    }
    Ok(conn.open_table(table).execute().await?)
}
