//! Schema creation and the structural validation gate.
//!
//! Validation is read-only and runs before any catalog query is allowed
//! against an existing file. It checks, in order: table names, per-table
//! columns (name and declared type), the full-text shadow-table count,
//! index names, and trigger names. The first mismatch fails the open.

use rusqlite::Connection;
use thiserror::Error;

use crate::expected;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("catalog schema is corrupted: {0}")]
    Corrupt(String),
}

/// Author the full schema into an open connection.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(&expected::creation_sql())?;
    Ok(())
}

/// Validate an existing database file against the expected schema.
pub fn validate_schema(conn: &Connection) -> Result<(), SchemaError> {
    validate_tables(conn)?;
    validate_fts_group(conn)?;
    validate_names(
        conn,
        "SELECT name FROM sqlite_master
         WHERE type='index' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
        &expected::sorted_index_names(),
        "index",
    )?;
    validate_names(
        conn,
        "SELECT name FROM sqlite_master WHERE type='trigger' ORDER BY name",
        &expected::sorted_trigger_names(),
        "trigger",
    )?;
    Ok(())
}

/// Compare the sorted list of non-fts tables, then each table's columns.
fn validate_tables(conn: &Connection) -> Result<(), SchemaError> {
    let mut stmt = conn.prepare(
        "SELECT tbl_name FROM sqlite_master
         WHERE type='table' AND tbl_name NOT LIKE ?1
         ORDER BY tbl_name",
    )?;
    let fts_pattern = format!("{}%", expected::FTS_TABLE);
    let found: Vec<String> = stmt
        .query_map([&fts_pattern], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    let expected_names = expected::sorted_table_names();
    if found != expected_names {
        return Err(SchemaError::Corrupt(format!(
            "expected tables {expected_names:?}, found {found:?}"
        )));
    }

    for table in expected::TABLES {
        validate_columns(conn, table)?;
    }
    Ok(())
}

/// Compare one table's `(name, declared type)` column pairs, sorted by name.
fn validate_columns(conn: &Connection, table: &expected::TableDef) -> Result<(), SchemaError> {
    let mut stmt =
        conn.prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY name")?;
    let found: Vec<(String, String)> = stmt
        .query_map([table.name], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;

    let expected_columns = table.sorted_columns();
    let matches = found.len() == expected_columns.len()
        && found
            .iter()
            .zip(&expected_columns)
            .all(|((name, decl), (exp_name, exp_decl))| name == exp_name && decl == exp_decl);
    if !matches {
        return Err(SchemaError::Corrupt(format!(
            "table '{}' expected columns {expected_columns:?}, found {found:?}",
            table.name
        )));
    }
    Ok(())
}

/// The fts5 engine materializes a fixed group of `title_fts%` tables; any
/// other count means the full-text structure was tampered with or dropped.
fn validate_fts_group(conn: &Connection) -> Result<(), SchemaError> {
    let fts_pattern = format!("{}%", expected::FTS_TABLE);
    let count: i64 = conn.query_row(
        "SELECT count(tbl_name) FROM sqlite_master
         WHERE type='table' AND tbl_name LIKE ?1",
        [&fts_pattern],
        |row| row.get(0),
    )?;
    if count != expected::FTS_SHADOW_TABLE_COUNT {
        return Err(SchemaError::Corrupt(format!(
            "expected {} full-text tables, found {count}",
            expected::FTS_SHADOW_TABLE_COUNT
        )));
    }
    Ok(())
}

/// Compare a sorted name listing (indices or triggers) against the expected
/// set; extra, missing, or renamed entries all fail.
fn validate_names(
    conn: &Connection,
    query: &str,
    expected_names: &[&str],
    kind: &str,
) -> Result<(), SchemaError> {
    let mut stmt = conn.prepare(query)?;
    let found: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;
    if found != expected_names {
        return Err(SchemaError::Corrupt(format!(
            "expected {kind} list {expected_names:?}, found {found:?}"
        )));
    }
    Ok(())
}
