//! Typed read helpers for the stage store.
//!
//! All functions take a shared `&Connection` reference and return
//! `anyhow::Result<T>` with typed structs (never raw rows). Empty results
//! are normal values, not errors.

use anyhow::{Context, Result};
use rusqlite::{Connection, Row, params, types::Type};
use std::str::FromStr;

use crate::model::{Item, Status};

/// One key-value field row. Keys are non-unique; `field_id` preserves
/// insertion order across copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub field_id: i64,
    pub item_id: i64,
    pub key: String,
    pub value: String,
}

/// One taxonomy association row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub item_id: i64,
    pub taxonomy: String,
    pub term: String,
}

pub(crate) const ITEM_COLUMNS: &str = "item_id, item_type, status, parent_id, title, content, \
     excerpt, slug, guid, created_at_us, updated_at_us";

pub(crate) fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let status_text: String = row.get(2)?;
    let status = Status::from_str(&status_text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(error))
    })?;

    Ok(Item {
        id: row.get(0)?,
        item_type: row.get(1)?,
        status,
        parent_id: row.get(3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        excerpt: row.get(6)?,
        slug: row.get(7)?,
        guid: row.get(8)?,
        created_at_us: row.get(9)?,
        updated_at_us: row.get(10)?,
    })
}

/// Fetch one item by id. `None` when the row does not exist.
pub fn get_item(conn: &Connection, item_id: i64) -> Result<Option<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1");
    let mut stmt = conn.prepare(&sql).context("prepare get_item")?;
    let mut rows = stmt
        .query_map(params![item_id], item_from_row)
        .context("query get_item")?;

    match rows.next() {
        Some(row) => Ok(Some(row.context("read item row")?)),
        None => Ok(None),
    }
}

/// `true` when an item row with this id exists.
pub fn item_exists(conn: &Connection, item_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE item_id = ?1)",
        params![item_id],
        |row| row.get(0),
    )
    .context("check item exists")
}

/// List items, optionally filtered by status, newest-modified first.
pub fn list_items(conn: &Connection, status: Option<Status>, limit: u32) -> Result<Vec<Item>> {
    let rows = if let Some(status) = status {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE status = ?1
             ORDER BY updated_at_us DESC, item_id DESC
             LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql).context("prepare list_items")?;
        let collected = stmt
            .query_map(params![status.as_str(), limit], item_from_row)
            .context("query list_items")?
            .collect::<rusqlite::Result<Vec<_>>>();
        collected
    } else {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items
             ORDER BY updated_at_us DESC, item_id DESC
             LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql).context("prepare list_items")?;
        let collected = stmt
            .query_map(params![limit], item_from_row)
            .context("query list_items")?
            .collect::<rusqlite::Result<Vec<_>>>();
        collected
    };

    rows.context("read item rows")
}

/// All fields for an item in insertion order.
pub fn get_fields(conn: &Connection, item_id: i64) -> Result<Vec<Field>> {
    let mut stmt = conn
        .prepare(
            "SELECT field_id, item_id, field_key, field_value
             FROM item_fields
             WHERE item_id = ?1
             ORDER BY field_id ASC",
        )
        .context("prepare get_fields")?;

    let rows = stmt
        .query_map(params![item_id], |row| {
            Ok(Field {
                field_id: row.get(0)?,
                item_id: row.get(1)?,
                key: row.get(2)?,
                value: row.get(3)?,
            })
        })
        .context("query get_fields")?
        .collect::<rusqlite::Result<Vec<_>>>();

    rows.context("read field rows")
}

/// All taxonomy associations for an item, ordered for stable output.
pub fn get_terms(conn: &Connection, item_id: i64) -> Result<Vec<Term>> {
    let mut stmt = conn
        .prepare(
            "SELECT item_id, taxonomy, term
             FROM item_terms
             WHERE item_id = ?1
             ORDER BY taxonomy ASC, term ASC",
        )
        .context("prepare get_terms")?;

    let rows = stmt
        .query_map(params![item_id], |row| {
            Ok(Term {
                item_id: row.get(0)?,
                taxonomy: row.get(1)?,
                term: row.get(2)?,
            })
        })
        .context("query get_terms")?
        .collect::<rusqlite::Result<Vec<_>>>();

    rows.context("read term rows")
}
