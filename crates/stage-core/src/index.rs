//! Relationship index between sources and their forks.
//!
//! The only persistent link from a fork back to its source is a reserved
//! key in the fork's field bag. Everything here is derived per call from
//! that pointer plus the fork statuses; nothing is cached.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use tracing::warn;

use crate::db::query::{self, ITEM_COLUMNS};
use crate::model::{Item, Status};

/// Reserved field key holding a fork's source item id.
pub const ORIGIN_FIELD_KEY: &str = "_stage_source_item";

/// Default page size when walking a source's fork history.
pub const DEFAULT_FORK_PAGE_SIZE: u32 = 500;

/// Record the origin pointer on a fork.
///
/// The pointer is write-once: if the fork already carries one, the existing
/// value wins and this call does nothing. Non-positive ids are ignored with
/// a warning rather than treated as errors, matching the forgiving pointer
/// semantics of the read side.
pub fn set_origin(conn: &Connection, fork_id: i64, source_id: i64) -> Result<()> {
    if fork_id <= 0 || source_id <= 0 {
        warn!(fork_id, source_id, "refusing to record origin for invalid id");
        return Ok(());
    }

    conn.execute(
        "INSERT INTO item_fields (item_id, field_key, field_value)
         SELECT ?1, ?2, ?3
         WHERE NOT EXISTS (
            SELECT 1 FROM item_fields WHERE item_id = ?1 AND field_key = ?2
         )",
        params![fork_id, ORIGIN_FIELD_KEY, source_id.to_string()],
    )
    .with_context(|| format!("record origin of fork {fork_id}"))?;

    Ok(())
}

/// The source id a fork points at, if it carries an origin pointer with a
/// parseable positive value.
pub fn origin_of(conn: &Connection, fork_id: i64) -> Result<Option<i64>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT field_value FROM item_fields
             WHERE item_id = ?1 AND field_key = ?2
             ORDER BY field_id ASC
             LIMIT 1",
            params![fork_id, ORIGIN_FIELD_KEY],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })
        .with_context(|| format!("read origin of fork {fork_id}"))?;

    Ok(value
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|id| *id > 0))
}

/// The source item a fork points at. `None` when the fork has no pointer or
/// the pointed-at row no longer exists (a dangling pointer is not an error).
pub fn source_of(conn: &Connection, fork_id: i64) -> Result<Option<Item>> {
    match origin_of(conn, fork_id)? {
        Some(source_id) => query::get_item(conn, source_id),
        None => Ok(None),
    }
}

/// The currently open fork of a source, if one exists.
///
/// Open means one of the in-flight fork statuses; newest-modified wins if
/// the store somehow holds more than one.
pub fn open_fork_of(conn: &Connection, source_id: i64) -> Result<Option<Item>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items
         WHERE status IN (?1, ?2)
           AND item_id IN (
              SELECT item_id FROM item_fields
              WHERE field_key = ?3 AND field_value = ?4
           )
         ORDER BY updated_at_us DESC, item_id DESC
         LIMIT 1"
    );

    let mut stmt = conn.prepare(&sql).context("prepare open_fork_of")?;
    let mut rows = stmt
        .query_map(
            params![
                Status::DraftFork.as_str(),
                Status::PendingFork.as_str(),
                ORIGIN_FIELD_KEY,
                source_id.to_string(),
            ],
            query::item_from_row,
        )
        .context("query open_fork_of")?;

    match rows.next() {
        Some(row) => Ok(Some(row.context("read open fork row")?)),
        None => Ok(None),
    }
}

/// Every fork pointing at a source, open or archived, newest-modified
/// first. Paged so a long-lived source cannot produce an unbounded read.
pub fn all_forks_of(
    conn: &Connection,
    source_id: i64,
    limit: u32,
    offset: u32,
) -> Result<Vec<Item>> {
    forks_with_statuses(
        conn,
        source_id,
        &[Status::DraftFork, Status::PendingFork, Status::ArchivedFork],
        limit,
        offset,
    )
}

/// A source's archived forks, newest-modified first, paged.
pub fn archived_forks_of(
    conn: &Connection,
    source_id: i64,
    limit: u32,
    offset: u32,
) -> Result<Vec<Item>> {
    forks_with_statuses(conn, source_id, &[Status::ArchivedFork], limit, offset)
}

/// `true` when at least one archived fork points at this source.
pub fn has_archived_forks(conn: &Connection, source_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM items
            WHERE status = ?1
              AND item_id IN (
                 SELECT item_id FROM item_fields
                 WHERE field_key = ?2 AND field_value = ?3
              )
         )",
        params![
            Status::ArchivedFork.as_str(),
            ORIGIN_FIELD_KEY,
            source_id.to_string(),
        ],
        |row| row.get(0),
    )
    .with_context(|| format!("check archived forks of {source_id}"))
}

fn forks_with_statuses(
    conn: &Connection,
    source_id: i64,
    statuses: &[Status],
    limit: u32,
    offset: u32,
) -> Result<Vec<Item>> {
    let status_marks = (1..=statuses.len())
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let base = statuses.len();
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items
         WHERE status IN ({status_marks})
           AND item_id IN (
              SELECT item_id FROM item_fields
              WHERE field_key = ?{key} AND field_value = ?{value}
           )
         ORDER BY updated_at_us DESC, item_id DESC
         LIMIT ?{limit} OFFSET ?{offset}",
        key = base + 1,
        value = base + 2,
        limit = base + 3,
        offset = base + 4,
    );

    let status_names: Vec<&'static str> = statuses.iter().map(|status| status.as_str()).collect();
    let origin_value = source_id.to_string();
    let limit = i64::from(limit);
    let offset = i64::from(offset);
    let mut values: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(status_names.len() + 4);
    for name in &status_names {
        values.push(name);
    }
    values.push(&ORIGIN_FIELD_KEY);
    values.push(&origin_value);
    values.push(&limit);
    values.push(&offset);

    let mut stmt = conn.prepare(&sql).context("prepare fork listing")?;
    let rows = stmt
        .query_map(values.as_slice(), query::item_from_row)
        .context("query fork listing")?
        .collect::<rusqlite::Result<Vec<_>>>();

    rows.context("read fork rows")
}
