//! Trash cascade between a source and its forks.
//!
//! Trashing a source drags its forks along so stale drafts do not linger in
//! listings. The cascade is best effort: each fork is trashed individually
//! and a failure is logged and skipped rather than aborting the rest.

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::ProjectConfig;
use crate::db::{mutate, now_us, query};
use crate::index;
use crate::model::Status;

/// Trash every fork of a trashed source, open or archived.
///
/// At most `trash.cascade_page_size` forks are processed in one call. Forks
/// leaving the open set release their open-fork claim. Returns the number
/// of forks trashed.
///
/// # Errors
///
/// Returns an error when the fork listing itself cannot be read; individual
/// fork failures are logged at warn and swallowed.
pub fn sync_trashed(conn: &Connection, config: &ProjectConfig, source_id: i64) -> Result<u32> {
    let forks = index::all_forks_of(conn, source_id, config.trash.cascade_page_size, 0)
        .context("list forks for trash cascade")?;

    let now = now_us();
    let mut trashed = 0_u32;
    for fork in forks {
        if let Err(error) = trash_one(conn, fork.id, now) {
            warn!(fork_id = fork.id, %error, "skipping fork in trash cascade");
            continue;
        }
        trashed += 1;
    }

    if trashed > 0 {
        info!(source_id, trashed, "trashed forks of trashed source");
    }
    Ok(trashed)
}

/// Restoring a source does not restore its forks.
///
/// A fork trashed alongside its source may be arbitrarily stale by the time
/// the source comes back; resurrecting it silently would put an open fork in
/// front of editors that nobody chose to reopen. Callers wanting the old
/// content can fork again from the restored source.
pub fn sync_untrashed(_conn: &Connection, _config: &ProjectConfig, _source_id: i64) {}

/// Trash an item and cascade to its forks. Returns the number of forks
/// trashed along with it.
///
/// # Errors
///
/// Returns an error when the item does not exist or its own trashing fails.
pub fn trash_with_cascade(
    conn: &Connection,
    config: &ProjectConfig,
    item_id: i64,
) -> Result<u32> {
    anyhow::ensure!(
        query::item_exists(conn, item_id).context("check item exists")?,
        "item {item_id} does not exist"
    );

    trash_one(conn, item_id, now_us())?;
    sync_trashed(conn, config, item_id)
}

/// Restore a trashed item to `draft`. Its forks stay trashed, see
/// [`sync_untrashed`].
///
/// # Errors
///
/// Returns an error when the item does not exist, or is not trashed.
pub fn untrash_item(conn: &Connection, config: &ProjectConfig, item_id: i64) -> Result<()> {
    let item = query::get_item(conn, item_id)
        .context("read item for untrash")?
        .with_context(|| format!("item {item_id} does not exist"))?;
    anyhow::ensure!(
        item.status == Status::Trash,
        "item {item_id} is not trashed"
    );

    mutate::set_status(conn, item_id, Status::Draft, now_us())?;
    sync_untrashed(conn, config, item_id);
    Ok(())
}

fn trash_one(conn: &Connection, item_id: i64, now: i64) -> Result<()> {
    // Trashing leaves the open set, so set_status drops any guard claim.
    mutate::set_status(conn, item_id, Status::Trash, now)
}
