//! Write helpers for the stage store.
//!
//! Field copies are clear-then-bulk-insert, never upsert-by-key: the field
//! bag allows duplicate keys, so the only correct copy is to wipe the
//! destination bag and re-insert every source row in order. Zero cleared
//! rows is a normal result, not an error.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::model::{Item, ItemPatch, NewItem, Status};

/// Insert a new item row and return its assigned id.
pub fn insert_item(conn: &Connection, item: &NewItem, now_us: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO items (
            item_type, status, parent_id, title, content, excerpt,
            slug, guid, created_at_us, updated_at_us
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            item.item_type,
            item.status.as_str(),
            item.parent_id,
            item.title,
            item.content,
            item.excerpt,
            item.slug,
            item.guid,
            now_us,
        ],
    )
    .context("insert item")?;

    Ok(conn.last_insert_rowid())
}

/// Give a freshly inserted item its slug and guid. Both derive from the
/// assigned id so they stay unique without a retry loop.
pub fn assign_identity(conn: &Connection, item_id: i64, title: &str) -> Result<()> {
    let base = crate::model::slugify(title);
    let slug = if base.is_empty() {
        format!("item-{item_id}")
    } else {
        format!("{base}-{item_id}")
    };
    let guid = format!("stage://item/{item_id}");

    let changed = conn
        .execute(
            "UPDATE items SET slug = ?1, guid = ?2 WHERE item_id = ?3",
            params![slug, guid, item_id],
        )
        .with_context(|| format!("assign identity to item {item_id}"))?;

    anyhow::ensure!(changed == 1, "item {item_id} not found for identity");
    Ok(())
}

/// Overwrite the target item's content columns from `source`, forcing the
/// given status. The target keeps its own id, parent linkage, slug, guid,
/// and creation time; `updated_at_us` is bumped.
pub fn update_item_from(
    conn: &Connection,
    target_id: i64,
    source: &Item,
    status: Status,
    now_us: i64,
) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE items
             SET title = ?1, content = ?2, excerpt = ?3, status = ?4, updated_at_us = ?5
             WHERE item_id = ?6",
            params![
                source.title,
                source.content,
                source.excerpt,
                status.as_str(),
                now_us,
                target_id,
            ],
        )
        .with_context(|| format!("update item {target_id}"))?;

    anyhow::ensure!(changed == 1, "item {target_id} not found for update");
    Ok(())
}

/// Apply in-flight edits over a persisted item. A no-op for an empty patch.
pub fn apply_patch(conn: &Connection, item_id: i64, patch: &ItemPatch, now_us: i64) -> Result<()> {
    if patch.is_empty() {
        return Ok(());
    }

    let changed = conn
        .execute(
            "UPDATE items
             SET title = COALESCE(?1, title),
                 content = COALESCE(?2, content),
                 excerpt = COALESCE(?3, excerpt),
                 updated_at_us = ?4
             WHERE item_id = ?5",
            params![patch.title, patch.content, patch.excerpt, now_us, item_id],
        )
        .with_context(|| format!("patch item {item_id}"))?;

    anyhow::ensure!(changed == 1, "item {item_id} not found for patch");
    Ok(())
}

/// Set an item's status and bump its modification time.
///
/// A change that leaves the open fork set also releases any open-fork claim
/// the item holds, so a fork trashed or archived outside the merge path
/// cannot leave its source claimed forever.
pub fn set_status(conn: &Connection, item_id: i64, status: Status, now_us: i64) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE items SET status = ?1, updated_at_us = ?2 WHERE item_id = ?3",
            params![status.as_str(), now_us, item_id],
        )
        .with_context(|| format!("set status of item {item_id}"))?;

    anyhow::ensure!(changed == 1, "item {item_id} not found for status change");

    if !status.is_open_fork() {
        release_open_fork(conn, item_id)?;
    }
    Ok(())
}

/// Append one field row to an item's bag.
pub fn add_field(conn: &Connection, item_id: i64, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO item_fields (item_id, field_key, field_value) VALUES (?1, ?2, ?3)",
        params![item_id, key, value],
    )
    .with_context(|| format!("add field '{key}' to item {item_id}"))?;
    Ok(())
}

/// Delete every field row for an item. Returns the number cleared.
pub fn clear_fields(conn: &Connection, item_id: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM item_fields WHERE item_id = ?1",
        params![item_id],
    )
    .with_context(|| format!("clear fields of item {item_id}"))
}

/// Copy the field bag from one item to another.
///
/// The destination bag is cleared first so a reused destination id cannot
/// accumulate duplicate rows, then every source row is re-inserted in
/// insertion order. Keys in `excluded_keys` are skipped.
///
/// Returns the number of rows copied.
pub fn copy_fields(
    conn: &Connection,
    from_id: i64,
    to_id: i64,
    excluded_keys: &[&str],
) -> Result<usize> {
    clear_fields(conn, to_id)?;

    let mut sql = String::from(
        "INSERT INTO item_fields (item_id, field_key, field_value)
         SELECT ?1, field_key, field_value
         FROM item_fields
         WHERE item_id = ?2",
    );
    for (offset, _) in excluded_keys.iter().enumerate() {
        sql.push_str(&format!(" AND field_key <> ?{}", offset + 3));
    }
    sql.push_str(" ORDER BY field_id ASC");

    let mut values: Vec<&dyn rusqlite::ToSql> = vec![&to_id, &from_id];
    for key in excluded_keys {
        values.push(key);
    }

    conn.execute(&sql, values.as_slice())
        .with_context(|| format!("copy fields {from_id} -> {to_id}"))
}

/// Attach one taxonomy term to an item. Duplicate associations are ignored.
pub fn add_term(conn: &Connection, item_id: i64, taxonomy: &str, term: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO item_terms (item_id, taxonomy, term) VALUES (?1, ?2, ?3)",
        params![item_id, taxonomy, term],
    )
    .with_context(|| format!("add term '{taxonomy}:{term}' to item {item_id}"))?;
    Ok(())
}

/// Copy taxonomy associations from one item to another, per taxonomy
/// namespace: the destination's terms are replaced for every taxonomy the
/// source has terms in; taxonomies absent from the source are untouched.
///
/// Returns the number of associations copied.
pub fn copy_terms(conn: &Connection, from_id: i64, to_id: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM item_terms
         WHERE item_id = ?1
           AND taxonomy IN (SELECT DISTINCT taxonomy FROM item_terms WHERE item_id = ?2)",
        params![to_id, from_id],
    )
    .with_context(|| format!("clear shared taxonomies on item {to_id}"))?;

    conn.execute(
        "INSERT OR IGNORE INTO item_terms (item_id, taxonomy, term)
         SELECT ?1, taxonomy, term FROM item_terms WHERE item_id = ?2",
        params![to_id, from_id],
    )
    .with_context(|| format!("copy terms {from_id} -> {to_id}"))
}

/// Claim the single-open-fork guard for a source.
///
/// Fails on the primary-key constraint when another open fork already holds
/// the claim, which is exactly the double-fork race this table exists to
/// stop.
pub fn claim_open_fork(conn: &Connection, source_id: i64, fork_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO open_forks (source_id, fork_id) VALUES (?1, ?2)",
        params![source_id, fork_id],
    )
    .with_context(|| format!("claim open fork {fork_id} for source {source_id}"))?;
    Ok(())
}

/// Release the guard row held by a fork, if any. Zero rows is normal (the
/// fork may never have been open, or was released already).
pub fn release_open_fork(conn: &Connection, fork_id: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM open_forks WHERE fork_id = ?1",
        params![fork_id],
    )
    .with_context(|| format!("release open fork {fork_id}"))
}

#[cfg(test)]
mod tests {
    use super::{
        add_field, add_term, apply_patch, assign_identity, claim_open_fork, clear_fields,
        copy_fields, copy_terms, insert_item, release_open_fork, set_status, update_item_from,
    };
    use crate::db::{open_in_memory, query};
    use crate::model::{Item, ItemPatch, NewItem, Status};

    fn seed(conn: &rusqlite::Connection, title: &str, status: Status) -> i64 {
        let item = NewItem {
            item_type: "post".into(),
            status,
            parent_id: None,
            title: title.into(),
            content: format!("{title} body"),
            excerpt: String::new(),
            slug: String::new(),
            guid: String::new(),
        };
        insert_item(conn, &item, 1_000).expect("insert")
    }

    fn fetch(conn: &rusqlite::Connection, id: i64) -> Item {
        query::get_item(conn, id).expect("query").expect("item")
    }

    #[test]
    fn update_item_from_keeps_target_identity() {
        let conn = open_in_memory().expect("open store");
        let source = seed(&conn, "Source", Status::Publish);
        let fork = seed(&conn, "Fork", Status::DraftFork);

        let fork_row = fetch(&conn, fork);
        update_item_from(&conn, source, &fork_row, Status::Publish, 5_000).expect("update");

        let merged = fetch(&conn, source);
        assert_eq!(merged.id, source);
        assert_eq!(merged.title, "Fork");
        assert_eq!(merged.content, "Fork body");
        assert_eq!(merged.status, Status::Publish);
        assert_eq!(merged.updated_at_us, 5_000);
        assert_eq!(merged.created_at_us, 1_000);
    }

    #[test]
    fn assign_identity_derives_slug_and_guid() {
        let conn = open_in_memory().expect("open store");
        let id = seed(&conn, "Hello, World!", Status::Publish);
        assign_identity(&conn, id, "Hello, World!").expect("assign");

        let item = fetch(&conn, id);
        assert_eq!(item.slug, format!("hello-world-{id}"));
        assert_eq!(item.guid, format!("stage://item/{id}"));
    }

    #[test]
    fn apply_patch_only_touches_set_fields() {
        let conn = open_in_memory().expect("open store");
        let id = seed(&conn, "Original", Status::Publish);

        let patch = ItemPatch {
            title: Some("Edited".into()),
            ..ItemPatch::default()
        };
        apply_patch(&conn, id, &patch, 2_000).expect("patch");

        let item = fetch(&conn, id);
        assert_eq!(item.title, "Edited");
        assert_eq!(item.content, "Original body");
        assert_eq!(item.updated_at_us, 2_000);
    }

    #[test]
    fn empty_patch_leaves_timestamps_alone() {
        let conn = open_in_memory().expect("open store");
        let id = seed(&conn, "Original", Status::Publish);

        apply_patch(&conn, id, &ItemPatch::default(), 9_000).expect("patch");
        assert_eq!(fetch(&conn, id).updated_at_us, 1_000);
    }

    #[test]
    fn leaving_the_open_set_releases_the_claim() {
        let conn = open_in_memory().expect("open store");
        let source = seed(&conn, "Source", Status::Publish);
        let fork = seed(&conn, "Fork", Status::DraftFork);
        claim_open_fork(&conn, source, fork).expect("claim");

        set_status(&conn, fork, Status::Trash, 2_000).expect("trash");
        assert_eq!(release_open_fork(&conn, fork).expect("release"), 0);

        let next = seed(&conn, "Fork B", Status::DraftFork);
        claim_open_fork(&conn, source, next).expect("source is claimable again");

        // Moving between open statuses keeps the claim.
        set_status(&conn, next, Status::PendingFork, 3_000).expect("pending");
        assert_eq!(release_open_fork(&conn, next).expect("release"), 1);
    }

    #[test]
    fn set_status_errors_on_missing_item() {
        let conn = open_in_memory().expect("open store");
        assert!(set_status(&conn, 404, Status::Trash, 1_000).is_err());
    }

    #[test]
    fn copy_fields_clears_destination_first() {
        let conn = open_in_memory().expect("open store");
        let from = seed(&conn, "From", Status::Publish);
        let to = seed(&conn, "To", Status::Publish);

        add_field(&conn, from, "color", "red").expect("add");
        add_field(&conn, from, "color", "blue").expect("add");
        add_field(&conn, to, "stale", "yes").expect("add");

        let copied = copy_fields(&conn, from, to, &[]).expect("copy");
        assert_eq!(copied, 2);

        let fields = query::get_fields(&conn, to).expect("query");
        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|f| (f.key.as_str(), f.value.as_str()))
            .collect();
        assert_eq!(pairs, vec![("color", "red"), ("color", "blue")]);
    }

    #[test]
    fn copy_fields_honors_exclusions() {
        let conn = open_in_memory().expect("open store");
        let from = seed(&conn, "From", Status::Publish);
        let to = seed(&conn, "To", Status::Publish);

        add_field(&conn, from, "_stage_source_item", "42").expect("add");
        add_field(&conn, from, "byline", "Ada").expect("add");

        let copied = copy_fields(&conn, from, to, &["_stage_source_item"]).expect("copy");
        assert_eq!(copied, 1);

        let fields = query::get_fields(&conn, to).expect("query");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].key, "byline");
    }

    #[test]
    fn clear_fields_of_bare_item_is_zero_not_error() {
        let conn = open_in_memory().expect("open store");
        let id = seed(&conn, "Bare", Status::Publish);
        assert_eq!(clear_fields(&conn, id).expect("clear"), 0);
    }

    #[test]
    fn copy_terms_replaces_shared_taxonomies_only() {
        let conn = open_in_memory().expect("open store");
        let from = seed(&conn, "From", Status::Publish);
        let to = seed(&conn, "To", Status::Publish);

        add_term(&conn, from, "category", "tech").expect("add");
        add_term(&conn, to, "category", "news").expect("add");
        add_term(&conn, to, "tag", "archive").expect("add");

        copy_terms(&conn, from, to).expect("copy");

        let terms = query::get_terms(&conn, to).expect("query");
        let pairs: Vec<(&str, &str)> = terms
            .iter()
            .map(|t| (t.taxonomy.as_str(), t.term.as_str()))
            .collect();
        assert_eq!(pairs, vec![("category", "tech"), ("tag", "archive")]);
    }

    #[test]
    fn open_fork_claim_is_exclusive_per_source() {
        let conn = open_in_memory().expect("open store");
        let source = seed(&conn, "Source", Status::Publish);
        let first = seed(&conn, "Fork A", Status::DraftFork);
        let second = seed(&conn, "Fork B", Status::DraftFork);

        claim_open_fork(&conn, source, first).expect("claim");
        assert!(claim_open_fork(&conn, source, second).is_err());

        assert_eq!(release_open_fork(&conn, first).expect("release"), 1);
        claim_open_fork(&conn, source, second).expect("claim after release");
        assert_eq!(release_open_fork(&conn, 777).expect("release"), 0);
    }
}
