//! Creating a fork of a published item.
//!
//! The whole operation runs inside one `BEGIN IMMEDIATE` transaction: the
//! eligibility check, the open-fork claim, and every row copy commit or
//! roll back together, so a crash mid-copy cannot leave a fork with half
//! its fields and two callers cannot both win the single-open-fork claim.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

use crate::config::ProjectConfig;
use crate::db::{mutate, now_us, query};
use crate::eligibility::{self, Actor};
use crate::error::Error;
use crate::hooks::Hooks;
use crate::index;
use crate::model::{Item, ItemPatch, NewItem, Status};

pub struct Forker<'a> {
    conn: &'a mut Connection,
    config: &'a ProjectConfig,
    hooks: &'a Hooks,
}

impl<'a> Forker<'a> {
    pub fn new(conn: &'a mut Connection, config: &'a ProjectConfig, hooks: &'a Hooks) -> Self {
        Self { conn, config, hooks }
    }

    /// Fork `source_id` into a new `stg-draft` item and return the fork's id.
    ///
    /// The first time an item is ever forked, an archived snapshot of its
    /// current state is written beforehand so the pre-fork content is never
    /// lost to a later merge. `edits` are unsaved caller-side changes,
    /// overlaid on the fork after the copy.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when `source_id` does not resolve to an item
    /// - `NotEligible` when a fork precondition fails
    /// - `PersistFailure` when the store rejects a write; the transaction is
    ///   rolled back and nothing changes
    pub fn fork(
        &mut self,
        source_id: i64,
        actor: &dyn Actor,
        edits: Option<&ItemPatch>,
    ) -> Result<i64, Error> {
        if source_id <= 0 {
            return Err(Error::InvalidArgument(format!(
                "invalid item id {source_id}"
            )));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::persist(&e.into()))?;

        let source = query::get_item(&tx, source_id)
            .map_err(|e| Error::persist(&e))?
            .ok_or_else(|| Error::unknown_item(source_id))?;

        eligibility::fork_eligibility(&tx, self.config, actor, source_id)?;

        self.hooks.before_fork(&source);

        let now = now_us();
        if !index::has_archived_forks(&tx, source_id).map_err(|e| Error::persist(&e))? {
            archive_snapshot(&tx, &source, now)?;
        }

        let fork_id = clone_into_fork(&tx, &source, now)?;
        if let Some(patch) = edits {
            mutate::apply_patch(&tx, fork_id, patch, now).map_err(|e| Error::persist(&e))?;
        }
        mutate::claim_open_fork(&tx, source_id, fork_id).map_err(|e| Error::persist(&e))?;

        let fork = query::get_item(&tx, fork_id)
            .map_err(|e| Error::persist(&e))?
            .ok_or_else(|| Error::PersistFailure(format!("fork {fork_id} vanished mid-write")))?;

        tx.commit().map_err(|e| Error::persist(&e.into()))?;
        info!(source_id, fork_id, "forked item");
        self.hooks.after_fork(&source, &fork);

        Ok(fork_id)
    }
}

impl std::fmt::Debug for Forker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forker").finish_non_exhaustive()
    }
}

/// Write an archived snapshot of the source's current state, so the content
/// as it stood before any fork existed survives the first merge.
fn archive_snapshot(tx: &Transaction<'_>, source: &Item, now: i64) -> Result<(), Error> {
    let snapshot = NewItem::cloned_from(source, Status::ArchivedFork, Some(source.id));
    let snapshot_id = mutate::insert_item(tx, &snapshot, now).map_err(|e| Error::persist(&e))?;
    mutate::assign_identity(tx, snapshot_id, &snapshot.title).map_err(|e| Error::persist(&e))?;
    copy_payload(tx, source.id, snapshot_id)?;
    index::set_origin(tx, snapshot_id, source.id).map_err(|e| Error::persist(&e))?;
    info!(source_id = source.id, snapshot_id, "archived pre-fork snapshot");
    Ok(())
}

fn clone_into_fork(tx: &Transaction<'_>, source: &Item, now: i64) -> Result<i64, Error> {
    let clone = NewItem::cloned_from(source, Status::DraftFork, Some(source.id));
    let fork_id = mutate::insert_item(tx, &clone, now).map_err(|e| Error::persist(&e))?;
    mutate::assign_identity(tx, fork_id, &clone.title).map_err(|e| Error::persist(&e))?;
    copy_payload(tx, source.id, fork_id)?;
    index::set_origin(tx, fork_id, source.id).map_err(|e| Error::persist(&e))?;
    Ok(fork_id)
}

/// Copy the field bag and taxonomy terms onto a fresh clone. The origin key
/// is excluded so the pointer written afterwards is always the clone's own.
fn copy_payload(tx: &Transaction<'_>, from_id: i64, to_id: i64) -> Result<(), Error> {
    mutate::copy_fields(tx, from_id, to_id, &[index::ORIGIN_FIELD_KEY])
        .map_err(|e| Error::persist(&e))?;
    mutate::copy_terms(tx, from_id, to_id).map_err(|e| Error::persist(&e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Forker;
    use crate::config::ProjectConfig;
    use crate::db::{mutate, open_in_memory, query};
    use crate::eligibility::StaticActor;
    use crate::error::Error;
    use crate::hooks::Hooks;
    use crate::index;
    use crate::model::{ItemPatch, NewItem, Status};

    fn seed_published(conn: &rusqlite::Connection, title: &str) -> i64 {
        let item = NewItem {
            item_type: "post".into(),
            status: Status::Publish,
            parent_id: None,
            title: title.into(),
            content: format!("{title} body"),
            excerpt: String::new(),
            slug: String::new(),
            guid: String::new(),
        };
        let id = mutate::insert_item(conn, &item, 1_000).expect("insert");
        mutate::assign_identity(conn, id, title).expect("identity");
        id
    }

    #[test]
    fn fork_clones_content_with_fresh_identity() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();
        let source = seed_published(&conn, "Hello");
        mutate::add_field(&conn, source, "byline", "Ada").expect("add");
        mutate::add_term(&conn, source, "category", "news").expect("add");

        let fork_id = Forker::new(&mut conn, &config, &hooks)
            .fork(source, &actor, None)
            .expect("fork");

        let source_row = query::get_item(&conn, source).expect("query").expect("item");
        let fork = query::get_item(&conn, fork_id).expect("query").expect("item");
        assert_eq!(fork.status, Status::DraftFork);
        assert_eq!(fork.parent_id, Some(source));
        assert_eq!(fork.title, "Hello");
        assert_eq!(fork.content, "Hello body");
        assert_ne!(fork.slug, source_row.slug);
        assert_ne!(fork.guid, source_row.guid);

        assert_eq!(index::origin_of(&conn, fork_id).expect("query"), Some(source));

        let fields = query::get_fields(&conn, fork_id).expect("query");
        assert!(fields.iter().any(|f| f.key == "byline" && f.value == "Ada"));
        let terms = query::get_terms(&conn, fork_id).expect("query");
        assert_eq!(terms.len(), 1);

        // Source row itself is untouched by the fork.
        assert_eq!(source_row.status, Status::Publish);
        assert_eq!(source_row.title, "Hello");
    }

    #[test]
    fn first_fork_writes_an_archived_snapshot() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();
        let source = seed_published(&conn, "Original");

        Forker::new(&mut conn, &config, &hooks)
            .fork(source, &actor, None)
            .expect("fork");

        let archived = index::archived_forks_of(&conn, source, 10, 0).expect("query");
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].title, "Original");
        assert_eq!(archived[0].status, Status::ArchivedFork);
    }

    #[test]
    fn later_forks_skip_the_snapshot() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();
        let source = seed_published(&conn, "Original");

        let first = Forker::new(&mut conn, &config, &hooks)
            .fork(source, &actor, None)
            .expect("fork");
        // Close the first fork out of the open set.
        mutate::set_status(&conn, first, Status::ArchivedFork, 2_000).expect("archive");

        Forker::new(&mut conn, &config, &hooks)
            .fork(source, &actor, None)
            .expect("second fork");

        // Snapshot + first fork + second fork, not two snapshots.
        let all = index::all_forks_of(&conn, source, 10, 0).expect("query");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn edits_overlay_the_cloned_content() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();
        let source = seed_published(&conn, "Stored title");

        let patch = ItemPatch {
            title: Some("Unsaved title".into()),
            ..ItemPatch::default()
        };
        let fork_id = Forker::new(&mut conn, &config, &hooks)
            .fork(source, &actor, Some(&patch))
            .expect("fork");

        let fork = query::get_item(&conn, fork_id).expect("query").expect("item");
        assert_eq!(fork.title, "Unsaved title");
        assert_eq!(fork.content, "Stored title body");
    }

    #[test]
    fn second_open_fork_is_rejected_without_mutation() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();
        let source = seed_published(&conn, "Original");

        Forker::new(&mut conn, &config, &hooks)
            .fork(source, &actor, None)
            .expect("fork");
        let before = query::list_items(&conn, None, 100).expect("list").len();

        let denied = Forker::new(&mut conn, &config, &hooks).fork(source, &actor, None);
        assert!(matches!(denied, Err(Error::NotEligible(_))));

        let after = query::list_items(&conn, None, 100).expect("list").len();
        assert_eq!(before, after, "denied fork must not write rows");
    }

    #[test]
    fn unknown_id_is_an_invalid_argument() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();

        let missing = Forker::new(&mut conn, &config, &hooks).fork(4_040, &actor, None);
        assert!(matches!(missing, Err(Error::InvalidArgument(_))));
        let nonpositive = Forker::new(&mut conn, &config, &hooks).fork(0, &actor, None);
        assert!(matches!(nonpositive, Err(Error::InvalidArgument(_))));
    }
}
