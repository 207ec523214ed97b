//! Merging a fork back into its source.
//!
//! Like forking, the merge runs inside one `BEGIN IMMEDIATE` transaction.
//! The source keeps its identity (id, slug, guid, parent linkage) and its
//! current status; everything else comes from the fork. Merging archives
//! the fork, and an archived fork never reopens.

use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

use crate::config::ProjectConfig;
use crate::db::{mutate, now_us, query};
use crate::eligibility::{self, Actor};
use crate::error::Error;
use crate::hooks::Hooks;
use crate::index;
use crate::model::{ItemPatch, Status};

pub struct Merger<'a> {
    conn: &'a mut Connection,
    config: &'a ProjectConfig,
    hooks: &'a Hooks,
}

impl<'a> Merger<'a> {
    pub fn new(conn: &'a mut Connection, config: &'a ProjectConfig, hooks: &'a Hooks) -> Self {
        Self { conn, config, hooks }
    }

    /// Merge `fork_id` into its source and return the source's id.
    ///
    /// `edits` are unsaved caller-side changes; they are persisted to the
    /// fork first so the merged content includes them. After the merge the
    /// fork is `stg-archived` and its open-fork claim is released.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when `fork_id` does not resolve to an item
    /// - `NotEligible` when a merge precondition fails
    /// - `MissingRelationship` when the fork's origin pointer does not
    ///   resolve to an existing item
    /// - `PersistFailure` when the store rejects a write; the transaction is
    ///   rolled back and nothing changes
    pub fn merge(
        &mut self,
        fork_id: i64,
        actor: &dyn Actor,
        edits: Option<&ItemPatch>,
    ) -> Result<i64, Error> {
        if fork_id <= 0 {
            return Err(Error::InvalidArgument(format!("invalid item id {fork_id}")));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::persist(&e.into()))?;

        if !query::item_exists(&tx, fork_id).map_err(|e| Error::persist(&e))? {
            return Err(Error::unknown_item(fork_id));
        }

        eligibility::merge_eligibility(&tx, self.config, actor, fork_id)?;

        let now = now_us();
        if let Some(patch) = edits {
            mutate::apply_patch(&tx, fork_id, patch, now).map_err(|e| Error::persist(&e))?;
        }
        let fork = query::get_item(&tx, fork_id)
            .map_err(|e| Error::persist(&e))?
            .ok_or_else(|| Error::unknown_item(fork_id))?;

        let source = index::source_of(&tx, fork_id)
            .map_err(|e| Error::persist(&e))?
            .ok_or_else(|| {
                Error::MissingRelationship(format!(
                    "fork {fork_id} does not point at an existing source item"
                ))
            })?;

        self.hooks.before_merge(&fork, &source);

        // The source keeps its current status; a private item stays private
        // when a fork of it is merged.
        mutate::update_item_from(&tx, source.id, &fork, source.status, now)
            .map_err(|e| Error::persist(&e))?;
        mutate::copy_fields(&tx, fork.id, source.id, &[index::ORIGIN_FIELD_KEY])
            .map_err(|e| Error::persist(&e))?;
        mutate::copy_terms(&tx, fork.id, source.id).map_err(|e| Error::persist(&e))?;

        // Archiving leaves the open set, which also releases the guard claim.
        mutate::set_status(&tx, fork.id, Status::ArchivedFork, now)
            .map_err(|e| Error::persist(&e))?;

        let merged = query::get_item(&tx, source.id)
            .map_err(|e| Error::persist(&e))?
            .ok_or_else(|| {
                Error::PersistFailure(format!("source {} vanished mid-merge", source.id))
            })?;

        tx.commit().map_err(|e| Error::persist(&e.into()))?;
        info!(fork_id, source_id = merged.id, "merged fork into source");
        self.hooks.after_merge(&fork, &merged);

        Ok(merged.id)
    }
}

impl std::fmt::Debug for Merger<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Merger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::Merger;
    use crate::config::ProjectConfig;
    use crate::db::{mutate, open_in_memory, query};
    use crate::eligibility::StaticActor;
    use crate::error::Error;
    use crate::forker::Forker;
    use crate::hooks::Hooks;
    use crate::index;
    use crate::model::{ItemPatch, NewItem, Status};

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
        let id = mutate::insert_item(conn, &item, 1_000).expect("insert");
        mutate::assign_identity(conn, id, title).expect("identity");
        id
    }

    fn fork_of(conn: &mut rusqlite::Connection, source: i64) -> i64 {
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();
        Forker::new(conn, &config, &hooks)
            .fork(source, &actor, None)
            .expect("fork")
    }

    #[test]
    fn merge_updates_source_and_archives_fork() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();

        let source = seed(&conn, "Original", Status::Publish);
        let fork_id = fork_of(&mut conn, source);
        let patch = ItemPatch {
            title: Some("Revised".into()),
            content: Some("Revised body".into()),
            ..ItemPatch::default()
        };
        mutate::apply_patch(&conn, fork_id, &patch, 2_000).expect("edit fork");

        let merged = Merger::new(&mut conn, &config, &hooks)
            .merge(fork_id, &actor, None)
            .expect("merge");
        assert_eq!(merged, source);

        let source_row = query::get_item(&conn, source).expect("query").expect("item");
        assert_eq!(source_row.title, "Revised");
        assert_eq!(source_row.content, "Revised body");
        assert_eq!(source_row.status, Status::Publish);
        assert!(source_row.slug.contains("original"), "slug is kept");

        let fork_row = query::get_item(&conn, fork_id).expect("query").expect("item");
        assert_eq!(fork_row.status, Status::ArchivedFork);
        assert!(index::open_fork_of(&conn, source).expect("query").is_none());
    }

    #[test]
    fn private_source_stays_private() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();

        let source = seed(&conn, "Secret", Status::Private);
        let fork_id = fork_of(&mut conn, source);

        Merger::new(&mut conn, &config, &hooks)
            .merge(fork_id, &actor, None)
            .expect("merge");

        let source_row = query::get_item(&conn, source).expect("query").expect("item");
        assert_eq!(source_row.status, Status::Private);
    }

    #[test]
    fn merge_copies_fields_without_the_origin_pointer() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();

        let source = seed(&conn, "Original", Status::Publish);
        mutate::add_field(&conn, source, "stale", "yes").expect("add");
        let fork_id = fork_of(&mut conn, source);
        mutate::clear_fields(&conn, fork_id).expect("clear");
        index::set_origin(&conn, fork_id, source).expect("restore origin");
        mutate::add_field(&conn, fork_id, "byline", "Ada").expect("add");
        mutate::add_term(&conn, fork_id, "tag", "update").expect("add");

        Merger::new(&mut conn, &config, &hooks)
            .merge(fork_id, &actor, None)
            .expect("merge");

        let fields = query::get_fields(&conn, source).expect("query");
        let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["byline"], "stale fields gone, origin not copied");

        let terms = query::get_terms(&conn, source).expect("query");
        assert!(terms.iter().any(|t| t.term == "update"));
    }

    #[test]
    fn unsaved_edits_land_in_the_merge() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();

        let source = seed(&conn, "Original", Status::Publish);
        let fork_id = fork_of(&mut conn, source);

        let patch = ItemPatch {
            content: Some("Last-second change".into()),
            ..ItemPatch::default()
        };
        Merger::new(&mut conn, &config, &hooks)
            .merge(fork_id, &actor, Some(&patch))
            .expect("merge");

        let source_row = query::get_item(&conn, source).expect("query").expect("item");
        assert_eq!(source_row.content, "Last-second change");
        // The edit was persisted to the fork before the copy.
        let fork_row = query::get_item(&conn, fork_id).expect("query").expect("item");
        assert_eq!(fork_row.content, "Last-second change");
    }

    #[test]
    fn merged_fork_cannot_merge_again() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();

        let source = seed(&conn, "Original", Status::Publish);
        let fork_id = fork_of(&mut conn, source);
        Merger::new(&mut conn, &config, &hooks)
            .merge(fork_id, &actor, None)
            .expect("merge");

        let again = Merger::new(&mut conn, &config, &hooks).merge(fork_id, &actor, None);
        assert!(matches!(again, Err(Error::NotEligible(_))));
    }

    #[test]
    fn source_can_fork_again_after_merge() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();

        let source = seed(&conn, "Original", Status::Publish);
        let first = fork_of(&mut conn, source);
        Merger::new(&mut conn, &config, &hooks)
            .merge(first, &actor, None)
            .expect("merge");

        let second = fork_of(&mut conn, source);
        assert_ne!(first, second);
    }

    #[test]
    fn orphan_fork_is_rejected() {
        let mut conn = open_in_memory().expect("open store");
        let config = ProjectConfig::default();
        let hooks = Hooks::new();
        let actor = StaticActor::allow_all();

        let orphan = seed(&conn, "Orphan", Status::DraftFork);
        let denied = Merger::new(&mut conn, &config, &hooks).merge(orphan, &actor, None);
        assert!(matches!(denied, Err(Error::NotEligible(_))));

        let missing = Merger::new(&mut conn, &config, &hooks).merge(4_040, &actor, None);
        assert!(matches!(missing, Err(Error::InvalidArgument(_))));
    }
}
