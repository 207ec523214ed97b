//! Fork and merge preconditions.
//!
//! Every predicate re-reads persisted state on each call; nothing is cached
//! between checks. Checks run in a fixed order so the reported reason is
//! deterministic when several would apply.

use anyhow::Context as _;
use rusqlite::Connection;
use tracing::debug;

use crate::config::ProjectConfig;
use crate::db::query;
use crate::error::Error;
use crate::index;
use crate::model::Status;

/// The acting principal. Capability answers must be cheap and side-effect
/// free; they are consulted on every eligibility check.
pub trait Actor {
    /// May this actor edit published items of the given type?
    fn can_edit_published(&self, item_type: &str) -> bool;
    /// May this actor edit this specific item?
    fn can_edit_item(&self, item_type: &str, item_id: i64) -> bool;
    /// May this actor publish items of the given type?
    fn can_publish(&self, item_type: &str) -> bool;
}

/// Fixed-answer actor. The CLI runs with [`StaticActor::allow_all`]; tests
/// carve out denials to exercise the capability gates.
#[derive(Debug, Clone, Default)]
pub struct StaticActor {
    deny_edit_published: bool,
    deny_publish: bool,
    denied_items: Vec<i64>,
}

impl StaticActor {
    /// An actor that can do everything.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Deny editing published items of any type.
    #[must_use]
    pub fn deny_edit_published(mut self) -> Self {
        self.deny_edit_published = true;
        self
    }

    /// Deny publishing items of any type.
    #[must_use]
    pub fn deny_publish(mut self) -> Self {
        self.deny_publish = true;
        self
    }

    /// Deny editing one specific item.
    #[must_use]
    pub fn deny_item(mut self, item_id: i64) -> Self {
        self.denied_items.push(item_id);
        self
    }
}

impl Actor for StaticActor {
    fn can_edit_published(&self, _item_type: &str) -> bool {
        !self.deny_edit_published
    }

    fn can_edit_item(&self, _item_type: &str, item_id: i64) -> bool {
        !self.denied_items.contains(&item_id)
    }

    fn can_publish(&self, _item_type: &str) -> bool {
        !self.deny_publish
    }
}

/// Why an item cannot be forked or merged right now. The `Display` text is
/// the user-facing reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Ineligibility {
    #[error("item {0} does not exist")]
    MissingItem(i64),

    #[error("forking is not enabled for '{0}' items")]
    TypeNotEnabled(String),

    #[error("items with status '{0}' cannot be forked")]
    StatusNotForkable(Status),

    #[error("item {0} is already an open fork of another item")]
    AlreadyAFork(i64),

    #[error("item {source_id} already has an open fork (item {fork_id})")]
    OpenForkExists { source_id: i64, fork_id: i64 },

    #[error("items with status '{0}' cannot be merged")]
    StatusNotMergeable(Status),

    #[error("fork {0} does not point at an existing source item")]
    MissingSource(i64),

    #[error("not allowed to edit published '{0}' items")]
    CannotEditPublished(String),

    #[error("not allowed to publish '{0}' items")]
    CannotPublish(String),

    #[error("not allowed to edit item {0}")]
    CannotEditItem(i64),
}

/// Check whether `source_id` may be forked by `actor`.
///
/// Checks run in order: the item exists, its type has forking enabled, its
/// status is forkable, it is not itself an open fork, it has no open fork
/// of its own, and the actor holds the edit capabilities.
///
/// # Errors
///
/// `Error::NotEligible` with the first failing reason; `Error::PersistFailure`
/// when the store cannot be read.
pub fn fork_eligibility(
    conn: &Connection,
    config: &ProjectConfig,
    actor: &dyn Actor,
    source_id: i64,
) -> Result<(), Error> {
    let Some(item) = query::get_item(conn, source_id).map_err(|e| Error::persist(&e))? else {
        return Err(deny(Ineligibility::MissingItem(source_id)));
    };

    if !config.forking.is_enabled_for(&item.item_type) {
        return Err(deny(Ineligibility::TypeNotEnabled(item.item_type)));
    }

    if !item.status.is_forkable() {
        return Err(deny(Ineligibility::StatusNotForkable(item.status)));
    }

    if claimed_as_fork(conn, item.id).map_err(|e| Error::persist(&e))? {
        return Err(deny(Ineligibility::AlreadyAFork(item.id)));
    }

    if let Some(fork_id) = claimed_fork_of(conn, item.id).map_err(|e| Error::persist(&e))? {
        return Err(deny(Ineligibility::OpenForkExists {
            source_id: item.id,
            fork_id,
        }));
    }

    if !actor.can_edit_published(&item.item_type) {
        return Err(deny(Ineligibility::CannotEditPublished(item.item_type)));
    }

    if !actor.can_edit_item(&item.item_type, item.id) {
        return Err(deny(Ineligibility::CannotEditItem(item.id)));
    }

    Ok(())
}

/// Check whether `fork_id` may be merged back into its source by `actor`.
///
/// A fork that is already published is tolerated by the status check so a
/// repeated merge of the same fork stays a clean denial elsewhere rather
/// than a status error.
///
/// # Errors
///
/// `Error::NotEligible` with the first failing reason; `Error::PersistFailure`
/// when the store cannot be read.
pub fn merge_eligibility(
    conn: &Connection,
    config: &ProjectConfig,
    actor: &dyn Actor,
    fork_id: i64,
) -> Result<(), Error> {
    let Some(fork) = query::get_item(conn, fork_id).map_err(|e| Error::persist(&e))? else {
        return Err(deny(Ineligibility::MissingItem(fork_id)));
    };

    if !config.forking.is_enabled_for(&fork.item_type) {
        return Err(deny(Ineligibility::TypeNotEnabled(fork.item_type)));
    }

    if !fork.status.is_open_fork() && fork.status != Status::Publish {
        return Err(deny(Ineligibility::StatusNotMergeable(fork.status)));
    }

    if index::source_of(conn, fork.id)
        .map_err(|e| Error::persist(&e))?
        .is_none()
    {
        return Err(deny(Ineligibility::MissingSource(fork.id)));
    }

    if !actor.can_publish(&fork.item_type) {
        return Err(deny(Ineligibility::CannotPublish(fork.item_type)));
    }

    if !actor.can_edit_item(&fork.item_type, fork.id) {
        return Err(deny(Ineligibility::CannotEditItem(fork.id)));
    }

    Ok(())
}

/// Boolean view of [`fork_eligibility`]; store failures read as `false`.
#[must_use]
pub fn can_fork(
    conn: &Connection,
    config: &ProjectConfig,
    actor: &dyn Actor,
    source_id: i64,
) -> bool {
    fork_eligibility(conn, config, actor, source_id).is_ok()
}

/// Boolean view of [`merge_eligibility`]; store failures read as `false`.
#[must_use]
pub fn can_merge(
    conn: &Connection,
    config: &ProjectConfig,
    actor: &dyn Actor,
    fork_id: i64,
) -> bool {
    merge_eligibility(conn, config, actor, fork_id).is_ok()
}

fn deny(reason: Ineligibility) -> Error {
    debug!(%reason, "eligibility denied");
    Error::NotEligible(reason)
}

/// `true` when the item is registered as somebody's open fork.
fn claimed_as_fork(conn: &Connection, item_id: i64) -> anyhow::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM open_forks WHERE fork_id = ?1)",
        [item_id],
        |row| row.get(0),
    )
    .context("check open fork claim")
}

/// The fork id currently claiming this source, if any.
fn claimed_fork_of(conn: &Connection, source_id: i64) -> anyhow::Result<Option<i64>> {
    conn.query_row(
        "SELECT fork_id FROM open_forks WHERE source_id = ?1",
        [source_id],
        |row| row.get(0),
    )
    .map(Some)
    .or_else(|error| match error {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    })
    .context("look up open fork claim")
}
