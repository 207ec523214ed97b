//! Registry metadata for the fork pseudo-statuses.
//!
//! The host system owns the native status vocabulary; this module describes
//! the three statuses the plugin registers next to it, and the save-path
//! filter that keeps a draft fork from being promoted out of draft state by
//! the generic "save as pending" transition.

use super::item::Status;

/// Registration options for one fork status, mirroring how the host system
/// expects custom statuses to be declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusInfo {
    pub status: Status,
    /// Short machine name stored in the items table.
    pub name: &'static str,
    /// Human label for admin screens.
    pub label: &'static str,
    /// Hidden from public status dropdowns.
    pub internal: bool,
    /// Never surfaced by front-end search.
    pub exclude_from_search: bool,
    /// Requires elevated capability to view.
    pub protected: bool,
}

const fn fork_status_info(status: Status, label: &'static str) -> StatusInfo {
    StatusInfo {
        status,
        name: status.as_str(),
        label,
        internal: true,
        exclude_from_search: true,
        protected: true,
    }
}

/// The three statuses this plugin contributes, in registration order.
#[must_use]
pub const fn fork_statuses() -> [StatusInfo; 3] {
    [
        fork_status_info(Status::DraftFork, "Draft Fork"),
        fork_status_info(Status::PendingFork, "Pending Fork"),
        fork_status_info(Status::ArchivedFork, "Archived Fork"),
    ]
}

/// Fork statuses that count as "open" (not yet merged or archived).
#[must_use]
pub const fn open_fork_statuses() -> [Status; 2] {
    [Status::DraftFork, Status::PendingFork]
}

/// Resolve the status to persist when an item is saved.
///
/// The generic save path requests `pending` whenever an editor saves a
/// draft for review. For a draft fork that request must not stick: an
/// intermediate save would silently promote the fork out of draft state,
/// so the current `stg-draft` status is kept instead. Every other
/// combination passes the requested status through unchanged.
#[must_use]
pub const fn resolve_save_status(current: Status, requested: Status) -> Status {
    match (current, requested) {
        (Status::DraftFork, Status::Pending) => Status::DraftFork,
        _ => requested,
    }
}
