//! stage-core library.
//!
//! Fork and merge lifecycle for content items backed by a SQLite store:
//! publish an item, fork it into a draft copy, edit the copy, and merge it
//! back over the source while the fork is archived as a snapshot.
//!
//! # Conventions
//!
//! - **Errors**: db helpers return `anyhow::Result` with `.context(...)`;
//!   the `fork`/`merge` boundary returns the typed [`error::Error`].
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod forker;
pub mod hooks;
pub mod index;
pub mod merger;
pub mod model;
pub mod trash;

pub use config::ProjectConfig;
pub use eligibility::{Actor, Ineligibility, StaticActor};
pub use error::Error;
pub use forker::Forker;
pub use hooks::{Hooks, Observer};
pub use merger::Merger;
pub use model::{Item, ItemPatch, NewItem, Status};
