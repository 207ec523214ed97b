//! One module per `stg` subcommand.

pub mod create;
pub mod edit;
pub mod fork;
pub mod forks;
pub mod init;
pub mod list;
pub mod merge;
pub mod show;
pub mod trash;

use anyhow::{Context as _, Result};
use rusqlite::Connection;
use serde::Serialize;
use stage_core::config::{self, ProjectConfig};
use stage_core::db;
use stage_core::model::Item;
use std::path::{Path, PathBuf};

/// An opened stage project: resolved root, loaded config, live store.
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub conn: Connection,
}

/// Locate and open the project containing `start`.
///
/// # Errors
///
/// Returns an error when no `.stage/` directory is found walking up from
/// `start`, or when the config or store cannot be opened.
pub fn open_project(start: &Path) -> Result<Project> {
    let root = config::find_project_root(start)
        .context("Not a stage project (no .stage/ found). Run `stg init` first.")?;
    let config = config::load_project_config(&root)?;
    let conn = db::open_store(&config::store_path(&root))?;
    Ok(Project { root, config, conn })
}

/// Item fields shared by the JSON output of several commands.
#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: i64,
    #[serde(rename = "type")]
    pub item_type: String,
    pub status: String,
    pub parent_id: Option<i64>,
    pub title: String,
    pub slug: String,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            item_type: item.item_type.clone(),
            status: item.status.to_string(),
            parent_id: item.parent_id,
            title: item.title.clone(),
            slug: item.slug.clone(),
        }
    }
}
