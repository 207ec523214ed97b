//! `stg trash` / `stg untrash` — trash an item and cascade over its forks.

use crate::cmd::open_project;
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stage_core::trash;
use std::path::Path;

#[derive(Args, Debug)]
pub struct TrashArgs {
    /// Item id to trash.
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct UntrashArgs {
    /// Item id to restore from trash.
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct TrashResult {
    item_id: i64,
    forks_trashed: u32,
    message: String,
}

pub fn run_trash(args: &TrashArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let project = open_project(project_root)?;
    let forks_trashed = trash::trash_with_cascade(&project.conn, &project.config, args.id)?;

    let result = TrashResult {
        item_id: args.id,
        forks_trashed,
        message: format!(
            "Trashed item {} and {forks_trashed} of its forks",
            args.id
        ),
    };
    render(output, &result, |result, out| {
        writeln!(out, "{}", result.message)
    })
}

pub fn run_untrash(args: &UntrashArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let project = open_project(project_root)?;
    trash::untrash_item(&project.conn, &project.config, args.id)?;

    let result = TrashResult {
        item_id: args.id,
        forks_trashed: 0,
        message: format!(
            "Restored item {} to draft; trashed forks stay in trash",
            args.id
        ),
    };
    render(output, &result, |result, out| {
        writeln!(out, "{}", result.message)
    })
}
