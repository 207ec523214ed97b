//! `stg edit` — update a stored item in place.
//!
//! Status changes go through the save-status filter: asking for `pending`
//! on a draft fork keeps the fork in `stg-draft` instead of promoting it.

use crate::cmd::{ItemView, open_project};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use stage_core::db::{self, mutate, query};
use stage_core::model::{ItemPatch, Status, status::resolve_save_status};
use std::path::Path;
use std::str::FromStr;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Item id to edit.
    pub id: i64,

    /// New title.
    #[arg(short, long)]
    pub title: Option<String>,

    /// New body content.
    #[arg(short, long)]
    pub content: Option<String>,

    /// New excerpt.
    #[arg(short, long)]
    pub excerpt: Option<String>,

    /// Requested status.
    #[arg(short, long)]
    pub status: Option<String>,
}

pub fn run_edit(args: &EditArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let project = open_project(project_root)?;
    let item = query::get_item(&project.conn, args.id)?
        .ok_or_else(|| anyhow::anyhow!("item {} does not exist", args.id))?;

    let now = db::now_us();
    let patch = ItemPatch {
        title: args.title.clone(),
        content: args.content.clone(),
        excerpt: args.excerpt.clone(),
    };
    mutate::apply_patch(&project.conn, item.id, &patch, now)?;

    if let Some(requested) = &args.status {
        let requested = Status::from_str(requested)?;
        let resolved = resolve_save_status(item.status, requested);
        if resolved != item.status {
            mutate::set_status(&project.conn, item.id, resolved, now)?;
        }
    }

    let updated = query::get_item(&project.conn, item.id)?
        .ok_or_else(|| anyhow::anyhow!("item {} vanished during edit", item.id))?;
    render(output, &ItemView::from(&updated), |view, out| {
        writeln!(out, "Updated item {} ({}): {}", view.id, view.status, view.title)
    })
}
