//! `stg list` — list items, optionally filtered by status.

use crate::cmd::{ItemView, open_project};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use stage_core::db::query;
use stage_core::model::Status;
use std::path::Path;
use std::str::FromStr;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only list items with this status.
    #[arg(short, long)]
    pub status: Option<String>,

    /// Maximum number of items to list.
    #[arg(short, long, default_value_t = 20)]
    pub limit: u32,
}

pub fn run_list(args: &ListArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let status = args
        .status
        .as_deref()
        .map(Status::from_str)
        .transpose()?;

    let project = open_project(project_root)?;
    let items = query::list_items(&project.conn, status, args.limit)?;
    let views: Vec<ItemView> = items.iter().map(ItemView::from).collect();

    render(output, &views, |views, out| {
        if views.is_empty() {
            writeln!(out, "No items.")?;
        }
        for view in views {
            writeln!(
                out,
                "{:>6}  {:<13} {}",
                view.id, view.status, view.title
            )?;
        }
        Ok(())
    })
}
