//! `stg create` — create a new content item.

use crate::cmd::{ItemView, open_project};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use stage_core::db::{self, mutate, query};
use stage_core::model::{NewItem, Status};
use std::path::Path;
use std::str::FromStr;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Title of the new item.
    #[arg(short, long)]
    pub title: String,

    /// Item type, e.g. post or page.
    #[arg(long = "type", default_value = "post")]
    pub item_type: String,

    /// Initial status (publish, private, draft, pending).
    #[arg(short, long, default_value = "publish")]
    pub status: String,

    /// Body content.
    #[arg(short, long, default_value = "")]
    pub content: String,

    /// Short excerpt.
    #[arg(short, long, default_value = "")]
    pub excerpt: String,
}

pub fn run_create(args: &CreateArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let status = Status::from_str(&args.status)?;
    anyhow::ensure!(
        !status.is_fork(),
        "fork statuses are assigned by `stg fork`, not at creation"
    );

    let project = open_project(project_root)?;
    let item = NewItem {
        item_type: args.item_type.clone(),
        status,
        parent_id: None,
        title: args.title.clone(),
        content: args.content.clone(),
        excerpt: args.excerpt.clone(),
        slug: String::new(),
        guid: String::new(),
    };
    let id = mutate::insert_item(&project.conn, &item, db::now_us())?;
    mutate::assign_identity(&project.conn, id, &args.title)?;

    let created = query::get_item(&project.conn, id)?
        .ok_or_else(|| anyhow::anyhow!("item {id} vanished after insert"))?;
    render(output, &ItemView::from(&created), |view, out| {
        writeln!(out, "Created item {} ({}): {}", view.id, view.status, view.title)
    })
}
