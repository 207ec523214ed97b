//! `stg forks` — a source item's fork history.

use crate::cmd::{ItemView, open_project};
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stage_core::index;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ForksArgs {
    /// Source item id.
    pub id: i64,

    /// Only list archived forks.
    #[arg(long)]
    pub archived: bool,

    /// Page number for archived listings, starting at 0.
    #[arg(long, default_value_t = 0)]
    pub page: u32,
}

#[derive(Debug, Serialize)]
struct ForksResult {
    source_id: i64,
    open_fork_id: Option<i64>,
    forks: Vec<ItemView>,
}

pub fn run_forks(args: &ForksArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let project = open_project(project_root)?;

    let open_fork_id = index::open_fork_of(&project.conn, args.id)?.map(|fork| fork.id);
    let forks = if args.archived {
        let page_size = project.config.forking.archived_page_size;
        index::archived_forks_of(&project.conn, args.id, page_size, args.page * page_size)?
    } else {
        index::all_forks_of(&project.conn, args.id, index::DEFAULT_FORK_PAGE_SIZE, 0)?
    };

    let result = ForksResult {
        source_id: args.id,
        open_fork_id,
        forks: forks.iter().map(ItemView::from).collect(),
    };
    render(output, &result, |result, out| {
        if result.forks.is_empty() {
            writeln!(out, "No forks of item {}.", result.source_id)?;
        }
        for fork in &result.forks {
            let marker = if Some(fork.id) == result.open_fork_id {
                " (open)"
            } else {
                ""
            };
            writeln!(
                out,
                "{:>6}  {:<13} {}{marker}",
                fork.id, fork.status, fork.title
            )?;
        }
        Ok(())
    })
}
