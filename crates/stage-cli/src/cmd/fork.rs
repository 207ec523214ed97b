//! `stg fork` — open a draft fork of a published item.

use crate::cmd::open_project;
use crate::output::{OutputMode, fail, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stage_core::eligibility::StaticActor;
use stage_core::hooks::Hooks;
use stage_core::model::ItemPatch;
use stage_core::Forker;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ForkArgs {
    /// Source item id to fork.
    pub id: i64,

    /// Unsaved title to carry onto the fork.
    #[arg(short, long)]
    pub title: Option<String>,

    /// Unsaved content to carry onto the fork.
    #[arg(short, long)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ForkResult {
    fork_id: i64,
    source_id: i64,
    message: String,
}

pub fn run_fork(args: &ForkArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let mut project = open_project(project_root)?;
    let hooks = Hooks::new();
    let actor = StaticActor::allow_all();

    let patch = ItemPatch {
        title: args.title.clone(),
        content: args.content.clone(),
        excerpt: None,
    };
    let edits = if patch.is_empty() { None } else { Some(&patch) };

    let mut forker = Forker::new(&mut project.conn, &project.config, &hooks);
    match forker.fork(args.id, &actor, edits) {
        Ok(fork_id) => {
            let result = ForkResult {
                fork_id,
                source_id: args.id,
                message: format!("Forked item {} into fork {fork_id}", args.id),
            };
            render(output, &result, |result, out| {
                writeln!(out, "{}", result.message)
            })
        }
        Err(error) => fail(output, &error),
    }
}
