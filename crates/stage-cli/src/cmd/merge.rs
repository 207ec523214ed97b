//! `stg merge` — merge an open fork back over its source.

use crate::cmd::open_project;
use crate::output::{OutputMode, fail, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stage_core::eligibility::StaticActor;
use stage_core::hooks::Hooks;
use stage_core::model::ItemPatch;
use stage_core::Merger;
use std::path::Path;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Fork item id to merge.
    pub id: i64,

    /// Unsaved title to persist to the fork before the merge.
    #[arg(short, long)]
    pub title: Option<String>,

    /// Unsaved content to persist to the fork before the merge.
    #[arg(short, long)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
struct MergeResult {
    source_id: i64,
    fork_id: i64,
    message: String,
}

pub fn run_merge(args: &MergeArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let mut project = open_project(project_root)?;
    let hooks = Hooks::new();
    let actor = StaticActor::allow_all();

    let patch = ItemPatch {
        title: args.title.clone(),
        content: args.content.clone(),
        excerpt: None,
    };
    let edits = if patch.is_empty() { None } else { Some(&patch) };

    let mut merger = Merger::new(&mut project.conn, &project.config, &hooks);
    match merger.merge(args.id, &actor, edits) {
        Ok(source_id) => {
            let result = MergeResult {
                source_id,
                fork_id: args.id,
                message: format!("Merged fork {} into item {source_id}", args.id),
            };
            render(output, &result, |result, out| {
                writeln!(out, "{}", result.message)
            })
        }
        Err(error) => fail(output, &error),
    }
}
