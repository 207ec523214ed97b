//! `stg show` — full details for one item.

use crate::cmd::open_project;
use crate::output::{OutputMode, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stage_core::db::query;
use stage_core::index;
use stage_core::model::Item;
use std::path::Path;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Item id to show.
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct ShowResult {
    #[serde(flatten)]
    item: Item,
    origin_id: Option<i64>,
    fields: Vec<(String, String)>,
    terms: Vec<(String, String)>,
}

pub fn run_show(args: &ShowArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let project = open_project(project_root)?;
    let item = query::get_item(&project.conn, args.id)?
        .ok_or_else(|| anyhow::anyhow!("item {} does not exist", args.id))?;

    let origin_id = index::origin_of(&project.conn, item.id)?;
    let fields = query::get_fields(&project.conn, item.id)?
        .into_iter()
        .map(|f| (f.key, f.value))
        .collect();
    let terms = query::get_terms(&project.conn, item.id)?
        .into_iter()
        .map(|t| (t.taxonomy, t.term))
        .collect();

    let result = ShowResult {
        item,
        origin_id,
        fields,
        terms,
    };
    render(output, &result, |result, out| {
        let item = &result.item;
        writeln!(out, "Item {}: {}", item.id, item.title)?;
        writeln!(out, "  type:    {}", item.item_type)?;
        writeln!(out, "  status:  {}", item.status)?;
        writeln!(out, "  slug:    {}", item.slug)?;
        if let Some(parent) = item.parent_id {
            writeln!(out, "  parent:  {parent}")?;
        }
        if let Some(origin) = result.origin_id {
            writeln!(out, "  origin:  {origin}")?;
        }
        if !item.content.is_empty() {
            writeln!(out, "  content: {}", item.content)?;
        }
        for (key, value) in &result.fields {
            writeln!(out, "  field:   {key} = {value}")?;
        }
        for (taxonomy, term) in &result.terms {
            writeln!(out, "  term:    {taxonomy}:{term}")?;
        }
        Ok(())
    })
}
