use crate::output::{OutputMode, render_message};
use anyhow::Result;
use clap::Args;
use stage_core::config::{self, ProjectConfig};
use stage_core::db;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force re-initialization even if `.stage/` already exists.
    #[arg(long)]
    pub force: bool,
}

/// Execute `stg init`. Creates the project skeleton:
///
/// ```text
/// .stage/
///   stage.sqlite3    (migrated store)
///   config.toml      (default project config)
/// ```
///
/// # Errors
///
/// Returns an error if `.stage/` already exists and `--force` is not set,
/// or if any filesystem or store operation fails.
pub fn run_init(args: &InitArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let stage_dir = config::stage_dir(project_root);
    if stage_dir.exists() && !args.force {
        anyhow::bail!(".stage/ already exists. Use `stg init --force` to reinitialize.");
    }

    config::write_project_config(project_root, &ProjectConfig::default())?;
    db::open_store(&config::store_path(project_root))?;

    render_message(
        output,
        &format!("Initialized stage project in {}", stage_dir.display()),
    )
}
