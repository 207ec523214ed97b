#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "stage: fork, edit, and merge published content safely",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Initialize a stage project",
        long_about = "Initialize a stage project in the current directory.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    stg init\n\n    # Emit machine-readable output\n    stg init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Create a content item",
        after_help = "EXAMPLES:\n    # Publish a post\n    stg create --title \"Launch announcement\" --content \"...\"\n\n    # Create an unpublished draft page\n    stg create --title \"About\" --type page --status draft"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Edit a stored item",
        after_help = "EXAMPLES:\n    # Retitle an item\n    stg edit 42 --title \"New title\"\n\n    # Submit a fork for review\n    stg edit 100 --status stg-pending"
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Forking",
        about = "Open a draft fork of a published item",
        after_help = "EXAMPLES:\n    # Fork item 42\n    stg fork 42\n\n    # Fork and carry an unsaved title\n    stg fork 42 --title \"Work in progress\""
    )]
    Fork(cmd::fork::ForkArgs),

    #[command(
        next_help_heading = "Forking",
        about = "Merge an open fork back over its source",
        after_help = "EXAMPLES:\n    # Merge fork 100 into its source\n    stg merge 100\n\n    # Emit machine-readable output\n    stg merge 100 --json"
    )]
    Merge(cmd::merge::MergeArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one item",
        after_help = "EXAMPLES:\n    # Show an item with its fields and terms\n    stg show 42"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "List items",
        after_help = "EXAMPLES:\n    # List recent items\n    stg list\n\n    # Only open draft forks\n    stg list --status stg-draft"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "List a source item's forks",
        after_help = "EXAMPLES:\n    # Full fork history of item 42\n    stg forks 42\n\n    # Archived snapshots only, second page\n    stg forks 42 --archived --page 1"
    )]
    Forks(cmd::forks::ForksArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Trash an item and its forks",
        after_help = "EXAMPLES:\n    # Trash item 42 and every fork pointing at it\n    stg trash 42"
    )]
    Trash(cmd::trash::TrashArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Restore a trashed item (its forks stay trashed)",
        after_help = "EXAMPLES:\n    # Restore item 42 to draft\n    stg untrash 42"
    )]
    Untrash(cmd::trash::UntrashArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STAGE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "stage_core=debug,stage_cli=debug,info"
        } else {
            "stage_core=info,stage_cli=info,warn"
        })
    });

    let format = env::var("STAGE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = std::env::current_dir()?;
    let output = cli.output_mode();

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, &project_root, output),
        Commands::Create(ref args) => cmd::create::run_create(args, &project_root, output),
        Commands::Edit(ref args) => cmd::edit::run_edit(args, &project_root, output),
        Commands::Fork(ref args) => cmd::fork::run_fork(args, &project_root, output),
        Commands::Merge(ref args) => cmd::merge::run_merge(args, &project_root, output),
        Commands::Show(ref args) => cmd::show::run_show(args, &project_root, output),
        Commands::List(ref args) => cmd::list::run_list(args, &project_root, output),
        Commands::Forks(ref args) => cmd::forks::run_forks(args, &project_root, output),
        Commands::Trash(ref args) => cmd::trash::run_trash(args, &project_root, output),
        Commands::Untrash(ref args) => cmd::trash::run_untrash(args, &project_root, output),
    }
}
