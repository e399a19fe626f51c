use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tn", about = concat!("tasknest v", env!("CARGO_PKG_VERSION"), " - nested checkbox tasks across markdown files"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "project-dir", global = true)]
    pub project_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a tasknest.toml template
    Init(InitArgs),
    /// Show documents bucketed by the configured rules
    Groups,
    /// Show a document's task tree
    Tree(TreeArgs),
    /// Move a task and its subtasks
    Mv(MvArgs),
    /// Delete a task and its subtasks
    Rm(RmArgs),
    /// Check off a task (or uncheck with --undo)
    Check(CheckArgs),
    /// Replace a task's text
    Retitle(RetitleArgs),
    /// Print document changes as they happen
    Watch,
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing tasknest.toml
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Document path, relative to the workspace root
    pub path: String,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["child_of", "before", "after", "end"])
))]
pub struct MvArgs {
    /// Task to move (path:line)
    pub task: String,
    /// Make it the first child of this task
    #[arg(long, value_name = "LOCATOR")]
    pub child_of: Option<String>,
    /// Place it just before this task
    #[arg(long, value_name = "LOCATOR")]
    pub before: Option<String>,
    /// Place it just after this task
    #[arg(long, value_name = "LOCATOR")]
    pub after: Option<String>,
    /// Append it to the end of this document
    #[arg(long, value_name = "PATH")]
    pub end: Option<String>,
    /// Depth for --end (default: relocation.append_depth)
    #[arg(long, requires = "end")]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct RmArgs {
    /// Task to delete (path:line)
    pub task: String,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Task to check (path:line)
    pub task: String,
    /// Uncheck instead
    #[arg(long)]
    pub undo: bool,
}

#[derive(Args)]
pub struct RetitleArgs {
    /// Task to retitle (path:line)
    pub task: String,
    /// New task text
    pub text: String,
}
