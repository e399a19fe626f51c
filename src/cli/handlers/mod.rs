mod init;
mod watch;
pub use init::cmd_init;
pub use watch::cmd_watch;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::store::DocumentStore;
use crate::io::workspace::{Workspace, WorkspaceError};
use crate::model::node::TaskNode;
use crate::ops::edit;
use crate::ops::locate::parse_locator;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let project_dir = cli.project_dir.as_deref();

    match cli.command {
        // Init runs before any workspace exists
        Commands::Init(args) => cmd_init(args, project_dir),

        // Read commands
        Commands::Groups => cmd_groups(&open_workspace(project_dir)?, json),
        Commands::Tree(args) => cmd_tree(&open_workspace(project_dir)?, args, json),
        Commands::Watch => cmd_watch(&open_workspace(project_dir)?, json),

        // Write commands
        Commands::Mv(args) => cmd_mv(&open_workspace(project_dir)?, args, json),
        Commands::Rm(args) => cmd_rm(&open_workspace(project_dir)?, args, json),
        Commands::Check(args) => cmd_check(&open_workspace(project_dir)?, args, json),
        Commands::Retitle(args) => cmd_retitle(&open_workspace(project_dir)?, args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_workspace(project_dir: Option<&str>) -> Result<Workspace, Box<dyn std::error::Error>> {
    let start = match project_dir {
        Some(dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?,
        None => std::env::current_dir()?,
    };
    Ok(Workspace::open(&start)?)
}

/// Resolve a `path:line` argument to the task currently on that line.
fn resolve(ws: &Workspace, locator: &str) -> Result<TaskNode, WorkspaceError> {
    let locator = parse_locator(locator)?;
    ws.locate(&locator)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_groups(ws: &Workspace, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let grouping = ws.scan()?;
    if json {
        return print_json(&grouping_to_json(&grouping));
    }
    for line in format_grouping(&grouping) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_tree(ws: &Workspace, args: TreeArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let meta = ws.store().metadata(&args.path)?;
    let document = ws.cache().get_or_parse(ws.store(), &meta)?;
    if json {
        return print_json(&tree_to_json(&document, Some(meta.modified)));
    }
    let lines = format_tree(&document);
    if lines.is_empty() {
        println!("(no tasks in {})", args.path);
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_mv(ws: &Workspace, args: MvArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = resolve(ws, &args.task)?;
    let relocator = ws.relocator();

    let relocation = if let Some(ref parent) = args.child_of {
        let parent = resolve(ws, parent)?;
        relocator.move_as_first_child(&source, &parent)?
    } else if let Some(ref anchor) = args.before {
        let anchor = resolve(ws, anchor)?;
        relocator.move_as_sibling(&source, &anchor, false)?
    } else if let Some(ref anchor) = args.after {
        let anchor = resolve(ws, anchor)?;
        relocator.move_as_sibling(&source, &anchor, true)?
    } else if let Some(ref path) = args.end {
        let depth = args.depth.unwrap_or(ws.config().relocation.append_depth);
        relocator.move_to_end(&source, path, depth)?
    } else {
        return Err("one of --child-of, --before, --after or --end is required".into());
    };

    if json {
        return print_json(&relocation_to_json(&relocation));
    }
    println!("{}", format_relocation(&relocation));
    Ok(())
}

fn cmd_rm(ws: &Workspace, args: RmArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let node = resolve(ws, &args.task)?;
    let deletion = ws.relocator().delete_subtree(&node)?;
    if json {
        return print_json(&deletion_to_json(&deletion));
    }
    println!("{}", format_deletion(&deletion));
    Ok(())
}

fn cmd_check(ws: &Workspace, args: CheckArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let node = resolve(ws, &args.task)?;
    let raw = edit::set_checked(ws.store(), ws.cache(), ws.squelch(), &node, !args.undo)?;
    print_line(&node, raw, json)
}

fn cmd_retitle(
    ws: &Workspace,
    args: RetitleArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let node = resolve(ws, &args.task)?;
    let raw = edit::set_text(ws.store(), ws.cache(), ws.squelch(), &node, &args.text)?;
    print_line(&node, raw, json)
}

fn print_line(node: &TaskNode, raw: String, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        return print_json(&LineJson {
            path: node.document_path.clone(),
            line: node.line_index + 1,
            raw,
        });
    }
    println!("{}:{}  {}", node.document_path, node.line_index + 1, raw.trim_start());
    Ok(())
}
