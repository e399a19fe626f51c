use std::path::PathBuf;

use crate::cli::commands::InitArgs;
use crate::io::config_io;

/// Write the template tasknest.toml into `project_dir` (or the cwd).
pub fn cmd_init(
    args: InitArgs,
    project_dir: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = match project_dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    if !dir.is_dir() {
        return Err(format!("not a directory: {}", dir.display()).into());
    }

    // Warn when an enclosing workspace would otherwise have been used
    if let Some(parent) = dir.parent()
        && let Ok(parent_root) = config_io::discover_root(parent)
    {
        eprintln!(
            "Note: enclosing workspace found at {}/",
            parent_root.display()
        );
    }

    let path = config_io::write_template(&dir, args.force)?;
    println!("Wrote {}", path.display());
    Ok(())
}
