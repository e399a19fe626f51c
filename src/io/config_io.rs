use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::NestConfig;

pub const CONFIG_FILE: &str = "tasknest.toml";

/// Template written by `tn init`
pub const CONFIG_TEMPLATE: &str = r#"# tasknest configuration

[documents]
# File extensions treated as task documents
extensions = ["md"]
# Directory names skipped while listing documents
exclude = [".git", "node_modules"]

# Grouping rules. A document matching any rule is shown; rules with a group
# name sort it into that group. Leave every `group` empty for a flat list.
[[rules]]
group = ""
pattern = "."

[relocation]
# Depth given to tasks moved to the end of a document
append_depth = 1
"#;

/// Error type for configuration I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no tasknest.toml found in this directory or any parent")]
    NotFound,
    #[error("tasknest.toml already exists at {0} (use --force to overwrite)")]
    AlreadyExists(PathBuf),
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse tasknest.toml: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Walk up from `start` looking for a directory containing tasknest.toml.
pub fn discover_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotFound);
        }
    }
}

pub fn load_config(root: &Path) -> Result<NestConfig, ConfigError> {
    let path = root.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    parse_config(&text)
}

pub fn parse_config(text: &str) -> Result<NestConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Write the template config into `root`. Returns the config path.
pub fn write_template(root: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    let path = root.join(CONFIG_FILE);
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path));
    }
    fs::write(&path, CONFIG_TEMPLATE).map_err(|e| ConfigError::WriteError {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}
