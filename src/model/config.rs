use serde::{Deserialize, Serialize};

/// Configuration from tasknest.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NestConfig {
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub relocation: RelocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// File extensions treated as documents (without the dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Directory names skipped while listing
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        DocumentsConfig {
            extensions: default_extensions(),
            exclude: default_exclude(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![".git".to_string(), "node_modules".to_string()]
}

/// A raw grouping rule. An empty group name puts the rule in flat mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub group: String,
    pub pattern: String,
}

impl RuleConfig {
    pub fn new(group: impl Into<String>, pattern: impl Into<String>) -> Self {
        RuleConfig {
            group: group.into(),
            pattern: pattern.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocationConfig {
    /// Depth used when moving a task to the end of a document
    #[serde(default = "default_append_depth")]
    pub append_depth: usize,
}

impl Default for RelocationConfig {
    fn default() -> Self {
        RelocationConfig {
            append_depth: default_append_depth(),
        }
    }
}

fn default_append_depth() -> usize {
    1
}
