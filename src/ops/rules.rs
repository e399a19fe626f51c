use regex::Regex;

use crate::model::config::RuleConfig;

/// A rule whose pattern compiled successfully
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Empty for rules that only contribute to the flat view
    pub group: String,
    pub pattern: Regex,
}

impl CompiledRule {
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    pub fn is_named(&self) -> bool {
        !self.group.is_empty()
    }
}

/// Compile raw rules. A rule with an invalid pattern is dropped; it never
/// affects the others.
pub fn compile_rules(raw: &[RuleConfig]) -> Vec<CompiledRule> {
    raw.iter()
        .filter_map(|rule| match Regex::new(&rule.pattern) {
            Ok(pattern) => Some(CompiledRule {
                group: rule.group.trim().to_string(),
                pattern,
            }),
            Err(e) => {
                tracing::debug!(pattern = %rule.pattern, error = %e, "dropping invalid rule");
                None
            }
        })
        .collect()
}
