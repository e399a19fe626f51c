/// Canonical indentation for one depth level
pub const INDENT_UNIT: &str = "  ";

/// A line recognized as a checkbox task: `<indent><bullet> [<mark>] <text>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLine<'a> {
    /// Leading whitespace exactly as written
    pub indent: &'a str,
    /// `-` or `*`
    pub bullet: char,
    /// ` `, `x` or `X`
    pub mark: char,
    /// Payload after the checkbox, verbatim
    pub text: &'a str,
}

impl<'a> TaskLine<'a> {
    pub fn checked(&self) -> bool {
        self.mark != ' '
    }

    pub fn depth(&self) -> usize {
        depth_of_indent(self.indent)
    }

    /// Everything after the indent: `- [ ] text`
    pub fn body(&self, line: &'a str) -> &'a str {
        &line[self.indent.len()..]
    }

    /// Lower-cased, trimmed payload, used for display grouping
    pub fn root_token(&self) -> String {
        self.text.trim().to_lowercase()
    }
}

/// Classify a line. Returns `None` for anything that is not a task line.
pub fn classify(line: &str) -> Option<TaskLine<'_>> {
    let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
    let (indent, rest) = line.split_at(indent_len);

    let mut chars = rest.chars();
    let bullet = chars.next().filter(|&c| matches!(c, '-' | '*'))?;
    let rest = chars.as_str().strip_prefix(" [")?;

    let mut chars = rest.chars();
    let mark = chars.next().filter(|&c| matches!(c, ' ' | 'x' | 'X'))?;
    let text = chars.as_str().strip_prefix("] ")?;
    if text.is_empty() {
        return None;
    }

    Some(TaskLine {
        indent,
        bullet,
        mark,
        text,
    })
}

pub fn is_task_line(line: &str) -> bool {
    classify(line).is_some()
}

/// Indentation depth of a line (1-based). Lines that are not tasks are depth 1.
pub fn indent_depth(line: &str) -> usize {
    classify(line).map_or(1, |t| t.depth())
}

/// One level per tab, one level per pair of spaces, plus one.
fn depth_of_indent(indent: &str) -> usize {
    let tabs = indent.chars().filter(|&c| c == '\t').count();
    let spaces = indent.chars().filter(|&c| c == ' ').count();
    tabs + spaces / 2 + 1
}

/// Re-emit a task line at `depth` with canonical space indentation. The
/// bullet, checkbox and payload are kept byte-for-byte. Lines already at the
/// requested depth and non-task lines come back unchanged.
pub fn with_depth(line: &str, depth: usize) -> String {
    match classify(line) {
        Some(task) if task.depth() != depth => {
            let depth = depth.max(1);
            format!("{}{}", INDENT_UNIT.repeat(depth - 1), task.body(line))
        }
        _ => line.to_string(),
    }
}

/// Rewrite only the checkbox mark. A checked `X` stays `X` when set checked.
pub fn with_checked(line: &str, checked: bool) -> Option<String> {
    let task = classify(line)?;
    let mark = match (checked, task.mark) {
        (true, 'X') => 'X',
        (true, _) => 'x',
        (false, _) => ' ',
    };
    Some(format!("{}{} [{}] {}", task.indent, task.bullet, mark, task.text))
}

/// Replace the payload, keeping indent, bullet and checkbox.
pub fn with_text(line: &str, text: &str) -> Option<String> {
    let task = classify(line)?;
    Some(format!("{}{} [{}] {}", task.indent, task.bullet, task.mark, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_plain_task() {
        let task = classify("- [ ] Buy milk").unwrap();
        assert_eq!(task.indent, "");
        assert_eq!(task.bullet, '-');
        assert!(!task.checked());
        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.depth(), 1);
    }

    #[test]
    fn test_classify_marks_and_bullets() {
        assert!(classify("* [x] done").unwrap().checked());
        assert!(classify("- [X] done").unwrap().checked());
        assert_eq!(classify("* [ ] star").unwrap().bullet, '*');
    }

    #[test]
    fn test_classify_rejects_non_tasks() {
        for line in [
            "",
            "plain prose",
            "- not a task",
            "- [ ]",
            "- [ ] ",
            "- [>] other state",
            "-[ ] no space",
            "+ [ ] wrong bullet",
            "- [ ]no space after",
            "## - [ ] heading",
        ] {
            assert!(classify(line).is_none(), "should not classify {:?}", line);
        }
    }

    #[test]
    fn test_payload_kept_verbatim() {
        let task = classify("  - [ ]   spaced out  ").unwrap();
        assert_eq!(task.text, "  spaced out  ");
        assert_eq!(task.root_token(), "spaced out");
        assert_eq!(classify("- [ ] Buy MILK").unwrap().root_token(), "buy milk");
    }

    #[test]
    fn test_indent_depth() {
        assert_eq!(indent_depth("- [ ] a"), 1);
        assert_eq!(indent_depth(" - [ ] a"), 1);
        assert_eq!(indent_depth("  - [ ] a"), 2);
        assert_eq!(indent_depth("   - [ ] a"), 2);
        assert_eq!(indent_depth("    - [ ] a"), 3);
        assert_eq!(indent_depth("\t- [ ] a"), 2);
        assert_eq!(indent_depth("\t\t- [ ] a"), 3);
        assert_eq!(indent_depth("\t  - [ ] a"), 3);
        // Non-task lines default to 1 regardless of indentation
        assert_eq!(indent_depth("      prose"), 1);
    }

    #[test]
    fn test_with_depth_normalizes_indent() {
        assert_eq!(with_depth("- [ ] a", 3), "    - [ ] a");
        assert_eq!(with_depth("\t\t* [x] b", 1), "* [x] b");
        assert_eq!(with_depth("  - [ ] c", 0), "- [ ] c");
    }

    #[test]
    fn test_with_depth_same_depth_is_identity() {
        for line in ["\t- [ ] tabbed", "   - [x] odd spaces", "- [ ] flat"] {
            let depth = indent_depth(line);
            assert_eq!(with_depth(line, depth), line);
        }
        assert_eq!(with_depth("some prose", 4), "some prose");
    }

    #[test]
    fn test_with_checked() {
        assert_eq!(with_checked("  - [ ] a", true).unwrap(), "  - [x] a");
        assert_eq!(with_checked("* [X] a", true).unwrap(), "* [X] a");
        assert_eq!(with_checked("\t- [X] a", false).unwrap(), "\t- [ ] a");
        assert!(with_checked("prose", true).is_none());
    }

    #[test]
    fn test_with_text() {
        assert_eq!(with_text("  * [x] old", "new").unwrap(), "  * [x] new");
        assert!(with_text("- nope", "new").is_none());
    }
}
