//! Indentation detection and normalization
//!
//! Covers the three questions the sequencer asks before typing content into
//! an existing document:
//! - what indentation a given line carries ([`indent_of`])
//! - what indent freshly inserted content should land at ([`target_indent`])
//! - where a block opened on some line actually ends ([`block_end`])
//!
//! plus [`normalize`], which lets blueprints author content at arbitrary or
//! zero indentation and still have it land correctly nested.

use serde::{Deserialize, Serialize};

/// The character family a line is indented with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentUnit {
    Spaces,
    Tabs,
}

/// Indentation of a single line. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentInfo {
    pub unit: IndentUnit,
    /// Number of leading whitespace characters
    pub count: usize,
    /// The leading whitespace itself, verbatim
    pub text: String,
}

/// The host's configured indentation style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndentStyle {
    pub use_spaces: bool,
    pub width: usize,
}

impl Default for IndentStyle {
    fn default() -> Self {
        Self {
            use_spaces: true,
            width: 4,
        }
    }
}

impl IndentStyle {
    /// One level of indentation in this style.
    #[must_use]
    pub fn unit(&self) -> String {
        if self.use_spaces {
            " ".repeat(self.width)
        } else {
            "\t".to_string()
        }
    }
}

/// Indentation of `line`.
#[must_use]
pub fn indent_of(line: &str) -> IndentInfo {
    let text: String = line
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect();
    let unit = if text.starts_with('\t') {
        IndentUnit::Tabs
    } else {
        IndentUnit::Spaces
    };
    IndentInfo {
        unit,
        count: text.len(),
        text,
    }
}

/// Whether `line` opens a nested block (colon- or brace-terminated).
#[must_use]
pub fn is_block_opener(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.ends_with(':') || trimmed.ends_with('{')
}

/// Indent for content inserted at `line`.
///
/// A block opener targets one level deeper than itself. Any other line
/// targets the sibling level: the indent of the first preceding non-blank
/// line with strictly smaller indentation, verbatim, or empty at top level.
#[must_use]
pub fn target_indent(lines: &[&str], line: usize, style: &IndentStyle) -> String {
    let Some(current) = lines.get(line) else {
        return String::new();
    };
    let info = indent_of(current);

    if is_block_opener(current) {
        return format!("{}{}", info.text, style.unit());
    }

    for prev in lines[..line].iter().rev() {
        if prev.trim().is_empty() {
            continue;
        }
        let prev_info = indent_of(prev);
        if prev_info.count < info.count {
            return prev_info.text;
        }
    }
    String::new()
}

/// Line index where content inserted "after" the block opened at `opener`
/// lands.
///
/// Colon blocks: the first following non-blank line indented at or below the
/// opener, or end of file, so insertion lands after the entire nested body.
/// Brace blocks: the line containing the balancing closing brace.
#[must_use]
pub fn block_end(lines: &[&str], opener: usize) -> usize {
    let Some(opener_line) = lines.get(opener) else {
        return lines.len();
    };

    if opener_line.trim_end().ends_with('{') {
        let mut balance: i64 = 0;
        for (i, line) in lines.iter().enumerate().skip(opener) {
            for c in line.chars() {
                match c {
                    '{' => balance += 1,
                    '}' => balance -= 1,
                    _ => {}
                }
            }
            if balance <= 0 {
                return i;
            }
        }
        return lines.len();
    }

    let opener_indent = indent_of(opener_line).count;
    for (i, line) in lines.iter().enumerate().skip(opener + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line).count <= opener_indent {
            return i;
        }
    }
    lines.len()
}

/// Re-indent authored content so it lands at `target`.
///
/// Strips the minimal common leading whitespace of the non-blank lines, then
/// prefixes every line with `target` plus its indentation relative to that
/// minimum, translating tabs in the relative part to the host's unit. Blank
/// lines stay empty. Idempotent for already-normalized input.
#[must_use]
pub fn normalize(content: &str, target: &str, style: &IndentStyle) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let min = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l).count)
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in &lines {
        if line.trim().is_empty() {
            out.push(String::new());
            continue;
        }
        let info = indent_of(line);
        let relative: String = info.text[min..]
            .chars()
            .map(|c| {
                if c == '\t' {
                    style.unit()
                } else {
                    c.to_string()
                }
            })
            .collect();
        out.push(format!("{target}{relative}{}", &line[info.count..]));
    }

    let mut result = out.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    result
}
