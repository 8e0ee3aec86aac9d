//! Python source segmentation
//!
//! A tree-sitter pass over one Python file that yields the units a demo
//! narrates: grouped imports, functions and classes (class header split from
//! its methods), assignments, and any remaining statements. Docstrings are
//! captured separately and stripped from the typed code; standalone comment
//! runs directly above a node become `comment_above`, trailing `#` comments
//! become inline comments with the code they annotate.

use std::collections::BTreeMap;
use tree_sitter::{Node, Parser};

/// What a segment is, which decides how the builder narrates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Imports,
    Function,
    Class,
    Variable,
    Expression,
    Code,
}

/// A trailing `#` comment and the code it sits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineComment {
    /// 1-indexed source line
    pub line: usize,
    pub text: String,
    /// The code part of the line, comment stripped
    pub code: String,
}

/// One narratable unit of the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Source text, docstring removed for functions and classes
    pub code: String,
    /// 1-indexed, inclusive
    pub start_line: usize,
    pub end_line: usize,
    pub docstring: Option<String>,
    /// Standalone comment run directly above, joined with spaces
    pub comment_above: Option<String>,
    pub inline_comments: Vec<InlineComment>,
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("failed to load the python grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("failed to parse the source file")]
    Parse,
}

struct CommentTok {
    text: String,
    inline: bool,
}

/// Comment index plus line-addressed access to the source.
struct Analyzer<'s> {
    source: &'s str,
    lines: Vec<&'s str>,
    comments: BTreeMap<usize, CommentTok>,
}

/// Slice a Python source file into segments, sorted by start line.
///
/// # Errors
/// [`GenError`] when the grammar fails to load or the file cannot be parsed
/// at all; files with localized syntax errors still produce segments for the
/// parts tree-sitter recovers.
pub fn parse_source(source: &str) -> Result<Vec<Segment>, GenError> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
    let tree = parser.parse(source, None).ok_or(GenError::Parse)?;
    let root = tree.root_node();

    let mut analyzer = Analyzer {
        source,
        lines: source.split('\n').collect(),
        comments: BTreeMap::new(),
    };
    analyzer.collect_comments(root);

    let mut imports: Vec<Node<'_>> = Vec::new();
    let mut others: Vec<Node<'_>> = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "comment" => {}
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                imports.push(child);
            }
            _ => others.push(child),
        }
    }

    let mut segments = Vec::new();
    for (start, end) in analyzer.group_imports(&imports) {
        segments.push(Segment {
            kind: SegmentKind::Imports,
            code: analyzer.text_range(start, end),
            start_line: start,
            end_line: end,
            docstring: None,
            comment_above: analyzer.comment_above(start),
            inline_comments: analyzer.inline_in_range(start, end),
            name: None,
        });
    }
    for node in others {
        analyzer.segment_for(node, &mut segments, true);
    }

    segments.sort_by_key(|s| s.start_line);
    Ok(segments)
}

impl Analyzer<'_> {
    fn collect_comments(&mut self, node: Node<'_>) {
        if node.kind() == "comment" {
            let row = node.start_position().row;
            let col = node.start_position().column;
            let text = node
                .utf8_text(self.source.as_bytes())
                .unwrap_or_default()
                .trim_start_matches('#')
                .trim()
                .to_string();
            let inline = self
                .lines
                .get(row)
                .and_then(|l| l.get(..col))
                .is_some_and(|before| !before.trim().is_empty());
            self.comments.insert(row + 1, CommentTok { text, inline });
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        for child in children {
            self.collect_comments(child);
        }
    }

    /// Consecutive standalone comments directly above `line`, joined with
    /// spaces. A blank line or code ends the run.
    fn comment_above(&self, line: usize) -> Option<String> {
        let mut collected: Vec<&str> = Vec::new();
        let mut check = line.checked_sub(1)?;
        while check >= 1 {
            match self.comments.get(&check) {
                Some(c) if !c.inline => {
                    collected.push(&c.text);
                    check -= 1;
                }
                _ => break,
            }
        }
        if collected.is_empty() {
            None
        } else {
            collected.reverse();
            Some(collected.join(" "))
        }
    }

    fn inline_in_range(&self, start: usize, end: usize) -> Vec<InlineComment> {
        self.comments
            .range(start..=end)
            .filter(|(_, c)| c.inline)
            .map(|(line, c)| {
                let code = self
                    .lines
                    .get(line - 1)
                    .and_then(|l| l.split('#').next())
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                InlineComment {
                    line: *line,
                    text: c.text.clone(),
                    code,
                }
            })
            .collect()
    }

    /// Source text for an inclusive 1-indexed line range.
    fn text_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.lines.len());
        if start > end {
            return String::new();
        }
        self.lines[start - 1..end].join("\n")
    }

    /// Same as [`text_range`](Self::text_range) minus the given line span.
    fn text_range_without(
        &self,
        start: usize,
        end: usize,
        skip: (usize, usize),
    ) -> String {
        let end = end.min(self.lines.len());
        let mut out: Vec<&str> = Vec::new();
        for line_no in start..=end {
            if line_no >= skip.0 && line_no <= skip.1 {
                continue;
            }
            out.push(self.lines[line_no - 1]);
        }
        out.join("\n")
    }

    /// Merge imports separated only by blank or comment lines into groups.
    fn group_imports(&self, imports: &[Node<'_>]) -> Vec<(usize, usize)> {
        let mut groups: Vec<(usize, usize)> = Vec::new();
        for node in imports {
            let start = node.start_position().row + 1;
            let end = node.end_position().row + 1;
            match groups.last_mut() {
                Some((_, prev_end)) if self.gap_is_soft(*prev_end, start) => *prev_end = end,
                _ => groups.push((start, end)),
            }
        }
        groups
    }

    fn gap_is_soft(&self, prev_end: usize, next_start: usize) -> bool {
        self.lines[prev_end..next_start.saturating_sub(1)]
            .iter()
            .all(|l| {
                let t = l.trim();
                t.is_empty() || t.starts_with('#')
            })
    }

    fn segment_for(&self, node: Node<'_>, segments: &mut Vec<Segment>, top_level: bool) {
        match node.kind() {
            "decorated_definition" => {
                if let Some(inner) = node.child_by_field_name("definition") {
                    match inner.kind() {
                        "function_definition" => {
                            segments.push(self.function_segment(node, inner));
                        }
                        "class_definition" if top_level => {
                            self.class_segments(node, inner, segments);
                        }
                        _ => segments.push(self.plain_segment(node, SegmentKind::Code, None)),
                    }
                } else {
                    segments.push(self.plain_segment(node, SegmentKind::Code, None));
                }
            }
            "function_definition" => segments.push(self.function_segment(node, node)),
            "class_definition" if top_level => self.class_segments(node, node, segments),
            "expression_statement" => {
                let inner = node.named_child(0);
                if inner.is_some_and(|n| n.kind() == "assignment") {
                    let name = inner.and_then(|a| self.assignment_names(a));
                    segments.push(self.plain_segment(node, SegmentKind::Variable, name));
                } else {
                    segments.push(self.plain_segment(node, SegmentKind::Expression, None));
                }
            }
            _ => segments.push(self.plain_segment(node, SegmentKind::Code, None)),
        }
    }

    fn plain_segment(
        &self,
        node: Node<'_>,
        kind: SegmentKind,
        name: Option<String>,
    ) -> Segment {
        let start = node.start_position().row + 1;
        let end = node.end_position().row + 1;
        Segment {
            kind,
            code: self.text_range(start, end),
            start_line: start,
            end_line: end,
            docstring: None,
            comment_above: self.comment_above(start),
            inline_comments: self.inline_in_range(start, end),
            name,
        }
    }

    fn function_segment(&self, outer: Node<'_>, def: Node<'_>) -> Segment {
        let start = outer.start_position().row + 1;
        let end = outer.end_position().row + 1;
        let name = self.node_name(def);
        let doc_stmt = docstring_stmt(def);
        let docstring = doc_stmt.map(|d| self.docstring_text(d));
        let code = match doc_stmt {
            Some(d) => self.text_range_without(
                start,
                end,
                (d.start_position().row + 1, d.end_position().row + 1),
            ),
            None => self.text_range(start, end),
        };

        Segment {
            kind: SegmentKind::Function,
            code,
            start_line: start,
            end_line: end,
            docstring,
            comment_above: self.comment_above(start),
            inline_comments: self.inline_in_range(start, end),
            name,
        }
    }

    /// A class becomes a header segment plus one segment per body member, so
    /// the demo types the shell first and fills methods in one at a time.
    fn class_segments(&self, outer: Node<'_>, class_def: Node<'_>, segments: &mut Vec<Segment>) {
        let start = outer.start_position().row + 1;
        let Some(body) = class_def.child_by_field_name("body") else {
            segments.push(self.plain_segment(outer, SegmentKind::Code, None));
            return;
        };
        let body_start = body.start_position().row + 1;
        let header_last = body_start.saturating_sub(1).max(start);

        let doc_stmt = docstring_stmt(class_def);
        let docstring = doc_stmt.map(|d| self.docstring_text(d));
        // Segment range extends over the docstring even though the typed
        // header omits it, so gap tracking matches the source layout.
        let end_line = doc_stmt.map_or(header_last, |d| d.end_position().row + 1);

        segments.push(Segment {
            kind: SegmentKind::Class,
            code: self.text_range(start, header_last),
            start_line: start,
            end_line,
            docstring,
            comment_above: self.comment_above(start),
            inline_comments: self.inline_in_range(start, header_last),
            name: self.node_name(class_def),
        });

        let doc_id = doc_stmt.map(|d| d.id());
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() == "comment" || Some(member.id()) == doc_id {
                continue;
            }
            self.segment_for(member, segments, false);
        }
    }

    fn node_name(&self, node: Node<'_>) -> Option<String> {
        node.child_by_field_name("name")
            .and_then(|n| n.utf8_text(self.source.as_bytes()).ok())
            .map(str::to_string)
    }

    fn assignment_names(&self, assignment: Node<'_>) -> Option<String> {
        let left = assignment.child_by_field_name("left")?;
        if left.kind() == "identifier" {
            return left
                .utf8_text(self.source.as_bytes())
                .ok()
                .map(str::to_string);
        }
        let mut cursor = left.walk();
        let names: Vec<&str> = left
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "identifier")
            .filter_map(|c| c.utf8_text(self.source.as_bytes()).ok())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join(", "))
        }
    }

    fn docstring_text(&self, stmt: Node<'_>) -> String {
        let mut cursor = stmt.walk();
        let Some(string) = stmt.named_children(&mut cursor).find(|c| c.kind() == "string")
        else {
            return String::new();
        };
        let mut inner = string.walk();
        let raw = string
            .children(&mut inner)
            .find(|c| c.kind() == "string_content")
            .and_then(|c| c.utf8_text(self.source.as_bytes()).ok())
            .unwrap_or_default();
        clean_docstring(raw)
    }
}

/// First statement of a definition body, when it is a bare string literal.
fn docstring_stmt<'t>(def: Node<'t>) -> Option<Node<'t>> {
    let body = def.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let inner = first.named_child(0)?;
    (inner.kind() == "string").then_some(first)
}

/// Strip the common indentation and surrounding blank lines of a docstring.
fn clean_docstring(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();
    let min = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            out.push(line.trim_start().to_string());
        } else {
            out.push(line.get(min..).unwrap_or("").to_string());
        }
    }
    while out.first().is_some_and(|l| l.trim().is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
# Importing libraries
import os
import sys

# Configuration constant
SEED = 42

def hello(name):
    """
    Says hello to someone.
    This is a detailed docstring.
    """
    print(f"Hello, {name}!")  # Print greeting
    return True
"#;

    #[test]
    fn imports_group_with_their_comment() {
        let segments = parse_source(SAMPLE).unwrap();
        let imports = &segments[0];

        assert_eq!(imports.kind, SegmentKind::Imports);
        assert_eq!(imports.code, "import os\nimport sys");
        assert_eq!(imports.comment_above.as_deref(), Some("Importing libraries"));
    }

    #[test]
    fn assignments_become_variables() {
        let segments = parse_source(SAMPLE).unwrap();
        let var = segments
            .iter()
            .find(|s| s.kind == SegmentKind::Variable)
            .unwrap();

        assert_eq!(var.code, "SEED = 42");
        assert_eq!(var.name.as_deref(), Some("SEED"));
        assert_eq!(var.comment_above.as_deref(), Some("Configuration constant"));
    }

    #[test]
    fn function_docstring_is_captured_and_stripped() {
        let segments = parse_source(SAMPLE).unwrap();
        let func = segments
            .iter()
            .find(|s| s.kind == SegmentKind::Function)
            .unwrap();

        assert_eq!(func.name.as_deref(), Some("hello"));
        let docstring = func.docstring.as_deref().unwrap();
        assert!(docstring.starts_with("Says hello to someone."));
        assert!(!func.code.contains("docstring"));
        assert!(func.code.contains("def hello(name):"));
        assert!(func.code.contains("return True"));
    }

    #[test]
    fn trailing_comments_are_inline() {
        let segments = parse_source(SAMPLE).unwrap();
        let func = segments
            .iter()
            .find(|s| s.kind == SegmentKind::Function)
            .unwrap();

        assert_eq!(func.inline_comments.len(), 1);
        let inline = &func.inline_comments[0];
        assert_eq!(inline.text, "Print greeting");
        assert_eq!(inline.code, r#"print(f"Hello, {name}!")"#);
    }

    #[test]
    fn class_header_splits_from_methods() {
        let source = r#"class Greeter:
    """A friendly greeter."""

    def greet(self):
        return "hi"
"#;
        let segments = parse_source(source).unwrap();

        assert_eq!(segments[0].kind, SegmentKind::Class);
        assert_eq!(segments[0].code, "class Greeter:");
        assert_eq!(segments[0].docstring.as_deref(), Some("A friendly greeter."));
        assert_eq!(segments[0].name.as_deref(), Some("Greeter"));

        assert_eq!(segments[1].kind, SegmentKind::Function);
        assert_eq!(segments[1].name.as_deref(), Some("greet"));
    }

    #[test]
    fn module_docstring_is_an_expression_segment() {
        let source = "\"\"\"Module overview.\"\"\"\n\nx = 1\n";
        let segments = parse_source(source).unwrap();

        assert_eq!(segments[0].kind, SegmentKind::Expression);
        assert!(segments[0].code.contains("Module overview."));
        assert_eq!(segments[1].kind, SegmentKind::Variable);
    }

    #[test]
    fn leftover_statements_become_code_segments() {
        let source = "def f():\n    pass\n\nif __name__ == '__main__':\n    f()\n";
        let segments = parse_source(source).unwrap();

        assert_eq!(segments.last().unwrap().kind, SegmentKind::Code);
        assert!(segments.last().unwrap().code.starts_with("if __name__"));
    }
}
