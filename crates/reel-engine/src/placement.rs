//! Insert placement
//!
//! Pure planning step between pattern resolution and document mutation:
//! given a location selector it decides which line the gap opens at and what
//! indent the typed content should land on. The sequencer then opens the
//! gap and types into it; no host calls happen here.

use reel_model::InsertSelector;
use reel_text::{block_end, indent_of, is_block_opener, resolve, target_indent, IndentStyle,
    ResolveError, SearchHints};

/// Where and how inserted content lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    /// 0-indexed line the gap opens at; `lines.len()` appends at end of file
    pub line: usize,
    /// Indent the content is normalized to
    pub indent: String,
}

/// Plan an insert against the current document text.
///
/// `after` on a block opener lands after the entire nested body, at the
/// opener's own indent. `after` on any other line opens the gap below it at
/// the enclosing sibling level. `before` and `at` open the gap on the
/// matched line itself, inheriting its indent.
///
/// # Errors
/// [`ResolveError::NotFound`] when the selector's pattern does not resolve.
pub fn plan_insert(
    document: &str,
    selector: InsertSelector<'_>,
    hints: &SearchHints<'_>,
    style: &IndentStyle,
) -> Result<InsertPlan, ResolveError> {
    let lines: Vec<&str> = document.lines().collect();

    match selector {
        InsertSelector::After(pattern) => {
            let m = resolve(document, pattern, hints)?;
            let matched = lines.get(m.line).copied().unwrap_or_default();
            if is_block_opener(matched) {
                Ok(InsertPlan {
                    line: block_end(&lines, m.line),
                    indent: indent_of(matched).text,
                })
            } else {
                Ok(InsertPlan {
                    line: m.line + 1,
                    indent: target_indent(&lines, m.line, style),
                })
            }
        }
        InsertSelector::Before(pattern) | InsertSelector::At(pattern) => {
            let m = resolve(document, pattern, hints)?;
            let matched = lines.get(m.line).copied().unwrap_or_default();
            Ok(InsertPlan {
                line: m.line,
                indent: indent_of(matched).text,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "def f():\n    pass\n";

    #[test]
    fn after_a_block_opener_lands_past_the_body() {
        let plan = plan_insert(
            DOC,
            InsertSelector::After("def f():"),
            &SearchHints::default(),
            &IndentStyle::default(),
        )
        .unwrap();

        // Block-end scan reaches end of file; indent is the opener's own.
        assert_eq!(plan, InsertPlan { line: 2, indent: String::new() });
    }

    #[test]
    fn after_a_plain_line_opens_the_next_gap() {
        let doc = "x = 1\ny = 2\n";
        let plan = plan_insert(
            doc,
            InsertSelector::After("x = 1"),
            &SearchHints::default(),
            &IndentStyle::default(),
        )
        .unwrap();

        assert_eq!(plan, InsertPlan { line: 1, indent: String::new() });
    }

    #[test]
    fn before_inherits_the_matched_line_indent() {
        let plan = plan_insert(
            DOC,
            InsertSelector::Before("pass"),
            &SearchHints::default(),
            &IndentStyle::default(),
        )
        .unwrap();

        assert_eq!(plan, InsertPlan { line: 1, indent: "    ".into() });
    }

    #[test]
    fn at_pushes_the_matched_line_down() {
        let plan = plan_insert(
            DOC,
            InsertSelector::At("def f():"),
            &SearchHints::default(),
            &IndentStyle::default(),
        )
        .unwrap();

        assert_eq!(plan, InsertPlan { line: 0, indent: String::new() });
    }

    #[test]
    fn brace_blocks_land_on_the_balancing_brace() {
        let doc = "fn main() {\n    work();\n}\n";
        let plan = plan_insert(
            doc,
            InsertSelector::After("fn main() {"),
            &SearchHints::default(),
            &IndentStyle::default(),
        )
        .unwrap();

        assert_eq!(plan, InsertPlan { line: 2, indent: String::new() });
    }

    #[test]
    fn unresolvable_pattern_is_an_error() {
        let err = plan_insert(
            DOC,
            InsertSelector::After("no such line"),
            &SearchHints::default(),
            &IndentStyle::default(),
        )
        .unwrap_err();

        let ResolveError::NotFound { pattern, .. } = err;
        assert_eq!(pattern, "no such line");
    }
}
