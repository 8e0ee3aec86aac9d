//! Pattern resolution
//!
//! Whitespace-insensitive, case-sensitive line search: a line matches when
//! its trimmed content contains the trimmed pattern as a substring. Multiple
//! matches are narrowed by a ±20-line context window (`near`/`inside`) and a
//! 1-indexed `occurrence` pick, clamped to the filtered set. Without any
//! hint, the first match wins silently; that ambiguity trade-off is part of
//! the contract and deliberately not "fixed" here.

/// Lines scanned on either side of a match when applying a context hint.
const CONTEXT_WINDOW: usize = 20;

/// A resolved line location within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMatch {
    /// 0-indexed line
    pub line: usize,
    /// Byte offset of the trimmed pattern within the raw line
    pub column: usize,
}

/// Disambiguation hints for [`resolve`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchHints<'a> {
    /// Context text expected within the window around the match
    pub near: Option<&'a str>,
    /// Alias of `near`; `near` takes precedence when both are set
    pub inside: Option<&'a str>,
    /// 1-indexed pick among the filtered matches, clamped to the set size
    pub occurrence: Option<usize>,
}

impl<'a> SearchHints<'a> {
    fn context(&self) -> Option<&'a str> {
        self.near.or(self.inside)
    }

    fn describe(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(c) = self.context() {
            parts.push(format!("near `{}`", c.trim()));
        }
        if let Some(n) = self.occurrence {
            parts.push(format!("occurrence {n}"));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Resolution failures, carrying enough context to fix the blueprint.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// No line matched, or the context filter emptied the match set
    #[error("pattern not found: `{pattern}`{}", hint.as_deref().map(|h| format!(" ({h})")).unwrap_or_default())]
    NotFound {
        pattern: String,
        hint: Option<String>,
    },
}

/// Locate the single line a pattern refers to.
///
/// # Errors
/// [`ResolveError::NotFound`] when nothing matches, or when the context
/// filter removes every candidate; the filter is never silently relaxed.
pub fn resolve(
    document: &str,
    pattern: &str,
    hints: &SearchHints<'_>,
) -> Result<PatternMatch, ResolveError> {
    let needle = pattern.trim();
    let lines: Vec<&str> = document.lines().collect();

    let mut matches: Vec<PatternMatch> = Vec::new();
    for (line_no, line) in lines.iter().enumerate() {
        if line.trim().contains(needle) {
            // The raw line contains its trimmed form, so this always hits.
            let column = line.find(needle).unwrap_or(0);
            matches.push(PatternMatch {
                line: line_no,
                column,
            });
        }
    }

    if matches.is_empty() {
        return Err(not_found(pattern, hints));
    }
    if matches.len() == 1 {
        return Ok(matches[0]);
    }

    if let Some(context) = hints.context() {
        let context = context.trim();
        matches.retain(|m| window_contains(&lines, m.line, context));
        if matches.is_empty() {
            return Err(not_found(pattern, hints));
        }
    }

    let pick = hints.occurrence.unwrap_or(1).clamp(1, matches.len());
    Ok(matches[pick - 1])
}

fn window_contains(lines: &[&str], center: usize, context: &str) -> bool {
    let start = center.saturating_sub(CONTEXT_WINDOW);
    let end = (center + CONTEXT_WINDOW + 1).min(lines.len());
    lines[start..end].iter().any(|l| l.trim().contains(context))
}

fn not_found(pattern: &str, hints: &SearchHints<'_>) -> ResolveError {
    ResolveError::NotFound {
        pattern: pattern.to_string(),
        hint: hints.describe(),
    }
}
