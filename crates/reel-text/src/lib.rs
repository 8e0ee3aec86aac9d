//! Text targeting (reel-text)
//!
//! The two pure components every edit goes through:
//! - [`resolver`]: turns a text pattern plus disambiguation hints into a
//!   single line location, or a diagnostic-rich miss
//! - [`indent`]: detects indentation, computes the indent inserted content
//!   should land at, finds block ends, and re-indents authored content
//!
//! Both operate on plain `&str` documents and hold no state.

pub mod indent;
pub mod resolver;

pub use indent::{
    block_end, indent_of, is_block_opener, normalize, target_indent, IndentInfo, IndentStyle,
    IndentUnit,
};
pub use resolver::{resolve, PatternMatch, ResolveError, SearchHints};
