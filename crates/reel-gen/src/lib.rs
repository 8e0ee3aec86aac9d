//! Blueprint generator (reel-gen)
//!
//! Turns an annotated Python source file into a playback blueprint:
//! - [`segment`]: tree-sitter pass that slices the file into import groups,
//!   functions, classes, assignments and leftover code, capturing docstrings
//!   and comments
//! - [`builder`]: maps those segments onto typed actions, promoting
//!   docstrings and comments to narration and highlights

pub mod builder;
pub mod segment;

pub use builder::{BlueprintBuilder, BuilderOptions};
pub use segment::{parse_source, GenError, InlineComment, Segment, SegmentKind};
