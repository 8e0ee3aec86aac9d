//! Host contracts
//!
//! The engine mutates documents, drives terminals and plays audio only
//! through these traits; it never touches the filesystem or a UI directly.
//! Hosts implement them, the sequencer consumes them as `Arc<dyn _>`.

use async_trait::async_trait;
use reel_text::IndentStyle;
use std::path::Path;
use std::time::Duration;

/// A character-addressed location within a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    /// 0-indexed line
    pub line: usize,
    /// 0-indexed character offset within the line
    pub column: usize,
}

impl Position {
    #[inline]
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Half-open span between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[inline]
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Opaque handle to an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub u64);

/// Opaque handle to an active decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecorationId(pub u64);

/// Exit status of a terminal command, for hosts that can observe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: i32,
}

impl ExitStatus {
    #[inline]
    #[must_use]
    pub const fn success(&self) -> bool {
        self.code == 0
    }
}

/// Failures surfaced by a host implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    #[error("file operation failed: {0}")]
    Io(String),

    #[error("unknown document handle")]
    UnknownDocument,

    #[error("terminal `{0}` is not open")]
    UnknownTerminal(String),

    #[error("audio playback failed: {0}")]
    Playback(String),
}

/// The editing surface: files, documents, cursors and decorations.
#[async_trait]
pub trait Workspace: Send + Sync + 'static {
    async fn create_directory(&self, path: &str) -> Result<(), HostError>;

    async fn create_empty_file(&self, path: &str) -> Result<(), HostError>;

    /// Open (and reveal) the document at `path`.
    async fn open(&self, path: &str) -> Result<DocumentId, HostError>;

    /// Full text of the document.
    async fn text(&self, doc: DocumentId) -> Result<String, HostError>;

    async fn insert(&self, doc: DocumentId, pos: Position, text: &str) -> Result<(), HostError>;

    async fn delete(&self, doc: DocumentId, range: Range) -> Result<(), HostError>;

    /// Scroll the range into view.
    async fn reveal(&self, doc: DocumentId, range: Range) -> Result<(), HostError>;

    async fn move_cursor(&self, doc: DocumentId, pos: Position) -> Result<(), HostError>;

    /// Apply the transient highlight decoration to `range`.
    async fn decorate(&self, doc: DocumentId, range: Range) -> Result<DecorationId, HostError>;

    async fn undecorate(&self, doc: DocumentId, decoration: DecorationId)
        -> Result<(), HostError>;

    /// Run the host's document formatter.
    async fn format(&self, doc: DocumentId) -> Result<(), HostError>;

    /// Indentation settings the host applies to this document.
    async fn indent_style(&self, doc: DocumentId) -> Result<IndentStyle, HostError>;
}

/// Named terminals the engine types commands into.
#[async_trait]
pub trait TerminalHost: Send + Sync + 'static {
    async fn open(&self, name: &str, cwd: Option<&str>) -> Result<(), HostError>;

    /// Type `command` into the terminal without observing completion.
    async fn send(&self, name: &str, command: &str) -> Result<(), HostError>;

    async fn show(&self, name: &str) -> Result<(), HostError>;

    async fn hide(&self, name: &str) -> Result<(), HostError>;

    async fn close(&self, name: &str) -> Result<(), HostError>;

    /// Run `command` and report its real exit status where the host can
    /// observe one. The default falls back to [`send`](Self::send) and
    /// returns `None`, leaving the sequencer on its heuristic wait.
    async fn run(
        &self,
        name: &str,
        command: &str,
        cwd: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<ExitStatus>, HostError> {
        let _ = (cwd, timeout);
        self.send(name, command).await?;
        Ok(None)
    }
}

/// Narration playback, resolving when the clip finishes.
#[async_trait]
pub trait AudioPlayer: Send + Sync + 'static {
    async fn play(&self, path: &Path) -> Result<(), HostError>;
}
