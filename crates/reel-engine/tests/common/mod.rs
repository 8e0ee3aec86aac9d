//! In-memory host used by the sequencer integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reel_engine::host::{
    AudioPlayer, DecorationId, DocumentId, ExitStatus, HostError, Position, Range, TerminalHost,
    Workspace,
};
use reel_narration::{SpeechSynthesizer, SynthesisError};
use reel_text::IndentStyle;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

struct Doc {
    path: String,
    text: String,
}

/// A workspace, terminal and audio player all in one, recording everything
/// the engine does to it.
#[derive(Default)]
pub struct InMemoryHost {
    docs: Mutex<Vec<Doc>>,
    pub dirs: Mutex<Vec<String>>,
    pub files: Mutex<Vec<String>>,
    pub terminals: Mutex<Vec<String>>,
    pub commands: Mutex<Vec<String>>,
    pub played: Mutex<Vec<PathBuf>>,
    pub active_decorations: Mutex<Vec<DecorationId>>,
    next_decoration: AtomicU64,
}

impl InMemoryHost {
    /// Current text of the document at `path`, if it was ever opened.
    pub fn document_text(&self, path: &str) -> Option<String> {
        self.docs
            .lock()
            .iter()
            .find(|d| d.path == path)
            .map(|d| d.text.clone())
    }

    fn with_doc<T>(
        &self,
        doc: DocumentId,
        f: impl FnOnce(&mut Doc) -> T,
    ) -> Result<T, HostError> {
        let mut docs = self.docs.lock();
        docs.get_mut(doc.0 as usize)
            .map(f)
            .ok_or(HostError::UnknownDocument)
    }
}

/// Byte offset of a character-addressed position, clamped to the text.
fn offset_of(text: &str, pos: Position) -> usize {
    let mut offset = 0usize;
    for _ in 0..pos.line {
        match text[offset..].find('\n') {
            Some(i) => offset += i + 1,
            None => return text.len(),
        }
    }
    let line_end = text[offset..].find('\n').map_or(text.len(), |i| offset + i);
    let mut chars = 0usize;
    for (i, _) in text[offset..line_end].char_indices() {
        if chars == pos.column {
            return offset + i;
        }
        chars += 1;
    }
    line_end
}

#[async_trait]
impl Workspace for InMemoryHost {
    async fn create_directory(&self, path: &str) -> Result<(), HostError> {
        self.dirs.lock().push(path.to_string());
        Ok(())
    }

    async fn create_empty_file(&self, path: &str) -> Result<(), HostError> {
        self.files.lock().push(path.to_string());
        Ok(())
    }

    async fn open(&self, path: &str) -> Result<DocumentId, HostError> {
        let mut docs = self.docs.lock();
        if let Some(i) = docs.iter().position(|d| d.path == path) {
            return Ok(DocumentId(i as u64));
        }
        docs.push(Doc {
            path: path.to_string(),
            text: String::new(),
        });
        Ok(DocumentId((docs.len() - 1) as u64))
    }

    async fn text(&self, doc: DocumentId) -> Result<String, HostError> {
        self.with_doc(doc, |d| d.text.clone())
    }

    async fn insert(&self, doc: DocumentId, pos: Position, text: &str) -> Result<(), HostError> {
        self.with_doc(doc, |d| {
            let offset = offset_of(&d.text, pos);
            d.text.insert_str(offset, text);
        })
    }

    async fn delete(&self, doc: DocumentId, range: Range) -> Result<(), HostError> {
        self.with_doc(doc, |d| {
            let start = offset_of(&d.text, range.start);
            let end = offset_of(&d.text, range.end).max(start);
            d.text.replace_range(start..end, "");
        })
    }

    async fn reveal(&self, _doc: DocumentId, _range: Range) -> Result<(), HostError> {
        Ok(())
    }

    async fn move_cursor(&self, _doc: DocumentId, _pos: Position) -> Result<(), HostError> {
        Ok(())
    }

    async fn decorate(&self, _doc: DocumentId, _range: Range) -> Result<DecorationId, HostError> {
        let id = DecorationId(self.next_decoration.fetch_add(1, Ordering::SeqCst));
        self.active_decorations.lock().push(id);
        Ok(id)
    }

    async fn undecorate(
        &self,
        _doc: DocumentId,
        decoration: DecorationId,
    ) -> Result<(), HostError> {
        self.active_decorations.lock().retain(|d| *d != decoration);
        Ok(())
    }

    async fn format(&self, _doc: DocumentId) -> Result<(), HostError> {
        Ok(())
    }

    async fn indent_style(&self, _doc: DocumentId) -> Result<IndentStyle, HostError> {
        Ok(IndentStyle::default())
    }
}

#[async_trait]
impl TerminalHost for InMemoryHost {
    async fn open(&self, name: &str, _cwd: Option<&str>) -> Result<(), HostError> {
        self.terminals.lock().push(name.to_string());
        Ok(())
    }

    async fn send(&self, name: &str, command: &str) -> Result<(), HostError> {
        self.commands.lock().push(format!("{name}: {command}"));
        Ok(())
    }

    async fn show(&self, _name: &str) -> Result<(), HostError> {
        Ok(())
    }

    async fn hide(&self, _name: &str) -> Result<(), HostError> {
        Ok(())
    }

    async fn close(&self, name: &str) -> Result<(), HostError> {
        self.terminals.lock().retain(|t| t != name);
        Ok(())
    }

    // Observes real completion, keeping tests off the heuristic wait.
    async fn run(
        &self,
        name: &str,
        command: &str,
        _cwd: Option<&str>,
        _timeout: Duration,
    ) -> Result<Option<ExitStatus>, HostError> {
        self.commands.lock().push(format!("{name}: {command}"));
        Ok(Some(ExitStatus { code: 0 }))
    }
}

#[async_trait]
impl AudioPlayer for InMemoryHost {
    async fn play(&self, path: &Path) -> Result<(), HostError> {
        self.played.lock().push(path.to_path_buf());
        Ok(())
    }
}

/// Synthesizer returning the text bytes, counting its calls.
#[derive(Default)]
pub struct StubSynthesizer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<Vec<u8>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.as_bytes().to_vec())
    }
}
