//! Action sequencer
//!
//! Drives one blueprint at a time through `Idle -> Loading -> Processing ->
//! Done|Error`, executing actions strictly in array order. Every side effect
//! goes through the host contracts; pattern resolution and indentation are
//! delegated to `reel-text`, narration to the cache. Batches recover at file
//! granularity: a file that ends in `Error` never stops the next one.

use crate::error::EngineError;
use crate::host::{AudioPlayer, DocumentId, Position, Range, TerminalHost, Workspace};
use crate::placement::plan_insert;
use crate::progress::{ExecutionState, ProgressReporter, RunStatus};
use parking_lot::Mutex;
use reel_model::{
    Action, Blueprint, CursorTarget, SearchOpts, ValidationError, Voiceover, VoiceoverTiming,
};
use reel_narration::{NarrationCache, NarrationRequest};
use reel_text::{normalize, resolve, IndentStyle, SearchHints};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How long a transient highlight stays on screen without narration.
const HIGHLIGHT_HOLD_MS: u64 = 800;
/// Heuristic wait for package-manager style commands.
const LONG_COMMAND_WAIT_MS: u64 = 10_000;
/// Heuristic wait for everything else.
const SHORT_COMMAND_WAIT_MS: u64 = 1_500;
/// Terminal used when the blueprint never names one.
const DEFAULT_TERMINAL: &str = "main";

/// Per-run mutable state: the active document and terminal.
struct RunCtx<'a> {
    blueprint: &'a Blueprint,
    doc: Option<DocumentId>,
    style: IndentStyle,
    terminal: Option<String>,
}

impl RunCtx<'_> {
    fn path_in_root(&self, path: &str) -> String {
        let root = self.blueprint.root_folder.trim_end_matches('/');
        if root.is_empty() {
            path.to_string()
        } else {
            format!("{root}/{path}")
        }
    }
}

/// Releases the single-run slot when a run ends, however it ends.
struct RunPermit<'a>(&'a AtomicBool);

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The playback engine. One blueprint processes at a time; a second `run`
/// while busy fails fast with [`EngineError::Busy`].
pub struct Sequencer {
    workspace: Arc<dyn Workspace>,
    terminal: Arc<dyn TerminalHost>,
    audio: Arc<dyn AudioPlayer>,
    narration: NarrationCache,
    reporter: Arc<dyn ProgressReporter>,
    state: Mutex<ExecutionState>,
    running: AtomicBool,
}

impl Sequencer {
    #[must_use]
    pub fn new(
        workspace: Arc<dyn Workspace>,
        terminal: Arc<dyn TerminalHost>,
        audio: Arc<dyn AudioPlayer>,
        narration: NarrationCache,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            workspace,
            terminal,
            audio,
            narration,
            reporter,
            state: Mutex::new(ExecutionState::idle()),
            running: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current execution state.
    #[must_use]
    pub fn state(&self) -> ExecutionState {
        self.state.lock().clone()
    }

    /// Read, parse and run one blueprint file.
    ///
    /// # Errors
    /// I/O and validation failures are reported through the progress sink
    /// and returned; nothing executes on a bad file.
    pub async fn run_file(&self, path: &Path) -> Result<(), EngineError> {
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            EngineError::BlueprintIo {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("blueprint");

        let blueprint = match Blueprint::from_json(&source) {
            Ok(blueprint) => blueprint,
            Err(e) => {
                let err = EngineError::from(e);
                // Report only while holding the run slot; a stray bad file
                // must not clobber the state of a blueprint mid-run.
                if let Ok(_permit) = self.acquire() {
                    self.push_state(|s| {
                        s.busy = false;
                        s.status = RunStatus::Error;
                        s.blueprint = Some(name.to_string());
                        s.error = Some(err.to_string());
                    });
                } else {
                    tracing::warn!(path = %path.display(), error = %err,
                        "blueprint rejected while another run is active");
                }
                return Err(err);
            }
        };

        self.run(&blueprint, name).await
    }

    /// Run several blueprint files sequentially with per-file isolation.
    ///
    /// A file that fails is logged and the batch moves on; results come back
    /// in input order.
    pub async fn run_batch(&self, paths: &[PathBuf]) -> Vec<Result<(), EngineError>> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.run_file(path).await;
            if let Err(e) = &result {
                tracing::warn!(path = %path.display(), error = %e,
                    "blueprint failed; continuing with next file");
            }
            results.push(result);
        }
        results
    }

    /// Run one already-parsed blueprint.
    ///
    /// # Errors
    /// The first failing action aborts the run; the error carries the action
    /// index and kind, and the same diagnostics reach the progress sink.
    pub async fn run(&self, blueprint: &Blueprint, name: &str) -> Result<(), EngineError> {
        let _permit = self.acquire()?;
        let total = blueprint.actions.len();

        self.push_state(|s| {
            *s = ExecutionState {
                busy: true,
                status: RunStatus::Loading,
                blueprint: Some(name.to_string()),
                current_step: 0,
                total_steps: total,
                current_action: None,
                error: None,
            };
        });

        if let Err(e) = blueprint.validate() {
            let err = EngineError::from(e);
            self.push_state(|s| {
                s.busy = false;
                s.status = RunStatus::Error;
                s.error = Some(err.to_string());
            });
            return Err(err);
        }

        self.pregenerate_narration(blueprint);
        self.push_state(|s| s.status = RunStatus::Processing);
        tracing::info!(blueprint = name, actions = total, "playback started");

        let mut ctx = RunCtx {
            blueprint,
            doc: None,
            style: IndentStyle::default(),
            terminal: None,
        };

        for (index, action) in blueprint.actions.iter().enumerate() {
            let kind = action.kind();
            self.push_state(|s| {
                s.current_step = index + 1;
                s.current_action = Some(kind.to_string());
            });
            tracing::debug!(step = index + 1, total, kind, "executing action");

            if let Err(e) = self.execute(&mut ctx, index, action).await {
                let err = e.at_action(index, kind);
                tracing::error!(blueprint = name, error = %err, "playback aborted");
                self.push_state(|s| {
                    s.busy = false;
                    s.status = RunStatus::Error;
                    s.error = Some(err.to_string());
                });
                return Err(err);
            }

            let delay = blueprint.action_delay_ms();
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        // Settle any pre-generation still in flight before declaring done.
        self.narration.wait_idle().await;
        self.push_state(|s| {
            s.busy = false;
            s.status = RunStatus::Done;
            s.current_action = None;
        });
        tracing::info!(blueprint = name, "playback finished");
        Ok(())
    }

    fn acquire(&self) -> Result<RunPermit<'_>, EngineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Ok(RunPermit(&self.running))
        } else {
            Err(EngineError::Busy)
        }
    }

    fn push_state(&self, mutate: impl FnOnce(&mut ExecutionState)) {
        let snapshot = {
            let mut state = self.state.lock();
            mutate(&mut state);
            state.clone()
        };
        self.reporter.report(&snapshot);
    }

    /// Kick off narration generation for every narrated action, deduplicated
    /// by the cache, before the first character is typed.
    fn pregenerate_narration(&self, blueprint: &Blueprint) {
        if !blueprint.voiceover_enabled() {
            return;
        }
        let requests: Vec<NarrationRequest> = blueprint
            .actions
            .iter()
            .filter_map(Action::narration)
            .filter_map(|v| {
                v.text().map(|text| {
                    NarrationRequest::new(text, v.voice.as_deref().unwrap_or(blueprint.voice()))
                })
            })
            .collect();
        if !requests.is_empty() {
            tracing::debug!(count = requests.len(), "pre-generating narration");
            self.narration.pregenerate_all(requests);
        }
    }

    async fn execute(
        &self,
        ctx: &mut RunCtx<'_>,
        index: usize,
        action: &Action,
    ) -> Result<(), EngineError> {
        match action {
            Action::CreateFolder { path } => {
                self.workspace
                    .create_directory(&ctx.path_in_root(path))
                    .await?;
                Ok(())
            }

            Action::CreateFile { path, narration } => {
                let pending = self.narration_before(ctx, narration).await;
                self.workspace
                    .create_empty_file(&ctx.path_in_root(path))
                    .await?;
                self.narration_after(ctx, narration, pending).await;
                Ok(())
            }

            Action::OpenFile { path } => {
                let doc = self.workspace.open(&ctx.path_in_root(path)).await?;
                ctx.style = self.workspace.indent_style(doc).await?;
                ctx.doc = Some(doc);
                Ok(())
            }

            Action::WriteText {
                content,
                typing_speed,
                highlight,
                narration,
            } => {
                let doc = ctx.doc.ok_or(EngineError::NoDocument)?;
                let text = self.workspace.text(doc).await?;
                let start = end_position(&text);
                let speed = typing_speed.unwrap_or_else(|| ctx.blueprint.typing_speed_ms());

                let pending = self.narration_before(ctx, narration).await;
                let end = self.type_text(doc, start, content, speed).await?;
                self.workspace.reveal(doc, Range::new(start, end)).await?;
                if *highlight {
                    self.flash_highlight(doc, Range::new(start, end)).await?;
                }
                self.narration_after(ctx, narration, pending).await;
                Ok(())
            }

            Action::Insert {
                path,
                content,
                search,
                typing_speed,
                narration,
                ..
            } => {
                let doc = self.ensure_doc(ctx, path.as_deref()).await?;
                let Some(selector) = action.insert_selector() else {
                    return Err(ValidationError::SelectorCount { index, found: 0 }.into());
                };

                let text = self.workspace.text(doc).await?;
                let plan = plan_insert(&text, selector, &hints(search), &ctx.style)?;
                let line_count = text.lines().count();
                let speed = typing_speed.unwrap_or_else(|| ctx.blueprint.typing_speed_ms());

                let mut body = normalize(content, &plan.indent, &ctx.style);
                while body.ends_with('\n') {
                    body.pop();
                }

                let pending = self.narration_before(ctx, narration).await;

                // Split first, then type into the created gap; an insert at
                // end of file terminates the last line instead.
                let appending = plan.line >= line_count;
                let start = if appending {
                    if !text.is_empty() && !text.ends_with('\n') {
                        self.workspace.insert(doc, end_position(&text), "\n").await?;
                    }
                    Position::new(line_count, 0)
                } else {
                    self.workspace
                        .insert(doc, Position::new(plan.line, 0), "\n")
                        .await?;
                    Position::new(plan.line, 0)
                };

                let end = self.type_text(doc, start, &body, speed).await?;
                if appending {
                    self.workspace.insert(doc, end, "\n").await?;
                }
                self.workspace.reveal(doc, Range::new(start, end)).await?;
                self.narration_after(ctx, narration, pending).await;
                Ok(())
            }

            Action::Delete { path, find, search } => {
                let doc = self.ensure_doc(ctx, path.as_deref()).await?;
                let text = self.workspace.text(doc).await?;
                let m = resolve(&text, find, &hints(search))?;
                // Whole line including its newline; the host clamps at EOF.
                let range = Range::new(
                    Position::new(m.line, 0),
                    Position::new(m.line + 1, 0),
                );
                self.workspace.delete(doc, range).await?;
                Ok(())
            }

            Action::Replace {
                path,
                find,
                replacement,
                search,
                typing_speed,
                narration,
            } => {
                let doc = self.ensure_doc(ctx, path.as_deref()).await?;
                let Some(replacement) = replacement else {
                    return Err(ValidationError::MissingReplacement { index }.into());
                };

                let text = self.workspace.text(doc).await?;
                let m = resolve(&text, find, &hints(search))?;
                let raw_line = text.lines().nth(m.line).unwrap_or_default();
                let column = raw_line[..m.column].chars().count();
                let start = Position::new(m.line, column);
                let matched = Range::new(
                    start,
                    Position::new(m.line, column + find.trim().chars().count()),
                );
                let speed = typing_speed.unwrap_or_else(|| ctx.blueprint.typing_speed_ms());

                let pending = self.narration_before(ctx, narration).await;
                self.workspace.delete(doc, matched).await?;
                let end = self.type_text(doc, start, replacement, speed).await?;
                self.workspace.reveal(doc, Range::new(start, end)).await?;
                self.narration_after(ctx, narration, pending).await;
                Ok(())
            }

            Action::Highlight {
                path,
                find,
                search,
                move_cursor,
                narration,
            } => {
                let doc = self.ensure_doc(ctx, path.as_deref()).await?;
                let text = self.workspace.text(doc).await?;
                let m = resolve(&text, find, &hints(search))?;
                let line_len = text.lines().nth(m.line).map_or(0, |l| l.chars().count());
                let range = Range::new(
                    Position::new(m.line, 0),
                    Position::new(m.line, line_len),
                );

                self.workspace.reveal(doc, range).await?;
                // The decoration is scoped to this action: whatever happens
                // between decorate and undecorate, it comes off before the
                // next action starts.
                let decoration = self.workspace.decorate(doc, range).await?;
                let pending = self.narration_before(ctx, narration).await;
                self.narration_after(ctx, narration, pending).await;
                if !narrates(ctx, narration) {
                    tokio::time::sleep(Duration::from_millis(HIGHLIGHT_HOLD_MS)).await;
                }
                self.workspace.undecorate(doc, decoration).await?;

                if let Some(target) = move_cursor {
                    let current = self.workspace.text(doc).await?;
                    let pos = match target {
                        CursorTarget::StartOfFile => Position::default(),
                        CursorTarget::EndOfFile => end_position(&current),
                    };
                    self.workspace.move_cursor(doc, pos).await?;
                }
                Ok(())
            }

            Action::OpenTerminal { terminal_name, cwd } => {
                let name = terminal_name.as_deref().unwrap_or(DEFAULT_TERMINAL);
                self.terminal.open(name, cwd.as_deref()).await?;
                self.terminal.show(name).await?;
                ctx.terminal = Some(name.to_string());
                Ok(())
            }

            Action::RunCommand {
                terminal_name,
                command,
                cwd,
                timeout,
                wait_for_completion,
            } => {
                let name = terminal_name
                    .clone()
                    .or_else(|| ctx.terminal.clone())
                    .unwrap_or_else(|| DEFAULT_TERMINAL.to_string());
                if ctx.terminal.is_none() {
                    self.terminal.open(&name, cwd.as_deref()).await?;
                    ctx.terminal = Some(name.clone());
                }

                let wait =
                    Duration::from_millis(timeout.unwrap_or_else(|| heuristic_wait_ms(command)));
                match self
                    .terminal
                    .run(&name, command, cwd.as_deref(), wait)
                    .await?
                {
                    Some(status) if status.success() => {
                        tracing::debug!(command, "command completed");
                    }
                    Some(status) => {
                        tracing::warn!(command, code = status.code, "command exited nonzero");
                    }
                    None if *wait_for_completion => {
                        // Send-only host: completion is approximated, not
                        // observed. Non-fatal by contract.
                        tokio::time::sleep(wait).await;
                        tracing::warn!(
                            command,
                            waited_ms = wait.as_millis() as u64,
                            "no completion signal from terminal; heuristic wait elapsed"
                        );
                    }
                    None => {}
                }
                Ok(())
            }

            Action::ShowTerminal { terminal_name } => {
                let name = self.terminal_name(ctx, terminal_name.as_deref());
                self.terminal.show(&name).await?;
                Ok(())
            }

            Action::HideTerminal { terminal_name } => {
                let name = self.terminal_name(ctx, terminal_name.as_deref());
                self.terminal.hide(&name).await?;
                Ok(())
            }

            Action::CloseTerminal { terminal_name } => {
                let name = self.terminal_name(ctx, terminal_name.as_deref());
                self.terminal.close(&name).await?;
                if ctx.terminal.as_deref() == Some(name.as_str()) {
                    ctx.terminal = None;
                }
                Ok(())
            }
        }
    }

    fn terminal_name(&self, ctx: &RunCtx<'_>, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| ctx.terminal.clone())
            .unwrap_or_else(|| DEFAULT_TERMINAL.to_string())
    }

    /// Open `path` when given, else fall back to the active document.
    async fn ensure_doc(
        &self,
        ctx: &mut RunCtx<'_>,
        path: Option<&str>,
    ) -> Result<DocumentId, EngineError> {
        if let Some(path) = path {
            let doc = self.workspace.open(&ctx.path_in_root(path)).await?;
            ctx.style = self.workspace.indent_style(doc).await?;
            ctx.doc = Some(doc);
            return Ok(doc);
        }
        ctx.doc.ok_or(EngineError::NoDocument)
    }

    /// Insert `text` one character at a time with the configured pacing,
    /// returning the position just past the last typed character.
    async fn type_text(
        &self,
        doc: DocumentId,
        mut pos: Position,
        text: &str,
        speed_ms: u64,
    ) -> Result<Position, EngineError> {
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            self.workspace
                .insert(doc, pos, ch.encode_utf8(&mut buf))
                .await?;
            if ch == '\n' {
                pos.line += 1;
                pos.column = 0;
            } else {
                pos.column += 1;
            }
            if speed_ms > 0 {
                tokio::time::sleep(Duration::from_millis(speed_ms)).await;
            }
        }
        Ok(pos)
    }

    /// Briefly decorate freshly typed text, then take the decoration off.
    async fn flash_highlight(&self, doc: DocumentId, range: Range) -> Result<(), EngineError> {
        let decoration = self.workspace.decorate(doc, range).await?;
        tokio::time::sleep(Duration::from_millis(HIGHLIGHT_HOLD_MS)).await;
        self.workspace.undecorate(doc, decoration).await?;
        Ok(())
    }

    /// Handle the pre-edit half of a voiceover: `before` plays to
    /// completion, `during` starts playback and hands back its task.
    async fn narration_before(
        &self,
        ctx: &RunCtx<'_>,
        narration: &Voiceover,
    ) -> Option<JoinHandle<()>> {
        if !narrates(ctx, narration) {
            return None;
        }
        let text = narration.text()?;
        let voice = narration
            .voice
            .as_deref()
            .unwrap_or_else(|| ctx.blueprint.voice());
        match narration.timing() {
            VoiceoverTiming::Before => {
                self.play_narration(text, voice).await;
                None
            }
            VoiceoverTiming::During => {
                Some(self.spawn_narration(text.to_string(), voice.to_string()))
            }
            VoiceoverTiming::After => None,
        }
    }

    /// Post-edit half: join a `during` playback, or play an `after` clip.
    async fn narration_after(
        &self,
        ctx: &RunCtx<'_>,
        narration: &Voiceover,
        pending: Option<JoinHandle<()>>,
    ) {
        if let Some(handle) = pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "narration playback task panicked");
            }
            return;
        }
        if narrates(ctx, narration) && narration.timing() == VoiceoverTiming::After {
            if let Some(text) = narration.text() {
                let voice = narration
                    .voice
                    .as_deref()
                    .unwrap_or_else(|| ctx.blueprint.voice());
                self.play_narration(text, voice).await;
            }
        }
    }

    /// Play one clip to completion. Missing or failed narration is skipped.
    async fn play_narration(&self, text: &str, voice: &str) {
        let Some(path) = self.narration.audio_path(text, voice).await else {
            return;
        };
        if let Err(e) = self.audio.play(&path).await {
            tracing::warn!(error = %e, "narration playback failed, continuing");
        }
    }

    fn spawn_narration(&self, text: String, voice: String) -> JoinHandle<()> {
        let cache = self.narration.clone();
        let audio = Arc::clone(&self.audio);
        tokio::spawn(async move {
            let Some(path) = cache.audio_path(&text, &voice).await else {
                return;
            };
            if let Err(e) = audio.play(&path).await {
                tracing::warn!(error = %e, "narration playback failed, continuing");
            }
        })
    }
}

fn narrates(ctx: &RunCtx<'_>, narration: &Voiceover) -> bool {
    ctx.blueprint.voiceover_enabled() && narration.text().is_some()
}

fn hints(opts: &SearchOpts) -> SearchHints<'_> {
    SearchHints {
        near: opts.near.as_deref(),
        inside: opts.inside.as_deref(),
        occurrence: opts.occurrence,
    }
}

/// Position just past the last character of `text`.
fn end_position(text: &str) -> Position {
    if text.is_empty() {
        return Position::default();
    }
    let line_count = text.lines().count();
    if text.ends_with('\n') {
        Position::new(line_count, 0)
    } else {
        let last = text.lines().last().map_or(0, |l| l.chars().count());
        Position::new(line_count - 1, last)
    }
}

fn heuristic_wait_ms(command: &str) -> u64 {
    let command = command.trim();
    if command.contains("install") || command.contains("build") || command.contains("update") {
        LONG_COMMAND_WAIT_MS
    } else {
        SHORT_COMMAND_WAIT_MS
    }
}
