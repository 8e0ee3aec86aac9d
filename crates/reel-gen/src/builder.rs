//! Blueprint construction
//!
//! Maps source segments onto typed actions: every file starts with a
//! createFile/openFile preamble, blank lines between segments are preserved
//! as gap writes, docstrings narrate `during` typing, comment runs above a
//! block narrate over a highlight of its first line, and trailing `#`
//! comments come back as follow-up highlights of the code they annotated.

use crate::segment::{InlineComment, Segment, SegmentKind};
use reel_model::{Action, Blueprint, CursorTarget, SearchOpts, Voiceover, VoiceoverTiming};
use std::path::Path;

/// Knobs shared by the CLI and tests.
#[derive(Debug, Clone)]
pub struct BuilderOptions {
    /// Milliseconds per typed character
    pub typing_speed: u64,
    /// Pause between actions in milliseconds
    pub action_delay: u64,
    pub voice: String,
    pub enable_voiceover: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            typing_speed: 35,
            action_delay: 1000,
            voice: "en-US-BrianNeural".to_string(),
            enable_voiceover: true,
        }
    }
}

/// Accumulates actions for one source file.
#[derive(Debug)]
pub struct BlueprintBuilder {
    filename: String,
    opts: BuilderOptions,
    actions: Vec<Action>,
}

impl BlueprintBuilder {
    #[must_use]
    pub fn new(filename: impl Into<String>, opts: BuilderOptions) -> Self {
        Self {
            filename: filename.into(),
            opts,
            actions: Vec::new(),
        }
    }

    /// Build the blueprint for `segments`, consumed in source order.
    #[must_use]
    pub fn build(mut self, mut segments: Vec<Segment>) -> Blueprint {
        self.actions.push(Action::CreateFile {
            path: self.filename.clone(),
            narration: Voiceover {
                voiceover: Some(format!("Let's create the {} file.", self.filename)),
                voiceover_timing: Some(VoiceoverTiming::Before),
                voice: None,
            },
        });
        self.actions.push(Action::OpenFile {
            path: self.filename.clone(),
        });

        let mut last_end_line = 0usize;
        // A skipped module docstring narrates the next function or class.
        let mut pending_voiceover: Option<String> = None;

        for segment in &mut segments {
            if last_end_line > 0 {
                let gap = segment.start_line.saturating_sub(last_end_line + 1);
                if gap > 0 {
                    self.write_text("\n".repeat(gap), false, None);
                }
            }

            if segment.kind == SegmentKind::Expression {
                if let Some(text) = module_docstring(&segment.code) {
                    pending_voiceover = Some(text);
                    last_end_line = segment.end_line;
                    continue;
                }
            }

            if matches!(segment.kind, SegmentKind::Class | SegmentKind::Function) {
                if let Some(pending) = pending_voiceover.take() {
                    segment.docstring = Some(match segment.docstring.take() {
                        Some(doc) => format!("{pending}\n\n{doc}"),
                        None => pending,
                    });
                }
            }

            match segment.kind {
                SegmentKind::Imports => self.process_plain(segment, false),
                SegmentKind::Function => self.process_definition(segment, true),
                SegmentKind::Class => self.process_definition(segment, false),
                SegmentKind::Variable
                | SegmentKind::Expression
                | SegmentKind::Code => self.process_plain(segment, true),
            }

            last_end_line = segment.end_line;
        }

        let stem = Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("project");
        Blueprint {
            root_folder: format!("{stem}-demo"),
            actions: self.actions,
            global_typing_speed: Some(self.opts.typing_speed),
            action_delay: Some(self.opts.action_delay),
            default_voice: Some(self.opts.voice.clone()),
            enable_voiceover: Some(self.opts.enable_voiceover),
        }
    }

    /// Imports, assignments and leftover code: write, then explain any
    /// comment above by highlighting the first line.
    fn process_plain(&mut self, segment: &Segment, strip: bool) {
        let code = if strip {
            strip_inline_comments(&segment.code, &segment.inline_comments)
        } else {
            segment.code.clone()
        };
        self.write_text(format!("{code}\n"), false, None);

        if let Some(comment) = &segment.comment_above {
            self.highlight(first_line(&code), comment.clone());
        }
        self.inline_highlights(&segment.inline_comments);
    }

    /// Functions and classes: a docstring narrates while the block types;
    /// a comment above narrates over a highlight of the signature instead.
    fn process_definition(&mut self, segment: &Segment, is_function: bool) {
        let clean = strip_inline_comments(&segment.code, &segment.inline_comments);

        if let Some(docstring) = &segment.docstring {
            self.write_text(
                format!("{clean}\n"),
                true,
                Some((docstring.clone(), VoiceoverTiming::During)),
            );
        } else if let Some(comment) = &segment.comment_above {
            self.write_text(format!("{clean}\n"), true, None);
            let anchor = if is_function {
                function_signature(&clean)
            } else {
                first_line(&clean)
            };
            self.highlight(anchor, comment.clone());
        } else {
            self.write_text(format!("{clean}\n"), true, None);
        }

        self.inline_highlights(&segment.inline_comments);
    }

    fn inline_highlights(&mut self, inline_comments: &[InlineComment]) {
        for inline in inline_comments {
            self.highlight(inline.code.clone(), inline.text.clone());
        }
    }

    fn write_text(
        &mut self,
        content: String,
        highlight: bool,
        voiceover: Option<(String, VoiceoverTiming)>,
    ) {
        let narration = match voiceover {
            Some((text, timing)) if self.opts.enable_voiceover => Voiceover {
                voiceover: Some(text),
                voiceover_timing: Some(timing),
                voice: None,
            },
            _ => Voiceover::default(),
        };
        self.actions.push(Action::WriteText {
            content,
            typing_speed: None,
            highlight,
            narration,
        });
    }

    fn highlight(&mut self, find: String, voiceover: String) {
        if !self.opts.enable_voiceover {
            return;
        }
        self.actions.push(Action::Highlight {
            path: Some(self.filename.clone()),
            find,
            search: SearchOpts::default(),
            move_cursor: Some(CursorTarget::EndOfFile),
            narration: Voiceover {
                voiceover: Some(voiceover),
                voiceover_timing: Some(VoiceoverTiming::During),
                voice: None,
            },
        });
    }
}

/// First non-empty, non-comment line, for highlight patterns.
fn first_line(code: &str) -> String {
    code.lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .or_else(|| code.lines().next().map(str::trim))
        .unwrap_or_default()
        .to_string()
}

fn function_signature(code: &str) -> String {
    code.lines()
        .map(str::trim)
        .find(|l| l.starts_with("def ") || l.starts_with("async def "))
        .map_or_else(|| first_line(code), str::to_string)
}

/// Drop trailing `#` comments; they come back as highlight actions.
fn strip_inline_comments(code: &str, inline_comments: &[InlineComment]) -> String {
    if inline_comments.is_empty() {
        return code.to_string();
    }
    code.lines()
        .map(|line| match line.find('#') {
            Some(pos) if !line[..pos].trim().is_empty() => line[..pos].trim_end().to_string(),
            _ => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The narration text of a module-level `"""docstring"""` expression.
fn module_docstring(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.len() >= 6 && trimmed.starts_with("\"\"\"") && trimmed.ends_with("\"\"\"") {
        Some(trimmed[3..trimmed.len() - 3].trim().to_string())
    } else {
        None
    }
}
