//! Tagged action variants
//!
//! The wire format is a flat JSON object with a `type` tag and whatever
//! fields the authoring tool chose to set. Here each kind is a closed enum
//! variant carrying only its valid fields; cross-field rules that serde
//! cannot express (exactly one location selector, `replace` needs `with`)
//! are enforced by [`crate::Blueprint::validate`].

use serde::{Deserialize, Serialize};

/// When a voiceover plays relative to its action's edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceoverTiming {
    /// Play to completion before the edit starts
    Before,
    /// Start playback concurrently with the edit
    During,
    /// Play once the edit is done
    After,
}

/// Cursor destination after an action completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorTarget {
    StartOfFile,
    EndOfFile,
}

/// Optional narration attached to an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voiceover {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voiceover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voiceover_timing: Option<VoiceoverTiming>,
    /// Per-action voice override; falls back to the blueprint default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

impl Voiceover {
    /// Narration text, if any was authored.
    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.voiceover.as_deref()
    }

    /// Timing, defaulting to playing after the edit.
    #[inline]
    #[must_use]
    pub fn timing(&self) -> VoiceoverTiming {
        self.voiceover_timing.unwrap_or(VoiceoverTiming::After)
    }
}

/// Disambiguation hints for pattern searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOpts {
    /// Context text expected within ±20 lines of the match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near: Option<String>,
    /// Alias of `near` kept for blueprint compatibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inside: Option<String>,
    /// 1-indexed occurrence among the (filtered) matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<usize>,
}

/// Validated view of an insert action's location selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertSelector<'a> {
    /// Below the matched line (after the whole block when the line opens one)
    After(&'a str),
    /// Above the matched line
    Before(&'a str),
    /// At the matched line, pushing it down
    At(&'a str),
}

/// One step of a blueprint, tagged by its operation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    CreateFolder { path: String },

    #[serde(rename_all = "camelCase")]
    CreateFile {
        path: String,
        #[serde(flatten)]
        narration: Voiceover,
    },

    #[serde(rename_all = "camelCase")]
    OpenFile { path: String },

    /// Type `content` at the end of the active document.
    #[serde(rename_all = "camelCase")]
    WriteText {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        typing_speed: Option<u64>,
        /// Transient highlight of the freshly typed text
        #[serde(default, skip_serializing_if = "core::ops::Not::not")]
        highlight: bool,
        #[serde(flatten)]
        narration: Voiceover,
    },

    /// Type `content` relative to a pattern-located line.
    #[serde(rename_all = "camelCase")]
    Insert {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        at: Option<String>,
        #[serde(flatten)]
        search: SearchOpts,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        typing_speed: Option<u64>,
        #[serde(flatten)]
        narration: Voiceover,
    },

    /// Remove the line matched by `find`.
    #[serde(rename_all = "camelCase")]
    Delete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        find: String,
        #[serde(flatten)]
        search: SearchOpts,
    },

    /// Replace the matched occurrence of `find` with `with`.
    #[serde(rename_all = "camelCase")]
    Replace {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        find: String,
        #[serde(rename = "with", default, skip_serializing_if = "Option::is_none")]
        replacement: Option<String>,
        #[serde(flatten)]
        search: SearchOpts,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        typing_speed: Option<u64>,
        #[serde(flatten)]
        narration: Voiceover,
    },

    /// Transiently decorate the matched line, usually while narrating.
    #[serde(rename_all = "camelCase")]
    Highlight {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        find: String,
        #[serde(flatten)]
        search: SearchOpts,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        move_cursor: Option<CursorTarget>,
        #[serde(flatten)]
        narration: Voiceover,
    },

    #[serde(rename_all = "camelCase")]
    OpenTerminal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        terminal_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    RunCommand {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        terminal_name: Option<String>,
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
        /// Heuristic wait override in milliseconds
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
        #[serde(default = "default_true")]
        wait_for_completion: bool,
    },

    #[serde(rename_all = "camelCase")]
    ShowTerminal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        terminal_name: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    HideTerminal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        terminal_name: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    CloseTerminal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        terminal_name: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

/// Action tags accepted by the validator, in wire spelling.
pub(crate) const KNOWN_KINDS: &[&str] = &[
    "createFolder",
    "createFile",
    "openFile",
    "writeText",
    "insert",
    "delete",
    "replace",
    "highlight",
    "openTerminal",
    "runCommand",
    "showTerminal",
    "hideTerminal",
    "closeTerminal",
];

impl Action {
    /// Wire-format tag of this action.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateFolder { .. } => "createFolder",
            Action::CreateFile { .. } => "createFile",
            Action::OpenFile { .. } => "openFile",
            Action::WriteText { .. } => "writeText",
            Action::Insert { .. } => "insert",
            Action::Delete { .. } => "delete",
            Action::Replace { .. } => "replace",
            Action::Highlight { .. } => "highlight",
            Action::OpenTerminal { .. } => "openTerminal",
            Action::RunCommand { .. } => "runCommand",
            Action::ShowTerminal { .. } => "showTerminal",
            Action::HideTerminal { .. } => "hideTerminal",
            Action::CloseTerminal { .. } => "closeTerminal",
        }
    }

    /// The validated location selector of an `insert` action.
    ///
    /// Returns `None` for other kinds, or when validation has not run and
    /// the selector is absent.
    #[must_use]
    pub fn insert_selector(&self) -> Option<InsertSelector<'_>> {
        if let Action::Insert {
            after, before, at, ..
        } = self
        {
            if let Some(p) = after {
                return Some(InsertSelector::After(p));
            }
            if let Some(p) = before {
                return Some(InsertSelector::Before(p));
            }
            if let Some(p) = at {
                return Some(InsertSelector::At(p));
            }
        }
        None
    }

    /// Narration attached to this action, if the kind supports one.
    #[must_use]
    pub fn narration(&self) -> Option<&Voiceover> {
        match self {
            Action::CreateFile { narration, .. }
            | Action::WriteText { narration, .. }
            | Action::Insert { narration, .. }
            | Action::Replace { narration, .. }
            | Action::Highlight { narration, .. } => Some(narration),
            _ => None,
        }
    }

    /// Search hints, for kinds that resolve a pattern.
    #[must_use]
    pub fn search(&self) -> Option<&SearchOpts> {
        match self {
            Action::Insert { search, .. }
            | Action::Delete { search, .. }
            | Action::Replace { search, .. }
            | Action::Highlight { search, .. } => Some(search),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_text_roundtrip() {
        let json = r#"{"type":"writeText","content":"x = 1\n","highlight":true,"voiceover":"a variable","voiceoverTiming":"during"}"#;
        let action: Action = serde_json::from_str(json).unwrap();

        match &action {
            Action::WriteText {
                content,
                highlight,
                narration,
                ..
            } => {
                assert_eq!(content, "x = 1\n");
                assert!(highlight);
                assert_eq!(narration.text(), Some("a variable"));
                assert_eq!(narration.timing(), VoiceoverTiming::During);
            }
            other => panic!("unexpected variant: {other:?}"),
        }

        let back = serde_json::to_value(&action).unwrap();
        assert_eq!(back["type"], "writeText");
        assert_eq!(back["voiceoverTiming"], "during");
    }

    #[test]
    fn insert_selector_prefers_after() {
        let action: Action = serde_json::from_str(
            r#"{"type":"insert","content":"pass","after":"def f():","occurrence":2}"#,
        )
        .unwrap();

        assert_eq!(
            action.insert_selector(),
            Some(InsertSelector::After("def f():"))
        );
        assert_eq!(action.search().unwrap().occurrence, Some(2));
    }

    #[test]
    fn replace_with_is_renamed() {
        let action: Action = serde_json::from_str(
            r#"{"type":"replace","find":"foo","with":"bar"}"#,
        )
        .unwrap();

        match action {
            Action::Replace { replacement, .. } => assert_eq!(replacement.as_deref(), Some("bar")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn run_command_waits_by_default() {
        let action: Action =
            serde_json::from_str(r#"{"type":"runCommand","command":"npm install"}"#).unwrap();

        match action {
            Action::RunCommand {
                wait_for_completion,
                ..
            } => assert!(wait_for_completion),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn timing_defaults_to_after() {
        let narration = Voiceover {
            voiceover: Some("hello".into()),
            ..Voiceover::default()
        };
        assert_eq!(narration.timing(), VoiceoverTiming::After);
    }
}
