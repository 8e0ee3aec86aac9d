//! Blueprint loading and validation
//!
//! Loading is a two-pass affair: a structural pass over raw JSON that yields
//! precise, index-carrying errors (missing `rootFolder`, unknown action
//! tags), then typed deserialization plus cross-field validation. A
//! [`Blueprint`] that made it through [`Blueprint::from_json`] is safe to
//! hand to the sequencer and never mutated afterwards.

use crate::action::{Action, KNOWN_KINDS};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_TYPING_SPEED_MS: u64 = 35;
const DEFAULT_ACTION_DELAY_MS: u64 = 1000;
const DEFAULT_VOICE: &str = "en-US-BrianNeural";

/// A declarative script of editing actions, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    /// Workspace-relative folder all paths resolve under
    pub root_folder: String,
    /// Actions, executed strictly in order
    pub actions: Vec<Action>,
    /// Milliseconds per typed character
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_typing_speed: Option<u64>,
    /// Milliseconds between actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_delay: Option<u64>,
    /// Voice used when an action does not override it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_voice: Option<String>,
    /// Master switch for narration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_voiceover: Option<bool>,
}

impl Blueprint {
    /// Parse and validate a blueprint from its JSON source.
    ///
    /// # Errors
    /// Returns [`ValidationError`] describing the first structural or
    /// cross-field problem found; nothing is executed on failure.
    pub fn from_json(source: &str) -> Result<Self, ValidationError> {
        let raw: Value = serde_json::from_str(source)?;
        check_shape(&raw)?;

        let blueprint: Blueprint = match serde_json::from_value(raw.clone()) {
            Ok(b) => b,
            Err(_) => {
                // Re-deserialize per action for an index-carrying diagnostic.
                return Err(locate_bad_action(&raw));
            }
        };

        blueprint.validate()?;
        Ok(blueprint)
    }

    /// Cross-field rules serde cannot express.
    ///
    /// # Errors
    /// Returns the first violated rule with its action index.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, action) in self.actions.iter().enumerate() {
            if let Action::Insert {
                after, before, at, ..
            } = action
            {
                let found = [after, before, at].iter().filter(|s| s.is_some()).count();
                if found != 1 {
                    return Err(ValidationError::SelectorCount { index, found });
                }
            }

            if let Action::Replace { replacement, .. } = action {
                if replacement.is_none() {
                    return Err(ValidationError::MissingReplacement { index });
                }
            }

            if let Some(search) = action.search() {
                if search.occurrence == Some(0) {
                    return Err(ValidationError::ZeroOccurrence { index });
                }
            }
        }
        Ok(())
    }

    /// Effective typing speed in ms per character.
    #[inline]
    #[must_use]
    pub fn typing_speed_ms(&self) -> u64 {
        self.global_typing_speed.unwrap_or(DEFAULT_TYPING_SPEED_MS)
    }

    /// Effective pause between actions in ms.
    #[inline]
    #[must_use]
    pub fn action_delay_ms(&self) -> u64 {
        self.action_delay.unwrap_or(DEFAULT_ACTION_DELAY_MS)
    }

    /// Effective default narration voice.
    #[inline]
    #[must_use]
    pub fn voice(&self) -> &str {
        self.default_voice.as_deref().unwrap_or(DEFAULT_VOICE)
    }

    /// Whether narration is enabled at all.
    #[inline]
    #[must_use]
    pub fn voiceover_enabled(&self) -> bool {
        self.enable_voiceover.unwrap_or(true)
    }
}

/// Structural pass: required top-level fields and known action tags.
fn check_shape(raw: &Value) -> Result<(), ValidationError> {
    let object = raw
        .as_object()
        .ok_or(ValidationError::WrongType {
            field: "blueprint",
            expected: "a JSON object",
        })?;

    match object.get("rootFolder") {
        None => return Err(ValidationError::MissingField("rootFolder")),
        Some(v) if !v.is_string() => {
            return Err(ValidationError::WrongType {
                field: "rootFolder",
                expected: "a string",
            })
        }
        Some(_) => {}
    }

    let actions = match object.get("actions") {
        None => return Err(ValidationError::MissingField("actions")),
        Some(Value::Array(actions)) => actions,
        Some(_) => {
            return Err(ValidationError::WrongType {
                field: "actions",
                expected: "an array",
            })
        }
    };

    for (index, action) in actions.iter().enumerate() {
        let tag = action
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ValidationError::WrongType {
                field: "actions[].type",
                expected: "a string tag",
            })?;
        if !KNOWN_KINDS.contains(&tag) {
            return Err(ValidationError::UnsupportedAction {
                index,
                tag: tag.to_string(),
            });
        }
    }

    Ok(())
}

/// Pinpoint which action failed typed deserialization.
fn locate_bad_action(raw: &Value) -> ValidationError {
    if let Some(actions) = raw.get("actions").and_then(Value::as_array) {
        for (index, action) in actions.iter().enumerate() {
            if let Err(e) = serde_json::from_value::<Action>(action.clone()) {
                let tag = action
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("?")
                    .to_string();
                return ValidationError::MalformedAction {
                    index,
                    tag,
                    message: e.to_string(),
                };
            }
        }
    }
    // Actions were fine; the failure is in a top-level field.
    ValidationError::WrongType {
        field: "blueprint",
        expected: "well-typed top-level fields",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"{
        "rootFolder": "demo",
        "actions": [
            {"type": "createFile", "path": "main.py"},
            {"type": "openFile", "path": "main.py"},
            {"type": "writeText", "content": "print('hi')\n"}
        ]
    }"#;

    #[test]
    fn minimal_blueprint_loads() {
        let bp = Blueprint::from_json(MINIMAL).unwrap();
        assert_eq!(bp.root_folder, "demo");
        assert_eq!(bp.actions.len(), 3);
        assert_eq!(bp.typing_speed_ms(), 35);
        assert_eq!(bp.action_delay_ms(), 1000);
        assert_eq!(bp.voice(), "en-US-BrianNeural");
        assert!(bp.voiceover_enabled());
    }

    #[test]
    fn missing_root_folder_is_rejected() {
        let err = Blueprint::from_json(r#"{"actions": []}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField("rootFolder")));
    }

    #[test]
    fn missing_actions_is_rejected() {
        let err = Blueprint::from_json(r#"{"rootFolder": "demo"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField("actions")));
    }

    #[test]
    fn unknown_tag_is_rejected_with_index() {
        let err = Blueprint::from_json(
            r#"{"rootFolder": "demo", "actions": [
                {"type": "createFile", "path": "a"},
                {"type": "teleport", "path": "b"}
            ]}"#,
        )
        .unwrap_err();

        match err {
            ValidationError::UnsupportedAction { index, tag } => {
                assert_eq!(index, 1);
                assert_eq!(tag, "teleport");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn insert_needs_exactly_one_selector() {
        let none = Blueprint::from_json(
            r#"{"rootFolder": "demo", "actions": [
                {"type": "insert", "content": "x"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            none,
            ValidationError::SelectorCount { index: 0, found: 0 }
        ));

        let two = Blueprint::from_json(
            r#"{"rootFolder": "demo", "actions": [
                {"type": "insert", "content": "x", "after": "a", "before": "b"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            two,
            ValidationError::SelectorCount { index: 0, found: 2 }
        ));
    }

    #[test]
    fn replace_without_with_is_rejected_before_execution() {
        let err = Blueprint::from_json(
            r#"{"rootFolder": "demo", "actions": [
                {"type": "replace", "find": "foo"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingReplacement { index: 0 }
        ));
    }

    #[test]
    fn zero_occurrence_is_rejected() {
        let err = Blueprint::from_json(
            r#"{"rootFolder": "demo", "actions": [
                {"type": "delete", "find": "foo", "occurrence": 0}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::ZeroOccurrence { index: 0 }));
    }

    #[test]
    fn defaults_can_be_overridden() {
        let bp = Blueprint::from_json(
            r#"{
                "rootFolder": "demo",
                "globalTypingSpeed": 10,
                "actionDelay": 250,
                "defaultVoice": "en-US-AriaNeural",
                "enableVoiceover": false,
                "actions": [{"type": "createFolder", "path": "src"}]
            }"#,
        )
        .unwrap();

        assert_eq!(bp.typing_speed_ms(), 10);
        assert_eq!(bp.action_delay_ms(), 250);
        assert_eq!(bp.voice(), "en-US-AriaNeural");
        assert!(!bp.voiceover_enabled());
    }
}
