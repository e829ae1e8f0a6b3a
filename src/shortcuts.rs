//! Key-sequence shortcut lookup for detected box models.
//!
//! Gateway announcements carry a `box_model` field. The model family selects
//! an externally provided mapping of control names to key sequences; any
//! failure along the way (missing file, malformed data) skips configuration
//! for the session and nothing else.

use std::path::PathBuf;

use serde_json::Value;

use crate::error::Result;

/// A named control bound to a key sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    /// Identifier of the control the sequence binds to.
    pub control: String,
    /// Key sequence sent when the control fires.
    pub sequence: String,
}

/// Source of raw shortcut mappings, looked up by model family.
pub trait ShortcutSource: Send + Sync {
    /// Fetch the raw JSON mapping for `family`.
    fn load(&self, family: &str) -> Result<String>;
}

/// Reads `<root>/<family>/shortcuts.json`.
pub struct DirShortcutSource {
    root: PathBuf,
}

impl DirShortcutSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ShortcutSource for DirShortcutSource {
    fn load(&self, family: &str) -> Result<String> {
        Ok(std::fs::read_to_string(
            self.root.join(family).join("shortcuts.json"),
        )?)
    }
}

/// Model family of a full model identifier: `"fbx8am-r1"` becomes `"fbx8am"`.
pub fn model_family(model: &str) -> &str {
    match model.split_once('-') {
        Some((family, _)) => family,
        None => model,
    }
}

/// Parse a raw shortcut mapping.
///
/// The format is a JSON array of single-entry objects mapping a control name
/// to its key sequence. Entries with an empty or non-string sequence are
/// dropped.
pub fn parse(raw: &str) -> Result<Vec<Shortcut>> {
    let entries: Vec<serde_json::Map<String, Value>> = serde_json::from_str(raw)?;
    let mut shortcuts = Vec::new();
    for entry in entries {
        if let Some((control, value)) = entry.into_iter().next() {
            if let Some(sequence) = value.as_str() {
                if !sequence.is_empty() {
                    shortcuts.push(Shortcut {
                        control,
                        sequence: sequence.to_string(),
                    });
                }
            }
        }
    }
    Ok(shortcuts)
}
