//! Configuration types for groups, templates and macros
//!
//! These types define the on-disk JSON document and the snapshot each worker
//! receives at spawn time. Workers never observe edits made after spawn.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// A screen rectangle in virtual-desktop coordinates.
///
/// Serialized as `[left, top, right, bottom]`; right must exceed left and
/// bottom must exceed top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[i32; 4]", into = "[i32; 4]")]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Region {
    /// Create a validated region
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Result<Self> {
        if right <= left || bottom <= top {
            return Err(EngineError::InvalidRegion {
                left,
                top,
                right,
                bottom,
            });
        }
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top) as u32
    }
}

impl TryFrom<[i32; 4]> for Region {
    type Error = EngineError;

    fn try_from(v: [i32; 4]) -> Result<Self> {
        Region::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Region> for [i32; 4] {
    fn from(r: Region) -> Self {
        [r.left, r.top, r.right, r.bottom]
    }
}

fn default_search_region() -> Region {
    Region {
        left: 0,
        top: 0,
        right: 100,
        bottom: 100,
    }
}

/// Delays around a single key press, in milliseconds.
///
/// Zero means "skip the wait", not "instantaneous".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTiming {
    #[serde(default = "default_delay_ms")]
    pub pre_delay: u64,
    #[serde(default = "default_delay_ms")]
    pub hold_time: u64,
    #[serde(default = "default_delay_ms")]
    pub post_delay: u64,
}

fn default_delay_ms() -> u64 {
    1
}

impl Default for KeyTiming {
    fn default() -> Self {
        Self {
            pre_delay: 1,
            hold_time: 1,
            post_delay: 1,
        }
    }
}

/// Whether a template fires on being matched or on being absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCondition {
    /// Fire when the score reaches the threshold
    #[default]
    Found,
    /// Fire when the score stays below the threshold
    NotFound,
}

/// One step of a macro sequence, played back verbatim in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MacroAction {
    /// Press and hold a key
    KeyDown { key: String },
    /// Release a held key
    KeyUp { key: String },
    /// Press and release with no delay in between
    KeyPress { key: String },
    /// Block for the given milliseconds (skipped if zero)
    Sleep { ms: u64 },
}

/// One reference image tied to one response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub name: String,
    /// Image file name, resolved against the shared images directory
    pub file: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Similarity threshold in the matcher's normalized output range
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub key_combo: String,
    /// Indicator color shown while this template's action runs
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub timing: KeyTiming,
    #[serde(default)]
    pub trigger_condition: TriggerCondition,
    #[serde(default)]
    pub use_macro: bool,
    #[serde(default, rename = "macro")]
    pub macro_actions: Vec<MacroAction>,
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> f32 {
    0.9
}

fn default_color() -> String {
    "#00ff88".to_string()
}

fn default_spam_interval() -> f64 {
    0.025
}

/// A unit of independent automation: one region, one template list, one hotkey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Global key that toggles this group's run state
    #[serde(default)]
    pub toggle_key: String,
    #[serde(default = "default_search_region")]
    pub search_region: Region,
    #[serde(default)]
    pub spam_enabled: bool,
    /// Key pressed while running with no match on screen
    #[serde(default)]
    pub spam_key: Option<String>,
    #[serde(default)]
    pub spam_timing: KeyTiming,
    /// Minimum seconds between two spam presses
    #[serde(default = "default_spam_interval")]
    pub spam_key_interval: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

/// Organizational folder; no runtime behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderConfig {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub expanded: bool,
    #[serde(default)]
    pub children: Vec<ConfigItem>,
}

/// A node of the configuration tree: a group or a folder of further items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConfigItem {
    Group(GroupConfig),
    Folder(FolderConfig),
}

/// Flatten the item tree into the group list workers are dispatched from.
///
/// Folders are purely organizational; depth-first order preserves the
/// user-visible ordering.
pub fn flatten_items(items: &[ConfigItem]) -> Vec<&GroupConfig> {
    let mut out = Vec::new();
    collect_groups(items, &mut out);
    out
}

fn collect_groups<'a>(items: &'a [ConfigItem], out: &mut Vec<&'a GroupConfig>) {
    for item in items {
        match item {
            ConfigItem::Group(group) => out.push(group),
            ConfigItem::Folder(folder) => collect_groups(&folder.children, out),
        }
    }
}

/// The persisted configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub groups: Vec<ConfigItem>,
}

impl ConfigDocument {
    /// Load from a JSON file; missing fields fall back to their defaults,
    /// which also migrates documents written before a field existed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let doc = serde_json::from_str(&text)?;
        log::info!("config loaded from {}", path.display());
        Ok(doc)
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        log::info!("config saved to {}", path.display());
        Ok(())
    }

    /// All groups in dispatch order, folders flattened away
    pub fn all_groups(&self) -> Vec<&GroupConfig> {
        flatten_items(&self.groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group_json() -> &'static str {
        r##"{
            "id": "g1",
            "name": "Fishing",
            "enabled": true,
            "toggle_key": "f1",
            "search_region": [430, 275, 750, 460],
            "spam_enabled": true,
            "spam_key": "e",
            "spam_timing": {"pre_delay": 1, "hold_time": 2, "post_delay": 3},
            "spam_key_interval": 0.1,
            "templates": [
                {
                    "name": "bite",
                    "file": "bite.png",
                    "enabled": true,
                    "threshold": 0.85,
                    "key_combo": "shift+e",
                    "color": "#ff00ff",
                    "timing": {"pre_delay": 5, "hold_time": 10, "post_delay": 5},
                    "trigger_condition": "found",
                    "use_macro": true,
                    "macro": [
                        {"action": "key_down", "key": "e"},
                        {"action": "sleep", "ms": 40},
                        {"action": "key_up", "key": "e"}
                    ]
                }
            ]
        }"##
    }

    #[test]
    fn test_group_round_trip() {
        let group: GroupConfig = serde_json::from_str(sample_group_json()).unwrap();
        assert_eq!(group.id, "g1");
        assert_eq!(group.search_region.width(), 320);
        assert_eq!(group.templates.len(), 1);

        let template = &group.templates[0];
        assert_eq!(template.threshold, 0.85);
        assert_eq!(template.trigger_condition, TriggerCondition::Found);
        assert_eq!(template.macro_actions[1], MacroAction::Sleep { ms: 40 });

        let text = serde_json::to_string(&group).unwrap();
        let again: GroupConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(group, again);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let group: GroupConfig =
            serde_json::from_str(r#"{"id": "g2", "name": "Minimal"}"#).unwrap();
        assert!(group.enabled);
        assert_eq!(group.spam_key_interval, 0.025);
        assert_eq!(group.search_region, default_search_region());

        let template: TemplateConfig =
            serde_json::from_str(r#"{"name": "t", "file": "t.png"}"#).unwrap();
        assert!(template.enabled);
        assert_eq!(template.threshold, 0.9);
        assert_eq!(template.trigger_condition, TriggerCondition::Found);
        assert_eq!(template.color, "#00ff88");
        assert!(!template.use_macro);
    }

    #[test]
    fn test_region_rejects_degenerate_rect() {
        assert!(Region::new(10, 10, 10, 20).is_err());
        assert!(Region::new(10, 10, 20, 5).is_err());
        assert!(serde_json::from_str::<Region>("[0, 0, 0, 100]").is_err());
    }

    #[test]
    fn test_flatten_preserves_order_through_folders() {
        let doc: ConfigDocument = serde_json::from_str(
            r#"{
                "groups": [
                    {"type": "group", "id": "a", "name": "A"},
                    {"type": "folder", "id": "f", "name": "Farm", "children": [
                        {"type": "group", "id": "b", "name": "B"},
                        {"type": "folder", "id": "f2", "name": "Nested", "children": [
                            {"type": "group", "id": "c", "name": "C"}
                        ]}
                    ]},
                    {"type": "group", "id": "d", "name": "D"}
                ]
            }"#,
        )
        .unwrap();

        let ids: Vec<&str> = doc.all_groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_document_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let group: GroupConfig = serde_json::from_str(sample_group_json()).unwrap();
        let doc = ConfigDocument {
            groups: vec![ConfigItem::Group(group)],
        };
        doc.save(&path).unwrap();

        let loaded = ConfigDocument::load(&path).unwrap();
        assert_eq!(doc, loaded);
    }
}
