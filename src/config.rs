use crate::statics;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Options consumed by the properties codec, the key tree and the visitors.
/// Field names follow the camelCase preference keys so a JSON5 file can set them directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub key_group_separator: String,
    pub group_level_deepness: usize,
    pub align_equal_signs: bool,
    pub align_group_equal_signs: bool,
    pub num_of_lines_between_groups: usize,
    /// Decode `\uXXXX` and standard escapes while parsing.
    pub convert_encoded_to_unicode: bool,
    /// Encode non-ASCII and special characters while generating.
    pub convert_unicode_to_encoded: bool,
    /// Write entries with empty values (as `key = `) instead of dropping them.
    pub keep_empty_fields: bool,
    /// Generate keys sorted instead of in bundle order.
    pub sort_keys: bool,
    pub key_tree_hierarchical: bool,
    /// Show only keys (and their groups) with at least one missing translation.
    pub show_only_incomplete: bool,
    pub commented_counts_as_missing: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            key_group_separator: statics::DEFAULT_KEY_GROUP_SEPARATOR.to_string(),
            group_level_deepness: statics::DEFAULT_GROUP_LEVEL_DEEPNESS,
            align_equal_signs: true,
            align_group_equal_signs: true,
            num_of_lines_between_groups: statics::DEFAULT_LINES_BETWEEN_GROUPS,
            convert_encoded_to_unicode: true,
            convert_unicode_to_encoded: true,
            keep_empty_fields: true,
            sort_keys: false,
            key_tree_hierarchical: true,
            show_only_incomplete: false,
            commented_counts_as_missing: false,
        }
    }
}

impl EditorConfig {
    pub fn from_json5(text: &str) -> anyhow::Result<Self> {
        let config: Self = json5::from_str(text).context("parsing editor config")?;
        config.validated()
    }

    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
        Self::from_json5(&text).with_context(|| format!("loading {path:?}"))
    }

    fn validated(self) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !self.key_group_separator.is_empty(),
            "keyGroupSeparator must not be empty"
        );
        Ok(self)
    }
}
