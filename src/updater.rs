use crate::tree::Items;
use crate::visitor::MissingValuePolicy;
use crate::{BundleGroup, EditorConfig};

/// How the key tree reacts structurally to keys being added or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Updater {
    /// One root item per key.
    Flat,
    /// Keys split on `separator` into a hierarchy of group and key items.
    Grouped { separator: String },
    /// Only keys with a missing translation (plus their groups), laid out by `inner`.
    Incomplete {
        inner: Box<Updater>,
        policy: MissingValuePolicy,
    },
}

impl Updater {
    /// Hierarchical layout; an empty separator cannot split anything and gives `Flat`.
    pub fn grouped(separator: &str) -> Self {
        if separator.is_empty() {
            tracing::warn!("empty key group separator, using flat layout");
            return Updater::Flat;
        }
        Updater::Grouped {
            separator: separator.to_string(),
        }
    }

    pub fn incomplete(inner: Updater, policy: MissingValuePolicy) -> Self {
        Updater::Incomplete {
            inner: Box::new(inner),
            policy,
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        let layout = if config.key_tree_hierarchical {
            Self::grouped(&config.key_group_separator)
        } else {
            Updater::Flat
        };
        if config.show_only_incomplete {
            Self::incomplete(layout, MissingValuePolicy::from_config(config))
        } else {
            layout
        }
    }

    /// True for the incomplete filter, whose projection depends on values, not only keys.
    pub fn is_filtered(&self) -> bool {
        matches!(self, Updater::Incomplete { .. })
    }

    /// Separator of the underlying layout; `None` when flat.
    pub fn separator(&self) -> Option<&str> {
        match self {
            Updater::Flat => None,
            Updater::Grouped { separator } if separator.is_empty() => None,
            Updater::Grouped { separator } => Some(separator),
            Updater::Incomplete { inner, .. } => inner.separator(),
        }
    }

    pub(crate) fn add_key(&self, items: &mut Items, group: &BundleGroup, key: &str) {
        match self {
            Updater::Flat => {
                items.ensure(key, key, None);
                items.mark_key(key);
            }
            Updater::Grouped { separator } if separator.is_empty() => {
                items.ensure(key, key, None);
                items.mark_key(key);
            }
            Updater::Grouped { separator } => {
                let mut parent: Option<&str> = None;
                let mut start = 0;
                let ends = key
                    .match_indices(separator.as_str())
                    .map(|(pos, _)| pos)
                    .chain(std::iter::once(key.len()));
                for end in ends {
                    let id = &key[..end];
                    items.ensure(id, &key[start..end], parent);
                    parent = Some(id);
                    start = end + separator.len();
                }
                items.mark_key(key);
            }
            Updater::Incomplete { inner, policy } => {
                // The key's answer can change the answer of every key above it.
                let separator = inner.separator();
                let mut id = key;
                loop {
                    if is_incomplete(group, id, separator, *policy) {
                        inner.add_key(items, group, id);
                    } else {
                        inner.remove_key(items, id);
                    }
                    match separator.and_then(|sep| id.rfind(sep)) {
                        Some(pos) => id = &id[..pos],
                        None => break,
                    }
                }
            }
        }
    }

    pub(crate) fn remove_key(&self, items: &mut Items, key: &str) {
        match self {
            Updater::Incomplete { inner, .. } => inner.remove_key(items, key),
            Updater::Flat | Updater::Grouped { .. } => {
                items.remove_key(key);
            }
        }
    }
}

/// A key is shown by the incomplete filter while it, or any key below it, lacks a value.
fn is_incomplete(
    group: &BundleGroup,
    id: &str,
    separator: Option<&str>,
    policy: MissingValuePolicy,
) -> bool {
    if !group.is_key(id) {
        return false;
    }
    if group.is_missing_value(id, policy) {
        return true;
    }
    let Some(separator) = separator else {
        return false;
    };
    let prefix = format!("{id}{separator}");
    group
        .keys()
        .iter()
        .any(|key| key.starts_with(&prefix) && group.is_missing_value(key, policy))
}
