//! Read-only queries over the key tree and bundles.

use crate::{Bundle, BundleGroup, EditorConfig, Entry, KeyTree, KeyTreeItem, Locale};

/// Decides whether one locale's slot for a key counts as a missing translation.
/// Absent entries and blank values always do; commented entries only when configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissingValuePolicy {
    pub commented_counts_as_missing: bool,
}

impl MissingValuePolicy {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            commented_counts_as_missing: config.commented_counts_as_missing,
        }
    }

    pub fn is_missing(&self, slot: Option<&Entry>) -> bool {
        match slot {
            None => true,
            Some(entry) => {
                !entry.has_value() || (self.commented_counts_as_missing && entry.commented)
            }
        }
    }
}

/// Missing-translation state of one tree item: the item itself (red warning) and
/// anything below it (grey warning).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissingValue {
    missing: bool,
    missing_descendant: bool,
}

impl MissingValue {
    pub fn inspect(tree: &KeyTree, group: &BundleGroup, id: &str, policy: MissingValuePolicy) -> Self {
        let missing = tree.item(id).is_some_and(KeyTreeItem::is_key)
            && group.is_missing_value(id, policy);
        let missing_descendant = tree
            .descendants(id)
            .into_iter()
            .any(|item| item.is_key() && group.is_missing_value(item.id(), policy));
        Self {
            missing,
            missing_descendant,
        }
    }

    pub fn is_missing_value(&self) -> bool {
        self.missing
    }

    pub fn has_missing_descendant(&self) -> bool {
        self.missing_descendant
    }

    /// Not missing itself, but something below is.
    pub fn is_missing_child_value_only(&self) -> bool {
        !self.missing && self.missing_descendant
    }
}

/// True when any locale's entry for `id`, or for a key below it, is commented out.
pub fn is_commented(tree: &KeyTree, group: &BundleGroup, id: &str) -> bool {
    let key_commented = |key: &str| {
        group
            .bundle_entries(key)
            .into_iter()
            .flatten()
            .any(|entry| entry.commented)
    };
    if tree.item(id).is_some_and(KeyTreeItem::is_key) && key_commented(id) {
        return true;
    }
    tree.descendants(id)
        .into_iter()
        .any(|item| item.is_key() && key_commented(item.id()))
}

/// Items whose id starts with a literal prefix, for jump-to-key while typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStartsWith {
    prefix: String,
}

impl KeyStartsWith {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Matches in tree pre-order.
    pub fn collect<'t>(&self, tree: &'t KeyTree) -> Vec<&'t KeyTreeItem> {
        let mut out = Vec::new();
        tree.walk(|item, _| {
            if item.id().starts_with(&self.prefix) {
                out.push(item);
            }
        });
        out
    }

    pub fn first<'t>(&self, tree: &'t KeyTree) -> Option<&'t KeyTreeItem> {
        self.collect(tree).into_iter().next()
    }
}

/// Entries of `bundle` sharing `reference`'s non-empty value, except the reference key itself.
pub fn duplicate_values<'b>(bundle: &'b Bundle, reference: &Entry) -> Vec<&'b Entry> {
    if reference.value.is_empty() {
        return Vec::new();
    }
    bundle
        .entries()
        .filter(|entry| entry.key != reference.key && entry.value == reference.value)
        .collect()
}

/// Group-wide variant: every locale is searched; `locale` tells which bundle holds the reference.
pub fn duplicate_values_in_group<'g>(
    group: &'g BundleGroup,
    locale: &Locale,
    reference: &Entry,
) -> Vec<(&'g Locale, &'g Entry)> {
    if reference.value.is_empty() {
        return Vec::new();
    }
    group
        .bundles()
        .filter_map(|bundle| Some((bundle.locale()?, bundle)))
        .flat_map(|(bundle_locale, bundle)| {
            bundle
                .entries()
                .filter(move |entry| {
                    entry.value == reference.value
                        && !(bundle_locale == locale && entry.key == reference.key)
                })
                .map(move |entry| (bundle_locale, entry))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        KeyStartsWith, MissingValue, MissingValuePolicy, duplicate_values,
        duplicate_values_in_group, is_commented,
    };
    use crate::{Bundle, BundleGroup, Entry, KeyTree, Locale, Updater};

    fn group() -> BundleGroup {
        let mut group = BundleGroup::new();
        group.add_bundle(
            Locale::language("en"),
            Bundle::with_entries([
                Entry::new("app.greeting", "Hello"),
                Entry::new("app.title", "Hello"),
                Entry::new("app.old", "Legacy").with_commented(true),
                Entry::new("other", "x"),
            ]),
        );
        group.add_bundle(
            Locale::language("fr"),
            Bundle::with_entries([
                Entry::new("app.title", "Bonjour"),
                Entry::new("app.old", "Ancien"),
                Entry::new("other", "Hello"),
            ]),
        );
        group
    }

    #[test]
    fn missing_value_distinguishes_item_and_children() {
        let group = group();
        let tree = KeyTree::new(Updater::grouped("."), &group);
        let policy = MissingValuePolicy::default();

        let greeting = MissingValue::inspect(&tree, &group, "app.greeting", policy);
        assert!(greeting.is_missing_value());
        assert!(!greeting.is_missing_child_value_only());

        let app = MissingValue::inspect(&tree, &group, "app", policy);
        assert!(!app.is_missing_value());
        assert!(app.is_missing_child_value_only());

        let other = MissingValue::inspect(&tree, &group, "other", policy);
        assert_eq!(other, MissingValue::default());
    }

    #[test]
    fn commented_entries_count_as_missing_only_when_configured() {
        let group = group();
        let tree = KeyTree::new(Updater::grouped("."), &group);

        let lenient = MissingValuePolicy::default();
        assert!(!MissingValue::inspect(&tree, &group, "app.old", lenient).is_missing_value());

        let strict = MissingValuePolicy {
            commented_counts_as_missing: true,
        };
        assert!(MissingValue::inspect(&tree, &group, "app.old", strict).is_missing_value());
    }

    #[test]
    fn commented_propagates_to_groups() {
        let group = group();
        let tree = KeyTree::new(Updater::grouped("."), &group);
        assert!(is_commented(&tree, &group, "app.old"));
        assert!(is_commented(&tree, &group, "app"));
        assert!(!is_commented(&tree, &group, "app.title"));
        assert!(!is_commented(&tree, &group, "other"));
    }

    #[test]
    fn starts_with_walks_in_tree_order() {
        let group = group();
        let tree = KeyTree::new(Updater::grouped("."), &group);

        let hits = KeyStartsWith::new("app.");
        let ids: Vec<_> = hits.collect(&tree).iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["app.greeting", "app.old", "app.title"]);
        assert_eq!(KeyStartsWith::new("ot").first(&tree).unwrap().id(), "other");
        assert!(KeyStartsWith::new("zzz").first(&tree).is_none());
    }

    #[test]
    fn duplicate_values_exclude_the_reference() {
        let group = group();
        let en = Locale::language("en");
        let reference = group.bundle_entry(&en, "app.greeting").unwrap().clone();

        let dupes = duplicate_values(group.bundle(&en).unwrap(), &reference);
        assert_eq!(dupes.iter().map(|e| e.key.as_str()).collect::<Vec<_>>(), vec!["app.title"]);

        let dupes = duplicate_values_in_group(&group, &en, &reference);
        let found: Vec<_> = dupes
            .iter()
            .map(|(l, e)| format!("{l}:{}", e.key))
            .collect();
        assert_eq!(found, vec!["en:app.title", "fr:other"]);

        assert!(duplicate_values(group.bundle(&en).unwrap(), &Entry::new("k", "")).is_empty());
    }
}
