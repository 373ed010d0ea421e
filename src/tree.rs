//! Hierarchical projection of a bundle group's keys.
//!
//! Items live in an arena keyed by id (the full key path up to the item). Parent links are
//! ids, children are id-sorted sets, so sibling order never depends on insertion order.

use crate::event::{ChangeEvent, ListenerId, Listeners};
use crate::{BundleGroup, EditorConfig, Updater};
use std::collections::{BTreeSet, HashMap};

/// Which role an item plays in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Exists only because deeper keys share its prefix.
    GroupOnly,
    Key,
    /// A real key that also has descendants (`a.b` next to `a.b.c`).
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTreeItem {
    id: String,
    name: String,
    parent: Option<String>,
    children: BTreeSet<String>,
    is_key: bool,
}

impl KeyTreeItem {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Last segment of the id (the whole key in flat mode).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(String::as_str)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn state(&self) -> ItemState {
        match (self.is_key, self.has_children()) {
            (true, true) => ItemState::Both,
            (true, false) => ItemState::Key,
            (false, _) => ItemState::GroupOnly,
        }
    }
}

/// Arena storage shared with the updaters. Structural changes queue events in `pending`.
#[derive(Debug, Default)]
pub(crate) struct Items {
    cache: HashMap<String, KeyTreeItem>,
    roots: BTreeSet<String>,
    pending: Vec<ChangeEvent<String>>,
}

impl Items {
    pub(crate) fn is_key(&self, id: &str) -> bool {
        self.cache.get(id).is_some_and(|item| item.is_key)
    }

    /// Create `id` under `parent` (or as a root) unless it exists. New items start group-only.
    pub(crate) fn ensure(&mut self, id: &str, name: &str, parent: Option<&str>) {
        if self.cache.contains_key(id) {
            return;
        }
        match parent.and_then(|p| self.cache.get_mut(p)) {
            Some(parent_item) => {
                parent_item.children.insert(id.to_string());
            }
            None => {
                self.roots.insert(id.to_string());
            }
        }
        self.cache.insert(
            id.to_string(),
            KeyTreeItem {
                id: id.to_string(),
                name: name.to_string(),
                parent: parent.map(str::to_string),
                children: BTreeSet::new(),
                is_key: false,
            },
        );
        self.pending.push(ChangeEvent::Added(id.to_string()));
    }

    pub(crate) fn mark_key(&mut self, id: &str) {
        let Some(item) = self.cache.get_mut(id) else {
            return;
        };
        if item.is_key {
            return;
        }
        item.is_key = true;
        // A freshly created item already announced itself as added.
        let just_added = matches!(self.pending.last(), Some(ChangeEvent::Added(last)) if last == id);
        if !just_added {
            self.pending.push(ChangeEvent::Modified(id.to_string()));
        }
    }

    /// Drop the key role of `id`. Items that still have children are demoted to group-only;
    /// otherwise the item goes, and so do ancestors left as empty groups.
    pub(crate) fn remove_key(&mut self, id: &str) -> bool {
        let Some(item) = self.cache.get_mut(id) else {
            tracing::debug!(id, "no tree item to remove");
            return false;
        };
        if !item.is_key {
            return false;
        }
        if item.has_children() {
            item.is_key = false;
            self.pending.push(ChangeEvent::Modified(id.to_string()));
            return true;
        }

        let mut next = self.detach(id);
        while let Some(parent_id) = next {
            let Some(parent) = self.cache.get(&parent_id) else {
                break;
            };
            if parent.is_key || parent.has_children() {
                break;
            }
            next = self.detach(&parent_id);
        }
        true
    }

    /// Unlink and drop one item; returns its parent id.
    fn detach(&mut self, id: &str) -> Option<String> {
        let item = self.cache.remove(id)?;
        match item.parent.as_deref().and_then(|p| self.cache.get_mut(p)) {
            Some(parent) => {
                parent.children.remove(id);
            }
            None => {
                self.roots.remove(id);
            }
        }
        self.pending.push(ChangeEvent::Removed(id.to_string()));
        item.parent
    }

    pub(crate) fn touch(&mut self, id: &str) {
        if self.cache.contains_key(id) {
            self.pending.push(ChangeEvent::Modified(id.to_string()));
        }
    }

    fn clear(&mut self) {
        let mut ids: Vec<String> = self.cache.keys().cloned().collect();
        ids.sort();
        self.pending
            .extend(ids.into_iter().rev().map(ChangeEvent::Removed));
        self.cache.clear();
        self.roots.clear();
    }
}

type TreeListener = dyn FnMut(ChangeEvent<&str>);

/// Key tree maintained from a [`BundleGroup`] by the active [`Updater`].
///
/// Every mutating call leaves the tree consistent with the group it was given, then
/// delivers the queued item events (`Added`/`Removed`/`Modified` with the item id).
pub struct KeyTree {
    items: Items,
    updater: Updater,
    listeners: Listeners<TreeListener>,
}

impl KeyTree {
    pub fn new(updater: Updater, group: &BundleGroup) -> Self {
        let mut tree = Self {
            items: Items::default(),
            updater,
            listeners: Listeners::new(),
        };
        tree.load(group);
        tree.items.pending.clear();
        tree
    }

    pub fn from_config(config: &EditorConfig, group: &BundleGroup) -> Self {
        Self::new(Updater::from_config(config), group)
    }

    pub fn updater(&self) -> &Updater {
        &self.updater
    }

    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(ChangeEvent<&str>) + 'static,
    {
        self.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Swap the projection rules and rebuild everything from `group`.
    pub fn set_updater(&mut self, updater: Updater, group: &BundleGroup) {
        self.updater = updater;
        self.rebuild(group);
    }

    /// Full rebuild; also the recovery path when the tree fell out of sync.
    pub fn rebuild(&mut self, group: &BundleGroup) {
        self.items.clear();
        self.load(group);
        tracing::debug!(items = self.items.cache.len(), "key tree rebuilt");
        self.flush();
    }

    pub fn add_key(&mut self, group: &BundleGroup, key: &str) {
        self.updater.add_key(&mut self.items, group, key);
        self.flush();
    }

    pub fn remove_key(&mut self, key: &str) {
        self.updater.remove_key(&mut self.items, key);
        self.flush();
    }

    /// Values of `key` changed; structure stays unless the incomplete filter now
    /// hides or shows the key.
    pub fn modify_key(&mut self, group: &BundleGroup, key: &str) {
        if self.updater.is_filtered() {
            let was_key = self.items.is_key(key);
            self.updater.add_key(&mut self.items, group, key);
            if was_key && self.items.is_key(key) {
                self.touch_with_ancestors(key);
            }
        } else if self.items.is_key(key) {
            self.touch_with_ancestors(key);
        } else {
            tracing::warn!(key, "modify for a key the tree does not know; tree out of sync");
        }
        self.flush();
    }

    /// Reconcile with `group` after arbitrary changes (e.g. a re-parsed locale):
    /// add new keys, drop vanished ones, refresh the rest.
    pub fn synchronize(&mut self, group: &BundleGroup) {
        let keys: BTreeSet<String> = group.keys().into_iter().collect();
        let mut stale: Vec<String> = self
            .items
            .cache
            .values()
            .filter(|item| item.is_key && !keys.contains(&item.id))
            .map(|item| item.id.clone())
            .collect();
        stale.sort();
        for key in &stale {
            self.updater.remove_key(&mut self.items, key);
        }
        for key in &keys {
            let was_key = self.items.is_key(key);
            self.updater.add_key(&mut self.items, group, key);
            if was_key && self.items.is_key(key) {
                self.items.touch(key);
            }
        }
        self.flush();
    }

    pub fn len(&self) -> usize {
        self.items.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.cache.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.cache.contains_key(id)
    }

    pub fn item(&self, id: &str) -> Option<&KeyTreeItem> {
        self.items.cache.get(id)
    }

    pub fn roots(&self) -> impl Iterator<Item = &KeyTreeItem> {
        self.items
            .roots
            .iter()
            .filter_map(|id| self.items.cache.get(id))
    }

    pub fn children(&self, id: &str) -> impl Iterator<Item = &KeyTreeItem> {
        self.items
            .cache
            .get(id)
            .into_iter()
            .flat_map(|item| item.children.iter())
            .filter_map(|child| self.items.cache.get(child))
    }

    pub fn parent(&self, id: &str) -> Option<&KeyTreeItem> {
        let parent = self.items.cache.get(id)?.parent.as_deref()?;
        self.items.cache.get(parent)
    }

    /// Parent first, root last.
    pub fn ancestors(&self, id: &str) -> Vec<&KeyTreeItem> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(item) = current {
            out.push(item);
            current = self.parent(&item.id);
        }
        out
    }

    /// All items below `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: &str) -> Vec<&KeyTreeItem> {
        let mut out = Vec::new();
        for child in self.children(id) {
            self.collect_pre_order(child, 0, &mut |item, _| out.push(item));
        }
        out
    }

    /// Visit every item in pre-order (roots and siblings id-sorted) with its depth.
    pub fn walk<'a>(&'a self, mut visitor: impl FnMut(&'a KeyTreeItem, usize)) {
        for root in self.roots() {
            self.collect_pre_order(root, 0, &mut visitor);
        }
    }

    /// All ids in pre-order.
    pub fn ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(|item, _| out.push(item.id()));
        out
    }

    /// Ids of items that are real keys, in pre-order.
    pub fn key_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(|item, _| {
            if item.is_key {
                out.push(item.id());
            }
        });
        out
    }

    fn collect_pre_order<'a>(
        &'a self,
        item: &'a KeyTreeItem,
        depth: usize,
        visitor: &mut dyn FnMut(&'a KeyTreeItem, usize),
    ) {
        visitor(item, depth);
        for child in self.children(&item.id) {
            self.collect_pre_order(child, depth + 1, visitor);
        }
    }

    fn touch_with_ancestors(&mut self, key: &str) {
        let mut ids = vec![key.to_string()];
        ids.extend(self.ancestors(key).into_iter().map(|item| item.id.clone()));
        for id in ids {
            self.items.touch(&id);
        }
    }

    fn load(&mut self, group: &BundleGroup) {
        for key in group.keys() {
            self.updater.add_key(&mut self.items, group, &key);
        }
    }

    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.items.pending);
        for event in &pending {
            let event = event.as_ref().map(String::as_str);
            for listener in self.listeners.iter_mut() {
                listener(event);
            }
        }
    }
}

impl std::fmt::Debug for KeyTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyTree")
            .field("updater", &self.updater)
            .field("ids", &self.ids())
            .finish()
    }
}
