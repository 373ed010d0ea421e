use crate::Locale;
use crate::event::{ChangeEvent, ListenerId, Listeners};
use indexmap::IndexMap;

/// One key/value pair of a single locale, with the comment lines preceding it.
/// `commented` entries were written as `##key = value` and are kept for round-tripping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    /// Raw comment lines, each terminated by `\n` (markers included).
    pub comment: String,
    pub commented: bool,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_commented(mut self, commented: bool) -> Self {
        self.commented = commented;
        self
    }

    /// Empty or whitespace-only values count as no translation.
    pub fn has_value(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

type EntryListener = dyn FnMut(ChangeEvent<&Entry>);

/// Ordered, key-unique entries of one locale plus the file-level comment.
///
/// The bundle never notifies its group; group operations fire the group event
/// after mutating a member bundle.
#[derive(Default)]
pub struct Bundle {
    locale: Option<Locale>,
    comment: String,
    entries: IndexMap<String, Entry>,
    listeners: Listeners<EntryListener>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut bundle = Self::new();
        for entry in entries {
            bundle.entries.insert(entry.key.clone(), entry);
        }
        bundle
    }

    /// `None` until the bundle is attached to a group.
    pub fn locale(&self) -> Option<&Locale> {
        self.locale.as_ref()
    }

    pub(crate) fn set_locale(&mut self, locale: Locale) {
        self.locale = Some(locale);
    }

    /// Text preceding the first entry, each line terminated by `\n`.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(ChangeEvent<&Entry>) + 'static,
    {
        self.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Insert, or replace in place when the key exists. Returns `false` if nothing changed.
    pub fn add_entry(&mut self, entry: Entry) -> bool {
        let key = entry.key.clone();
        let event = match self.entries.get_mut(&key) {
            Some(existing) if *existing == entry => return false,
            Some(existing) => {
                *existing = entry;
                ChangeEvent::Modified(key)
            }
            None => {
                self.entries.insert(key.clone(), entry);
                ChangeEvent::Added(key)
            }
        };
        self.fire(event);
        true
    }

    pub fn remove_entry(&mut self, key: &str) -> Option<Entry> {
        let removed = self.entries.shift_remove(key)?;
        for listener in self.listeners.iter_mut() {
            listener(ChangeEvent::Removed(&removed));
        }
        Some(removed)
    }

    /// Re-key in place, keeping value, comment and position.
    /// An existing entry under `new_key` is replaced.
    pub fn rename_key(&mut self, old_key: &str, new_key: &str) -> bool {
        if old_key == new_key || !self.entries.contains_key(old_key) {
            return false;
        }
        if let Some(clobbered) = self.entries.shift_remove(new_key) {
            for listener in self.listeners.iter_mut() {
                listener(ChangeEvent::Removed(&clobbered));
            }
        }
        let Some((index, _, mut entry)) = self.entries.shift_remove_full(old_key) else {
            return false;
        };
        for listener in self.listeners.iter_mut() {
            listener(ChangeEvent::Removed(&entry));
        }
        entry.key = new_key.to_string();
        self.entries.shift_insert(index, new_key.to_string(), entry);
        self.fire(ChangeEvent::Added(new_key.to_string()));
        true
    }

    /// Apply `f` to the entry for `key`. Returns `false` if absent or unchanged.
    pub fn update_entry(&mut self, key: &str, f: impl FnOnce(&mut Entry)) -> bool {
        let Some(existing) = self.entries.get(key) else {
            return false;
        };
        let mut updated = existing.clone();
        f(&mut updated);
        updated.key = key.to_string();
        self.add_entry(updated)
    }

    /// Replace the full content with `other`'s (file comment and entries, in `other`'s order).
    /// Listeners see the difference: removed, added and modified entries.
    /// Returns `false` if the content was already identical.
    pub fn copy_from(&mut self, other: &Bundle) -> bool {
        if self.content_eq(other) {
            return false;
        }
        let previous = std::mem::replace(&mut self.entries, other.entries.clone());
        self.comment = other.comment.clone();

        if self.listeners.is_empty() {
            return true;
        }
        for (key, old) in &previous {
            if !self.entries.contains_key(key) {
                for listener in self.listeners.iter_mut() {
                    listener(ChangeEvent::Removed(old));
                }
            }
        }
        for (key, new) in &self.entries {
            let event = match previous.get(key) {
                None => ChangeEvent::Added(new),
                Some(old) if old != new => ChangeEvent::Modified(new),
                Some(_) => continue,
            };
            for listener in self.listeners.iter_mut() {
                listener(event);
            }
        }
        true
    }

    fn content_eq(&self, other: &Bundle) -> bool {
        self.comment == other.comment
            && self.entries.len() == other.entries.len()
            && self.entries.iter().eq(other.entries.iter())
    }

    fn fire(&mut self, event: ChangeEvent<String>) {
        if self.listeners.is_empty() {
            return;
        }
        let Some(entry) = self.entries.get(event.payload().as_str()) else {
            return;
        };
        let event = event.map(|_| entry);
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

impl Clone for Bundle {
    /// Clones content and locale; listeners stay with the original.
    fn clone(&self) -> Self {
        Self {
            locale: self.locale.clone(),
            comment: self.comment.clone(),
            entries: self.entries.clone(),
            listeners: Listeners::new(),
        }
    }
}

impl PartialEq for Bundle {
    /// Content equality: file comment and entries in order.
    fn eq(&self, other: &Self) -> bool {
        self.content_eq(other)
    }
}

impl Eq for Bundle {}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("locale", &self.locale)
            .field("comment", &self.comment)
            .field("entries", &self.entries.values().collect::<Vec<_>>())
            .finish()
    }
}
