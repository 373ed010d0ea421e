use crate::event::{ChangeEvent, ListenerId, Listeners};
use crate::visitor::MissingValuePolicy;
use crate::{Bundle, Entry, Locale};
use indexmap::IndexMap;
use std::collections::BTreeSet;

type BundleListener = dyn FnMut(ChangeEvent<&Bundle>);

/// All locale bundles of one resource family, keyed by locale in insertion order.
///
/// Key-level operations apply to every member bundle and fire one event per bundle
/// they actually changed. Operations on absent keys are silent no-ops.
#[derive(Default)]
pub struct BundleGroup {
    bundles: IndexMap<Locale, Bundle>,
    listeners: Listeners<BundleListener>,
}

impl BundleGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(ChangeEvent<&Bundle>) + 'static,
    {
        self.listeners.add(Box::new(listener))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.bundles.keys()
    }

    pub fn bundle(&self, locale: &Locale) -> Option<&Bundle> {
        self.bundles.get(locale)
    }

    pub fn bundles(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.values()
    }

    /// Insert a bundle for a new locale, or merge `bundle` into the existing one
    /// (the re-sync path after the locale's text changed).
    pub fn add_bundle(&mut self, locale: Locale, mut bundle: Bundle) {
        if let Some(existing) = self.bundles.get_mut(&locale) {
            if existing.copy_from(&bundle) {
                tracing::debug!(%locale, "bundle content replaced");
                self.fire_modified(&locale);
            }
            return;
        }
        tracing::debug!(%locale, entries = bundle.len(), "bundle added");
        bundle.set_locale(locale.clone());
        self.bundles.insert(locale.clone(), bundle);
        self.fire(ChangeEvent::Added(&locale));
    }

    pub fn remove_bundle(&mut self, locale: &Locale) -> Option<Bundle> {
        let removed = self.bundles.shift_remove(locale)?;
        for listener in self.listeners.iter_mut() {
            listener(ChangeEvent::Removed(&removed));
        }
        Some(removed)
    }

    /// Replace one locale's entry (value editor path).
    pub fn add_bundle_entry(&mut self, locale: &Locale, entry: Entry) -> bool {
        let Some(bundle) = self.bundles.get_mut(locale) else {
            return false;
        };
        let changed = bundle.add_entry(entry);
        if changed {
            self.fire_modified(locale);
        }
        changed
    }

    /// Give every locale lacking `key` an empty entry.
    pub fn add_key(&mut self, key: &str) {
        self.apply_each(|bundle| {
            if bundle.contains_key(key) {
                return false;
            }
            bundle.add_entry(Entry::new(key, ""))
        });
    }

    pub fn rename_key(&mut self, old_key: &str, new_key: &str) {
        if old_key == new_key {
            return;
        }
        self.apply_each(|bundle| bundle.rename_key(old_key, new_key));
    }

    /// Duplicate `orig_key`'s entry (value, comment, flag) under `new_key` in every locale having it.
    pub fn copy_key(&mut self, orig_key: &str, new_key: &str) {
        if orig_key == new_key {
            return;
        }
        self.apply_each(|bundle| {
            let Some(orig) = bundle.entry(orig_key) else {
                return false;
            };
            let copy = Entry {
                key: new_key.to_string(),
                ..orig.clone()
            };
            bundle.add_entry(copy)
        });
    }

    pub fn remove_key(&mut self, key: &str) {
        self.apply_each(|bundle| bundle.remove_entry(key).is_some());
    }

    pub fn comment_key(&mut self, key: &str) {
        self.set_commented(key, true);
    }

    pub fn uncomment_key(&mut self, key: &str) {
        self.set_commented(key, false);
    }

    fn set_commented(&mut self, key: &str, commented: bool) {
        self.apply_each(|bundle| bundle.update_entry(key, |e| e.commented = commented));
    }

    /// Sorted union of all bundles' keys.
    pub fn keys(&self) -> Vec<String> {
        self.key_set().into_iter().map(str::to_string).collect()
    }

    fn key_set(&self) -> BTreeSet<&str> {
        self.bundles.values().flat_map(Bundle::keys).collect()
    }

    pub fn is_key(&self, key: &str) -> bool {
        self.bundles.values().any(|b| b.contains_key(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.is_key(key)
    }

    /// One slot per locale, in group order; `None` where the locale lacks the key.
    pub fn bundle_entries(&self, key: &str) -> Vec<Option<&Entry>> {
        self.bundles.values().map(|b| b.entry(key)).collect()
    }

    pub fn bundle_entry(&self, locale: &Locale, key: &str) -> Option<&Entry> {
        self.bundles.get(locale)?.entry(key)
    }

    /// True when `key` exists and some locale has no usable value for it.
    pub fn is_missing_value(&self, key: &str, policy: MissingValuePolicy) -> bool {
        let entries = self.bundle_entries(key);
        if entries.iter().all(Option::is_none) {
            return false;
        }
        entries.iter().any(|slot| policy.is_missing(*slot))
    }

    /// The key after `key` in sorted order; `None` past the end.
    pub fn next_key(&self, key: &str) -> Option<String> {
        use std::ops::Bound::{Excluded, Unbounded};
        let keys = self.key_set();
        keys.range::<&str, _>((Excluded(key), Unbounded))
            .next()
            .map(|k| k.to_string())
    }

    /// The key before `key` in sorted order; `None` before the start.
    pub fn previous_key(&self, key: &str) -> Option<String> {
        let keys = self.key_set();
        keys.range::<&str, _>(..key)
            .next_back()
            .map(|k| k.to_string())
    }

    fn apply_each(&mut self, mut f: impl FnMut(&mut Bundle) -> bool) {
        let mut changed = Vec::new();
        for (locale, bundle) in self.bundles.iter_mut() {
            if f(bundle) {
                changed.push(locale.clone());
            }
        }
        for locale in &changed {
            self.fire_modified(locale);
        }
    }

    fn fire_modified(&mut self, locale: &Locale) {
        self.fire(ChangeEvent::Modified(locale));
    }

    fn fire(&mut self, event: ChangeEvent<&Locale>) {
        let Some(bundle) = self.bundles.get(*event.payload()) else {
            return;
        };
        let event = event.map(|_| bundle);
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

impl std::fmt::Debug for BundleGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleGroup")
            .field("bundles", &self.bundles)
            .field("listeners", &self.listeners)
            .finish()
    }
}
