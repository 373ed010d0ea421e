use crate::error::EditorError;
use crate::event::{ChangeEvent, ListenerId};
use crate::source::{Persistence, TextSource};
use crate::visitor::{self, MissingValue, MissingValuePolicy};
use crate::{Bundle, BundleGroup, EditorConfig, Entry, FileSource, KeyTree, Locale, Updater, codec};
use std::{cell::RefCell, rc::Rc};

/// Outcome of loading locales from a text source.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<Locale>,
    /// Locales whose text could not be read or parsed; they stay out of the group.
    pub failures: Vec<(Locale, anyhow::Error)>,
}

impl LoadReport {
    pub fn is_failed(&self, locale: &Locale) -> bool {
        self.failures.iter().any(|(l, _)| l == locale)
    }
}

/// Keeps a text source, the bundle group and the key tree in step.
///
/// Text flows in through [`BundleEditor::new`] and [`BundleEditor::refresh`]; edits
/// flow out by regenerating every locale whose bundle fired `Modified`.
pub struct BundleEditor<S: TextSource> {
    source: S,
    config: EditorConfig,
    group: BundleGroup,
    tree: KeyTree,
    changed: Rc<RefCell<Vec<Locale>>>,
    report: LoadReport,
}

impl<S: TextSource> BundleEditor<S> {
    pub fn new(mut source: S, config: EditorConfig) -> Self {
        let mut group = BundleGroup::new();
        let mut report = LoadReport::default();
        for locale in source.locales() {
            match read_bundle(&mut source, &locale, &config) {
                Ok(bundle) => {
                    group.add_bundle(locale.clone(), bundle);
                    report.loaded.push(locale);
                }
                Err(err) => {
                    tracing::warn!(%locale, error = %err, "locale failed to load");
                    report.failures.push((locale, err));
                }
            }
        }

        // Listeners only see the bundle; regeneration happens after the operation returns.
        let changed = Rc::new(RefCell::new(Vec::new()));
        let queue = Rc::clone(&changed);
        group.add_listener(move |event| {
            if let ChangeEvent::Modified(bundle) = event {
                if let Some(locale) = bundle.locale() {
                    queue.borrow_mut().push(locale.clone());
                }
            }
        });

        let tree = KeyTree::from_config(&config, &group);
        tracing::info!(
            base_name = source.base_name(),
            locales = group.len(),
            failed = report.failures.len(),
            "bundle editor ready"
        );
        Self {
            source,
            config,
            group,
            tree,
            changed,
            report,
        }
    }

    pub fn group(&self) -> &BundleGroup {
        &self.group
    }

    pub fn tree(&self) -> &KeyTree {
        &self.tree
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn add_tree_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(ChangeEvent<&str>) + 'static,
    {
        self.tree.add_listener(listener)
    }

    pub fn remove_tree_listener(&mut self, id: ListenerId) -> bool {
        self.tree.remove_listener(id)
    }

    pub fn policy(&self) -> MissingValuePolicy {
        MissingValuePolicy::from_config(&self.config)
    }

    pub fn missing_value(&self, id: &str) -> MissingValue {
        MissingValue::inspect(&self.tree, &self.group, id, self.policy())
    }

    pub fn is_commented(&self, id: &str) -> bool {
        visitor::is_commented(&self.tree, &self.group, id)
    }

    pub fn add_key(&mut self, key: &str) -> anyhow::Result<()> {
        let lacking: Vec<Locale> = self
            .group
            .locales()
            .filter(|l| self.group.bundle_entry(l, key).is_none())
            .cloned()
            .collect();
        self.ensure_writable(lacking.iter())?;
        self.group.add_key(key);
        if self.group.is_key(key) {
            self.tree.add_key(&self.group, key);
        }
        self.write_changed()
    }

    pub fn rename_key(&mut self, old_key: &str, new_key: &str) -> anyhow::Result<()> {
        if old_key == new_key {
            return Ok(());
        }
        self.ensure_writable(self.locales_with(old_key).iter())?;
        self.group.rename_key(old_key, new_key);
        if !self.group.is_key(old_key) {
            self.tree.remove_key(old_key);
            self.recheck_filtered(old_key);
        }
        if self.group.is_key(new_key) {
            self.tree.add_key(&self.group, new_key);
        }
        self.write_changed()
    }

    pub fn copy_key(&mut self, orig_key: &str, new_key: &str) -> anyhow::Result<()> {
        if orig_key == new_key {
            return Ok(());
        }
        self.ensure_writable(self.locales_with(orig_key).iter())?;
        self.group.copy_key(orig_key, new_key);
        if self.group.is_key(new_key) {
            self.tree.add_key(&self.group, new_key);
        }
        self.write_changed()
    }

    pub fn remove_key(&mut self, key: &str) -> anyhow::Result<()> {
        self.ensure_writable(self.locales_with(key).iter())?;
        self.group.remove_key(key);
        self.tree.remove_key(key);
        self.recheck_filtered(key);
        self.write_changed()
    }

    /// Regenerate locales still queued, e.g. after a failed write.
    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.write_changed()
    }

    pub fn comment_key(&mut self, key: &str) -> anyhow::Result<()> {
        self.set_commented(key, true)
    }

    pub fn uncomment_key(&mut self, key: &str) -> anyhow::Result<()> {
        self.set_commented(key, false)
    }

    fn set_commented(&mut self, key: &str, commented: bool) -> anyhow::Result<()> {
        self.ensure_writable(self.locales_with(key).iter())?;
        if commented {
            self.group.comment_key(key);
        } else {
            self.group.uncomment_key(key);
        }
        if self.tree.contains(key) || self.tree.updater().is_filtered() {
            self.tree.modify_key(&self.group, key);
        }
        self.write_changed()
    }

    /// Value-editor path: set one locale's value, keeping its comment and flag.
    pub fn set_value(&mut self, locale: &Locale, key: &str, value: &str) -> anyhow::Result<()> {
        if self.group.bundle(locale).is_none() {
            return Err(EditorError::UnknownLocale(locale.clone()).into());
        }
        self.ensure_writable(std::iter::once(locale))?;

        let was_key = self.group.is_key(key);
        let entry = match self.group.bundle_entry(locale, key) {
            Some(existing) => Entry {
                value: value.to_string(),
                ..existing.clone()
            },
            None => Entry::new(key, value),
        };
        if !self.group.add_bundle_entry(locale, entry) {
            return Ok(());
        }
        if was_key {
            self.tree.modify_key(&self.group, key);
        } else {
            self.tree.add_key(&self.group, key);
        }
        self.write_changed()
    }

    pub fn set_hierarchical(&mut self, hierarchical: bool) {
        self.config.key_tree_hierarchical = hierarchical;
        self.apply_updater();
    }

    pub fn set_show_only_incomplete(&mut self, show_only_incomplete: bool) {
        self.config.show_only_incomplete = show_only_incomplete;
        self.apply_updater();
    }

    fn apply_updater(&mut self) {
        self.tree
            .set_updater(Updater::from_config(&self.config), &self.group);
    }

    /// Re-parse every locale whose text changed outside the editor and reconcile
    /// the tree. Returns the locales that were re-read.
    pub fn refresh(&mut self) -> anyhow::Result<Vec<Locale>> {
        let mut reread = Vec::new();
        for locale in self.source.locales() {
            let known = self.group.bundle(&locale).is_some();
            if known && !self.source.is_cache_dirty(&locale) {
                continue;
            }
            match read_bundle(&mut self.source, &locale, &self.config) {
                Ok(bundle) => {
                    self.report.failures.retain(|(l, _)| l != &locale);
                    self.group.add_bundle(locale.clone(), bundle);
                    reread.push(locale);
                }
                Err(err) => {
                    tracing::warn!(%locale, error = %err, "locale failed to reload; keeping previous bundle");
                    self.report.failures.retain(|(l, _)| l != &locale);
                    self.report.failures.push((locale, err));
                }
            }
        }
        // The source already holds this text; nothing to write back.
        self.changed.borrow_mut().clear();
        if !reread.is_empty() {
            tracing::info!(locales = reread.len(), "refreshed from source");
            self.tree.synchronize(&self.group);
        }
        Ok(reread)
    }

    /// The incomplete filter shows groups for what lies below them, so a vanished key
    /// may hide its ancestors.
    fn recheck_filtered(&mut self, key: &str) {
        if self.tree.updater().is_filtered() {
            self.tree.modify_key(&self.group, key);
        }
    }

    fn locales_with(&self, key: &str) -> Vec<Locale> {
        self.group
            .locales()
            .filter(|l| self.group.bundle_entry(l, key).is_some())
            .cloned()
            .collect()
    }

    fn ensure_writable<'l>(&self, mut locales: impl Iterator<Item = &'l Locale>) -> Result<(), EditorError> {
        match locales.find(|l| self.source.is_read_only(l)) {
            Some(locale) => Err(EditorError::ReadOnly(locale.clone())),
            None => Ok(()),
        }
    }

    fn write_changed(&mut self) -> anyhow::Result<()> {
        let mut pending: Vec<Locale> = self.changed.borrow_mut().drain(..).collect();
        let mut seen = std::collections::HashSet::new();
        pending.retain(|l| seen.insert(l.clone()));

        for (i, locale) in pending.iter().enumerate() {
            let Some(bundle) = self.group.bundle(locale) else {
                continue;
            };
            let text = codec::generate(bundle, &self.config, self.source.newline(locale));
            tracing::debug!(%locale, bytes = text.len(), "regenerated locale text");
            if let Err(err) = self.source.set_content(locale, text) {
                // Unwritten locales stay queued for the next operation.
                self.changed.borrow_mut().extend(pending[i..].iter().cloned());
                return Err(err);
            }
        }
        Ok(())
    }
}

impl<S: TextSource + Persistence> BundleEditor<S> {
    /// Create the backing resource for a new locale and add an empty bundle for it.
    pub fn add_locale(&mut self, locale: Locale) -> anyhow::Result<S::Handle> {
        if self.group.bundle(&locale).is_some() {
            return Err(EditorError::LocaleExists(locale).into());
        }
        let base_name = self.source.base_name().to_string();
        let handle = self.source.create_file(&locale, &base_name)?;
        self.group.add_bundle(locale, Bundle::new());
        self.tree.synchronize(&self.group);
        Ok(handle)
    }
}

impl BundleEditor<FileSource> {
    /// Write every locale file changed through the editor.
    pub fn save(&mut self) -> anyhow::Result<usize> {
        self.source.save_all()
    }
}

fn read_bundle<S: TextSource>(
    source: &mut S,
    locale: &Locale,
    config: &EditorConfig,
) -> anyhow::Result<Bundle> {
    let text = source.content(locale)?;
    let bundle = codec::parse(&text, config)?;
    tracing::debug!(%locale, entries = bundle.len(), "parsed locale");
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::BundleEditor;
    use crate::error::EditorError;
    use crate::{EditorConfig, Locale, MemorySource, TextSource};

    fn source() -> MemorySource {
        MemorySource::new("messages")
            .with_document(Locale::root(), "app.title = Title\napp.ok = OK\n")
            .with_document(Locale::language("de"), "app.title = Titel\n")
    }

    #[test]
    fn set_value_regenerates_only_the_edited_locale() -> anyhow::Result<()> {
        let mut editor = BundleEditor::new(source(), EditorConfig::default());
        let de = Locale::language("de");
        assert!(editor.missing_value("app.ok").is_missing_value());

        editor.set_value(&de, "app.ok", "OK")?;
        assert_eq!(
            editor.source().text(&de),
            Some("app.title = Titel\napp.ok    = OK\n")
        );
        assert_eq!(
            editor.source().text(&Locale::root()),
            Some("app.title = Title\napp.ok = OK\n")
        );
        assert!(!editor.missing_value("app.ok").is_missing_value());
        Ok(())
    }

    #[test]
    fn parse_failures_are_reported_per_locale() {
        let source = source().with_document(Locale::language("fr"), "bad = \\u12\n");
        let editor = BundleEditor::new(source, EditorConfig::default());
        assert!(editor.report().is_failed(&Locale::language("fr")));
        assert_eq!(editor.report().loaded.len(), 2);
        assert!(editor.group().bundle(&Locale::language("fr")).is_none());
    }

    #[test]
    fn read_only_locales_refuse_key_operations() {
        let mut source = source();
        source.insert(Locale::language("it"), "app.title = Titolo\n", true);
        let mut editor = BundleEditor::new(source, EditorConfig::default());

        let err = editor.rename_key("app.title", "app.heading").unwrap_err();
        assert_eq!(
            err.downcast_ref::<EditorError>(),
            Some(&EditorError::ReadOnly(Locale::language("it")))
        );
        assert!(editor.group().is_key("app.title"));
        assert!(editor.tree().contains("app.title"));

        // `it` lacks the new key, so adding it would write there.
        assert!(editor.add_key("app.cancel").is_err());
        editor.remove_key("app.ok").unwrap();
        assert!(!editor.tree().contains("app.ok"));
    }

    #[test]
    fn add_locale_creates_an_empty_document() -> anyhow::Result<()> {
        let mut editor = BundleEditor::new(source(), EditorConfig::default());
        let fr = Locale::language("fr");
        editor.add_locale(fr.clone())?;
        assert_eq!(editor.source().locales().len(), 3);
        assert!(editor.missing_value("app.title").is_missing_value());

        let err = editor.add_locale(fr.clone()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EditorError>(),
            Some(&EditorError::LocaleExists(fr))
        );
        Ok(())
    }
}
