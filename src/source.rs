//! Collaborator contracts between the model and wherever the text lives.

use crate::{Locale, statics};
use indexmap::IndexMap;

/// Raw text per locale for one bundle family.
pub trait TextSource {
    /// Base name shared by all locale files (`messages` for `messages_de.properties`).
    fn base_name(&self) -> &str;

    fn locales(&self) -> Vec<Locale>;

    /// Current text of `locale`, refreshing any cached copy first.
    fn content(&mut self, locale: &Locale) -> anyhow::Result<String>;

    fn set_content(&mut self, locale: &Locale, text: String) -> anyhow::Result<()>;

    fn is_read_only(&self, locale: &Locale) -> bool;

    /// True when the text changed behind the model's back since it was last read.
    fn is_cache_dirty(&self, locale: &Locale) -> bool;

    /// Line terminator to use when generating text for `locale`.
    fn newline(&self, _locale: &Locale) -> &'static str {
        statics::NL_LF
    }
}

/// Creates the resource backing a brand-new locale.
pub trait Persistence {
    type Handle;

    fn create_file(&mut self, locale: &Locale, base_name: &str) -> anyhow::Result<Self::Handle>;
}

#[derive(Debug, Clone, Default)]
struct MemoryDocument {
    text: String,
    read_only: bool,
    externally_changed: bool,
}

/// In-memory text source, e.g. for editors that manage buffers themselves.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    base_name: String,
    documents: IndexMap<Locale, MemoryDocument>,
}

impl MemorySource {
    pub fn new(base_name: &str) -> Self {
        Self {
            base_name: base_name.to_string(),
            documents: IndexMap::new(),
        }
    }

    pub fn with_document(mut self, locale: Locale, text: &str) -> Self {
        self.insert(locale, text, false);
        self
    }

    pub fn insert(&mut self, locale: Locale, text: &str, read_only: bool) {
        self.documents.insert(
            locale,
            MemoryDocument {
                text: text.to_string(),
                read_only,
                externally_changed: false,
            },
        );
    }

    /// Replace text as an outside editor would; the model sees it on its next refresh.
    pub fn edit_externally(&mut self, locale: &Locale, text: &str) -> bool {
        let Some(doc) = self.documents.get_mut(locale) else {
            return false;
        };
        doc.text = text.to_string();
        doc.externally_changed = true;
        true
    }

    pub fn text(&self, locale: &Locale) -> Option<&str> {
        self.documents.get(locale).map(|d| d.text.as_str())
    }
}

impl TextSource for MemorySource {
    fn base_name(&self) -> &str {
        &self.base_name
    }

    fn locales(&self) -> Vec<Locale> {
        self.documents.keys().cloned().collect()
    }

    fn content(&mut self, locale: &Locale) -> anyhow::Result<String> {
        let doc = self
            .documents
            .get_mut(locale)
            .ok_or_else(|| anyhow::anyhow!("no document for locale {locale:?}"))?;
        doc.externally_changed = false;
        Ok(doc.text.clone())
    }

    fn set_content(&mut self, locale: &Locale, text: String) -> anyhow::Result<()> {
        let doc = self.documents.entry(locale.clone()).or_default();
        anyhow::ensure!(!doc.read_only, "document for locale {locale:?} is read-only");
        doc.text = text;
        Ok(())
    }

    fn is_read_only(&self, locale: &Locale) -> bool {
        self.documents.get(locale).is_some_and(|d| d.read_only)
    }

    fn is_cache_dirty(&self, locale: &Locale) -> bool {
        self.documents
            .get(locale)
            .is_some_and(|d| d.externally_changed)
    }
}

impl Persistence for MemorySource {
    type Handle = Locale;

    fn create_file(&mut self, locale: &Locale, base_name: &str) -> anyhow::Result<Locale> {
        anyhow::ensure!(
            base_name == self.base_name,
            "base name {base_name:?} does not match {:?}",
            self.base_name
        );
        anyhow::ensure!(
            !self.documents.contains_key(locale),
            "document for locale {locale:?} already exists"
        );
        self.insert(locale.clone(), statics::EN_EMPTY, false);
        Ok(locale.clone())
    }
}
