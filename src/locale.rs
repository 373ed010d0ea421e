use crate::statics;
use std::fmt;

/// A `language[_COUNTRY[_VARIANT]]` identifier selecting one bundle of a group.
/// The empty locale stands for the default (base) bundle, e.g. `messages.properties`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale {
    pub language: String,
    pub country: String,
    pub variant: String,
}

impl Locale {
    pub fn new(language: &str, country: &str, variant: &str) -> Self {
        Self {
            language: language.to_lowercase(),
            country: country.to_uppercase(),
            variant: variant.to_string(),
        }
    }

    pub fn root() -> Self {
        Self::default()
    }

    pub fn language(language: &str) -> Self {
        Self::new(language, "", "")
    }

    /// Parse `en`, `en_US`, `en_US_POSIX` (also accepts `-` as separator).
    /// Returns `None` for text that cannot be a locale tag, like `en__X_Y`.
    pub fn parse(tag: &str) -> Option<Self> {
        if tag.is_empty() {
            return Some(Self::root());
        }
        let normalized = tag.replace('-', "_");
        let mut parts = normalized.splitn(3, statics::LOCALE_SEPARATOR);
        let language = parts.next().unwrap_or_default();
        let country = parts.next().unwrap_or_default();
        let variant = parts.next().unwrap_or_default();

        if !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if !country.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        if language.is_empty() && country.is_empty() {
            return None;
        }
        Some(Self::new(language, country, variant))
    }

    pub fn is_root(&self) -> bool {
        self.language.is_empty() && self.country.is_empty() && self.variant.is_empty()
    }

    /// Suffix appended to a bundle base name: `""`, `_en`, `_en_US`, `_en_US_POSIX`.
    pub fn file_suffix(&self) -> String {
        if self.is_root() {
            return String::new();
        }
        format!("{}{}", statics::LOCALE_SEPARATOR, self)
    }

    /// `base_name` + suffix + `.properties`.
    pub fn file_name(&self, base_name: &str) -> String {
        format!(
            "{base_name}{}.{}",
            self.file_suffix(),
            statics::PROPERTIES_EXTENSION
        )
    }

    /// Inverse of [`Locale::file_name`]: returns the locale if `file_name` belongs to `base_name`.
    pub fn from_file_name(file_name: &str, base_name: &str) -> Option<Self> {
        let stem = file_name
            .strip_suffix(statics::PROPERTIES_EXTENSION)?
            .strip_suffix('.')?;
        let rest = stem.strip_prefix(base_name)?;
        if rest.is_empty() {
            return Some(Self::root());
        }
        let tag = rest.strip_prefix(statics::LOCALE_SEPARATOR)?;
        Self::parse(tag)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = statics::LOCALE_SEPARATOR;
        f.write_str(&self.language)?;
        if !self.country.is_empty() || !self.variant.is_empty() {
            write!(f, "{sep}{}", self.country)?;
        }
        if !self.variant.is_empty() {
            write!(f, "{sep}{}", self.variant)?;
        }
        Ok(())
    }
}
