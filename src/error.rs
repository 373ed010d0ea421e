use crate::Locale;
use thiserror::Error;

/// Failure while decoding properties text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `\u` not followed by four hex digits, or an unpaired UTF-16 surrogate.
    #[error("malformed \\uXXXX escape {sequence:?} on line {line}")]
    MalformedEscape { line: usize, sequence: String },
}

/// Model operations refused by the editor before anything was mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("locale {0:?} is read-only")]
    ReadOnly(Locale),
    #[error("locale {0:?} is not part of the bundle group")]
    UnknownLocale(Locale),
    #[error("locale {0:?} already exists in the bundle group")]
    LocaleExists(Locale),
}
