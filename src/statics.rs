// Central place for CLI strings and other non-localized constants.
// Keep these out of the codec/model code to reduce duplication and make tweaks safer.

// English CLI strings (EN_ prefix to make future localization easier)
pub const EN_APP_TITLE: &str = "RBE: Resource Bundle Editor";

pub const EN_HEADING_LOCALES: &str = "Locales:";
pub const EN_HEADING_KEYS: &str = "Keys:";
pub const EN_LOCALE_DEFAULT: &str = "<default>";
pub const EN_LABEL_READ_ONLY: &str = "(read-only)";
pub const EN_LABEL_FAILED: &str = "failed to load";
pub const EN_SUMMARY_KEYS: &str = "keys:";
pub const EN_SUMMARY_MISSING: &str = "missing:";
pub const EN_NO_BUNDLES: &str = "No properties files found.";

// Tree decorations (single glyphs so the tree stays aligned).
pub const EN_GLYPH_MISSING: &str = "!";
pub const EN_GLYPH_MISSING_CHILD: &str = "~";
pub const EN_GLYPH_COMMENTED: &str = "#";
pub const EN_GLYPH_NONE: &str = " ";

pub const EN_EMPTY: &str = "";

// Newline constants (used for generated files; keep out of codec code).
pub const NL_LF: &str = "\n";
pub const NL_CRLF: &str = "\r\n";

// Properties file naming.
pub const PROPERTIES_EXTENSION: &str = "properties";
pub const LOCALE_SEPARATOR: char = '_';

// Properties syntax.
pub const COMMENT_PREFIX: &str = "#";
pub const COMMENT_PREFIX_ALT: &str = "!";
pub const COMMENTED_ENTRY_PREFIX: &str = "##";
pub const KEY_VALUE_SEPARATOR: &str = " = ";

// Configuration defaults.
pub const DEFAULT_KEY_GROUP_SEPARATOR: &str = ".";
pub const DEFAULT_GROUP_LEVEL_DEEPNESS: usize = 1;
pub const DEFAULT_LINES_BETWEEN_GROUPS: usize = 1;
