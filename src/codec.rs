//! Reading and writing the `.properties` key/value text format.
//!
//! Parsing keeps comments (file header and per-entry), commented-out entries (`##key=value`)
//! and entry order, so `parse(generate(b)) == b` holds when the codec flags agree.

use crate::error::ParseError;
use crate::{Bundle, EditorConfig, Entry, statics};
use std::fmt::Write as _;

impl Bundle {
    pub fn parse_properties(text: &str, config: &EditorConfig) -> Result<Bundle, ParseError> {
        parse(text, config)
    }

    pub fn to_properties(&self, config: &EditorConfig, newline: &str) -> String {
        generate(self, config, newline)
    }
}

/// Parse properties text into a bundle with no locale attached.
pub fn parse(text: &str, config: &EditorConfig) -> Result<Bundle, ParseError> {
    let lines = split_lines(text);
    let mut bundle = Bundle::new();
    let mut file_comment = String::new();
    let mut line_comment = String::new();
    let mut done_with_file_comment = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let line_no = i + 1;

        if done_with_file_comment && is_commented_entry_line(line) {
            let (logical, next) = logical_line(&lines, i, Some(statics::COMMENTED_ENTRY_PREFIX));
            if let Some(entry) = read_entry(&logical, line_no, config)? {
                bundle.add_entry(
                    entry
                        .with_comment(std::mem::take(&mut line_comment))
                        .with_commented(true),
                );
                i = next;
                continue;
            }
        }

        if is_comment_line(line) {
            let target = if done_with_file_comment {
                &mut line_comment
            } else {
                &mut file_comment
            };
            target.push_str(line);
            target.push('\n');
            i += 1;
            continue;
        }

        if !line.trim().is_empty() {
            let (logical, next) = logical_line(&lines, i, None);
            if let Some(entry) = read_entry(&logical, line_no, config)? {
                done_with_file_comment = true;
                bundle.add_entry(entry.with_comment(std::mem::take(&mut line_comment)));
                i = next;
                continue;
            }
            tracing::debug!(line = line_no, "skipping unparseable properties line");
        }

        // Blank or unsupported line.
        done_with_file_comment = true;
        i += 1;
    }

    bundle.set_comment(file_comment);
    tracing::debug!(entries = bundle.len(), "parsed properties");
    Ok(bundle)
}

/// Render a bundle back to properties text, using `newline` as line terminator.
pub fn generate(bundle: &Bundle, config: &EditorConfig, newline: &str) -> String {
    let mut out = String::new();
    write_comment(&mut out, bundle.comment(), newline);

    let mut entries: Vec<&Entry> = bundle
        .entries()
        .filter(|e| config.keep_empty_fields || !e.value.is_empty())
        .collect();
    if config.sort_keys {
        entries.sort_by(|a, b| a.key.cmp(&b.key));
    }

    let rows: Vec<(&Entry, String)> = entries
        .into_iter()
        .map(|e| (e, escape(&e.key, true, config.convert_unicode_to_encoded)))
        .collect();

    let group_of = |key: &str| -> Option<String> {
        key_group(key, &config.key_group_separator, config.group_level_deepness)
            .map(str::to_string)
    };

    let mut current_group: Option<String> = None;
    let mut column = equal_column(None, &rows, config);

    for (i, (entry, key_text)) in rows.iter().enumerate() {
        let group = group_of(&entry.key);
        let mut blank_lines = 0;
        if group != current_group {
            column = equal_column(group.as_deref(), &rows, config);
            current_group = group;
            if i > 0 {
                blank_lines = config.num_of_lines_between_groups;
            }
        }
        // A leading comment would otherwise merge into the file comment on re-parse.
        if i == 0 && (!entry.comment.is_empty() || entry.commented) {
            blank_lines = 1;
        }
        for _ in 0..blank_lines {
            out.push_str(newline);
        }

        write_comment(&mut out, &entry.comment, newline);
        if entry.commented {
            out.push_str(statics::COMMENTED_ENTRY_PREFIX);
        }
        out.push_str(key_text);
        if let Some(column) = column {
            let width = key_text.chars().count();
            out.push_str(&" ".repeat(column.saturating_sub(width)));
        }
        out.push_str(statics::KEY_VALUE_SEPARATOR);
        out.push_str(&escape(&entry.value, false, config.convert_unicode_to_encoded));
        out.push_str(newline);
    }

    out
}

/// The group of a key: its prefix up to `deepness` separators.
/// No separator at all gives `None`; fewer separators than `deepness` gives the whole key.
pub fn key_group<'a>(key: &'a str, separator: &str, deepness: usize) -> Option<&'a str> {
    if separator.is_empty() || deepness == 0 {
        return None;
    }
    let mut end = 0;
    let mut found = 0;
    for _ in 0..deepness {
        let Some(pos) = key[end..].find(separator) else {
            break;
        };
        end += pos + separator.len();
        found += 1;
    }
    match found {
        0 => None,
        f if f < deepness => Some(key),
        _ => Some(&key[..end - separator.len()]),
    }
}

/// Decode `\uXXXX` (combining surrogate pairs) and `\t \r \n \f`; any other `\c` becomes `c`.
/// `line` is only used for error reporting.
pub fn unescape(text: &str, line: usize) -> Result<String, ParseError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('f') => out.push('\u{0C}'),
            Some('u') => {
                let unit = read_hex4(&mut chars, line)?;
                out.push(decode_unit(unit, &mut chars, line)?);
            }
            Some(other) => out.push(other),
        }
    }
    Ok(out)
}

fn read_hex4(chars: &mut std::str::Chars<'_>, line: usize) -> Result<u32, ParseError> {
    let mut unit = 0u32;
    let mut seen = String::new();
    for _ in 0..4 {
        let digit = chars.next().inspect(|c| seen.push(*c));
        match digit.and_then(|c| c.to_digit(16)) {
            Some(d) => unit = unit * 16 + d,
            None => {
                return Err(ParseError::MalformedEscape {
                    line,
                    sequence: format!("\\u{seen}"),
                });
            }
        }
    }
    Ok(unit)
}

fn decode_unit(unit: u32, chars: &mut std::str::Chars<'_>, line: usize) -> Result<char, ParseError> {
    let malformed = |units: &[u32]| ParseError::MalformedEscape {
        line,
        sequence: units.iter().map(|u| format!("\\u{u:04X}")).collect(),
    };

    if (0xDC00..=0xDFFF).contains(&unit) {
        return Err(malformed(&[unit]));
    }
    if !(0xD800..=0xDBFF).contains(&unit) {
        return char::from_u32(unit).ok_or_else(|| malformed(&[unit]));
    }

    let mut lookahead = chars.clone();
    if lookahead.next() != Some('\\') || lookahead.next() != Some('u') {
        return Err(malformed(&[unit]));
    }
    let low = read_hex4(&mut lookahead, line)?;
    if !(0xDC00..=0xDFFF).contains(&low) {
        return Err(malformed(&[unit, low]));
    }
    *chars = lookahead;
    let cp = 0x1_0000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(cp).ok_or_else(|| malformed(&[unit, low]))
}

/// Escape a key or value for writing. Without `encode` only line breaks
/// and a leading value space are escaped.
fn escape(s: &str, is_key: bool, encode: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, ch) in s.chars().enumerate() {
        match ch {
            ' ' if i == 0 || (is_key && encode) => out.push_str("\\ "),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            _ if !encode => out.push(ch),
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\u{0C}' => out.push_str("\\f"),
            '=' if is_key => out.push_str("\\="),
            '#' | '!' if is_key && i == 0 => {
                out.push('\\');
                out.push(ch);
            }
            c if c.is_control() || (c as u32) > 0x7F => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(out, "\\u{:04X}", unit).ok();
                }
            }
            c => out.push(c),
        }
    }
    out
}

fn write_comment(out: &mut String, comment: &str, newline: &str) {
    for line in comment.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !is_comment_line(line) {
            out.push_str(statics::COMMENT_PREFIX);
            out.push(' ');
        }
        out.push_str(line);
        out.push_str(newline);
    }
}

fn equal_column(group: Option<&str>, rows: &[(&Entry, String)], config: &EditorConfig) -> Option<usize> {
    if !config.align_equal_signs {
        return None;
    }
    let width = |(_, key_text): &(&Entry, String)| key_text.chars().count();
    if !config.align_group_equal_signs {
        return rows.iter().map(width).max();
    }
    let group = group?;
    rows.iter()
        .filter(|(e, _)| {
            key_group(&e.key, &config.key_group_separator, config.group_level_deepness)
                == Some(group)
        })
        .map(width)
        .max()
}

/// Build one entry from a logical line; `None` when the line has no usable `key=`.
fn read_entry(logical: &str, line_no: usize, config: &EditorConfig) -> Result<Option<Entry>, ParseError> {
    let Some(pos) = find_separator(logical) else {
        return Ok(None);
    };
    let raw_key = trim_unescaped_end(logical[..pos].trim_start());
    if raw_key.is_empty() {
        return Ok(None);
    }
    let mut value = logical[pos + 1..].trim_start();
    if value.starts_with("\\ ") {
        value = &value[1..];
    }

    let (key, value) = if config.convert_encoded_to_unicode {
        (unescape(raw_key, line_no)?, unescape(value, line_no)?)
    } else {
        (
            raw_key.to_string(),
            value.replace("\\r", "\r").replace("\\n", "\n"),
        )
    };
    Ok(Some(Entry::new(key, value)))
}

/// Join `lines[start]` with following lines while it ends in an unescaped backslash.
/// Returns the logical line and the index of the next unconsumed line.
fn logical_line(lines: &[&str], start: usize, strip_prefix: Option<&str>) -> (String, usize) {
    let strip = |line: &str| -> String {
        match strip_prefix {
            Some(prefix) => line.strip_prefix(prefix).unwrap_or(line).to_string(),
            None => line.to_string(),
        }
    };

    let mut buf = strip(lines[start]);
    let mut next = start + 1;
    while trailing_backslashes(&buf) % 2 == 1 {
        buf.pop();
        let Some(wrapped) = lines.get(next) else {
            break;
        };
        buf.push_str(&strip(wrapped.trim_start()));
        next += 1;
    }
    (buf, next)
}

fn find_separator(line: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            '=' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn trailing_backslashes(s: &str) -> usize {
    s.chars().rev().take_while(|c| *c == '\\').count()
}

fn trim_unescaped_end(s: &str) -> &str {
    let mut t = s;
    while let Some(c) = t.chars().next_back() {
        if !c.is_whitespace() {
            break;
        }
        let before = &t[..t.len() - c.len_utf8()];
        if trailing_backslashes(before) % 2 == 1 {
            break;
        }
        t = before;
    }
    t
}

fn is_comment_line(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with(statics::COMMENT_PREFIX) || t.starts_with(statics::COMMENT_PREFIX_ALT)
}

fn is_commented_entry_line(line: &str) -> bool {
    line.strip_prefix(statics::COMMENTED_ENTRY_PREFIX)
        .is_some_and(|rest| !rest.starts_with(statics::COMMENT_PREFIX))
}

/// Split on `\r\n`, `\r` or `\n`. A final terminator does not produce an empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::{escape, generate, key_group, parse, split_lines, unescape};
    use crate::error::ParseError;
    use crate::{Bundle, EditorConfig, Entry, statics};

    fn plain() -> EditorConfig {
        EditorConfig {
            align_equal_signs: false,
            num_of_lines_between_groups: 0,
            ..Default::default()
        }
    }

    #[test]
    fn split_lines_handles_all_terminators() {
        assert_eq!(split_lines("a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "", "b"]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn key_group_respects_deepness() {
        assert_eq!(key_group("a.b.c", ".", 1), Some("a"));
        assert_eq!(key_group("a.b.c", ".", 2), Some("a.b"));
        assert_eq!(key_group("a", ".", 2), None);
        assert_eq!(key_group("a.b", ".", 2), Some("a.b"));
        assert_eq!(key_group("a::b::c", "::", 1), Some("a"));
        assert_eq!(key_group("plain", ".", 1), None);
    }

    #[test]
    fn parse_header_entries_and_comments() {
        let text = "# hdr\n! more\n\nfoo.bar = 1\n# about baz\n  # indented\nfoo.baz=  2\n";
        let bundle = parse(text, &EditorConfig::default()).unwrap();

        assert_eq!(bundle.comment(), "# hdr\n! more\n");
        let entries: Vec<_> = bundle.entries().cloned().collect();
        assert_eq!(
            entries,
            vec![
                Entry::new("foo.bar", "1"),
                Entry::new("foo.baz", "2").with_comment("# about baz\n  # indented\n"),
            ]
        );
        assert!(bundle.locale().is_none());
    }

    #[test]
    fn parse_continuations_and_escaped_separators() {
        let text = "multi = one \\\n      two \\\n  three\nkey\\=with\\ eq = v\nends = back\\\\\nnext = x\n";
        let bundle = parse(text, &EditorConfig::default()).unwrap();

        assert_eq!(bundle.entry("multi").unwrap().value, "one two three");
        assert_eq!(bundle.entry("key=with eq").unwrap().value, "v");
        assert_eq!(bundle.entry("ends").unwrap().value, "back\\");
        assert_eq!(bundle.entry("next").unwrap().value, "x");
    }

    #[test]
    fn parse_commented_entries_only_after_header() {
        let text = "##header = not an entry\n\n##old.key = legacy\n### just a comment\nlive = 1\n";
        let bundle = parse(text, &EditorConfig::default()).unwrap();

        assert_eq!(bundle.comment(), "##header = not an entry\n");
        let old = bundle.entry("old.key").unwrap();
        assert!(old.commented);
        assert_eq!(old.value, "legacy");
        let live = bundle.entry("live").unwrap();
        assert!(!live.commented);
        assert_eq!(live.comment, "### just a comment\n");
    }

    #[test]
    fn parse_without_unicode_conversion_only_maps_line_breaks() {
        let config = EditorConfig {
            convert_encoded_to_unicode: false,
            ..Default::default()
        };
        let bundle = parse("k\\u0041 = a\\nb\\u0042\n", &config).unwrap();
        assert_eq!(bundle.entry("k\\u0041").unwrap().value, "a\nb\\u0042");
    }

    #[test]
    fn unescape_decodes_standard_and_surrogates() {
        assert_eq!(unescape("caf\\u00e9\\t\\\\\\:", 1).unwrap(), "café\t\\:");
        assert_eq!(unescape("\\uD83D\\uDE00", 1).unwrap(), "😀");
    }

    #[test]
    fn malformed_escape_reports_line() {
        let err = parse("ok = 1\nbad = \\u12G4\n", &EditorConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ParseError::MalformedEscape {
                line: 2,
                sequence: "\\u12G".to_string()
            }
        );
        assert!(unescape("\\u12", 1).is_err());
        assert!(unescape("\\uDE00", 1).is_err());
        assert!(unescape("\\uD83Dx", 1).is_err());
    }

    #[test]
    fn escape_encodes_non_ascii_uppercase() {
        assert_eq!(escape("café", false, true), "caf\\u00E9");
        assert_eq!(escape("😀", false, true), "\\uD83D\\uDE00");
        assert_eq!(escape(" lead", false, true), "\\ lead");
        assert_eq!(escape("#a b=c", true, true), "\\#a\\ b\\=c");
        assert_eq!(escape("a\nb", false, false), "a\\nb");
    }

    #[test]
    fn generate_aligns_equal_signs_per_group() {
        let bundle = Bundle::with_entries([
            Entry::new("a.x", "1"),
            Entry::new("a.long", "2"),
            Entry::new("b.yy", "3"),
            Entry::new("plain", "4"),
        ]);
        let text = generate(&bundle, &EditorConfig::default(), statics::NL_LF);
        assert_eq!(
            text,
            "a.x    = 1\na.long = 2\n\nb.yy = 3\n\nplain = 4\n"
        );

        let config = EditorConfig {
            align_group_equal_signs: false,
            num_of_lines_between_groups: 0,
            ..Default::default()
        };
        let text = generate(&bundle, &config, statics::NL_CRLF);
        assert_eq!(
            text,
            "a.x    = 1\r\na.long = 2\r\nb.yy   = 3\r\nplain  = 4\r\n"
        );
    }

    #[test]
    fn generate_writes_comments_commented_and_empty_entries() {
        let mut bundle = Bundle::with_entries([
            Entry::new("a", "").with_comment("# first\n"),
            Entry::new("b", "2").with_commented(true),
            Entry::new("c", "3").with_comment("no marker\n"),
        ]);
        bundle.set_comment("# header\n");

        let text = generate(&bundle, &plain(), statics::NL_LF);
        assert_eq!(
            text,
            "# header\n\n# first\na = \n##b = 2\n# no marker\nc = 3\n"
        );

        let config = EditorConfig {
            keep_empty_fields: false,
            ..plain()
        };
        let text = generate(&bundle, &config, statics::NL_LF);
        assert!(!text.contains("a = "));
    }

    #[test]
    fn generate_sorted_keys() {
        let bundle = Bundle::with_entries([Entry::new("b", "2"), Entry::new("a", "1")]);
        let config = EditorConfig {
            sort_keys: true,
            ..plain()
        };
        assert_eq!(generate(&bundle, &config, statics::NL_LF), "a = 1\nb = 2\n");
    }

    #[test]
    fn generate_starts_first_group_without_blank_lines() {
        let mut bundle = Bundle::with_entries([
            Entry::new("menu.open", "Open"),
            Entry::new("menu.quit", "Quit"),
            Entry::new("title", "App"),
        ]);
        let text = generate(&bundle, &EditorConfig::default(), statics::NL_LF);
        assert_eq!(text, "menu.open = Open\nmenu.quit = Quit\n\ntitle = App\n");

        bundle.set_comment("# header\n");
        let text = generate(&bundle, &EditorConfig::default(), statics::NL_LF);
        assert!(text.starts_with("# header\nmenu.open = Open\n"));
        assert_eq!(parse(&text, &EditorConfig::default()).ok(), Some(bundle));
    }
}
