use crate::source::{Persistence, TextSource};
use crate::{Locale, statics};
use anyhow::Context;
use indexmap::IndexMap;
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => statics::NL_LF,
            LineEnding::CrLf => statics::NL_CRLF,
        }
    }
}

/// Properties files are traditionally ISO-8859-1; UTF-8 is accepted when the bytes are valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

/// One locale's file, preserving its original bytes so an untouched file is
/// written back byte-for-byte.
#[derive(Debug, Clone)]
pub struct PropertiesFile {
    pub path: PathBuf,
    pub encoding: TextEncoding,
    pub line_ending: LineEnding,
    pub original_bytes: Vec<u8>,
    pub text: String,
    pub dirty: bool,
    stamp: Option<FileStamp>,
}

impl PropertiesFile {
    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading {path:?}"))?;
        let (text, encoding) = decode(&bytes);
        tracing::debug!(?path, ?encoding, bytes = bytes.len(), "loaded properties file");
        Ok(Self {
            path: path.to_path_buf(),
            encoding,
            line_ending: detect_line_ending(&bytes),
            original_bytes: bytes,
            text,
            dirty: false,
            stamp: read_stamp(path),
        })
    }

    pub fn is_read_only(&self) -> bool {
        fs::metadata(&self.path)
            .map(|m| m.permissions().readonly())
            .unwrap_or(false)
    }

    /// True when the file on disk no longer matches what was last loaded or saved.
    pub fn has_changed_on_disk(&self) -> bool {
        read_stamp(&self.path) != self.stamp
    }

    pub fn reload(&mut self) -> anyhow::Result<()> {
        if self.dirty {
            tracing::warn!(path = ?self.path, "file changed on disk; discarding unsaved edits");
        }
        *self = Self::load_path(&self.path)?;
        Ok(())
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.refresh_dirty();
    }

    /// Recompute `dirty` by comparing the current bytes to `original_bytes`,
    /// so reverting an edit clears it again.
    pub fn refresh_dirty(&mut self) {
        self.dirty = self.generate_bytes() != self.original_bytes;
    }

    /// Encode the current text regardless of `dirty`.
    pub fn generate_bytes(&self) -> Vec<u8> {
        encode(&self.text, self.encoding)
    }

    pub fn save_bytes(&self) -> Vec<u8> {
        if !self.dirty {
            return self.original_bytes.clone();
        }
        self.generate_bytes()
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        let bytes = self.save_bytes();
        fs::write(&self.path, &bytes).with_context(|| format!("writing {:?}", self.path))?;
        tracing::info!(path = ?self.path, bytes = bytes.len(), "saved properties file");
        self.original_bytes = bytes;
        self.dirty = false;
        self.stamp = read_stamp(&self.path);
        Ok(())
    }
}

/// All `base[_locale].properties` files of one directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
    base_name: String,
    files: IndexMap<Locale, PropertiesFile>,
}

impl FileSource {
    pub fn open(dir: &Path, base_name: &str) -> anyhow::Result<Self> {
        let mut found = Vec::new();
        let listing = fs::read_dir(dir).with_context(|| format!("listing {dir:?}"))?;
        for dir_entry in listing {
            let dir_entry = dir_entry.with_context(|| format!("listing {dir:?}"))?;
            if !dir_entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let file_name = dir_entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(locale) = Locale::from_file_name(file_name, base_name) {
                found.push((locale, dir_entry.path()));
            }
        }
        found.sort();

        let mut files = IndexMap::new();
        for (locale, path) in found {
            files.insert(locale, PropertiesFile::load_path(&path)?);
        }
        tracing::info!(?dir, base_name, locales = files.len(), "opened bundle family");

        Ok(Self {
            dir: dir.to_path_buf(),
            base_name: base_name.to_string(),
            files,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self, locale: &Locale) -> Option<&PropertiesFile> {
        self.files.get(locale)
    }

    pub fn is_dirty(&self) -> bool {
        self.files.values().any(|f| f.dirty)
    }

    /// Write every dirty file; returns how many were written.
    pub fn save_all(&mut self) -> anyhow::Result<usize> {
        let mut saved = 0;
        for file in self.files.values_mut().filter(|f| f.dirty) {
            file.save()?;
            saved += 1;
        }
        Ok(saved)
    }

    fn file_mut(&mut self, locale: &Locale) -> anyhow::Result<&mut PropertiesFile> {
        self.files
            .get_mut(locale)
            .ok_or_else(|| anyhow::anyhow!("no {} file for locale {locale:?}", self.base_name))
    }
}

impl TextSource for FileSource {
    fn base_name(&self) -> &str {
        &self.base_name
    }

    fn locales(&self) -> Vec<Locale> {
        self.files.keys().cloned().collect()
    }

    fn content(&mut self, locale: &Locale) -> anyhow::Result<String> {
        let file = self.file_mut(locale)?;
        if file.has_changed_on_disk() {
            file.reload()?;
        }
        Ok(file.text.clone())
    }

    fn set_content(&mut self, locale: &Locale, text: String) -> anyhow::Result<()> {
        let file = self.file_mut(locale)?;
        anyhow::ensure!(!file.is_read_only(), "{:?} is read-only", file.path);
        file.set_text(text);
        Ok(())
    }

    fn is_read_only(&self, locale: &Locale) -> bool {
        self.files.get(locale).is_some_and(PropertiesFile::is_read_only)
    }

    fn is_cache_dirty(&self, locale: &Locale) -> bool {
        self.files
            .get(locale)
            .is_some_and(PropertiesFile::has_changed_on_disk)
    }

    fn newline(&self, locale: &Locale) -> &'static str {
        self.files
            .get(locale)
            .map(|f| f.line_ending.as_str())
            .unwrap_or(statics::NL_LF)
    }
}

impl Persistence for FileSource {
    type Handle = PathBuf;

    fn create_file(&mut self, locale: &Locale, base_name: &str) -> anyhow::Result<PathBuf> {
        let path = self.dir.join(locale.file_name(base_name));
        anyhow::ensure!(!path.exists(), "{path:?} already exists");
        fs::write(&path, b"").with_context(|| format!("creating {path:?}"))?;
        tracing::info!(?path, %locale, "created properties file");

        let mut file = PropertiesFile::load_path(&path)?;
        // New files follow the family's prevailing line ending.
        if let Some(first) = self.files.values().next() {
            file.line_ending = first.line_ending;
        }
        self.files.insert(locale.clone(), file);
        Ok(path)
    }
}

fn read_stamp(path: &Path) -> Option<FileStamp> {
    let meta = fs::metadata(path).ok()?;
    Some(FileStamp {
        len: meta.len(),
        modified: meta.modified().ok(),
    })
}

fn decode(bytes: &[u8]) -> (String, TextEncoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        Err(_) => (
            bytes.iter().map(|b| char::from(*b)).collect(),
            TextEncoding::Latin1,
        ),
    }
}

fn encode(text: &str, encoding: TextEncoding) -> Vec<u8> {
    if encoding == TextEncoding::Latin1 && text.chars().all(|c| (c as u32) <= 0xFF) {
        return text.chars().map(|c| c as u8).collect();
    }
    text.as_bytes().to_vec()
}

fn detect_line_ending(text_bytes: &[u8]) -> LineEnding {
    // Detect by counting actual newline terminators.
    // Using "any CRLF anywhere" can mis-detect files with a few mixed lines.
    let mut lf_count = 0usize;
    let mut crlf_count = 0usize;

    for (i, b) in text_bytes.iter().enumerate() {
        if *b != b'\n' {
            continue;
        }
        if i > 0 && text_bytes[i - 1] == b'\r' {
            crlf_count += 1;
        } else {
            lf_count += 1;
        }
    }

    if crlf_count > lf_count {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    }
}
