//! Core library for the Resource Bundle Editor (RBE).
//! Parses and regenerates `.properties` bundle families, keeps the locales of one family
//! in a [`BundleGroup`], and projects their key set into a [`KeyTree`] for navigation.

mod bundle;
pub mod codec;
mod config;
mod editor;
mod error;
pub mod event;
mod files;
mod group;
mod locale;
mod source;
pub mod statics;
mod tree;
mod updater;
pub mod visitor;

pub use bundle::{Bundle, Entry};
pub use config::EditorConfig;
pub use editor::{BundleEditor, LoadReport};
pub use error::{EditorError, ParseError};
pub use event::{ChangeEvent, ListenerId};
pub use files::{FileSource, LineEnding, PropertiesFile, TextEncoding};
pub use group::BundleGroup;
pub use locale::Locale;
pub use source::{MemorySource, Persistence, TextSource};
pub use tree::{ItemState, KeyTree, KeyTreeItem};
pub use updater::Updater;
pub use visitor::{KeyStartsWith, MissingValue, MissingValuePolicy};
