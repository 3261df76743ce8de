//! Template sources.
//!
//! An [`AssetSource`] enumerates the template entries a generation run works
//! on. Callers depend only on the trait, so an embedded bundle and a live
//! directory are interchangeable.

use crate::error::Result;

pub mod embedded;
pub mod local;

pub use embedded::{EmbeddedFile, EmbeddedSource};
pub use local::LocalSource;

/// A single template file: its path relative to the source root and its raw content.
///
/// Paths always use `/` as separator, whatever the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    pub path: String,
    pub content: Vec<u8>,
}

impl TemplateEntry {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self { path: path.into(), content: content.into() }
    }

    /// Returns the content as UTF-8 text, or `None` for binary content.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Trait for enumerating template entries from a backing store.
pub trait AssetSource: Send + Sync {
    /// Lists every entry of the source.
    ///
    /// The sequence is finite and lazily produced. Its order is stable for the
    /// lifetime of the source.
    fn list(&self) -> Box<dyn Iterator<Item = Result<TemplateEntry>> + '_>;

    /// Reads the content of an entry previously produced by [`AssetSource::list`].
    ///
    /// # Errors
    /// * `Error::NotFound` if `path` is not one of the listed entries
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Human readable description of the backing store, used in logs.
    fn describe(&self) -> String;
}

impl<T: AssetSource + ?Sized> AssetSource for Box<T> {
    fn list(&self) -> Box<dyn Iterator<Item = Result<TemplateEntry>> + '_> {
        (**self).list()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        (**self).read(path)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
