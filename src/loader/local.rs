use globset::GlobSet;
use log::debug;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::ignore::parse_ignore_file;
use crate::loader::{AssetSource, TemplateEntry};

/// Template source backed by a live directory on the local filesystem.
pub struct LocalSource {
    root: PathBuf,
    ignored: GlobSet,
}

impl LocalSource {
    /// Opens a template directory, reading its ignore patterns.
    ///
    /// # Errors
    /// * `Error::TemplateDoesNotExistsError` if `root` is not a directory
    /// * `Error::GlobSetParseError` if the ignore file has an invalid pattern
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::TemplateDoesNotExistsError {
                template_dir: root.display().to_string(),
            });
        }
        let ignored = parse_ignore_file(root)?;
        Ok(Self { root: root.to_path_buf(), ignored })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_ignored(&self, relative: &str) -> bool {
        self.ignored.is_match(relative)
    }

    /// Maps a listed relative path back onto the directory, or `None` if it
    /// could not have been produced by `list`.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let candidate = Path::new(relative);
        let plain = candidate.components().all(|c| matches!(c, Component::Normal(_)));
        if relative.is_empty() || !plain || self.is_ignored(relative) {
            return None;
        }
        let full = self.root.join(candidate);
        full.is_file().then_some(full)
    }
}

/// Joins the components of a path relative to the template root with `/`.
fn to_relative_string(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| Error::ConfigError(e.to_string()))?;
    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                Error::ConfigError(format!("non UTF-8 path: {}", path.display()))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join("/"))
}

impl AssetSource for LocalSource {
    fn list(&self) -> Box<dyn Iterator<Item = Result<TemplateEntry>> + '_> {
        let root = self.root.as_path();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                match to_relative_string(root, entry.path()) {
                    // The root itself has an empty relative path.
                    Ok(relative) => relative.is_empty() || !self.is_ignored(&relative),
                    Err(_) => true,
                }
            });

        Box::new(walker.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };
            if !entry.file_type().is_file() {
                return None;
            }
            let result = to_relative_string(root, entry.path()).and_then(|path| {
                debug!("Listing template file: {path}");
                let content = std::fs::read(entry.path())?;
                Ok(TemplateEntry { path, content })
            });
            Some(result)
        }))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        match self.resolve(path) {
            Some(full) => Ok(std::fs::read(full)?),
            None => Err(Error::NotFound { path: path.to_string() }),
        }
    }

    fn describe(&self) -> String {
        format!("local path: '{}'", self.root.display())
    }
}
