//! Materialization of transformed entries onto a destination tree.

use indexmap::IndexMap;
use log::{debug, info};
use serde::Deserialize;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// What to do when a target file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Leave the existing file untouched and report it as skipped.
    Skip,
    /// Replace the existing file.
    Overwrite,
    /// Abort the run on the first collision.
    #[default]
    Fail,
}

/// Result of a successful [`OutputWriter::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped,
}

/// Destination for transformed entries.
///
/// Paths are relative to the writer's root; a path that would resolve outside
/// of it is rejected with `Error::PathTraversal`.
pub trait OutputWriter: Sync {
    /// Checks whether `path` could be written, without touching the destination.
    fn check(&self, path: &str) -> Result<()>;

    /// Writes `content` at `path`, creating intermediate directories.
    fn write(&self, path: &str, content: &[u8]) -> Result<WriteOutcome>;
}

/// Normalizes `relative` lexically and joins it onto `root`.
///
/// # Errors
/// * `Error::PathTraversal` if the path is absolute or climbs above `root`
/// * `Error::ConfigError` if the path is empty after normalization
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf> {
    let traversal = || Error::PathTraversal {
        path: relative.to_string(),
        root: root.display().to_string(),
    };

    let mut resolved = PathBuf::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return Err(traversal());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal()),
        }
    }

    if resolved.as_os_str().is_empty() {
        return Err(Error::ConfigError(format!("empty output path '{relative}'")));
    }
    Ok(root.join(resolved))
}

/// Writes into a directory on the local filesystem.
///
/// Each file is first written to a temporary file next to its target and then
/// renamed into place, so a target is never observed half-written.
///
/// In dry-run mode every check and policy decision is made against the real
/// destination, but nothing is written.
pub struct FsWriter {
    root: PathBuf,
    policy: OverwritePolicy,
    dry_run: bool,
}

impl FsWriter {
    pub fn new<P: AsRef<Path>>(root: P, policy: OverwritePolicy) -> Self {
        Self { root: root.as_ref().to_path_buf(), policy, dry_run: false }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative path, also rejecting targets that escape the root
    /// through a symlinked directory.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let target = resolve_within(&self.root, path)?;

        let Ok(root) = self.root.canonicalize() else {
            // The root does not exist yet, so nothing below it can be a symlink.
            return Ok(target);
        };
        let existing = target.ancestors().find(|p| p.exists());
        if let Some(canonical) = existing.and_then(|p| p.canonicalize().ok()) {
            if !canonical.starts_with(&root) {
                return Err(Error::PathTraversal {
                    path: path.to_string(),
                    root: self.root.display().to_string(),
                });
            }
        }
        Ok(target)
    }

    /// Whether an existing path between the root and `target` is not a
    /// directory, so `target` cannot be created.
    fn blocked_by_file(&self, target: &Path) -> bool {
        target
            .ancestors()
            .skip(1)
            .take_while(|p| p.starts_with(&self.root) && *p != self.root.as_path())
            .any(|p| std::fs::metadata(p).is_ok_and(|m| !m.is_dir()))
    }

    fn write_failure(path: &str) -> impl FnOnce(std::io::Error) -> Error + '_ {
        move |source| Error::WriteFailure { path: path.to_string(), source }
    }
}

impl OutputWriter for FsWriter {
    fn check(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if target.is_dir()
            || self.blocked_by_file(&target)
            || (target.exists() && self.policy == OverwritePolicy::Fail)
        {
            return Err(Error::Collision { path: path.to_string() });
        }
        Ok(())
    }

    fn write(&self, path: &str, content: &[u8]) -> Result<WriteOutcome> {
        let target = self.resolve(path)?;
        let existing = std::fs::metadata(&target).ok();

        if existing.is_some() {
            match self.policy {
                OverwritePolicy::Skip => {
                    info!("Skipping '{}' (target already exists)", target.display());
                    return Ok(WriteOutcome::Skipped);
                }
                OverwritePolicy::Fail => {
                    return Err(Error::Collision { path: path.to_string() });
                }
                OverwritePolicy::Overwrite => {
                    debug!("Overwriting '{}'", target.display());
                }
            }
        }

        if self.dry_run {
            info!("Would write '{}'", target.display());
            return Ok(WriteOutcome::Written);
        }

        let parent = target.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(parent).map_err(Self::write_failure(path))?;

        let mut file = NamedTempFile::new_in(parent).map_err(Self::write_failure(path))?;
        file.write_all(content).map_err(Self::write_failure(path))?;
        match existing {
            Some(metadata) => file
                .as_file()
                .set_permissions(metadata.permissions())
                .map_err(Self::write_failure(path))?,
            None => set_default_permissions(file.as_file()).map_err(Self::write_failure(path))?,
        }
        file.persist(&target).map_err(|e| Self::write_failure(path)(e.error))?;

        info!("Wrote '{}'", target.display());
        Ok(WriteOutcome::Written)
    }
}

#[cfg(unix)]
fn set_default_permissions(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_file: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

/// Collects output in memory, starting from an optional set of existing files.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    policy: OverwritePolicy,
    files: Mutex<IndexMap<String, Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new(policy: OverwritePolicy) -> Self {
        Self { policy, files: Mutex::default() }
    }

    /// Pre-populates a file, as if it already existed at the destination.
    pub fn with_file(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.lock().insert(path.to_string(), content.into());
        self
    }

    /// Snapshot of every file, in the order they were first written.
    pub fn files(&self) -> IndexMap<String, Vec<u8>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(path: &str) -> Result<String> {
        let resolved = resolve_within(Path::new(""), path)?;
        let parts: Vec<_> =
            resolved.components().map(|c| c.as_os_str().to_string_lossy()).collect();
        Ok(parts.join("/"))
    }
}

impl OutputWriter for MemoryWriter {
    fn check(&self, path: &str) -> Result<()> {
        let key = Self::key(path)?;
        if self.policy == OverwritePolicy::Fail && self.lock().contains_key(&key) {
            return Err(Error::Collision { path: path.to_string() });
        }
        Ok(())
    }

    fn write(&self, path: &str, content: &[u8]) -> Result<WriteOutcome> {
        let key = Self::key(path)?;
        let mut files = self.lock();
        if files.contains_key(&key) {
            match self.policy {
                OverwritePolicy::Skip => return Ok(WriteOutcome::Skipped),
                OverwritePolicy::Fail => return Err(Error::Collision { path: path.to_string() }),
                OverwritePolicy::Overwrite => {}
            }
        }
        files.insert(key, content.to_vec());
        Ok(WriteOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_within() {
        let root = Path::new("/out");
        assert_eq!(resolve_within(root, "a/b.txt").unwrap(), PathBuf::from("/out/a/b.txt"));
        assert_eq!(resolve_within(root, "./a/../b.txt").unwrap(), PathBuf::from("/out/b.txt"));

        for path in ["../../etc/passwd", "a/../../b", "/etc/passwd"] {
            assert!(
                matches!(resolve_within(root, path), Err(Error::PathTraversal { .. })),
                "expected traversal for {path:?}"
            );
        }
        assert!(matches!(resolve_within(root, "a/.."), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_fs_writer_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let writer = FsWriter::new(temp_dir.path().join("out"), OverwritePolicy::Fail);

        assert_eq!(writer.write("a/b/c.txt", b"hello").unwrap(), WriteOutcome::Written);
        assert_eq!(fs::read(temp_dir.path().join("out/a/b/c.txt")).unwrap(), b"hello");
    }

    #[test]
    fn test_fs_writer_policies() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("main.go");
        fs::write(&target, "old").unwrap();

        let skip = FsWriter::new(temp_dir.path(), OverwritePolicy::Skip);
        assert!(skip.check("main.go").is_ok());
        assert_eq!(skip.write("main.go", b"new").unwrap(), WriteOutcome::Skipped);
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");

        let fail = FsWriter::new(temp_dir.path(), OverwritePolicy::Fail);
        assert!(matches!(fail.check("main.go"), Err(Error::Collision { .. })));
        assert!(matches!(fail.write("main.go", b"new"), Err(Error::Collision { .. })));
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");

        let overwrite = FsWriter::new(temp_dir.path(), OverwritePolicy::Overwrite);
        assert_eq!(overwrite.write("main.go", b"new").unwrap(), WriteOutcome::Written);
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_fs_writer_rejects_directory_target() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("pkg")).unwrap();
        let writer = FsWriter::new(temp_dir.path(), OverwritePolicy::Overwrite);
        assert!(matches!(writer.check("pkg"), Err(Error::Collision { .. })));
    }

    #[test]
    fn test_fs_writer_rejects_file_ancestor() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("pkg"), "not a directory").unwrap();

        let writer = FsWriter::new(temp_dir.path(), OverwritePolicy::Overwrite);
        assert!(matches!(writer.check("pkg/x.go"), Err(Error::Collision { .. })));
        assert!(matches!(writer.check("pkg/sub/x.go"), Err(Error::Collision { .. })));
        assert!(writer.check("other/x.go").is_ok());
    }

    #[test]
    fn test_fs_writer_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("main.go"), "old").unwrap();

        let skip = FsWriter::new(temp_dir.path(), OverwritePolicy::Skip).with_dry_run(true);
        assert_eq!(skip.write("main.go", b"new").unwrap(), WriteOutcome::Skipped);
        assert_eq!(skip.write("a/b.go", b"new").unwrap(), WriteOutcome::Written);
        assert!(!temp_dir.path().join("a").exists());

        let fail = FsWriter::new(temp_dir.path(), OverwritePolicy::Fail).with_dry_run(true);
        assert!(matches!(fail.check("main.go"), Err(Error::Collision { .. })));

        let overwrite =
            FsWriter::new(temp_dir.path(), OverwritePolicy::Overwrite).with_dry_run(true);
        assert_eq!(overwrite.write("main.go", b"new").unwrap(), WriteOutcome::Written);
        assert_eq!(fs::read_to_string(temp_dir.path().join("main.go")).unwrap(), "old");
    }

    #[cfg(unix)]
    #[test]
    fn test_fs_writer_rejects_symlink_escape() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let root = temp_dir.path().join("out");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("link")).unwrap();

        let writer = FsWriter::new(&root, OverwritePolicy::Overwrite);
        assert!(matches!(writer.write("link/x.txt", b"x"), Err(Error::PathTraversal { .. })));
        assert!(!outside.path().join("x.txt").exists());
    }

    #[test]
    fn test_memory_writer() {
        let writer = MemoryWriter::new(OverwritePolicy::Skip).with_file("a.txt", "old");
        assert_eq!(writer.write("./a.txt", b"new").unwrap(), WriteOutcome::Skipped);
        assert_eq!(writer.write("b/c.txt", b"c").unwrap(), WriteOutcome::Written);
        assert!(matches!(writer.write("../x", b"x"), Err(Error::PathTraversal { .. })));

        let files = writer.files();
        assert_eq!(files.get("a.txt").unwrap(), b"old");
        assert_eq!(files.get("b/c.txt").unwrap(), b"c");
    }
}
