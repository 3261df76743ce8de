use crate::error::{Error, Result};
use crate::loader::{AssetSource, TemplateEntry};

/// A file compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedFile {
    pub path: &'static str,
    pub content: &'static [u8],
}

/// Template source backed by a bundle fixed at build time.
#[derive(Debug, Clone)]
pub struct EmbeddedSource {
    name: &'static str,
    files: &'static [EmbeddedFile],
}

impl EmbeddedSource {
    pub fn new(name: &'static str, files: &'static [EmbeddedFile]) -> Self {
        Self { name, files }
    }

    fn find(&self, path: &str) -> Option<&EmbeddedFile> {
        self.files.iter().find(|file| file.path == path)
    }
}

impl AssetSource for EmbeddedSource {
    fn list(&self) -> Box<dyn Iterator<Item = Result<TemplateEntry>> + '_> {
        Box::new(
            self.files
                .iter()
                .map(|file| Ok(TemplateEntry::new(file.path, file.content))),
        )
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.find(path)
            .map(|file| file.content.to_vec())
            .ok_or_else(|| Error::NotFound { path: path.to_string() })
    }

    fn describe(&self) -> String {
        format!("embedded bundle '{}'", self.name)
    }
}

/// Builds an [`EmbeddedSource`] from files below a directory, relative to the
/// source file that invokes the macro.
///
/// ```ignore
/// let source = kiln::embedded_bundle!("app", "../templates/app" => [
///     "go.mod.plush",
///     "app/app.go.plush",
/// ]);
/// ```
#[macro_export]
macro_rules! embedded_bundle {
    ($name:literal, $root:literal => [$($path:literal),* $(,)?]) => {{
        const FILES: &[$crate::loader::EmbeddedFile] = &[$(
            $crate::loader::EmbeddedFile {
                path: $path,
                content: include_bytes!(concat!($root, "/", $path)),
            }
        ),*];
        $crate::loader::EmbeddedSource::new($name, FILES)
    }};
}
