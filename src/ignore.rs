//! File and directory ignore pattern handling for kiln templates.
//! This module processes .kilnignore files to exclude specific paths
//! from a template directory, similar to .gitignore functionality.

use crate::constants::{DEFAULT_IGNORE_PATTERNS, IGNORE_FILE};
use crate::error::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use std::{fs::read_to_string, path::Path};

/// Reads the .kilnignore file of a template root and builds a set of glob patterns.
///
/// Patterns match paths relative to the template root, using `/` separators.
///
/// # Notes
/// - The default patterns are always included
/// - If the .kilnignore file doesn't exist, only the defaults are used
/// - Blank lines and lines starting with `#` are skipped
/// - A pattern ending with `/` also ignores everything below that directory
///
/// # Example
/// ```ignore
/// # Contents of .kilnignore:
/// *.pyc
/// __pycache__/
/// ```
pub fn parse_ignore_file<P: AsRef<Path>>(template_root: P) -> Result<GlobSet> {
    let ignore_path = template_root.as_ref().join(IGNORE_FILE);

    let mut patterns: Vec<String> =
        DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect();

    if let Ok(contents) = read_to_string(&ignore_path) {
        for line in contents.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.strip_suffix('/') {
                Some(dir) => {
                    patterns.push(dir.to_string());
                    patterns.push(format!("{dir}/**"));
                }
                None => patterns.push(line.to_string()),
            }
        }
    } else {
        debug!("No {IGNORE_FILE} file found, using default patterns.");
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in &patterns {
        debug!("Adding ignore pattern: {pattern}");
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
