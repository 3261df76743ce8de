//! Common constants used throughout kiln.

/// Supported manifest file names, in lookup order.
pub const MANIFEST_FILES: [&str; 3] = ["kiln.json", "kiln.yml", "kiln.yaml"];

/// kiln's ignore file name
pub const IGNORE_FILE: &str = ".kilnignore";

/// Patterns that are always excluded from a live template directory.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    ".git/**",
    ".hg",
    ".hg/**",
    ".svn",
    ".svn/**",
    "**/.DS_Store",
    IGNORE_FILE,
    "kiln.json",
    "kiln.yml",
    "kiln.yaml",
];
