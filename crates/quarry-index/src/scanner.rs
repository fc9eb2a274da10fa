//! Workspace file enumeration.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// Extensions worth feeding to the extractor: every extension
/// `detect_language` recognises, plus markdown. Files on this list
/// without a grammar (markdown, currently) simply produce zero chunks.
const SCAN_EXTENSIONS: &[&str] = &[
    "py", "pyi", "js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts", "rs", "md",
];

/// Lazily yield candidate source files under `root`.
///
/// Honors `.gitignore` and skips hidden entries, so build output and
/// vendored trees stay out of the index. Unreadable directory entries
/// are logged and skipped.
pub fn scan_workspace(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkBuilder::new(root)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| has_scan_extension(path))
}

fn has_scan_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCAN_EXTENSIONS.contains(&ext))
}
