use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Recursively lists files under `root` whose extension matches one of
/// `extensions` (case-insensitive).
///
/// The result is sorted and free of duplicates so that chunk boundaries and
/// log keys stay identical from one run to the next. Unreadable entries are
/// logged and skipped.
pub fn discover_images(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
        .map(|e| e.into_path())
        .collect();

    images.sort();
    images.dedup();
    images
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
