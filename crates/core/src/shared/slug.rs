use std::path::Path;

/// Extension of the per-directory result log.
pub const LOG_EXTENSION: &str = "log";

/// Result log file name for an input directory.
///
/// The path is transliterated to lowercase ASCII with every other run of
/// characters collapsed into a single `-`. It depends only on the directory
/// path as given, so rerunning against the same directory reopens the same
/// log.
pub fn log_file_name(images_dir: &Path) -> String {
    format!(
        "{}.{LOG_EXTENSION}",
        ::slug::slugify(images_dir.to_string_lossy())
    )
}
