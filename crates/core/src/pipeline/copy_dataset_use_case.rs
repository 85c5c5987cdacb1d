use std::fs;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("failed to read file list {path}: {source}")]
    ReadList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} has fewer than {segments} path segments")]
    TooFewSegments { path: PathBuf, segments: usize },
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads a list of paths, one per line. Blank lines and surrounding
/// whitespace are ignored.
pub fn read_file_list(path: &Path) -> Result<Vec<PathBuf>, CopyError> {
    let content = fs::read_to_string(path).map_err(|source| CopyError::ReadList {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}

/// Copies files into a dataset tree rebuilt from the trailing segments of
/// each source path.
///
/// With the default three segments, `/raw/paris/42/a.png` lands at
/// `<output_dir>/paris/42/a.png` (`city/profile_id/image`).
pub struct CopyDatasetUseCase {
    output_dir: PathBuf,
    segments: NonZeroUsize,
}

impl CopyDatasetUseCase {
    pub fn new(output_dir: PathBuf, segments: NonZeroUsize) -> Self {
        Self {
            output_dir,
            segments,
        }
    }

    pub fn destination_for(&self, source: &Path) -> Result<PathBuf, CopyError> {
        let names: Vec<_> = source
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name),
                _ => None,
            })
            .collect();
        let k = self.segments.get();
        if names.len() < k {
            return Err(CopyError::TooFewSegments {
                path: source.to_path_buf(),
                segments: k,
            });
        }
        Ok(names[names.len() - k..]
            .iter()
            .fold(self.output_dir.clone(), |dest, name| dest.join(name)))
    }

    /// Copies every file, stopping at the first failure. Returns the number
    /// of files copied.
    pub fn execute(&self, files: &[PathBuf]) -> Result<usize, CopyError> {
        for source in files {
            let dest = self.destination_for(source)?;
            let copy_err = |e| CopyError::Copy {
                from: source.clone(),
                to: dest.clone(),
                source: e,
            };
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(copy_err)?;
            }
            fs::copy(source, &dest).map_err(copy_err)?;
            log::info!("COPY: {} to {}", source.display(), dest.display());
        }
        Ok(files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn use_case(output: &Path, k: usize) -> CopyDatasetUseCase {
        CopyDatasetUseCase::new(output.to_path_buf(), NonZeroUsize::new(k).unwrap())
    }

    #[rstest]
    #[case::three_segments("/raw/paris/42/a.png", 3, "/out/paris/42/a.png")]
    #[case::one_segment("/raw/paris/42/a.png", 1, "/out/a.png")]
    #[case::exact_depth("paris/42/a.png", 3, "/out/paris/42/a.png")]
    #[case::dot_components("/raw/./paris/42/a.png", 3, "/out/paris/42/a.png")]
    fn test_destination_keeps_trailing_segments(
        #[case] source: &str,
        #[case] k: usize,
        #[case] expected: &str,
    ) {
        let dest = use_case(Path::new("/out"), k)
            .destination_for(Path::new(source))
            .unwrap();
        assert_eq!(dest, PathBuf::from(expected));
    }

    #[test]
    fn test_shallow_path_is_rejected() {
        let result = use_case(Path::new("/out"), 3).destination_for(Path::new("/42/a.png"));
        assert!(matches!(
            result,
            Err(CopyError::TooFewSegments { segments: 3, .. })
        ));
    }

    #[test]
    fn test_read_file_list_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("files.txt");
        fs::write(&list, "/a/b/c.png\n\n  /d/e/f.png  \n").unwrap();

        assert_eq!(
            read_file_list(&list).unwrap(),
            vec![PathBuf::from("/a/b/c.png"), PathBuf::from("/d/e/f.png")]
        );
    }

    #[test]
    fn test_read_missing_list_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_file_list(&dir.path().join("none.txt")),
            Err(CopyError::ReadList { .. })
        ));
    }

    #[test]
    fn test_execute_copies_into_nested_layout() {
        let dir = tempfile::tempdir().unwrap();
        let src_dir = dir.path().join("raw").join("paris").join("42");
        fs::create_dir_all(&src_dir).unwrap();
        let src = src_dir.join("a.png");
        fs::write(&src, b"pixels").unwrap();
        let out = dir.path().join("digits");

        let copied = use_case(&out, 3).execute(&[src.clone()]).unwrap();

        assert_eq!(copied, 1);
        assert_eq!(
            fs::read(out.join("paris").join("42").join("a.png")).unwrap(),
            b"pixels"
        );
        assert!(src.exists());
    }

    #[test]
    fn test_execute_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("x").join("y").join("z.png");

        let result = use_case(&dir.path().join("out"), 3).execute(&[missing]);

        assert!(matches!(result, Err(CopyError::Copy { .. })));
    }
}
