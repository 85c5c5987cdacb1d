use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

const APP_DIR_NAME: &str = "facebatch";

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create model directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Locates a detection model by file name, downloading it on first use.
///
/// A copy already in the user cache directory is used as is; otherwise the
/// model is downloaded into the cache.
pub fn resolve(
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, progress)
}

fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.is_file() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    fs::create_dir_all(cache_dir).map_err(|source| ModelResolveError::CacheDir {
        path: cache_dir.to_path_buf(),
        source,
    })?;
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform cache directory for downloaded models, e.g.
/// `~/.cache/facebatch/models/` on Linux.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    dirs::cache_dir()
        .map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };

    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;
    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(download_err)?;

    // Written under a temporary name and renamed, so a partial download is
    // never picked up as a cached model.
    let temp_path = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let mut downloaded: u64 = 0;
    for chunk in bytes.chunks(1024 * 1024) {
        file.write_all(chunk).map_err(write_err)?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.sync_all().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|source| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UNREACHABLE_URL: &str = "http://127.0.0.1:9/model.onnx";

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cached = tmp.path().join("face.onnx");
        fs::write(&cached, b"cached").unwrap();

        let path = resolve_in(tmp.path(), "face.onnx", UNREACHABLE_URL, None).unwrap();

        assert_eq!(path, cached);
    }

    #[test]
    fn test_missing_cache_dir_is_created_before_download() {
        let tmp = TempDir::new().unwrap();
        let cache_dir = tmp.path().join("cache").join("models");

        let result = resolve_in(&cache_dir, "face.onnx", UNREACHABLE_URL, None);

        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(cache_dir.is_dir());
    }

    #[test]
    fn test_failed_download_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let result = resolve_in(tmp.path(), "face.onnx", UNREACHABLE_URL, None);

        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!tmp.path().join("face.onnx").exists());
        assert!(!tmp.path().join("face.part").exists());
    }

    #[test]
    fn test_model_cache_dir_is_namespaced() {
        let path = model_cache_dir().unwrap();
        assert!(path.ends_with("facebatch/models"));
    }
}
