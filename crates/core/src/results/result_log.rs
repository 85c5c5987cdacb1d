use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::face_box::FaceBox;

/// Separates the item key from the serialized result on each log line.
pub const SEPARATOR: char = '\t';

/// Item key → detected faces, as replayed from a log file.
pub type ResultIndex = HashMap<String, Vec<FaceBox>>;

#[derive(Error, Debug)]
pub enum ResultLogError {
    #[error("failed to open result log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read result log {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed entry at {path}:{line}: {reason}")]
    MalformedEntry {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("failed to append to result log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize result for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("item key {0:?} contains a tab or line break")]
    InvalidKey(String),
}

/// Whether `key` can be stored on a single log line.
pub fn is_valid_key(key: &str) -> bool {
    !key.contains([SEPARATOR, '\n', '\r'])
}

/// Durable, append-only record of completed detections.
///
/// Every line is `key<TAB>json`, where `json` is the face list as an array
/// of `[top, right, bottom, left]`. A key is written at most once; lines are
/// never rewritten. The whole file is replayed into memory on open, and each
/// [`persist`](Self::persist) is flushed to disk before it returns, so an
/// interrupted run resumes exactly where the last persisted key left off.
///
/// Only one process may own a given log file at a time.
pub struct ResultLog {
    path: PathBuf,
    index: ResultIndex,
    file: File,
}

impl ResultLog {
    /// Replays `path` into an index and opens it for appending, creating the
    /// file (and its parent directories) if needed.
    pub fn open(path: &Path) -> Result<Self, ResultLogError> {
        let index = Self::load(path)?;
        log::info!(
            "Found {} entries in result log {}",
            index.len(),
            path.display()
        );

        let open_err = |source| ResultLogError::Open {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            index,
            file,
        })
    }

    /// Reads every entry of the log at `path` in file order.
    ///
    /// A missing file is an empty index. Any line that cannot be split on
    /// [`SEPARATOR`] or whose payload is not a face list fails the whole load.
    pub fn load(path: &Path) -> Result<ResultIndex, ResultLogError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ResultIndex::new()),
            Err(source) => {
                return Err(ResultLogError::Open {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut index = ResultIndex::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| ResultLogError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            if line.is_empty() {
                continue;
            }
            let malformed = |reason: String| ResultLogError::MalformedEntry {
                path: path.to_path_buf(),
                line: i + 1,
                reason,
            };
            let (key, payload) = line
                .split_once(SEPARATOR)
                .ok_or_else(|| malformed("missing separator".to_string()))?;
            let faces: Vec<FaceBox> =
                serde_json::from_str(payload).map_err(|e| malformed(e.to_string()))?;
            index.insert(key.to_string(), faces);
        }
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// True when every key is already recorded (vacuously true for none).
    pub fn has_all<S: AsRef<str>>(&self, keys: &[S]) -> bool {
        keys.iter().all(|k| self.has(k.as_ref()))
    }

    pub fn get(&self, key: &str) -> Option<&[FaceBox]> {
        self.index.get(key).map(|v| v.as_slice())
    }

    /// Read-only view of everything recorded so far.
    pub fn index(&self) -> &ResultIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Records `faces` for `key` unless the key is already present.
    ///
    /// Returns `Ok(false)` without touching the file when the key exists; the
    /// stored result is never replaced. Otherwise appends one line, syncs it
    /// to disk and returns `Ok(true)`.
    pub fn persist(&mut self, key: &str, faces: &[FaceBox]) -> Result<bool, ResultLogError> {
        if self.has(key) {
            return Ok(false);
        }
        if !is_valid_key(key) {
            return Err(ResultLogError::InvalidKey(key.to_string()));
        }

        let payload = serde_json::to_string(faces).map_err(|source| ResultLogError::Serialize {
            key: key.to_string(),
            source,
        })?;
        let line = format!("{key}{SEPARATOR}{payload}\n");

        append_line(&mut self.file, line.as_bytes()).map_err(|source| ResultLogError::Write {
            path: self.path.clone(),
            source,
        })?;

        self.index.insert(key.to_string(), faces.to_vec());
        Ok(true)
    }

    /// Flushes pending data and releases the file handle.
    pub fn close(mut self) -> Result<(), ResultLogError> {
        let write_err = |source| ResultLogError::Write {
            path: self.path.clone(),
            source,
        };
        self.file.flush().map_err(write_err)?;
        self.file.sync_all().map_err(write_err)?;
        log::debug!(
            "Closed result log {} ({} entries)",
            self.path.display(),
            self.index.len()
        );
        Ok(())
    }
}

/// A file-like target that log lines are appended to.
trait AppendTarget: Write {
    fn end_offset(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl AppendTarget for File {
    fn end_offset(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Appends `line` and syncs it, or leaves the target as it was.
///
/// A write can land partially before failing (disk full, file size limit),
/// so on error the target is cut back to its previous end. Otherwise the
/// torn line would make every later load fail.
fn append_line<T: AppendTarget>(target: &mut T, line: &[u8]) -> io::Result<()> {
    let end = target.end_offset()?;
    let result = target.write_all(line).and_then(|()| target.sync());
    if let Err(e) = result {
        if let Err(rollback) = target.truncate_to(end).and_then(|()| target.sync()) {
            log::error!("Failed to roll back partial result log line: {rollback}");
        }
        return Err(e);
    }
    Ok(())
}
