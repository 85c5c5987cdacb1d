use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::imaging::domain::image_reader::ImageReader;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("source file no longer exists: {0}")]
    MissingSourceFile(PathBuf),
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("face detection failed: {0}")]
    Detection(String),
}

/// The external work applied to item keys by the batch runner.
///
/// `process_batch` must return exactly one result per key, in key order.
pub trait ItemProcessor: Send {
    fn process_one(&mut self, key: &str) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;

    fn process_batch(
        &mut self,
        keys: &[String],
    ) -> Result<Vec<Vec<FaceBox>>, Box<dyn std::error::Error>>;
}

/// Treats item keys as image paths: decodes them and runs a face detector.
pub struct DetectorItemProcessor {
    reader: Box<dyn ImageReader>,
    detector: Box<dyn FaceDetector>,
}

impl DetectorItemProcessor {
    pub fn new(reader: Box<dyn ImageReader>, detector: Box<dyn FaceDetector>) -> Self {
        Self { reader, detector }
    }

    fn load(&self, key: &str) -> Result<Frame, ProcessError> {
        let path = Path::new(key);
        if !path.is_file() {
            return Err(ProcessError::MissingSourceFile(path.to_path_buf()));
        }
        self.reader.read(path).map_err(|e| ProcessError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl ItemProcessor for DetectorItemProcessor {
    fn process_one(&mut self, key: &str) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let frame = self.load(key)?;
        let faces = self
            .detector
            .detect(&frame)
            .map_err(|e| ProcessError::Detection(e.to_string()))?;
        Ok(faces)
    }

    fn process_batch(
        &mut self,
        keys: &[String],
    ) -> Result<Vec<Vec<FaceBox>>, Box<dyn std::error::Error>> {
        let frames = keys
            .iter()
            .map(|key| self.load(key))
            .collect::<Result<Vec<_>, _>>()?;
        let faces = self
            .detector
            .detect_batch(&frames)
            .map_err(|e| ProcessError::Detection(e.to_string()))?;
        Ok(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubReader;

    impl ImageReader for StubReader {
        fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
            let bytes = std::fs::read(path)?;
            if bytes.is_empty() {
                return Err("empty file".into());
            }
            // Width encodes the file size so detections can be told apart.
            let width = bytes.len() as u32;
            Ok(Frame::new(vec![0; width as usize * 3], width, 1))
        }
    }

    struct StubDetector {
        batch_sizes: Arc<Mutex<Vec<usize>>>,
        fail: bool,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            if self.fail {
                return Err("model exploded".into());
            }
            Ok(vec![FaceBox::new(0, frame.width() as i32, 1, 0)])
        }

        fn detect_batch(
            &mut self,
            frames: &[Frame],
        ) -> Result<Vec<Vec<FaceBox>>, Box<dyn std::error::Error>> {
            self.batch_sizes.lock().unwrap().push(frames.len());
            frames.iter().map(|f| self.detect(f)).collect()
        }
    }

    // --- Helpers ---

    fn processor(fail: bool) -> (DetectorItemProcessor, Arc<Mutex<Vec<usize>>>) {
        let batch_sizes = Arc::new(Mutex::new(Vec::new()));
        let detector = StubDetector {
            batch_sizes: batch_sizes.clone(),
            fail,
        };
        (
            DetectorItemProcessor::new(Box::new(StubReader), Box::new(detector)),
            batch_sizes,
        )
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, len: usize) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, vec![1u8; len]).unwrap();
        path.to_string_lossy().into_owned()
    }

    // --- Tests ---

    #[test]
    fn test_process_one_detects_on_decoded_image() {
        let dir = tempfile::tempdir().unwrap();
        let key = write_file(&dir, "a.png", 7);
        let (mut p, _) = processor(false);

        let faces = p.process_one(&key).unwrap();

        assert_eq!(faces, vec![FaceBox::new(0, 7, 1, 0)]);
    }

    #[test]
    fn test_process_batch_sends_whole_group_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let keys = vec![write_file(&dir, "a.png", 3), write_file(&dir, "b.png", 5)];
        let (mut p, batch_sizes) = processor(false);

        let faces = p.process_batch(&keys).unwrap();

        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0][0].right, 3);
        assert_eq!(faces[1][0].right, 5);
        assert_eq!(*batch_sizes.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_missing_source_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("gone.png").to_string_lossy().into_owned();
        let (mut p, batch_sizes) = processor(false);

        let err = p.process_batch(&[key]).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ProcessError>(),
            Some(ProcessError::MissingSourceFile(_))
        ));
        assert!(batch_sizes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let key = write_file(&dir, "empty.png", 0);
        let (mut p, _) = processor(false);

        let err = p.process_one(&key).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ProcessError>(),
            Some(ProcessError::Decode { .. })
        ));
    }

    #[test]
    fn test_detector_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let key = write_file(&dir, "a.png", 2);
        let (mut p, _) = processor(true);

        let err = p.process_one(&key).unwrap_err();

        assert!(err.to_string().contains("model exploded"));
    }
}
