use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Implementations may hold mutable inference state, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;

    /// Detects faces on several frames at once, returning one result per
    /// frame in input order.
    ///
    /// The default runs [`FaceDetector::detect`] frame by frame; backends
    /// with real batched inference override it.
    fn detect_batch(
        &mut self,
        frames: &[Frame],
    ) -> Result<Vec<Vec<FaceBox>>, Box<dyn std::error::Error>> {
        frames.iter().map(|frame| self.detect(frame)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports one box per frame whose top edge is the frame width.
    struct WidthDetector {
        calls: usize,
    }

    impl FaceDetector for WidthDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
            self.calls += 1;
            Ok(vec![FaceBox::new(frame.width() as i32, 1, 1, 0)])
        }
    }

    fn frame(width: u32) -> Frame {
        Frame::new(vec![0; width as usize * 3], width, 1)
    }

    #[test]
    fn test_default_batch_preserves_order() {
        let mut detector = WidthDetector { calls: 0 };
        let results = detector
            .detect_batch(&[frame(3), frame(1), frame(2)])
            .unwrap();

        let tops: Vec<i32> = results.iter().map(|r| r[0].top).collect();
        assert_eq!(tops, vec![3, 1, 2]);
        assert_eq!(detector.calls, 3);
    }

    #[test]
    fn test_default_batch_empty_input() {
        let mut detector = WidthDetector { calls: 0 };
        assert!(detector.detect_batch(&[]).unwrap().is_empty());
        assert_eq!(detector.calls, 0);
    }
}
