use serde::{Deserialize, Serialize};

/// A detected face rectangle in pixel coordinates.
///
/// Edges are stored in `(top, right, bottom, left)` order and serialize as a
/// bare four-integer array, which keeps one log line per image compact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct FaceBox {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl FaceBox {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Builds a box from `(x1, y1, x2, y2)` corners, rounding to whole pixels
    /// and clamping to a `frame_w` x `frame_h` frame.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, frame_w: u32, frame_h: u32) -> Self {
        let max_x = frame_w as f64;
        let max_y = frame_h as f64;
        Self {
            top: y1.clamp(0.0, max_y).round() as i32,
            right: x2.clamp(0.0, max_x).round() as i32,
            bottom: y2.clamp(0.0, max_y).round() as i32,
            left: x1.clamp(0.0, max_x).round() as i32,
        }
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    /// True when the box covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl From<[i32; 4]> for FaceBox {
    fn from([top, right, bottom, left]: [i32; 4]) -> Self {
        Self::new(top, right, bottom, left)
    }
}

impl From<FaceBox> for [i32; 4] {
    fn from(b: FaceBox) -> Self {
        [b.top, b.right, b.bottom, b.left]
    }
}
