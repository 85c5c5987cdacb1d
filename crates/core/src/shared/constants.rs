pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Images handed to the detector per call when batching is enabled.
pub const DEFAULT_BATCH_SIZE: usize = 8;

pub const DEFAULT_EXTENSION: &str = "png";

/// Trailing path components (`city/profile_id/image`) kept when copying into a dataset.
pub const DEFAULT_COPY_SEGMENTS: usize = 3;
