pub mod face_detector;
