pub mod copy_dataset_use_case;
pub mod detect_faces_use_case;
pub mod grouping;
pub mod item_processor;
pub mod progress_reporter;
pub mod resize_images_use_case;
