use std::path::Path;

use image::imageops::FilterType;

use crate::imaging::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Antialiased resampling for downscaled dataset images.
const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Encodes frames with the `image` crate; the format follows the file extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // Several workers may create the same directory concurrently;
        // create_dir_all treats an existing directory as success.
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = frame
            .to_rgb_image()
            .ok_or("Frame data does not match its dimensions")?;

        let img = match size {
            Some((w, h)) if (w, h) != img.dimensions() => {
                image::imageops::resize(&img, w, h, RESIZE_FILTER)
            }
            _ => img,
        };

        img.save(path)?;
        Ok(())
    }
}
