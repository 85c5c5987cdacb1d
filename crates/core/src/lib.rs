//! Resumable batch jobs for face-image datasets: face detection backed by an
//! append-only result log, image resizing with a worker pool, and dataset
//! copying into a nested directory layout.

pub mod detection;
pub mod imaging;
pub mod pipeline;
pub mod results;
pub mod shared;
