//! Image capture metadata, storage keys and upload signaling.

mod image_models;
mod image_pipeline;

pub use image_models::{CapturedFrame, ImageMetadata, UploadRequest, UploadStatus};
pub use image_pipeline::{ImagePipeline, UploadSignal};
