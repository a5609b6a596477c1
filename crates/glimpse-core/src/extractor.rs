//! Capability interface over the external detection/recognition model.
//!
//! The pipeline assumes nothing about the model beyond "zero or more faces
//! per frame, each with a fixed-length descriptor". Any runtime — ONNX,
//! remote service, test stub — can sit behind this trait.

use thiserror::Error;

use crate::types::Detection;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Detects faces in 8-bit grayscale images and computes their descriptors.
///
/// `&mut self` because model runtimes typically require exclusive access to
/// their inference session.
pub trait DescriptorExtractor {
    /// Detect at most one face (the most confident) in a reference image.
    ///
    /// Returns `None` when no face is found — a normal outcome during
    /// enrollment, not an error.
    fn detect_single(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<Detection>, ExtractorError>;

    /// Detect all faces in a live frame, in detector-defined order.
    fn detect_all(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, ExtractorError>;
}
