//! Face descriptor embedder via ONNX Runtime.
//!
//! Crops the detected box (with a small margin, squared up), resizes to the
//! model input, and runs the embedding network. Output descriptors are
//! L2-normalised so Euclidean distances land in the usual [0, 2] range.

use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

use super::resize_gray_bilinear;
use crate::extractor::ExtractorError;
use crate::types::{BoundingBox, Descriptor};

const EMBEDDER_INPUT_SIZE: usize = 112;
const EMBEDDER_MEAN: f32 = 127.5;
const EMBEDDER_STD: f32 = 127.5;
const EMBEDDER_DESCRIPTOR_DIM: usize = 128;
/// Margin added around the detection box before cropping, as a fraction of
/// the box's larger side.
const CROP_MARGIN: f32 = 0.2;

/// Descriptor embedding network.
pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    /// Load the embedding model. Fails fast on a missing file.
    pub fn load(model_path: &str) -> Result<Self, ExtractorError> {
        if !Path::new(model_path).exists() {
            return Err(ExtractorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face embedding model"
        );

        Ok(Self { session })
    }

    /// Compute the descriptor for one detected face.
    pub fn embed(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
        face: &BoundingBox,
    ) -> Result<Descriptor, ExtractorError> {
        let crop = crop_square(gray, width as usize, height as usize, face);
        let input = preprocess(&crop);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("embedding: {e}")))?;

        if raw.len() != EMBEDDER_DESCRIPTOR_DIM {
            return Err(ExtractorError::InferenceFailed(format!(
                "expected {EMBEDDER_DESCRIPTOR_DIM}-dim descriptor, got {}",
                raw.len()
            )));
        }

        Ok(Descriptor::new(l2_normalize(raw)))
    }
}

/// L2-normalise a raw embedding; a zero vector is returned unchanged.
fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}

/// Crop the face region as a square with margin, clamped to the frame, and
/// resize it to the embedder input size. Out-of-frame pixels read as black.
fn crop_square(gray: &[u8], width: usize, height: usize, face: &BoundingBox) -> Vec<u8> {
    let side = face.width.max(face.height) * (1.0 + CROP_MARGIN);
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;

    let x0 = (cx - side / 2.0).round() as i64;
    let y0 = (cy - side / 2.0).round() as i64;
    let side = (side.round() as i64).max(1);

    let mut crop = vec![0u8; (side * side) as usize];
    for dy in 0..side {
        let sy = y0 + dy;
        if sy < 0 || sy >= height as i64 {
            continue;
        }
        for dx in 0..side {
            let sx = x0 + dx;
            if sx < 0 || sx >= width as i64 {
                continue;
            }
            crop[(dy * side + dx) as usize] = gray[sy as usize * width + sx as usize];
        }
    }

    resize_gray_bilinear(
        &crop,
        side as usize,
        side as usize,
        EMBEDDER_INPUT_SIZE,
        EMBEDDER_INPUT_SIZE,
    )
}

/// Normalise the crop into a NCHW tensor, replicating grayscale into RGB.
fn preprocess(crop: &[u8]) -> Array4<f32> {
    let size = EMBEDDER_INPUT_SIZE;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for y in 0..size {
        for x in 0..size {
            let pixel = crop.get(y * size + x).copied().unwrap_or(0) as f32;
            let value = (pixel - EMBEDDER_MEAN) / EMBEDDER_STD;
            tensor[[0, 0, y, x]] = value;
            tensor[[0, 1, y, x]] = value;
            tensor[[0, 2, y, x]] = value;
        }
    }

    tensor
}
