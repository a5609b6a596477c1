//! ONNX-backed [`DescriptorExtractor`] — face detection plus descriptor
//! embedding, both via ONNX Runtime CPU inference.

mod detector;
mod embedder;

pub use detector::FaceDetector;
pub use embedder::FaceEmbedder;

use crate::extractor::{DescriptorExtractor, ExtractorError};
use crate::types::Detection;

/// Extractor pairing a face detector with a descriptor embedder.
///
/// Both models are loaded once, fail-fast, before first use.
pub struct OnnxExtractor {
    detector: FaceDetector,
    embedder: FaceEmbedder,
}

impl OnnxExtractor {
    pub fn load(detector_path: &str, embedder_path: &str) -> Result<Self, ExtractorError> {
        let detector = FaceDetector::load(detector_path)?;
        let embedder = FaceEmbedder::load(embedder_path)?;
        Ok(Self { detector, embedder })
    }
}

impl DescriptorExtractor for OnnxExtractor {
    fn detect_single(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<Detection>, ExtractorError> {
        // Boxes come back sorted by confidence; the first is the best.
        let Some(bbox) = self.detector.detect(gray, width, height)?.into_iter().next() else {
            return Ok(None);
        };
        let descriptor = self.embedder.embed(gray, width, height, &bbox)?;
        Ok(Some(Detection { bbox, descriptor }))
    }

    fn detect_all(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, ExtractorError> {
        let boxes = self.detector.detect(gray, width, height)?;
        let mut detections = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            let descriptor = self.embedder.embed(gray, width, height, &bbox)?;
            detections.push(Detection { bbox, descriptor });
        }
        Ok(detections)
    }
}

/// Resize an 8-bit grayscale image with bilinear interpolation.
pub(crate) fn resize_gray_bilinear(
    src: &[u8],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<u8> {
    let mut dst = vec![0u8; dst_w * dst_h];
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return dst;
    }

    let scale_x = src_w as f32 / dst_w as f32;
    let scale_y = src_h as f32 / dst_h as f32;

    for y in 0..dst_h {
        let src_y = (y as f32 + 0.5) * scale_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, src_h as i32 - 1) as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..dst_w {
            let src_x = (x as f32 + 0.5) * scale_x - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, src_w as i32 - 1) as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            let tl = src[y0 * src_w + x0] as f32;
            let tr = src[y0 * src_w + x1] as f32;
            let bl = src[y1 * src_w + x0] as f32;
            let br = src[y1 * src_w + x1] as f32;

            let val = tl * (1.0 - fx) * (1.0 - fy)
                + tr * fx * (1.0 - fy)
                + bl * (1.0 - fx) * fy
                + br * fx * fy;

            dst[y * dst_w + x] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    dst
}
