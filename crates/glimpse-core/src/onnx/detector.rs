//! Anchor-free face detector via ONNX Runtime.
//!
//! Decodes a single-stride score/box grid (CenterFace-style export): the
//! model takes a letterboxed square input and produces one confidence and
//! one box regression per grid cell. Post-processing is confidence
//! thresholding followed by NMS.

use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

use super::resize_gray_bilinear;
use crate::extractor::ExtractorError;
use crate::types::BoundingBox;

const DETECTOR_INPUT_SIZE: usize = 320;
const DETECTOR_STRIDE: usize = 8;
const DETECTOR_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DETECTOR_NMS_THRESHOLD: f32 = 0.4;
/// Input pixels are scaled to [0, 1].
const DETECTOR_PIXEL_SCALE: f32 = 255.0;

/// Letterbox mapping from model input space back to frame space.
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Single-stride anchor-free face detector.
pub struct FaceDetector {
    session: Session,
    input_size: usize,
}

impl FaceDetector {
    /// Load the detection model. Fails fast on a missing file.
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
            "loaded face detection model"
        );

        Ok(Self {
            session,
            input_size: DETECTOR_INPUT_SIZE,
        })
    }

    /// Detect faces in a grayscale frame, sorted by descending confidence.
    pub fn detect(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, ExtractorError> {
        let (input, letterbox) = self.preprocess(gray, width as usize, height as usize);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        // Positional outputs: [0] = per-cell scores, [1] = per-cell boxes.
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("scores: {e}")))?;
        let (_, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| ExtractorError::InferenceFailed(format!("boxes: {e}")))?;

        let candidates = decode_grid(
            scores,
            boxes,
            self.input_size,
            DETECTOR_STRIDE,
            &letterbox,
            DETECTOR_CONFIDENCE_THRESHOLD,
        );

        // nms sorts candidates by confidence and keeps that order.
        Ok(nms(candidates, DETECTOR_NMS_THRESHOLD))
    }

    /// Letterbox the frame into a square [0, 1]-scaled NCHW tensor,
    /// replicating the grayscale channel into RGB.
    fn preprocess(&self, gray: &[u8], width: usize, height: usize) -> (Array4<f32>, Letterbox) {
        let size = self.input_size;
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as usize).max(1);
        let new_h = ((height as f32 * scale).round() as usize).max(1);
        let pad_x = (size - new_w) as f32 / 2.0;
        let pad_y = (size - new_h) as f32 / 2.0;

        let resized = resize_gray_bilinear(gray, width, height, new_w, new_h);

        let x_start = pad_x.floor() as usize;
        let y_start = pad_y.floor() as usize;

        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for y in 0..new_h {
            for x in 0..new_w {
                let value = resized[y * new_w + x] as f32 / DETECTOR_PIXEL_SCALE;
                let (ty, tx) = (y + y_start, x + x_start);
                tensor[[0, 0, ty, tx]] = value;
                tensor[[0, 1, ty, tx]] = value;
                tensor[[0, 2, ty, tx]] = value;
            }
        }

        (tensor, Letterbox { scale, pad_x, pad_y })
    }
}

/// Decode the score/box grid into frame-space candidates.
///
/// `boxes` holds 4 values per cell: center offsets (dx, dy) within the cell
/// and box size (w, h), all in stride units.
fn decode_grid(
    scores: &[f32],
    boxes: &[f32],
    input_size: usize,
    stride: usize,
    letterbox: &Letterbox,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid = input_size / stride;
    let cells = grid * grid;
    let mut detections = Vec::new();

    for idx in 0..cells.min(scores.len()) {
        let score = scores[idx];
        if score <= threshold {
            continue;
        }

        let off = idx * 4;
        if off + 3 >= boxes.len() {
            break;
        }

        let cell_x = (idx % grid) as f32;
        let cell_y = (idx / grid) as f32;

        let cx = (cell_x + boxes[off]) * stride as f32;
        let cy = (cell_y + boxes[off + 1]) * stride as f32;
        let w = boxes[off + 2] * stride as f32;
        let h = boxes[off + 3] * stride as f32;

        // Back out the letterbox to frame coordinates.
        let x = (cx - w / 2.0 - letterbox.pad_x) / letterbox.scale;
        let y = (cy - h / 2.0 - letterbox.pad_y) / letterbox.scale;

        detections.push(BoundingBox {
            x,
            y,
            width: w / letterbox.scale,
            height: h / letterbox.scale,
            confidence: score,
        });
    }

    detections
}

/// Non-Maximum Suppression: drop boxes overlapping a more confident one.
/// Kept boxes come back in descending confidence order.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<BoundingBox> = Vec::new();
    for candidate in detections {
        if keep.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection-over-Union of two boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width * a.height + b.width * b.height - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bbox(x: f32, y: f32, w: f32, h: f32, conf: f32) -> BoundingBox {
        BoundingBox {
            x,
            y,
            width: w,
            height: h,
            confidence: conf,
        }
    }

    #[test]
    fn test_iou_identical() {
        let a = make_bbox(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = make_bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = make_bbox(30.0, 30.0, 10.0, 10.0, 1.0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = make_bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = make_bbox(5.0, 0.0, 10.0, 10.0, 1.0);
        // inter 50, union 150
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_best_of_cluster() {
        let dets = vec![
            make_bbox(0.0, 0.0, 100.0, 100.0, 0.8),
            make_bbox(4.0, 4.0, 100.0, 100.0, 0.9),
            make_bbox(300.0, 300.0, 40.0, 40.0, 0.6),
        ];
        let kept = nms(dets, 0.4);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
        assert!((kept[1].confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_nms_output_sorted_by_confidence() {
        // Disjoint boxes in shuffled confidence order: nothing is suppressed,
        // and the output is descending by confidence without a further sort.
        let dets = vec![
            make_bbox(0.0, 0.0, 10.0, 10.0, 0.6),
            make_bbox(100.0, 0.0, 10.0, 10.0, 0.9),
            make_bbox(200.0, 0.0, 10.0, 10.0, 0.7),
        ];
        let kept = nms(dets, 0.4);
        assert_eq!(kept.len(), 3);
        let confidences: Vec<f32> = kept.iter().map(|b| b.confidence).collect();
        assert!(confidences.windows(2).all(|w| w[0] >= w[1]), "{confidences:?}");
    }

    #[test]
    fn test_decode_grid_thresholds_and_unmaps() {
        // 16x16 input at stride 8 → 2x2 grid, 4 cells. Only cell 3 fires.
        let mut scores = vec![0.0f32; 4];
        scores[3] = 0.9;
        let mut boxes = vec![0.0f32; 16];
        // Cell (1,1): centered in cell, 2x2 strides wide.
        boxes[12] = 0.5;
        boxes[13] = 0.5;
        boxes[14] = 2.0;
        boxes[15] = 2.0;

        let letterbox = Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        let dets = decode_grid(&scores, &boxes, 16, 8, &letterbox, 0.5);

        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        // center (12, 12), size 16x16 → origin (4, 4)
        assert!((d.x - 4.0).abs() < 1e-4);
        assert!((d.y - 4.0).abs() < 1e-4);
        assert!((d.width - 16.0).abs() < 1e-4);
        assert!((d.height - 16.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_grid_letterbox_unmapping() {
        // Same firing cell, but frame was scaled 0.5x and padded 8px in x.
        let mut scores = vec![0.0f32; 4];
        scores[0] = 0.8;
        let mut boxes = vec![0.0f32; 16];
        boxes[0] = 0.5;
        boxes[1] = 0.5;
        boxes[2] = 1.0;
        boxes[3] = 1.0;

        let letterbox = Letterbox {
            scale: 0.5,
            pad_x: 8.0,
            pad_y: 0.0,
        };
        let dets = decode_grid(&scores, &boxes, 16, 8, &letterbox, 0.5);
        assert_eq!(dets.len(), 1);
        // center (4, 4), size 8x8 → letterboxed origin (0, 0);
        // unmapped: x = (0 - 8) / 0.5 = -16, width = 8 / 0.5 = 16
        assert!((dets[0].x - -16.0).abs() < 1e-4);
        assert!((dets[0].width - 16.0).abs() < 1e-4);
    }
}
