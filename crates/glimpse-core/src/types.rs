use serde::{Deserialize, Serialize};

/// Label reported for a query descriptor that matched nothing in the gallery.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Bounding box for a detected face, in frame coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Face descriptor vector (fixed length, model-defined — e.g. 128-dim).
///
/// Immutable once computed. Two descriptors are comparable only when they
/// come from the same model; mixing models is a caller bug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    pub values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compute Euclidean distance to another descriptor.
    ///
    /// Both descriptors must have the same dimensionality; a mismatch is an
    /// invariant violation (single consistent extractor per session), checked
    /// in debug builds only.
    pub fn euclidean_distance(&self, other: &Descriptor) -> f32 {
        debug_assert_eq!(
            self.values.len(),
            other.values.len(),
            "descriptor dimensionality mismatch"
        );
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One detected face in a frame: bounding box plus its descriptor.
///
/// Ephemeral — produced by the extractor and consumed within the same tick.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub descriptor: Descriptor,
}

/// Result of matching a query descriptor against the gallery.
///
/// `label` is either a gallery label or [`UNKNOWN_LABEL`]; `distance` is the
/// distance to the nearest gallery entry either way, so callers can see how
/// close the best candidate was even on a rejection. For an empty gallery
/// the distance is `f32::INFINITY`.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub label: String,
    pub distance: f32,
}

impl FaceMatch {
    pub fn unknown(distance: f32) -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            distance,
        }
    }

    /// Whether this match names an enrolled label (as opposed to "unknown").
    pub fn is_known(&self) -> bool {
        self.label != UNKNOWN_LABEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_identical() {
        let a = Descriptor::new(vec![1.0, 2.0, 3.0]);
        assert!(a.euclidean_distance(&a) < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_unit_apart() {
        let a = Descriptor::new(vec![0.0, 0.0]);
        let b = Descriptor::new(vec![3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_symmetric() {
        let a = Descriptor::new(vec![0.1, 0.9, -0.3]);
        let b = Descriptor::new(vec![0.4, -0.2, 0.5]);
        assert!((a.euclidean_distance(&b) - b.euclidean_distance(&a)).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_match() {
        let m = FaceMatch::unknown(0.8);
        assert!(!m.is_known());
        assert_eq!(m.label, UNKNOWN_LABEL);
        assert!((m.distance - 0.8).abs() < 1e-6);
    }
}
