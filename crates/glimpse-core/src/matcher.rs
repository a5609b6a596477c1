//! Nearest-label matching over an enrolled gallery.
//!
//! The matcher snapshots the gallery at construction and is immutable
//! afterwards; a changed gallery requires building a new matcher.

use crate::gallery::Gallery;
use crate::types::{Descriptor, FaceMatch};

/// Default accept/reject distance threshold, in Euclidean units over
/// L2-normalised descriptors.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Nearest-neighbor matcher over a gallery snapshot.
///
/// Gallery sizes are a few dozen entries at most, so matching is a linear
/// scan — no index structure is warranted.
pub struct NearestMatcher {
    entries: Vec<(String, Descriptor)>,
    threshold: f32,
}

impl NearestMatcher {
    /// Snapshot `gallery` with the given accept threshold.
    pub fn new(gallery: &Gallery, threshold: f32) -> Self {
        Self {
            entries: gallery
                .iter()
                .map(|(label, desc)| (label.to_string(), desc.clone()))
                .collect(),
            threshold,
        }
    }

    /// Snapshot `gallery` with [`DEFAULT_MATCH_THRESHOLD`].
    pub fn with_default_threshold(gallery: &Gallery) -> Self {
        Self::new(gallery, DEFAULT_MATCH_THRESHOLD)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the gallery entry nearest to `query`.
    ///
    /// Returns that entry's label if its distance is within the threshold,
    /// otherwise "unknown" — in both cases carrying the minimum distance
    /// found. An empty gallery yields "unknown" at infinite distance.
    /// Ties among exactly-equidistant entries have an unspecified winner.
    pub fn best_match(&self, query: &Descriptor) -> FaceMatch {
        let mut best_distance = f32::INFINITY;
        let mut best_label: Option<&str> = None;

        for (label, descriptor) in &self.entries {
            let distance = query.euclidean_distance(descriptor);
            if distance < best_distance {
                best_distance = distance;
                best_label = Some(label);
            }
        }

        match best_label {
            Some(label) if best_distance <= self.threshold => FaceMatch {
                label: label.to_string(),
                distance: best_distance,
            },
            _ => FaceMatch::unknown(best_distance),
        }
    }
}
