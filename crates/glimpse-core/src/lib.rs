//! glimpse-core — Gallery enrollment and nearest-label face matching.
//!
//! Builds a label → descriptor gallery from labeled reference photos, and
//! matches live face descriptors against it by nearest neighbor with an
//! accept/reject distance threshold. The detection/recognition model sits
//! behind [`extractor::DescriptorExtractor`]; an ONNX Runtime implementation
//! lives in [`onnx`].

pub mod extractor;
pub mod gallery;
pub mod manifest;
pub mod matcher;
pub mod onnx;
pub mod types;

pub use extractor::{DescriptorExtractor, ExtractorError};
pub use gallery::{Gallery, GalleryBuilder};
pub use matcher::{NearestMatcher, DEFAULT_MATCH_THRESHOLD};
pub use types::{BoundingBox, Descriptor, Detection, FaceMatch, UNKNOWN_LABEL};
