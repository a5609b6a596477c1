//! Gallery enrollment — label → descriptor mapping built from reference photos.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::extractor::DescriptorExtractor;
use crate::types::Descriptor;

/// Reference image extensions tried in order when resolving a label.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

/// Enrolled reference set: one descriptor per label.
///
/// Built once at session startup, read-only afterwards, never persisted.
/// Re-enrolling a label overwrites its previous descriptor (last write wins);
/// a label whose extraction failed is simply absent.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: BTreeMap<String, Descriptor>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: String, descriptor: Descriptor) {
        self.entries.insert(label, descriptor);
    }

    pub fn get(&self, label: &str) -> Option<&Descriptor> {
        self.entries.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.entries.iter().map(|(l, d)| (l.as_str(), d))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Builds a [`Gallery`] by running single-face extraction over labeled
/// reference photos in a directory.
///
/// Enrollment is best-effort per label: a photo that cannot be read or
/// contains no detectable face is logged and skipped, and the build
/// continues. Each label is attempted exactly once, in input order, with
/// one inference in flight at a time.
pub struct GalleryBuilder<'a, E: DescriptorExtractor> {
    extractor: &'a mut E,
    images_dir: PathBuf,
    extensions: Vec<String>,
}

impl<'a, E: DescriptorExtractor> GalleryBuilder<'a, E> {
    pub fn new(extractor: &'a mut E, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            images_dir: images_dir.into(),
            extensions: IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Override the extension list tried when resolving reference images.
    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = String>) -> Self {
        self.extensions = extensions.into_iter().collect();
        self
    }

    /// Build a gallery from `labels`. A partially (or fully) failed build
    /// still yields a usable gallery — possibly empty.
    pub fn build(&mut self, labels: &[String]) -> Gallery {
        let mut gallery = Gallery::new();

        for label in labels {
            let Some(path) = self.resolve_image(label) else {
                tracing::warn!(%label, dir = %self.images_dir.display(), "no reference image found");
                continue;
            };

            let gray = match load_grayscale(&path) {
                Ok(img) => img,
                Err(err) => {
                    tracing::warn!(%label, path = %path.display(), error = %err, "failed to load reference image");
                    continue;
                }
            };

            self.enroll_image(&mut gallery, label, &gray.data, gray.width, gray.height);
        }

        tracing::info!(
            enrolled = gallery.len(),
            requested = labels.len(),
            "gallery build complete"
        );
        gallery
    }

    /// Enroll one decoded grayscale image under `label`.
    ///
    /// No face or an extraction error leaves the label absent (never a null
    /// entry) and is reported as a warning.
    pub fn enroll_image(
        &mut self,
        gallery: &mut Gallery,
        label: &str,
        gray: &[u8],
        width: u32,
        height: u32,
    ) {
        match self.extractor.detect_single(gray, width, height) {
            Ok(Some(detection)) => {
                tracing::debug!(
                    label,
                    confidence = detection.bbox.confidence,
                    dim = detection.descriptor.len(),
                    "enrolled reference face"
                );
                gallery.insert(label.to_string(), detection.descriptor);
            }
            Ok(None) => {
                tracing::warn!(label, "no face detected in reference image");
            }
            Err(err) => {
                tracing::warn!(label, error = %err, "descriptor extraction failed");
            }
        }
    }

    /// Resolve `{images_dir}/{label}.{ext}` over the configured extensions.
    fn resolve_image(&self, label: &str) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| self.images_dir.join(format!("{label}.{ext}")))
            .find(|path| path.exists())
    }
}

struct LoadedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

/// Decode an image file and convert it to 8-bit grayscale.
fn load_grayscale(path: &Path) -> Result<LoadedImage, image::ImageError> {
    let img = image::open(path)?.to_luma8();
    let (width, height) = img.dimensions();
    Ok(LoadedImage {
        data: img.into_raw(),
        width,
        height,
    })
}
