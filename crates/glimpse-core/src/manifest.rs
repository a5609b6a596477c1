//! Reference-image manifest — a JSON array of labels.
//!
//! The manifest lists which labeled reference photos exist; labels are image
//! file stems (extension stripped). It is regenerated from the images
//! directory rather than edited by hand.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::gallery::IMAGE_EXTENSIONS;

/// Manifest file name inside the images directory.
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed manifest {path}: {source}")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },
    #[error("images directory not found: {0}")]
    ImagesDirNotFound(String),
}

/// Load a manifest: a JSON array of label strings.
///
/// Missing file or malformed JSON is an error; callers building a gallery
/// downgrade it to "no labels" with a log line rather than crashing.
pub fn load(path: &Path) -> Result<Vec<String>, ManifestError> {
    let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ManifestError::Malformed {
        path: path.display().to_string(),
        source,
    })
}

/// Scan `images_dir` for reference photos with the default extension list,
/// derive labels from file stems, and write them as `manifest.json` in that
/// directory.
pub fn generate(images_dir: &Path) -> Result<Vec<String>, ManifestError> {
    let extensions: Vec<String> = IMAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect();
    generate_with(images_dir, &extensions)
}

/// Like [`generate`], with a caller-supplied extension list.
///
/// Returns the labels in sorted order for a deterministic manifest.
pub fn generate_with(images_dir: &Path, extensions: &[String]) -> Result<Vec<String>, ManifestError> {
    if !images_dir.is_dir() {
        return Err(ManifestError::ImagesDirNotFound(
            images_dir.display().to_string(),
        ));
    }

    let mut labels = Vec::new();
    let entries = fs::read_dir(images_dir).map_err(|source| ManifestError::Read {
        path: images_dir.display().to_string(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let ext = e.to_ascii_lowercase();
                extensions.iter().any(|known| known == &ext)
            })
            .unwrap_or(false);
        if !is_image {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            labels.push(stem.to_string());
        }
    }

    labels.sort();

    let manifest_path = images_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&labels).expect("Vec<String> always serializes");
    fs::write(&manifest_path, json + "\n").map_err(|source| ManifestError::Write {
        path: manifest_path.display().to_string(),
        source,
    })?;

    tracing::info!(
        path = %manifest_path.display(),
        labels = labels.len(),
        "manifest generated"
    );
    Ok(labels)
}
