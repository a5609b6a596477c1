//! Frame type and YUYV conversion.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// A captured grayscale camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture time, surfaced downstream for per-frame latency reporting.
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

/// Convert packed YUYV (4:2:2) to grayscale by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
/// Grayscale = every even-indexed byte.
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}
