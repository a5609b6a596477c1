//! glimpse-hw — Webcam capture for the recognition loop.
//!
//! V4L2-based camera access producing grayscale frames. The camera is
//! exclusively owned by whoever holds the handle and is released on drop.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::Frame;
