//! Inference engine thread.
//!
//! The camera and both ONNX sessions live on one dedicated OS thread —
//! inference and capture are blocking, and keeping them on a single thread
//! caps concurrent model invocations at one. Async callers talk to it over
//! an mpsc request channel with oneshot replies.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use glimpse_core::onnx::OnnxExtractor;
use glimpse_core::{DescriptorExtractor, Detection, ExtractorError, Gallery, GalleryBuilder};
use glimpse_hw::{Camera, CameraError};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("extractor error: {0}")]
    Extractor(#[from] ExtractorError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// One analyzed frame: dimensions plus all detections in detector order.
#[derive(Debug)]
pub struct FrameAnalysis {
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
    /// When the camera captured the frame, for latency reporting.
    pub captured_at: std::time::Instant,
    pub detections: Vec<Detection>,
}

/// Messages sent from async callers to the engine thread.
pub(crate) enum EngineRequest {
    AnalyzeFrame {
        reply: oneshot::Sender<Result<FrameAnalysis, EngineError>>,
    },
    BuildGallery {
        labels: Vec<String>,
        reply: oneshot::Sender<Gallery>,
    },
}

/// Clone-safe handle to the engine thread. When every handle is dropped the
/// thread exits and the camera is released.
#[derive(Clone)]
pub struct EngineHandle {
    pub(crate) tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Capture the current frame and extract all face detections from it.
    pub async fn analyze_frame(&self) -> Result<FrameAnalysis, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::AnalyzeFrame { reply: reply_tx })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Build the reference gallery on the engine thread.
    ///
    /// Best-effort per label; the returned gallery may be partial or empty.
    pub async fn build_gallery(&self, labels: Vec<String>) -> Result<Gallery, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::BuildGallery {
                labels,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Open the camera, load both models, and spawn the engine thread.
///
/// Setup is synchronous and fail-fast: camera or model problems surface
/// here, before any async work starts.
pub fn spawn_engine(
    camera_device: &str,
    detector_path: &str,
    embedder_path: &str,
    images_dir: std::path::PathBuf,
    image_extensions: Vec<String>,
) -> Result<EngineHandle, EngineError> {
    let camera = Camera::open(camera_device)?;
    let mut extractor = OnnxExtractor::load(detector_path, embedder_path)?;
    tracing::info!(
        device = camera_device,
        width = camera.width,
        height = camera.height,
        "engine resources ready"
    );

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("glimpse-engine".into())
        .spawn(move || {
            tracing::debug!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::AnalyzeFrame { reply } => {
                        let _ = reply.send(run_analyze(&camera, &mut extractor));
                    }
                    EngineRequest::BuildGallery { labels, reply } => {
                        let gallery = GalleryBuilder::new(&mut extractor, images_dir.clone())
                            .with_extensions(image_extensions.clone())
                            .build(&labels);
                        let _ = reply.send(gallery);
                    }
                }
            }
            tracing::debug!("engine thread exiting, camera released");
        })
        .expect("failed to spawn engine thread");

    Ok(EngineHandle { tx })
}

/// Capture one frame and run all-faces detection + descriptor extraction.
fn run_analyze(
    camera: &Camera,
    extractor: &mut OnnxExtractor,
) -> Result<FrameAnalysis, EngineError> {
    let frame = camera.capture_frame()?;
    let detections = extractor.detect_all(&frame.data, frame.width, frame.height)?;

    Ok(FrameAnalysis {
        width: frame.width,
        height: frame.height,
        sequence: frame.sequence,
        captured_at: frame.timestamp,
        detections,
    })
}
