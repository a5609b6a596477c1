//! Annotation output.
//!
//! The loop emits per-detection draw instructions through a sink; the sink
//! owns its output surface, not the loop.

use std::time::Instant;

use glimpse_core::BoundingBox;

/// Metadata for the frame an annotation batch belongs to.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
    /// Capture time; sinks can report how stale the frame is by emit time.
    pub captured_at: Instant,
}

/// One labeled detection, ready to draw.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub bbox: BoundingBox,
    pub label: String,
    pub distance: f32,
}

/// Receives each tick's annotations.
pub trait AnnotationSink: Send {
    fn emit(&mut self, frame: &FrameInfo, annotations: &[Annotation]);
}

/// Sink that writes one line per detection to stdout.
pub struct ConsoleSink;

impl AnnotationSink for ConsoleSink {
    fn emit(&mut self, frame: &FrameInfo, annotations: &[Annotation]) {
        let latency_ms = frame.captured_at.elapsed().as_millis();
        for ann in annotations {
            println!(
                "frame {:>6} (+{latency_ms}ms): {} ({:.2}) @ {:.0},{:.0} {:.0}x{:.0}",
                frame.sequence,
                ann.label,
                ann.distance,
                ann.bbox.x,
                ann.bbox.y,
                ann.bbox.width,
                ann.bbox.height,
            );
        }
    }
}
