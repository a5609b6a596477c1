//! Recognition session: gallery, matcher, and the periodic detection loop.
//!
//! The loop polls the engine on a fixed wall-clock period, independent of
//! the camera's frame rate. At most one tick is in flight at a time: the
//! tick's work is awaited in the loop body before the next interval fire,
//! which gives natural backpressure when extraction runs slow. Missed ticks
//! are not queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use glimpse_core::{Detection, Gallery, NearestMatcher};

use crate::engine::EngineHandle;
use crate::render::{Annotation, AnnotationSink, FrameInfo};

/// A running recognition session.
///
/// Owns the enrolled gallery, the matcher built over it, and the loop task.
/// Both gallery and matcher are immutable for the session's lifetime; the
/// loop only reads them.
pub struct Session {
    gallery: Gallery,
    matcher: Arc<NearestMatcher>,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Session {
    /// Start the recognition loop.
    pub fn start(
        engine: EngineHandle,
        gallery: Gallery,
        matcher: NearestMatcher,
        period: Duration,
        mut sink: Box<dyn AnnotationSink>,
    ) -> Session {
        let matcher = Arc::new(matcher);
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let loop_matcher = Arc::clone(&matcher);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = interval.tick() => {
                        run_tick(&engine, &loop_matcher, sink.as_mut()).await;
                    }
                }
            }
            tracing::debug!("recognition loop stopped");
        });

        tracing::info!(
            enrolled = matcher.len(),
            threshold = matcher.threshold(),
            period_ms = period.as_millis() as u64,
            "recognition session started"
        );

        Session {
            gallery,
            matcher,
            stop_tx,
            task,
        }
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn matcher(&self) -> &NearestMatcher {
        &self.matcher
    }

    /// Stop the loop and wait for it to wind down.
    ///
    /// An in-flight tick finishes first; its results go to the sink, which
    /// is dropped with the task. The loop is never left stuck.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
        tracing::info!("recognition session stopped");
    }
}

/// One tick: analyze the current frame and emit matched annotations.
///
/// Extraction failure is soft — logged, nothing emitted, the loop keeps
/// running. Zero detections emit an empty batch.
async fn run_tick(engine: &EngineHandle, matcher: &NearestMatcher, sink: &mut dyn AnnotationSink) {
    match engine.analyze_frame().await {
        Ok(analysis) => {
            let frame = FrameInfo {
                width: analysis.width,
                height: analysis.height,
                sequence: analysis.sequence,
                captured_at: analysis.captured_at,
            };
            let annotations = match_detections(matcher, analysis.detections);
            sink.emit(&frame, &annotations);
        }
        Err(err) => {
            tracing::warn!(error = %err, "frame analysis failed; skipping tick");
        }
    }
}

/// Match each detection against the gallery, preserving detector order.
pub fn match_detections(matcher: &NearestMatcher, detections: Vec<Detection>) -> Vec<Annotation> {
    detections
        .into_iter()
        .map(|det| {
            let m = matcher.best_match(&det.descriptor);
            Annotation {
                bbox: det.bbox,
                label: m.label,
                distance: m.distance,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, EngineRequest, FrameAnalysis};
    use glimpse_core::types::{BoundingBox, Descriptor};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    fn bbox(x: f32) -> BoundingBox {
        BoundingBox {
            x,
            y: 0.0,
            width: 50.0,
            height: 50.0,
            confidence: 0.9,
        }
    }

    fn detection(x: f32, values: Vec<f32>) -> Detection {
        Detection {
            bbox: bbox(x),
            descriptor: Descriptor::new(values),
        }
    }

    fn alice_gallery() -> Gallery {
        let mut g = Gallery::new();
        g.insert("alice".into(), Descriptor::new(vec![0.0, 0.0]));
        g
    }

    /// Sink that collects every emitted batch with its frame metadata.
    struct CollectSink(Arc<Mutex<Vec<(FrameInfo, Vec<Annotation>)>>>);

    impl AnnotationSink for CollectSink {
        fn emit(&mut self, frame: &FrameInfo, annotations: &[Annotation]) {
            self.0.lock().unwrap().push((*frame, annotations.to_vec()));
        }
    }

    /// Engine stand-in: answers every AnalyzeFrame with the next scripted
    /// response, repeating the last one when the script runs out.
    fn fake_engine(
        script: Vec<Result<Vec<Detection>, ()>>,
    ) -> EngineHandle {
        let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);
        tokio::spawn(async move {
            let mut step = 0usize;
            while let Some(req) = rx.recv().await {
                if let EngineRequest::AnalyzeFrame { reply } = req {
                    let entry = script.get(step).or_else(|| script.last()).cloned();
                    step += 1;
                    let response = match entry {
                        Some(Ok(detections)) => Ok(FrameAnalysis {
                            width: 640,
                            height: 480,
                            sequence: step as u32,
                            captured_at: std::time::Instant::now(),
                            detections,
                        }),
                        _ => Err(EngineError::ChannelClosed),
                    };
                    let _ = reply.send(response);
                }
            }
        });
        EngineHandle { tx }
    }

    #[test]
    fn test_match_detections_two_faces_in_order() {
        // One face near alice (0.2), one near nobody (0.9).
        let matcher = NearestMatcher::with_default_threshold(&alice_gallery());
        let detections = vec![
            detection(10.0, vec![0.2, 0.0]),
            detection(200.0, vec![0.9, 0.0]),
        ];

        let annotations = match_detections(&matcher, detections);

        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].label, "alice");
        assert!((annotations[0].distance - 0.2).abs() < 1e-6);
        assert!((annotations[0].bbox.x - 10.0).abs() < 1e-6);
        assert_eq!(annotations[1].label, "unknown");
        assert!((annotations[1].distance - 0.9).abs() < 1e-6);
        assert!((annotations[1].bbox.x - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_match_detections_empty_frame() {
        let matcher = NearestMatcher::with_default_threshold(&alice_gallery());
        assert!(match_detections(&matcher, vec![]).is_empty());
    }

    #[tokio::test]
    async fn test_session_emits_and_stops() {
        let engine = fake_engine(vec![Ok(vec![detection(10.0, vec![0.1, 0.0])])]);
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = CollectSink(Arc::clone(&batches));

        let session = Session::start(
            engine,
            alice_gallery(),
            NearestMatcher::with_default_threshold(&alice_gallery()),
            Duration::from_millis(5),
            Box::new(sink),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        session.stop().await;

        let batches = batches.lock().unwrap();
        assert!(!batches.is_empty(), "loop never ticked");
        let (frame, annotations) = &batches[0];
        assert!(frame.sequence >= 1);
        // Capture time travels with the batch for latency reporting.
        assert!(frame.captured_at.elapsed() < Duration::from_secs(5));
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].label, "alice");
    }

    #[tokio::test]
    async fn test_session_survives_failed_tick() {
        // First tick fails; later ticks succeed and still reach the sink.
        let engine = fake_engine(vec![Err(()), Ok(vec![detection(0.0, vec![0.0, 0.0])])]);
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = CollectSink(Arc::clone(&batches));

        let session = Session::start(
            engine,
            alice_gallery(),
            NearestMatcher::with_default_threshold(&alice_gallery()),
            Duration::from_millis(5),
            Box::new(sink),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        session.stop().await;

        let batches = batches.lock().unwrap();
        assert!(!batches.is_empty(), "loop died after the failed tick");
        assert_eq!(batches[0].1[0].label, "alice");
    }

    #[tokio::test]
    async fn test_session_with_empty_gallery_reports_unknown() {
        let engine = fake_engine(vec![Ok(vec![detection(0.0, vec![0.5, 0.5])])]);
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = CollectSink(Arc::clone(&batches));

        let session = Session::start(
            engine,
            Gallery::new(),
            NearestMatcher::with_default_threshold(&Gallery::new()),
            Duration::from_millis(5),
            Box::new(sink),
        );

        tokio::time::sleep(Duration::from_millis(40)).await;
        session.stop().await;

        let batches = batches.lock().unwrap();
        assert!(!batches.is_empty());
        assert_eq!(batches[0].1[0].label, "unknown");
        assert!(batches[0].1[0].distance.is_infinite());
    }
}
