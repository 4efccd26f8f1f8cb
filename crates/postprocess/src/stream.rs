use crate::pipeline::{FrameInput, FrameResult, PostProcessPipeline};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Cooperative stop flag checked between frames.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub total_detections: u64,
}

/// Drives a pipeline over a live frame source.
///
/// Frames whose geometry is invalid are logged and skipped; the stream
/// carries on with the next frame.
pub struct StreamRunner<'p, 'c> {
    pipeline: &'p PostProcessPipeline<'c>,
    stop: StopHandle,
    frame_limit: Option<u64>,
}

impl<'p, 'c> StreamRunner<'p, 'c> {
    pub fn new(pipeline: &'p PostProcessPipeline<'c>) -> Self {
        Self {
            pipeline,
            stop: StopHandle::new(),
            frame_limit: None,
        }
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Stop after this many frames have been handled (processed or skipped).
    pub fn with_frame_limit(mut self, frame_limit: Option<u64>) -> Self {
        self.frame_limit = frame_limit;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn run<I, F>(&self, frames: I, mut on_result: F) -> StreamStats
    where
        I: IntoIterator<Item = FrameInput>,
        F: FnMut(u64, FrameResult),
    {
        tracing::info!("Starting post-processing stream");

        let mut stats = StreamStats::default();
        let mut frame_index = 0u64;

        for frame in frames {
            if self.stop.is_stopped() {
                tracing::warn!(frame_index, "Stop requested, leaving stream loop");
                break;
            }

            let start = Instant::now();
            match self.pipeline.process(&frame.prediction, frame.dims) {
                Ok(result) => {
                    stats.frames_processed += 1;
                    stats.total_detections += result.detections.len() as u64;
                    tracing::trace!(
                        frame_index,
                        detections = result.detections.len(),
                        elapsed_us = start.elapsed().as_micros() as u64,
                        "Frame processed"
                    );
                    on_result(frame_index, result);
                }
                Err(e) => {
                    stats.frames_skipped += 1;
                    tracing::error!(frame_index, error = %e, "Skipping frame");
                }
            }

            frame_index += 1;

            if stats.frames_processed.is_multiple_of(100) && stats.frames_processed > 0 {
                tracing::debug!(
                    frames_processed = stats.frames_processed,
                    frames_skipped = stats.frames_skipped,
                    total_detections = stats.total_detections,
                    "Stream progress"
                );
            }

            if self.frame_limit.is_some_and(|limit| frame_index >= limit) {
                tracing::info!(frame_index, "Frame limit reached, leaving stream loop");
                break;
            }
        }

        tracing::info!(
            frames_processed = stats.frames_processed,
            frames_skipped = stats.frames_skipped,
            "Stream finished"
        );

        stats
    }
}
