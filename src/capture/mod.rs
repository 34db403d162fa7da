//! The capture loop: acquire → decode → dedupe → persist → record → display.
//!
//! The loop does not own a timer. Whoever drives it (the TUI event loop)
//! calls [`CaptureLoop::tick`] at the configured cadence, which keeps frame
//! ordering deterministic and the camera handle on a single thread.

pub mod annotate;
pub mod decoder;
mod glyphs;
pub mod source;

use chrono::{Local, NaiveDateTime};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{info, trace, warn};

use crate::db::NewDetection;
use crate::dedup::DedupWindow;
use crate::error::{CaptureError, RecordingError};
use crate::recording::RecordingController;
use crate::tasks::BackgroundWriter;

pub use decoder::{BarcodeDecoder, BoundingBox, Symbol};
pub use source::{open_camera, FrameSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Stopped,
    Running,
}

/// What one tick produced.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Frame for display, annotated when enabled.
    pub frame: Option<RgbImage>,
    /// Every symbol decoded this tick, including suppressed repeats.
    pub symbols: Vec<Symbol>,
    /// Detections dispatched for persistence this tick.
    pub detections: Vec<NewDetection>,
    /// Set when the camera was lost during this tick.
    pub stopped: Option<CaptureError>,
    /// Set when the active recording died during this tick.
    pub recording_lost: Option<RecordingError>,
}

pub struct CaptureLoop {
    source: Option<Box<dyn FrameSource>>,
    decoder: Box<dyn BarcodeDecoder>,
    dedup: DedupWindow,
    recorder: RecordingController,
    writer: BackgroundWriter,
    annotate: bool,
    last_frame: Option<RgbImage>,
}

impl CaptureLoop {
    pub fn new(
        decoder: Box<dyn BarcodeDecoder>,
        dedup: DedupWindow,
        recorder: RecordingController,
        writer: BackgroundWriter,
    ) -> Self {
        Self {
            source: None,
            decoder,
            dedup,
            recorder,
            writer,
            annotate: true,
            last_frame: None,
        }
    }

    pub fn with_annotation(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Attach a camera and start running. A previous camera is closed first.
    pub fn open(&mut self, source: Box<dyn FrameSource>) {
        if self.source.is_some() {
            self.close();
        }
        let (w, h) = source.resolution();
        info!("Capture running ({}x{})", w, h);
        self.source = Some(source);
    }

    /// Stop recording, then release the camera.
    pub fn close(&mut self) {
        if let Err(e) = self.recorder.stop() {
            warn!("{}", e);
        }
        if let Some(mut source) = self.source.take() {
            source.release();
            info!("Capture stopped");
        }
    }

    pub fn state(&self) -> CaptureState {
        if self.source.is_some() {
            CaptureState::Running
        } else {
            CaptureState::Stopped
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.tick_at(Local::now().naive_local())
    }

    /// Run one cycle as if the wall clock read `now`.
    pub fn tick_at(&mut self, now: NaiveDateTime) -> TickOutcome {
        let Some(source) = self.source.as_mut() else {
            return TickOutcome::default();
        };

        let frame = match source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return TickOutcome::default(),
            Err(CaptureError::TransientRead(reason)) => {
                trace!("Skipping frame: {}", reason);
                return TickOutcome::default();
            }
            Err(e) => {
                warn!("Camera lost: {}", e);
                self.close();
                return TickOutcome {
                    stopped: Some(e),
                    ..TickOutcome::default()
                };
            }
        };

        let gray = image::imageops::grayscale(&frame);
        let symbols = self.decoder.decode(&gray);

        let mut detections = Vec::new();
        for symbol in &symbols {
            if !self.dedup.observe(&symbol.value, now) {
                continue;
            }
            let detection = NewDetection {
                value: symbol.value.clone(),
                detected_at: now,
                video_path: self.recorder.current_path().map(Path::to_path_buf),
            };
            info!("Detected barcode {}", detection.value);
            self.writer.dispatch(detection.clone());
            detections.push(detection);
        }

        // The sink gets the raw frame, never the annotated one.
        let recording_lost = self.recorder.write(&frame).err();

        let display = if self.annotate && symbols.iter().any(|s| s.bounds.is_some()) {
            annotate::annotate(&frame, &symbols)
        } else {
            frame.clone()
        };
        self.last_frame = Some(frame);

        TickOutcome {
            frame: Some(display),
            symbols,
            detections,
            stopped: None,
            recording_lost,
        }
    }

    pub fn start_recording(&mut self) -> Result<PathBuf, RecordingError> {
        self.start_recording_at(Local::now().naive_local())
    }

    /// Open a recording session sized to the camera.
    pub fn start_recording_at(&mut self, now: NaiveDateTime) -> Result<PathBuf, RecordingError> {
        let Some(source) = self.source.as_ref() else {
            return Err(RecordingError::NoCamera);
        };
        let (mut width, mut height) = source.resolution();
        if width == 0 || height == 0 {
            if let Some(ref frame) = self.last_frame {
                (width, height) = frame.dimensions();
            }
        }
        let fps = source.frame_rate();
        self.recorder.start(now, width, height, fps)
    }

    pub fn stop_recording(&mut self) -> Result<Option<PathBuf>, RecordingError> {
        self.recorder.stop()
    }

    pub fn recorder(&self) -> &RecordingController {
        &self.recorder
    }

    pub fn writer(&self) -> &BackgroundWriter {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut BackgroundWriter {
        &mut self.writer
    }

    pub fn last_frame(&self) -> Option<&RgbImage> {
        self.last_frame.as_ref()
    }

    pub fn dedup(&self) -> &DedupWindow {
        &self.dedup
    }

    /// Shutdown path: recording is always closed before the camera goes.
    pub fn shutdown(&mut self) {
        self.close();
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.close();
    }
}
