//! Session video recording.
//!
//! The controller owns at most one open sink. Sessions are started and
//! stopped only by explicit commands; detections never start one.

pub mod ffmpeg;

use chrono::NaiveDateTime;
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::RecordingConfig;
use crate::error::RecordingError;

pub use ffmpeg::FfmpegSinkFactory;

/// Geometry and rate a sink is opened with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkSpec {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl SinkSpec {
    /// Use the camera's rate unless it is missing or nonsensical.
    pub fn new(width: u32, height: u32, reported_fps: Option<f64>, default_fps: f64) -> Self {
        let fps = match reported_fps {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ => default_fps,
        };
        Self { width, height, fps }
    }
}

/// An open video file being appended to.
///
/// A `write` error means the sink is unusable and ends the session.
pub trait VideoSink: Send {
    fn write(&mut self, frame: &RgbImage) -> anyhow::Result<()>;

    /// Fails once the sink has died behind the controller's back.
    fn check_alive(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Flush and close the file.
    fn finish(self: Box<Self>) -> anyhow::Result<()>;
}

/// Opens sinks for new sessions.
pub trait SinkFactory: Send {
    fn open(&self, path: &Path, spec: SinkSpec) -> anyhow::Result<Box<dyn VideoSink>>;

    /// Container extension for session files, without the dot.
    fn extension(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

struct ActiveSession {
    path: PathBuf,
    sink: Box<dyn VideoSink>,
    frames: u64,
}

pub struct RecordingController {
    recordings_dir: PathBuf,
    default_fps: f64,
    factory: Box<dyn SinkFactory>,
    session: Option<ActiveSession>,
}

/// `<recordings>/<YYYYMMDD>/<HHMMSS>.<ext>` for a session started at `started_at`.
pub fn session_path(recordings_dir: &Path, started_at: NaiveDateTime, extension: &str) -> PathBuf {
    recordings_dir
        .join(started_at.format("%Y%m%d").to_string())
        .join(format!("{}.{}", started_at.format("%H%M%S"), extension))
}

impl RecordingController {
    pub fn new(recordings_dir: PathBuf, config: &RecordingConfig, factory: Box<dyn SinkFactory>) -> Self {
        Self {
            recordings_dir,
            default_fps: config.default_fps,
            factory,
            session: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        if self.session.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    /// Open a new session. A session that is already running is left alone
    /// and the start is rejected.
    pub fn start(
        &mut self,
        started_at: NaiveDateTime,
        width: u32,
        height: u32,
        reported_fps: Option<f64>,
    ) -> Result<PathBuf, RecordingError> {
        if let Some(ref session) = self.session {
            return Err(RecordingError::AlreadyRecording(session.path.clone()));
        }

        let path = session_path(&self.recordings_dir, started_at, self.factory.extension());
        let spec = SinkSpec::new(width, height, reported_fps, self.default_fps);

        let unavailable = |reason: String| RecordingError::Unavailable {
            path: path.clone(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| unavailable(e.to_string()))?;
        }

        match self.factory.open(&path, spec) {
            Ok(sink) => {
                info!(
                    "Recording started: {} ({}x{} @ {:.1} fps)",
                    path.display(),
                    spec.width,
                    spec.height,
                    spec.fps
                );
                self.session = Some(ActiveSession {
                    path: path.clone(),
                    sink,
                    frames: 0,
                });
                Ok(path)
            }
            Err(e) => {
                remove_empty_artifact(&path);
                warn!("Unable to start recording at {}: {:#}", path.display(), e);
                Err(unavailable(format!("{:#}", e)))
            }
        }
    }

    /// Close the active session. Does nothing when idle.
    pub fn stop(&mut self) -> Result<Option<PathBuf>, RecordingError> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };

        let ActiveSession { path, sink, frames } = session;
        match sink.finish() {
            Ok(()) => {
                info!("Recording stopped: {} ({} frames)", path.display(), frames);
                Ok(Some(path))
            }
            Err(e) => Err(RecordingError::Finalize {
                path,
                reason: format!("{:#}", e),
            }),
        }
    }

    /// Append a frame to the active session, if any.
    ///
    /// A dead or failing sink ends the session: the controller goes back to
    /// idle, an empty file is removed and the loss is returned.
    pub fn write(&mut self, frame: &RgbImage) -> Result<(), RecordingError> {
        let Some(ref mut session) = self.session else {
            return Ok(());
        };
        let result = session.sink.check_alive().and_then(|()| session.sink.write(frame));
        match result {
            Ok(()) => {
                session.frames += 1;
                Ok(())
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                match self.session.take() {
                    Some(session) => Err(abandon(session, reason)),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Tear down a session whose sink failed.
fn abandon(session: ActiveSession, reason: String) -> RecordingError {
    let ActiveSession { path, sink, frames } = session;
    if let Err(e) = sink.finish() {
        debug!("Closing lost sink {}: {:#}", path.display(), e);
    }
    remove_empty_artifact(&path);
    warn!("Recording {} lost after {} frames: {}", path.display(), frames, reason);
    RecordingError::SinkLost { path, reason }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("{}", e);
        }
    }
}

/// A failed open can leave a zero-byte file behind.
fn remove_empty_artifact(path: &Path) {
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.is_file() && meta.len() == 0 {
            debug!("Removing empty recording artifact {}", path.display());
            let _ = std::fs::remove_file(path);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeSinkFactory;
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn controller(dir: &TempDir, factory: FakeSinkFactory) -> RecordingController {
        RecordingController::new(
            dir.path().join("recordings"),
            &RecordingConfig::default(),
            Box::new(factory),
        )
    }

    #[test]
    fn test_session_path_layout() {
        let path = session_path(Path::new("/srv/recordings"), at(10, 0, 5), "mp4");
        assert_eq!(path, PathBuf::from("/srv/recordings/20240715/100005.mp4"));
    }

    #[test]
    fn test_sink_spec_fps_fallback() {
        assert_eq!(SinkSpec::new(640, 480, Some(25.0), 30.0).fps, 25.0);
        assert_eq!(SinkSpec::new(640, 480, Some(0.0), 30.0).fps, 30.0);
        assert_eq!(SinkSpec::new(640, 480, Some(-1.0), 30.0).fps, 30.0);
        assert_eq!(SinkSpec::new(640, 480, Some(f64::NAN), 30.0).fps, 30.0);
        assert_eq!(SinkSpec::new(640, 480, None, 30.0).fps, 30.0);
    }

    #[test]
    fn test_start_write_stop() {
        let dir = TempDir::new().unwrap();
        let (factory, log) = FakeSinkFactory::new();
        let mut rec = controller(&dir, factory);
        assert_eq!(rec.state(), RecordingState::Idle);

        let frame = RgbImage::new(4, 2);
        rec.write(&frame).unwrap();
        assert!(log.lock().unwrap().frames.is_empty());

        let path = rec.start(at(10, 0, 0), 4, 2, None).unwrap();
        assert_eq!(rec.state(), RecordingState::Recording);
        assert_eq!(rec.current_path(), Some(path.as_path()));
        assert!(path.starts_with(dir.path().join("recordings").join("20240715")));

        rec.write(&frame).unwrap();
        rec.write(&frame).unwrap();
        assert_eq!(rec.stop().unwrap(), Some(path.clone()));
        assert_eq!(rec.state(), RecordingState::Idle);
        assert_eq!(rec.current_path(), None);

        let log = log.lock().unwrap();
        assert_eq!(log.opened.len(), 1);
        assert_eq!(log.opened[0].1, SinkSpec { width: 4, height: 2, fps: 30.0 });
        assert_eq!(log.frames.len(), 2);
        assert_eq!(log.finished, vec![path]);
    }

    #[test]
    fn test_start_while_recording_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (factory, log) = FakeSinkFactory::new();
        let mut rec = controller(&dir, factory);

        let first = rec.start(at(10, 0, 0), 640, 480, Some(30.0)).unwrap();
        let err = rec.start(at(10, 0, 7), 640, 480, Some(30.0)).unwrap_err();
        assert!(matches!(err, RecordingError::AlreadyRecording(ref p) if *p == first));

        assert_eq!(rec.current_path(), Some(first.as_path()));
        assert_eq!(log.lock().unwrap().opened.len(), 1);
        assert!(!first.with_file_name("100007.mp4").exists());
    }

    #[test]
    fn test_stop_when_idle_leaves_last_recording_alone() {
        let dir = TempDir::new().unwrap();
        let (factory, log) = FakeSinkFactory::new();
        let mut rec = controller(&dir, factory);

        assert_eq!(rec.stop().unwrap(), None);

        let path = rec.start(at(9, 30, 0), 8, 8, None).unwrap();
        rec.stop().unwrap();
        let before = std::fs::read(&path).unwrap();

        assert_eq!(rec.stop().unwrap(), None);
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(log.lock().unwrap().finished.len(), 1);
    }

    #[test]
    fn test_failed_open_stays_idle_without_artifact() {
        let dir = TempDir::new().unwrap();
        let (mut factory, _log) = FakeSinkFactory::new();
        factory.fail_open = true;
        let mut rec = controller(&dir, factory);

        let path = match rec.start(at(11, 0, 0), 640, 480, None) {
            Err(RecordingError::Unavailable { path, .. }) => path,
            other => panic!("expected Unavailable, got {other:?}"),
        };
        assert_eq!(rec.state(), RecordingState::Idle);
        assert!(!path.exists());
    }

    #[test]
    fn test_failing_sink_ends_session() {
        let dir = TempDir::new().unwrap();
        let (mut factory, log) = FakeSinkFactory::new();
        factory.fail_after = Some(0);
        let mut rec = controller(&dir, factory);

        let path = rec.start(at(13, 0, 0), 4, 4, None).unwrap();
        let frame = RgbImage::new(4, 4);
        match rec.write(&frame) {
            Err(RecordingError::SinkLost { path: lost, reason }) => {
                assert_eq!(lost, path);
                assert!(reason.contains("Broken pipe"));
            }
            other => panic!("expected SinkLost, got {other:?}"),
        }

        assert_eq!(rec.state(), RecordingState::Idle);
        assert_eq!(rec.current_path(), None);
        assert!(rec.write(&frame).is_ok());
        assert_eq!(rec.stop().unwrap(), None);
        assert!(log.lock().unwrap().finished.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_closes_active_session() {
        let dir = TempDir::new().unwrap();
        let (factory, log) = FakeSinkFactory::new();
        let mut rec = controller(&dir, factory);
        rec.start(at(12, 0, 0), 8, 8, None).unwrap();
        drop(rec);
        assert_eq!(log.lock().unwrap().finished.len(), 1);
    }
}
