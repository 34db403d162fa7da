//! Video sink that pipes raw RGB frames into an `ffmpeg` child process.

use anyhow::{anyhow, bail, Context, Result};
use image::{imageops::FilterType, RgbImage};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::Duration;

use super::{SinkFactory, SinkSpec, VideoSink};
use crate::config::RecordingConfig;

/// Long enough for ffmpeg to reject a bad codec or unwritable path.
const STARTUP_GRACE: Duration = Duration::from_millis(150);

pub struct FfmpegSinkFactory {
    program: String,
    codec: String,
    extension: String,
}

impl FfmpegSinkFactory {
    pub fn new(config: &RecordingConfig) -> Self {
        Self {
            program: config.encoder.clone(),
            codec: config.codec.clone(),
            extension: config.extension.clone(),
        }
    }

    fn args(&self, path: &Path, spec: SinkSpec) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s".into(),
            format!("{}x{}", spec.width, spec.height),
            "-r".into(),
            format!("{:.3}", spec.fps),
            "-i".into(),
            "-".into(),
            "-an".into(),
            "-c:v".into(),
            self.codec.clone(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            path.to_string_lossy().to_string(),
        ]
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn open(&self, path: &Path, spec: SinkSpec) -> Result<Box<dyn VideoSink>> {
        if spec.width == 0 || spec.height == 0 {
            bail!("camera reported an empty frame size {}x{}", spec.width, spec.height);
        }

        let mut child = Command::new(&self.program)
            .args(self.args(path, spec))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to launch {}", self.program))?;

        std::thread::sleep(STARTUP_GRACE);
        if let Some(status) = child.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            bail!("{} exited with {}: {}", self.program, status, stderr.trim());
        }

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("{} stdin not captured", self.program))?;

        Ok(Box::new(FfmpegSink {
            path: path.to_path_buf(),
            spec,
            child,
            stdin: Some(stdin),
        }))
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}

struct FfmpegSink {
    path: PathBuf,
    spec: SinkSpec,
    child: Child,
    stdin: Option<ChildStdin>,
}

impl VideoSink for FfmpegSink {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("sink for {} already closed", self.path.display()))?;

        if frame.dimensions() == (self.spec.width, self.spec.height) {
            stdin.write_all(frame.as_raw())?;
        } else {
            let resized =
                image::imageops::resize(frame, self.spec.width, self.spec.height, FilterType::Triangle);
            stdin.write_all(resized.as_raw())?;
        }
        Ok(())
    }

    fn check_alive(&mut self) -> Result<()> {
        let Some(status) = self.child.try_wait()? else {
            return Ok(());
        };
        drop(self.stdin.take());
        let mut stderr = String::new();
        if let Some(mut pipe) = self.child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }
        bail!("encoder exited with {}: {}", status, stderr.trim());
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        // Closing stdin is ffmpeg's end-of-stream.
        drop(self.stdin.take());
        let status = self.child.wait()?;
        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut pipe) = self.child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            bail!("encoder exited with {}: {}", status, stderr.trim());
        }
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_describe_raw_input_and_output() {
        let factory = FfmpegSinkFactory::new(&RecordingConfig::default());
        let spec = SinkSpec { width: 640, height: 480, fps: 30.0 };
        let args = factory.args(Path::new("/tmp/out.mp4"), spec);

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("-s") + 1], "640x480");
        assert_eq!(args[pos("-r") + 1], "30.000");
        assert_eq!(args[pos("-c:v") + 1], "mpeg4");
        assert_eq!(args.last().unwrap(), "/tmp/out.mp4");
    }

    #[test]
    fn test_missing_encoder_is_reported() {
        let config = RecordingConfig {
            encoder: "scanlog-no-such-encoder".to_string(),
            ..RecordingConfig::default()
        };
        let factory = FfmpegSinkFactory::new(&config);
        let spec = SinkSpec { width: 2, height: 2, fps: 30.0 };
        assert!(factory.open(Path::new("/tmp/never.mp4"), spec).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_encoder_exit_after_start_is_detected() {
        use crate::recording::{RecordingController, RecordingState};
        use crate::error::RecordingError;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("short-lived-encoder");
        std::fs::write(&script, "#!/bin/sh\nsleep 0.4\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = RecordingConfig {
            encoder: script.to_string_lossy().to_string(),
            ..RecordingConfig::default()
        };
        let mut rec = RecordingController::new(
            dir.path().join("recordings"),
            &config,
            Box::new(FfmpegSinkFactory::new(&config)),
        );
        let started_at = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let path = rec.start(started_at, 4, 4, Some(30.0)).unwrap();

        std::thread::sleep(Duration::from_millis(800));
        let frame = RgbImage::new(4, 4);
        let lost = (0..5).find_map(|_| rec.write(&frame).err());

        assert!(matches!(lost, Some(RecordingError::SinkLost { path: ref p, .. }) if *p == path));
        assert_eq!(rec.state(), RecordingState::Idle);
        assert_eq!(rec.current_path(), None);
        assert!(rec.write(&frame).is_ok());
    }

    #[test]
    fn test_empty_frame_size_is_rejected() {
        let factory = FfmpegSinkFactory::new(&RecordingConfig::default());
        let spec = SinkSpec { width: 0, height: 480, fps: 30.0 };
        assert!(factory.open(Path::new("/tmp/never.mp4"), spec).is_err());
    }
}
