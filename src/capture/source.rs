//! Frame sources: the live webcam, or anything else that yields RGB frames.

use image::RgbImage;

use crate::config::CaptureConfig;
use crate::error::CaptureError;

/// A camera-like producer of frames.
///
/// `read_frame` returns `Ok(None)` or `TransientRead` for a missed frame; any
/// other error means the device is gone and the loop stops.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, CaptureError>;

    /// Frame size the device delivers, `(0, 0)` if unknown.
    fn resolution(&self) -> (u32, u32);

    /// Reported frame rate, if the device reports one.
    fn frame_rate(&self) -> Option<f64>;

    fn release(&mut self);
}

/// Open the configured webcam.
#[cfg(feature = "camera")]
pub fn open_camera(config: &CaptureConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    Ok(Box::new(camera::WebcamSource::open(config)?))
}

#[cfg(not(feature = "camera"))]
pub fn open_camera(_config: &CaptureConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::CameraUnavailable(
        "built without the `camera` feature".to_string(),
    ))
}

#[cfg(feature = "camera")]
mod camera {
    use image::RgbImage;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    };
    use nokhwa::Camera;
    use tracing::{info, trace};

    use super::FrameSource;
    use crate::config::CaptureConfig;
    use crate::error::CaptureError;

    /// About five seconds of misses at the default cadence.
    const MAX_CONSECUTIVE_FAILURES: u32 = 150;

    pub struct WebcamSource {
        camera: Camera,
        failures: u32,
        released: bool,
    }

    impl WebcamSource {
        pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
            let requested = match (config.requested_width, config.requested_height) {
                (Some(w), Some(h)) => RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                    CameraFormat::new(Resolution::new(w, h), FrameFormat::MJPEG, 30),
                )),
                _ => RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
            };

            let mut camera = Camera::new(CameraIndex::Index(config.camera_index), requested)
                .map_err(|e| CaptureError::CameraUnavailable(e.to_string()))?;
            camera
                .open_stream()
                .map_err(|e| CaptureError::CameraUnavailable(e.to_string()))?;

            let res = camera.resolution();
            info!(
                "Camera {} opened at {}x{} @ {} fps",
                config.camera_index,
                res.width(),
                res.height(),
                camera.frame_rate()
            );

            Ok(Self {
                camera,
                failures: 0,
                released: false,
            })
        }

        fn fail(&mut self, reason: String) -> CaptureError {
            self.failures += 1;
            trace!("Missed frame ({} in a row): {}", self.failures, reason);
            if self.failures >= MAX_CONSECUTIVE_FAILURES {
                CaptureError::CameraUnavailable(format!(
                    "{} consecutive read failures, last: {}",
                    self.failures, reason
                ))
            } else {
                CaptureError::TransientRead(reason)
            }
        }
    }

    impl FrameSource for WebcamSource {
        fn read_frame(&mut self) -> Result<Option<RgbImage>, CaptureError> {
            let buffer = match self.camera.frame() {
                Ok(buffer) => buffer,
                Err(e) => return Err(self.fail(e.to_string())),
            };
            let decoded = match buffer.decode_image::<RgbFormat>() {
                Ok(decoded) => decoded,
                Err(e) => return Err(self.fail(e.to_string())),
            };
            let (width, height) = (decoded.width(), decoded.height());
            // Rebuild from raw bytes so the frame is independent of nokhwa's image version.
            match RgbImage::from_raw(width, height, decoded.into_raw()) {
                Some(frame) => {
                    self.failures = 0;
                    Ok(Some(frame))
                }
                None => Err(self.fail("frame buffer size mismatch".to_string())),
            }
        }

        fn resolution(&self) -> (u32, u32) {
            let res = self.camera.resolution();
            (res.width(), res.height())
        }

        fn frame_rate(&self) -> Option<f64> {
            match self.camera.frame_rate() {
                0 => None,
                fps => Some(fps as f64),
            }
        }

        fn release(&mut self) {
            if !self.released {
                let _ = self.camera.stop_stream();
                self.released = true;
                info!("Camera released");
            }
        }
    }

    impl Drop for WebcamSource {
        fn drop(&mut self) {
            self.release();
        }
    }
}
