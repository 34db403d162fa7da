use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `data/` and `recordings/`.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub recording: RecordingConfig,

    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub camera_index: u32,

    /// Frame polling cadence in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Minimum seconds before the same barcode is logged again.
    #[serde(default = "default_dedup_interval_secs")]
    pub dedup_interval_secs: u64,

    #[serde(default)]
    pub requested_width: Option<u32>,

    #[serde(default)]
    pub requested_height: Option<u32>,
}

fn default_tick_ms() -> u64 {
    33
}

fn default_dedup_interval_secs() -> u64 {
    crate::dedup::DEFAULT_INTERVAL_SECS
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            tick_ms: default_tick_ms(),
            dedup_interval_secs: default_dedup_interval_secs(),
            requested_width: None,
            requested_height: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Encoder program frames are piped into.
    #[serde(default = "default_encoder")]
    pub encoder: String,

    #[serde(default = "default_codec")]
    pub codec: String,

    /// Container extension for session files.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Used when the camera does not report a frame rate.
    #[serde(default = "default_fps")]
    pub default_fps: f64,
}

fn default_encoder() -> String {
    "ffmpeg".to_string()
}

fn default_codec() -> String {
    "mpeg4".to_string()
}

fn default_extension() -> String {
    "mp4".to_string()
}

fn default_fps() -> f64 {
    30.0
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            encoder: default_encoder(),
            codec: default_codec(),
            extension: default_extension(),
            default_fps: default_fps(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageProtocol {
    #[default]
    Auto,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Render the camera feed in the Capture tab.
    #[serde(default = "default_true")]
    pub live_video: bool,

    /// Draw boxes around decoded barcodes.
    #[serde(default = "default_true")]
    pub annotate: bool,

    #[serde(default)]
    pub protocol: ImageProtocol,

    /// External player for opening recordings (e.g., "mpv", "vlc")
    /// If not set, uses system default (xdg-open on Linux, open on macOS)
    #[serde(default)]
    pub external_viewer: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            live_video: true,
            annotate: true,
            protocol: ImageProtocol::default(),
            external_viewer: None,
        }
    }
}

fn default_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scanlog")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            capture: CaptureConfig::default(),
            recording: RecordingConfig::default(),
            preview: PreviewConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default location, honouring `SCANLOG_CONFIG`.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var_os("SCANLOG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path);
        Self::load_from(&config_path)
    }

    /// Load from `path`, writing defaults there if it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scanlog")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("records.db")
    }

    pub fn recordings_dir(&self) -> PathBuf {
        self.root.join("recordings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_gets_defaults() {
        let config: Config = toml::from_str(
            r#"
            root = "/srv/packing"

            [capture]
            dedup_interval_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.dedup_interval_secs, 5);
        assert_eq!(config.capture.tick_ms, 33);
        assert_eq!(config.recording.extension, "mp4");
        assert_eq!(config.recording.default_fps, 30.0);
        assert!(config.preview.annotate);
        assert_eq!(config.db_path(), PathBuf::from("/srv/packing/data/records.db"));
        assert_eq!(config.recordings_dir(), PathBuf::from("/srv/packing/recordings"));
    }

    #[test]
    fn test_load_from_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.root, config.root);
        assert_eq!(reloaded.capture.tick_ms, config.capture.tick_ms);
    }
}
