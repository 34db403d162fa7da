//! Hands a recording to the host's video player.

use anyhow::{bail, Result};
use std::path::Path;
use std::process::Command;

/// Build the command that opens `path`, using `viewer` when configured.
pub fn open_command(path: &Path, viewer: Option<&str>) -> Command {
    if let Some(viewer) = viewer {
        let mut cmd = Command::new(viewer);
        cmd.arg(path);
        return cmd;
    }

    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    }
    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

/// Open a recording with the configured or system default viewer.
pub fn open_video(path: &Path, viewer: Option<&str>) -> Result<()> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }

    open_command(path, viewer)
        .spawn()
        .map_err(|e| anyhow::anyhow!("Could not open video file: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_viewer_is_used() {
        let cmd = open_command(Path::new("/v/100000.mp4"), Some("mpv"));
        assert_eq!(cmd.get_program(), "mpv");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["/v/100000.mp4"]);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = open_video(Path::new("/nonexistent/scanlog/clip.mp4"), Some("true")).unwrap_err();
        assert!(err.to_string().starts_with("File not found"));
    }
}
