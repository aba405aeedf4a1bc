//! FFmpeg toolchain locator.
//!
//! Finds `ffmpeg` and `ffprobe` in the usual installation directories before
//! falling back to a PATH search, so the recorder works from shells with a
//! trimmed PATH.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Resolved paths of the external media tools.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Toolchain {
    /// Locates both binaries. The probe tool is optional for the session, so a
    /// missing ffprobe falls back to the bare name and probing simply fails later.
    pub fn locate() -> Result<Self> {
        let ffmpeg = find_binary("ffmpeg")?;
        let ffprobe = sibling_of(&ffmpeg, "ffprobe")
            .or_else(|| find_binary("ffprobe").ok())
            .unwrap_or_else(|| PathBuf::from("ffprobe"));
        tracing::debug!("Using ffmpeg={} ffprobe={}", ffmpeg.display(), ffprobe.display());
        Ok(Self { ffmpeg, ffprobe })
    }
}

/// Locates `binary_name` on the system.
///
/// Checks in this order:
/// 1. macOS homebrew locations: `/opt/homebrew/bin`, `/usr/local/bin`
/// 2. Linux standard locations: `/usr/bin`, `/usr/local/bin`, `/snap/bin`
/// 3. Falls back to PATH search via `which`
pub fn find_binary(binary_name: &str) -> Result<PathBuf> {
    let dirs: &[&str] = if cfg!(target_os = "macos") {
        &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"]
    } else if cfg!(target_os = "linux") {
        &["/usr/bin", "/usr/local/bin", "/snap/bin"]
    } else {
        &[]
    };

    for dir in dirs {
        let path = Path::new(dir).join(binary_name);
        if path.exists() {
            tracing::debug!("Found {} at: {}", binary_name, path.display());
            return Ok(path);
        }
    }

    let path = find_in_path(binary_name)?;
    tracing::debug!("Found {} in PATH at: {}", binary_name, path.display());
    Ok(path)
}

fn sibling_of(binary: &Path, name: &str) -> Option<PathBuf> {
    let candidate = binary.parent()?.join(name);
    candidate.exists().then_some(candidate)
}

fn find_in_path(binary_name: &str) -> Result<PathBuf> {
    let output = std::process::Command::new("which")
        .arg(binary_name)
        .output()
        .map_err(|e| anyhow!("Failed to search PATH for {binary_name}: {e}"))?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        let path = PathBuf::from(path_str.trim());
        if !path.as_os_str().is_empty() {
            return Ok(path);
        }
    }

    Err(anyhow!(
        "{binary_name} not found. Please install ffmpeg:\n\
         Linux: apt install ffmpeg (Debian/Ubuntu) or dnf install ffmpeg (Fedora)\n\
         macOS: brew install ffmpeg"
    ))
}
