//! Joining the padding clips and the capture into the final video.

use crate::config::{COPY_CONCAT_TIMEOUT, REENCODE_CONCAT_TIMEOUT};
use crate::error::{RecordError, Result};
use crate::padding::PaddingAssets;
use crate::process::{ProcessRunner, RunOptions};
use crate::recording::session::remove_all;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
pub struct ProbeStream {
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Resolution of the first video stream in an ffprobe JSON report.
pub fn video_resolution(json: &str) -> Option<(u32, u32)> {
    let report: ProbeReport = serde_json::from_str(json).ok()?;
    let stream = report
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))?;
    Some((stream.width?, stream.height?))
}

/// Ordered segments written to the concat demuxer's list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatPlan {
    pub segments: [PathBuf; 3],
}

impl ConcatPlan {
    pub fn new(padding: &PaddingAssets, raw_capture: &Path) -> Self {
        Self {
            segments: [
                padding.intro_path.clone(),
                raw_capture.to_path_buf(),
                padding.outro_path.clone(),
            ],
        }
    }

    /// Renders the list file: one `file '<path>'` line per segment.
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(|path| format!("file '{}'", concat_escape(path)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Forward slashes only, and single quotes closed/escaped/reopened as the
/// concat demuxer requires.
fn concat_escape(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "/")
        .replace('\'', r"'\''")
}

/// Which concatenation attempt produced the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatMethod {
    StreamCopy,
    Reencode,
}

pub struct PostProcessor<'a, R> {
    runner: &'a R,
    ffmpeg: &'a Path,
    ffprobe: &'a Path,
}

impl<'a, R: ProcessRunner> PostProcessor<'a, R> {
    pub fn new(runner: &'a R, ffmpeg: &'a Path, ffprobe: &'a Path) -> Self {
        Self {
            runner,
            ffmpeg,
            ffprobe,
        }
    }

    /// Logs the capture's video resolution. Any probe failure is ignored.
    pub async fn probe(&self, raw_capture: &Path) -> Option<(u32, u32)> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_streams".to_string(),
            raw_capture.display().to_string(),
        ];
        let output = self
            .runner
            .run(self.ffprobe, &args, RunOptions::captured())
            .await
            .ok()?;
        if !output.status.success() {
            tracing::debug!("ffprobe failed: {}", output.status.describe());
            return None;
        }
        let resolution = video_resolution(&output.stdout)?;
        tracing::info!("Capture resolution {}x{}", resolution.0, resolution.1);
        Some(resolution)
    }

    /// Joins intro, capture and outro into `final_path`, then removes the inputs
    /// and the list file.
    ///
    /// The stream-copy attempt is tried first; any failure, including its timeout,
    /// falls back to exactly one re-encode attempt.
    ///
    /// # Errors
    /// - `Io` if the list file cannot be written
    /// - `Subprocess`/`Timeout`/`MissingOutput` if the re-encode fallback fails
    ///   too; the raw capture is kept in that case
    pub async fn merge(
        &self,
        padding: &PaddingAssets,
        raw_capture: &Path,
        list_path: &Path,
        final_path: &Path,
    ) -> Result<ConcatMethod> {
        let plan = ConcatPlan::new(padding, raw_capture);
        std::fs::write(list_path, plan.render())?;

        let result = self.concatenate(list_path, final_path).await;
        match &result {
            Ok(_) => {
                println!("{}", console::style("🪩 Cleaning up temporary files...").dim());
                remove_all(&[
                    raw_capture,
                    &padding.intro_path,
                    &padding.outro_path,
                    list_path,
                ]);
            }
            Err(_) => {
                remove_all(&[&padding.intro_path, &padding.outro_path, list_path, final_path]);
            }
        }
        result
    }

    async fn concatenate(&self, list_path: &Path, final_path: &Path) -> Result<ConcatMethod> {
        let copy = self
            .run_ffmpeg(copy_args(list_path, final_path), final_path, COPY_CONCAT_TIMEOUT)
            .await;
        match copy {
            Ok(()) => return Ok(ConcatMethod::StreamCopy),
            Err(e) => {
                tracing::warn!("Stream copy concatenation failed: {}", e);
                println!(
                    "{}",
                    console::style("Copy codec failed, trying re-encode...").yellow()
                );
            }
        }

        self.run_ffmpeg(reencode_args(list_path, final_path), final_path, REENCODE_CONCAT_TIMEOUT)
            .await
            .map(|()| ConcatMethod::Reencode)
    }

    /// Runs one concatenation attempt; it only counts if `output` ends up non-empty.
    async fn run_ffmpeg(&self, args: Vec<String>, output: &Path, limit: std::time::Duration) -> Result<()> {
        let result = self
            .runner
            .run(self.ffmpeg, &args, RunOptions::inherited(limit))
            .await?;
        if !result.status.success() {
            return Err(RecordError::subprocess("ffmpeg", result.status.describe()));
        }
        match std::fs::metadata(output) {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(RecordError::MissingOutput(output.to_path_buf())),
        }
    }
}

fn concat_input(list_path: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_path.display().to_string(),
    ]
}

pub fn copy_args(list_path: &Path, final_path: &Path) -> Vec<String> {
    let mut args = concat_input(list_path);
    args.extend(["-c".to_string(), "copy".to_string()]);
    args.push(final_path.display().to_string());
    args
}

pub fn reencode_args(list_path: &Path, final_path: &Path) -> Vec<String> {
    let mut args = concat_input(list_path);
    args.extend(
        [
            "-c:v",
            "libx264",
            "-preset",
            "fast",
            "-crf",
            "23",
            "-c:a",
            "aac",
            "-b:a",
            "128k",
            "-movflags",
            "+faststart",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(final_path.display().to_string());
    args
}
