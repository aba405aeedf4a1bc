//! Capture device discovery and selection.
//!
//! Displays come from `xrandr --listmonitors`, webcams from the `/dev/video*`
//! nodes (labelled through sysfs) and microphones from `pactl list short sources`.

use crate::error::{RecordError, Result};
use crate::process::{ProcessRunner, RunOptions};
use crate::prompt::PromptService;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Screen region to grab, in pixels of the X11 root window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub offset_x: u32,
    pub offset_y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub name: String,
    pub geometry: Geometry,
}

impl Monitor {
    fn label(&self) -> String {
        let g = self.geometry;
        format!("{} ({}x{} at {},{})", self.name, g.width, g.height, g.offset_x, g.offset_y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub path: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub name: String,
    pub format: String,
}

/// Outcome of device selection, consumed when the capture config is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelection {
    pub geometry: Geometry,
    pub video_device: String,
    pub audio_device: String,
}

/// Parses `xrandr --listmonitors` output.
///
/// Lines look like ` 0: +*DP-1 2560/597x1440/336+0+0  DP-1`.
pub fn parse_monitors(stdout: &str) -> Vec<Monitor> {
    static MONITOR_LINE: OnceLock<Regex> = OnceLock::new();
    let re = MONITOR_LINE.get_or_init(|| {
        Regex::new(r"^\s*\d+:\s+[+*]*(\S+)\s+(\d+)/\d+x(\d+)/\d+\+(\d+)\+(\d+)")
            .expect("monitor pattern is valid")
    });

    stdout
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            Some(Monitor {
                name: caps[1].to_string(),
                geometry: Geometry {
                    width: caps[2].parse().ok()?,
                    height: caps[3].parse().ok()?,
                    offset_x: caps[4].parse().ok()?,
                    offset_y: caps[5].parse().ok()?,
                },
            })
        })
        .collect()
}

/// Parses `pactl list short sources`, skipping monitors of output sinks.
pub fn parse_audio_sources(stdout: &str) -> Vec<AudioSource> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let _index = fields.next()?;
            let name = fields.next()?.trim();
            let _driver = fields.next();
            let format = fields.next().unwrap_or("").trim();
            if name.is_empty() || name.ends_with(".monitor") {
                return None;
            }
            Some(AudioSource {
                name: name.to_string(),
                format: format.to_string(),
            })
        })
        .collect()
}

/// Lists `videoN` nodes under `dev_root`, labelled from `sysfs_root/videoN/name`.
pub async fn list_video_devices(dev_root: &Path, sysfs_root: &Path) -> Result<Vec<VideoDevice>> {
    let mut nodes: Vec<(u32, String)> = Vec::new();
    let mut entries = match tokio::fs::read_dir(dev_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(index) = name.strip_prefix("video").and_then(|n| n.parse::<u32>().ok()) {
            nodes.push((index, name));
        }
    }
    nodes.sort();

    let mut devices = Vec::with_capacity(nodes.len());
    for (_, node) in nodes {
        let path = dev_root.join(&node).display().to_string();
        let label = match tokio::fs::read_to_string(sysfs_root.join(&node).join("name")).await {
            Ok(name) if !name.trim().is_empty() => format!("{} ({})", name.trim(), path),
            _ => path.clone(),
        };
        devices.push(VideoDevice { path, label });
    }
    Ok(devices)
}

/// Enumerates host devices and asks the user to choose among them.
pub struct DeviceSelector<'a, R, P> {
    runner: &'a R,
    prompt: &'a P,
    dev_root: PathBuf,
    sysfs_root: PathBuf,
}

impl<'a, R: ProcessRunner, P: PromptService> DeviceSelector<'a, R, P> {
    pub fn new(runner: &'a R, prompt: &'a P) -> Self {
        Self {
            runner,
            prompt,
            dev_root: PathBuf::from("/dev"),
            sysfs_root: PathBuf::from("/sys/class/video4linux"),
        }
    }

    #[cfg(test)]
    fn with_roots(mut self, dev_root: &Path, sysfs_root: &Path) -> Self {
        self.dev_root = dev_root.to_path_buf();
        self.sysfs_root = sysfs_root.to_path_buf();
        self
    }

    /// Selects the screen region, webcam and microphone for the session.
    ///
    /// # Errors
    /// - `DeviceNotFound` if no display, webcam or microphone is present
    /// - `Prompt` if the user aborts a selection
    pub async fn select(&self) -> Result<DeviceSelection> {
        let geometry = self.select_display().await?;
        let video_device = self.select_video().await?;
        let audio_device = self.select_audio().await?;
        Ok(DeviceSelection {
            geometry,
            video_device,
            audio_device,
        })
    }

    async fn select_display(&self) -> Result<Geometry> {
        let monitors = match self
            .runner
            .run(Path::new("xrandr"), &["--listmonitors".to_string()], RunOptions::captured())
            .await
        {
            Ok(output) if output.status.success() => parse_monitors(&output.stdout),
            Ok(output) => {
                tracing::warn!("xrandr failed: {}", output.status.describe());
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("xrandr unavailable: {}", e);
                Vec::new()
            }
        };
        tracing::info!("Detected {} display(s)", monitors.len());

        let monitor = match monitors.len() {
            0 => return Err(RecordError::DeviceNotFound("display".to_string())),
            1 => &monitors[0],
            _ => {
                let labels: Vec<String> = monitors.iter().map(Monitor::label).collect();
                &monitors[self.choose("Select display to record:", &labels)?]
            }
        };
        tracing::info!("Selected display {}", monitor.label());
        Ok(monitor.geometry)
    }

    async fn select_video(&self) -> Result<String> {
        let devices = list_video_devices(&self.dev_root, &self.sysfs_root).await?;
        tracing::info!("Detected {} video device(s)", devices.len());
        if devices.is_empty() {
            return Err(RecordError::DeviceNotFound("webcam".to_string()));
        }
        let labels: Vec<String> = devices.iter().map(|d| d.label.clone()).collect();
        let index = self.choose("Select webcam:", &labels)?;
        Ok(devices[index].path.clone())
    }

    async fn select_audio(&self) -> Result<String> {
        let sources = match self
            .runner
            .run(
                Path::new("pactl"),
                &["list".to_string(), "short".to_string(), "sources".to_string()],
                RunOptions::captured(),
            )
            .await
        {
            Ok(output) if output.status.success() => parse_audio_sources(&output.stdout),
            Ok(output) => {
                tracing::warn!("pactl failed: {}", output.status.describe());
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("pactl unavailable: {}", e);
                Vec::new()
            }
        };
        tracing::info!("Detected {} audio source(s)", sources.len());
        if sources.is_empty() {
            return Err(RecordError::DeviceNotFound("microphone".to_string()));
        }
        let labels: Vec<String> = sources
            .iter()
            .map(|s| {
                if s.format.is_empty() {
                    s.name.clone()
                } else {
                    format!("{} [{}]", s.name, s.format)
                }
            })
            .collect();
        let index = self.choose("Select microphone:", &labels)?;
        Ok(sources[index].name.clone())
    }

    /// Prompts only when there is more than one option.
    fn choose(&self, message: &str, labels: &[String]) -> Result<usize> {
        if labels.len() == 1 {
            tracing::info!("Only one option for '{}': {}", message, labels[0]);
            return Ok(0);
        }
        self.prompt.select_one(message, labels)
    }
}
