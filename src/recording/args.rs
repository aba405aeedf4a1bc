//! Capture command construction.
//!
//! Turns a [`CaptureConfig`] into the exact ffmpeg argument list. Building is
//! pure: the same config always yields the same arguments.

use super::devices::{DeviceSelection, Geometry};
use crate::config::OutputProfile;
use std::path::PathBuf;

/// Width of the webcam picture-in-picture overlay in combined mode.
const OVERLAY_WIDTH: u32 = 400;
/// Distance of the overlay from the bottom-right corner.
const OVERLAY_MARGIN: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Screen with a webcam overlay.
    Combined,
    WebcamOnly,
}

impl CaptureMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Combined => "Screen + Webcam (combined)",
            Self::WebcamOnly => "Webcam only",
        }
    }

    pub fn all() -> [CaptureMode; 2] {
        [Self::Combined, Self::WebcamOnly]
    }
}

/// Everything the capture command depends on. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub mode: CaptureMode,
    pub geometry: Geometry,
    pub video_device: String,
    pub audio_device: String,
    /// Also write the raw webcam feed to its own file (combined mode only).
    pub save_webcam_separate: bool,
    pub x11_display: String,
    pub profile: OutputProfile,
    pub output_path: PathBuf,
    pub webcam_output_path: Option<PathBuf>,
}

impl CaptureConfig {
    pub fn new(
        mode: CaptureMode,
        devices: DeviceSelection,
        save_webcam_separate: bool,
        x11_display: &str,
        profile: OutputProfile,
        output_path: PathBuf,
        webcam_output_path: Option<PathBuf>,
    ) -> Self {
        let save_webcam_separate = mode == CaptureMode::Combined && save_webcam_separate;
        Self {
            mode,
            geometry: devices.geometry,
            video_device: devices.video_device,
            audio_device: devices.audio_device,
            save_webcam_separate,
            x11_display: x11_display.to_string(),
            profile,
            output_path,
            webcam_output_path: webcam_output_path.filter(|_| save_webcam_separate),
        }
    }

    /// Builds the ffmpeg argument list for this capture.
    pub fn build_args(&self) -> Vec<String> {
        match self.mode {
            CaptureMode::Combined => self.combined_args(),
            CaptureMode::WebcamOnly => self.webcam_only_args(),
        }
    }

    fn combined_args(&self) -> Vec<String> {
        let g = self.geometry;
        let mut args = strings(&["-y", "-thread_queue_size", "512", "-f", "x11grab"]);
        args.extend([
            "-framerate".to_string(),
            self.profile.framerate.to_string(),
            "-video_size".to_string(),
            format!("{}x{}", g.width, g.height),
            "-i".to_string(),
            format!("{}+{},{}", self.x11_display, g.offset_x, g.offset_y),
        ]);
        args.extend(self.webcam_input());
        args.extend(self.audio_input());

        let separate = self.webcam_output_path.as_ref();
        let webcam_chain = if separate.is_some() {
            format!("[1:v]split=2[camsrc][camfile];[camsrc]scale={OVERLAY_WIDTH}:-2[cam]")
        } else {
            format!("[1:v]scale={OVERLAY_WIDTH}:-2[cam]")
        };
        let mut graph = format!(
            "[0:v]{fit}[screen];{webcam_chain};[screen][cam]overlay=W-w-{m}:H-h-{m}[outv]",
            fit = self.profile.fit_filter(),
            m = OVERLAY_MARGIN,
        );
        if separate.is_some() {
            graph.push_str(&format!(";[camfile]{}[webcam]", self.profile.fit_filter()));
        }
        args.extend(["-filter_complex".to_string(), graph]);

        args.extend(strings(&["-map", "[outv]", "-map", "2:a"]));
        args.extend(self.profile.encode_args());
        args.push(self.output_path.display().to_string());

        if let Some(webcam_path) = separate {
            args.extend(strings(&["-map", "[webcam]", "-map", "2:a"]));
            args.extend(self.profile.encode_args());
            args.push(webcam_path.display().to_string());
        }
        args
    }

    fn webcam_only_args(&self) -> Vec<String> {
        let mut args = strings(&["-y"]);
        args.extend(self.webcam_input());
        args.extend(self.audio_input());
        args.extend(["-vf".to_string(), self.profile.fit_filter()]);
        args.extend(strings(&["-map", "0:v", "-map", "1:a"]));
        args.extend(self.profile.encode_args());
        args.push(self.output_path.display().to_string());
        args
    }

    fn webcam_input(&self) -> Vec<String> {
        vec![
            "-thread_queue_size".to_string(),
            "512".to_string(),
            "-f".to_string(),
            "v4l2".to_string(),
            "-framerate".to_string(),
            self.profile.framerate.to_string(),
            "-i".to_string(),
            self.video_device.clone(),
        ]
    }

    fn audio_input(&self) -> Vec<String> {
        vec![
            "-thread_queue_size".to_string(),
            "512".to_string(),
            "-f".to_string(),
            "pulse".to_string(),
            "-i".to_string(),
            self.audio_device.clone(),
        ]
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: CaptureMode, separate: bool) -> CaptureConfig {
        CaptureConfig::new(
            mode,
            DeviceSelection {
                geometry: Geometry {
                    offset_x: 3441,
                    offset_y: 17,
                    width: 2561,
                    height: 1441,
                },
                video_device: "/dev/video0".to_string(),
                audio_device: "alsa_input.usb-mic".to_string(),
            },
            separate,
            ":0",
            OutputProfile::default(),
            PathBuf::from("public/recording_raw_20240101_120000.mp4"),
            Some(PathBuf::from("public/webcam_only_20240101_120000.mp4")),
        )
    }

    #[test]
    fn test_build_is_deterministic() {
        for (mode, separate) in [
            (CaptureMode::Combined, false),
            (CaptureMode::Combined, true),
            (CaptureMode::WebcamOnly, false),
        ] {
            assert_eq!(config(mode, separate).build_args(), config(mode, separate).build_args());
        }
    }

    #[test]
    fn test_combined_encodes_geometry_and_sources() {
        let args = config(CaptureMode::Combined, false).build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-f x11grab"));
        assert!(joined.contains("-video_size 2561x1441"));
        assert!(joined.contains("-i :0+3441,17"));
        assert!(joined.contains("-f v4l2 -framerate 30 -i /dev/video0"));
        assert!(joined.contains("-f pulse -i alsa_input.usb-mic"));
        assert!(joined.contains("overlay="));
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(
            args.last().map(String::as_str),
            Some("public/recording_raw_20240101_120000.mp4")
        );
    }

    #[test]
    fn test_combined_without_separate_webcam_has_single_output() {
        let args = config(CaptureMode::Combined, false).build_args();
        assert!(!args.iter().any(|a| a.contains("webcam_only")));
        assert!(!args.iter().any(|a| a.contains("[webcam]")));
    }

    #[test]
    fn test_combined_with_separate_webcam_adds_second_output() {
        let args = config(CaptureMode::Combined, true).build_args();
        assert_eq!(args.last().map(String::as_str), Some("public/webcam_only_20240101_120000.mp4"));
        assert!(args.contains(&"public/recording_raw_20240101_120000.mp4".to_string()));
        let graph = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(graph.contains("split=2"));
        assert_eq!(args.iter().filter(|a| *a == "[webcam]").count(), 1);
    }

    #[test]
    fn test_webcam_only_omits_screen_geometry() {
        let args = config(CaptureMode::WebcamOnly, false).build_args();
        for needle in ["2561", "1441", "3441", "x11grab", "-video_size"] {
            assert!(
                !args.iter().any(|a| a.contains(needle)),
                "webcam-only args should not contain {needle}: {args:?}"
            );
        }
        assert!(args.join(" ").contains("-map 0:v -map 1:a"));
    }

    #[test]
    fn test_webcam_only_ignores_separate_flag() {
        let cfg = config(CaptureMode::WebcamOnly, true);
        assert!(!cfg.save_webcam_separate);
        assert!(cfg.webcam_output_path.is_none());
        assert!(!cfg.build_args().iter().any(|a| a.contains("webcam_only")));
    }
}
