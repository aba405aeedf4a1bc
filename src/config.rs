//! Session configuration for docrec.
//!
//! There is no configuration file. Values come from compiled defaults and can be
//! overridden per invocation through environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Extension every produced video carries.
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Time the capture process gets to exit after SIGTERM before it is killed.
pub const STOP_GRACE: Duration = Duration::from_secs(3);

/// Limit for the stream-copy concatenation attempt.
pub const COPY_CONCAT_TIMEOUT: Duration = Duration::from_secs(300);

/// Limit for the re-encoding concatenation fallback.
pub const REENCODE_CONCAT_TIMEOUT: Duration = Duration::from_secs(600);

/// Frame size, rate and codecs shared by the capture and the padding clips.
///
/// Stream-copy concatenation only works when every segment agrees on these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputProfile {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub video_codec: &'static str,
    pub preset: &'static str,
    pub crf: u8,
    pub pixel_format: &'static str,
    pub audio_codec: &'static str,
    pub audio_bitrate: &'static str,
    pub audio_rate: u32,
}

impl Default for OutputProfile {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            framerate: 30,
            video_codec: "libx264",
            preset: "veryfast",
            crf: 23,
            pixel_format: "yuv420p",
            audio_codec: "aac",
            audio_bitrate: "128k",
            audio_rate: 48000,
        }
    }
}

impl OutputProfile {
    /// Filter that fits any input into the profile frame, letterboxing as needed.
    pub fn fit_filter(&self) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format={pix}",
            w = self.width,
            h = self.height,
            fps = self.framerate,
            pix = self.pixel_format,
        )
    }

    /// Encoder arguments appended to every output written in this profile.
    pub fn encode_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.video_codec.to_string(),
            "-preset".to_string(),
            self.preset.to_string(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.to_string(),
            "-c:a".to_string(),
            self.audio_codec.to_string(),
            "-b:a".to_string(),
            self.audio_bitrate.to_string(),
            "-ar".to_string(),
            self.audio_rate.to_string(),
            "-ac".to_string(),
            "2".to_string(),
        ]
    }
}

/// Complete configuration for one recording session.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Directory the final videos land in. Must exist before the session starts.
    pub output_dir: PathBuf,
    /// Directory holding `intro.png` and `outro.png`.
    pub template_dir: PathBuf,
    /// Length of each padding clip in seconds.
    pub padding_secs: u32,
    /// X11 display the screen is grabbed from.
    pub x11_display: String,
    pub profile: OutputProfile,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./public"),
            template_dir: PathBuf::from("./scripts/record/templates"),
            padding_secs: 3,
            x11_display: ":0".to_string(),
            profile: OutputProfile::default(),
        }
    }
}

impl RecorderConfig {
    /// Builds the configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("DOCREC_OUTPUT_DIR").filter(|v| !v.trim().is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DOCREC_TEMPLATE_DIR").filter(|v| !v.trim().is_empty()) {
            config.template_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("DOCREC_PADDING_SECS") {
            match secs.trim().parse::<u32>() {
                Ok(secs) if secs > 0 => config.padding_secs = secs,
                _ => tracing::warn!("Ignoring invalid DOCREC_PADDING_SECS value '{}'", secs),
            }
        }
        if let Some(display) = lookup("DISPLAY").filter(|v| !v.is_empty()) {
            config.x11_display = display;
        }

        config
    }
}
