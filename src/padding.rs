//! Intro and outro clip generation.
//!
//! Each clip is a still template image held for a few seconds over a silent
//! stereo track, encoded with the same profile as the capture so the three
//! segments can be joined without re-encoding.

use crate::config::OutputProfile;
use crate::error::{RecordError, Result};
use crate::process::{ProcessRunner, RunOptions};
use std::path::{Path, PathBuf};

pub const INTRO_TEMPLATE: &str = "intro.png";
pub const OUTRO_TEMPLATE: &str = "outro.png";

/// Generated padding clips, owned by the post-processor once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddingAssets {
    pub intro_path: PathBuf,
    pub outro_path: PathBuf,
}

pub struct PaddingGenerator<'a, R> {
    runner: &'a R,
    ffmpeg: &'a Path,
    template_dir: PathBuf,
    output_dir: PathBuf,
    seconds: u32,
    profile: OutputProfile,
}

impl<'a, R: ProcessRunner> PaddingGenerator<'a, R> {
    pub fn new(
        runner: &'a R,
        ffmpeg: &'a Path,
        template_dir: &Path,
        output_dir: &Path,
        seconds: u32,
        profile: OutputProfile,
    ) -> Self {
        Self {
            runner,
            ffmpeg,
            template_dir: template_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            seconds,
            profile,
        }
    }

    /// Confirms both template images exist, so a session can fail before recording.
    pub fn check_templates(&self) -> Result<()> {
        for name in [INTRO_TEMPLATE, OUTRO_TEMPLATE] {
            let path = self.template_dir.join(name);
            if !path.is_file() {
                return Err(RecordError::AssetGeneration(format!(
                    "template {} is missing",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Synthesizes the intro and outro clips for the session identified by `stamp`.
    ///
    /// # Errors
    /// - `AssetGeneration` if a template is missing, ffmpeg fails, or a clip is empty
    pub async fn generate(&self, stamp: &str) -> Result<PaddingAssets> {
        self.check_templates()?;

        let assets = PaddingAssets {
            intro_path: self.output_dir.join(format!("padding_intro_{stamp}.mp4")),
            outro_path: self.output_dir.join(format!("padding_outro_{stamp}.mp4")),
        };

        let intro = self
            .render(&self.template_dir.join(INTRO_TEMPLATE), &assets.intro_path)
            .await;
        let outro = match intro {
            Ok(()) => {
                self.render(&self.template_dir.join(OUTRO_TEMPLATE), &assets.outro_path)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = outro {
            crate::recording::session::remove_all(&[&assets.intro_path, &assets.outro_path]);
            return Err(e);
        }

        tracing::info!(
            "Generated padding clips {} and {}",
            assets.intro_path.display(),
            assets.outro_path.display()
        );
        Ok(assets)
    }

    /// Arguments rendering `image` into a clip at `output`.
    pub fn clip_args(&self, image: &Path, output: &Path) -> Vec<String> {
        let p = &self.profile;
        let seconds = self.seconds.to_string();
        let mut args: Vec<String> = [
            "-y",
            "-loglevel",
            "error",
            "-loop",
            "1",
            "-framerate",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.extend([
            p.framerate.to_string(),
            "-t".to_string(),
            seconds.clone(),
            "-i".to_string(),
            image.display().to_string(),
            "-f".to_string(),
            "lavfi".to_string(),
            "-t".to_string(),
            seconds,
            "-i".to_string(),
            format!("anullsrc=channel_layout=stereo:sample_rate={}", p.audio_rate),
            "-vf".to_string(),
            p.fit_filter(),
            "-map".to_string(),
            "0:v".to_string(),
            "-map".to_string(),
            "1:a".to_string(),
        ]);
        args.extend(p.encode_args());
        args.push("-shortest".to_string());
        args.push(output.display().to_string());
        args
    }

    async fn render(&self, image: &Path, output: &Path) -> Result<()> {
        let args = self.clip_args(image, output);
        let result = self
            .runner
            .run(self.ffmpeg, &args, RunOptions::captured())
            .await
            .map_err(|e| RecordError::AssetGeneration(e.to_string()))?;

        if !result.status.success() {
            return Err(RecordError::AssetGeneration(format!(
                "ffmpeg could not render {} ({}): {}",
                image.display(),
                result.status.describe(),
                result.stderr.trim()
            )));
        }

        match std::fs::metadata(output) {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(RecordError::AssetGeneration(format!(
                "{} was not created",
                output.display()
            ))),
        }
    }
}
