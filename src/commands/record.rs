//! The interactive recording session.
//!
//! Detects devices, asks for the recording mode, records until the user stops
//! the capture, wraps the result in intro/outro clips and files the merged video
//! under a chosen name.

use crate::config::{RecorderConfig, STOP_GRACE};
use crate::error::{RecordError, Result};
use crate::output::{embed_snippet, OutputNamer, PlacedFile};
use crate::padding::PaddingGenerator;
use crate::postprocess::{ConcatMethod, PostProcessor};
use crate::process::{ProcessRunner, SystemRunner};
use crate::prompt::{PromptService, TerminalPrompt};
use crate::recording::devices::DeviceSelection;
use crate::recording::session::remove_all;
use crate::recording::supervisor::StopToken;
use crate::recording::{
    stop_on_ctrl_c, CaptureConfig, CaptureMode, CaptureState, DeviceSelector, RecordingSession,
    Supervisor, Toolchain,
};
use chrono::{DateTime, Utc};
use console::style;
use std::future::Future;
use std::path::Path;

/// What a completed session produced.
#[derive(Debug)]
pub struct SessionSummary {
    pub capture: CaptureState,
    pub concat: ConcatMethod,
    pub video: PlacedFile,
    pub webcam: Option<PlacedFile>,
}

/// Runs one recording session against the real terminal and devices.
pub async fn handle_record() -> anyhow::Result<()> {
    tracing::info!("=== docrec Recording Session Started ===");

    let config = RecorderConfig::from_env();
    ensure_output_dir(&config.output_dir)?;

    let tools = Toolchain::locate()?;
    let runner = SystemRunner;
    let prompt = TerminalPrompt;

    let selector = DeviceSelector::new(&runner, &prompt);
    let devices = selector.select();
    let summary = run_session(&config, &tools, &runner, &prompt, devices, Utc::now(), stop_on_ctrl_c).await?;

    tracing::info!(
        "=== docrec Recording Session Finished: {} ({:?}, {:?}) ===",
        summary.video.path.display(),
        summary.capture,
        summary.concat
    );
    Ok(())
}

/// Fails unless the output directory already exists.
pub fn ensure_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        return Ok(());
    }
    tracing::error!("Output directory {} does not exist", output_dir.display());
    Err(RecordError::Precondition(format!(
        "Folder '{}' does not exist.",
        output_dir.display()
    )))
}

/// Drives a session from device selection to final placement.
///
/// `select_devices` is awaited only after the output directory check, and
/// `stop` is called right before the capture starts to obtain its stop token.
pub async fn run_session<R, P, D, S>(
    config: &RecorderConfig,
    tools: &Toolchain,
    runner: &R,
    prompt: &P,
    select_devices: D,
    started_at: DateTime<Utc>,
    stop: S,
) -> Result<SessionSummary>
where
    R: ProcessRunner,
    P: PromptService,
    D: Future<Output = Result<DeviceSelection>>,
    S: FnOnce() -> StopToken,
{
    ensure_output_dir(&config.output_dir)?;

    println!("{}", style("🔍 Detecting devices...").blue());
    let devices = select_devices.await?;

    let modes = CaptureMode::all();
    let labels: Vec<String> = modes.iter().map(|m| m.label().to_string()).collect();
    let mode = modes[prompt.select_one("Select recording mode:", &labels)?];
    let save_webcam_separate = match mode {
        CaptureMode::Combined => prompt.confirm("Save camera footage as separate file?", false)?,
        CaptureMode::WebcamOnly => false,
    };
    tracing::info!("Mode {:?}, separate webcam file: {}", mode, save_webcam_separate);

    let session = RecordingSession::new(&config.output_dir, started_at, save_webcam_separate);
    let padding = PaddingGenerator::new(
        runner,
        &tools.ffmpeg,
        &config.template_dir,
        &config.output_dir,
        config.padding_secs,
        config.profile.clone(),
    );
    padding.check_templates()?;

    let capture = CaptureConfig::new(
        mode,
        devices,
        save_webcam_separate,
        &config.x11_display,
        config.profile.clone(),
        session.raw_path.clone(),
        session.webcam_only_path.clone(),
    );
    let args = capture.build_args();

    println!("{}", style("\n📹 Starting recording...").green());
    println!("{}", style(format!("Webcam: {}", capture.video_device)).cyan());
    println!("{}", style(format!("Microphone: {}", capture.audio_device)).cyan());
    println!("{}", style(format!("Saving to: {}\n", session.raw_path.display())).cyan());
    println!("{}", style("FFmpeg command:").dim());
    println!("{}", style(format!("ffmpeg {}", args.join(" "))).dim());
    println!("{}", style("\nPress Ctrl+C to stop recording\n").yellow());

    let stop_token = stop();
    let mut handle = runner.stream(&tools.ffmpeg, &args)?;
    let mut supervisor = Supervisor::new(STOP_GRACE);
    let stamp = session.stamp();
    let (assets, outcome) = tokio::join!(
        padding.generate(&stamp),
        supervisor.supervise(&mut handle, stop_token)
    );

    let capture_state = match outcome {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{} {}", style("Recording failed:").red(), e);
            discard_session(&session, assets.as_ref().ok());
            return Err(e);
        }
    };
    match capture_state {
        CaptureState::StoppedByUser => println!("{}", style("Recording stopped by user.").yellow()),
        _ => println!("{}", style("\n✅ Recording complete!").green()),
    }

    let assets = match assets {
        Ok(assets) => assets,
        Err(e) => {
            keep_recordings_notice(&session);
            return Err(e);
        }
    };

    let raw_size = std::fs::metadata(&session.raw_path).map(|m| m.len()).unwrap_or(0);
    if raw_size == 0 {
        eprintln!("{}", style("❌ Raw recording file was not created!").red());
        remove_all(&[&session.raw_path, &assets.intro_path, &assets.outro_path]);
        if let Some(webcam) = &session.webcam_only_path {
            remove_all(&[webcam]);
        }
        return Err(RecordError::MissingOutput(session.raw_path.clone()));
    }
    println!(
        "{}",
        style(format!("📊 Raw recording size: {:.2} MB", raw_size as f64 / 1024.0 / 1024.0)).dim()
    );

    let post = PostProcessor::new(runner, &tools.ffmpeg, &tools.ffprobe);
    if let Some((width, height)) = post.probe(&session.raw_path).await {
        println!("{}", style(format!("📀 Video resolution: {width}x{height}")).dim());
    }

    println!("{}", style("Merging intro + recording + outro...").dim());
    let concat = match post
        .merge(&assets, &session.raw_path, &session.concat_list_path, &session.final_path)
        .await
    {
        Ok(method) => method,
        Err(e) => {
            keep_recordings_notice(&session);
            return Err(e);
        }
    };

    let namer = OutputNamer::new(prompt, &config.output_dir);
    let (video, webcam) = match namer.place(&session.final_path, session.webcam_only_path.as_deref()) {
        Ok(placed) => placed,
        Err(e) => {
            eprintln!(
                "{}",
                style(format!("Merged video left at {}", session.final_path.display())).yellow()
            );
            return Err(e);
        }
    };

    println!("{}", style("\nFinal video saved!").green());
    println!("{}", style("\nCopy-paste this into your markdown:\n").cyan());
    println!("{}", style(embed_snippet(&video.file_name)).cyan());

    Ok(SessionSummary {
        capture: capture_state,
        concat,
        video,
        webcam,
    })
}

/// Removes everything a failed capture left behind.
fn discard_session(session: &RecordingSession, assets: Option<&crate::padding::PaddingAssets>) {
    remove_all(&[&session.raw_path]);
    if let Some(webcam) = &session.webcam_only_path {
        remove_all(&[webcam]);
    }
    if let Some(assets) = assets {
        remove_all(&[&assets.intro_path, &assets.outro_path]);
    }
}

/// Points the user at the captures left on disk for manual recovery.
fn keep_recordings_notice(session: &RecordingSession) {
    eprintln!(
        "{}",
        style(format!("Raw recording kept at {}", session.raw_path.display())).yellow()
    );
    if let Some(webcam) = session.webcam_only_path.as_ref().filter(|path| path.exists()) {
        eprintln!(
            "{}",
            style(format!("Webcam recording kept at {}", webcam.display())).yellow()
        );
    }
}
