//! Application entry: argument parsing, logging setup and command dispatch.

use crate::commands;
use crate::error::RecordError;
use crate::logging;
use clap::Parser;
use std::process;

/// Records the screen and webcam, pads the capture with intro/outro clips and
/// stores the merged video for the docs site.
#[derive(Parser)]
#[command(name = "docrec")]
#[command(version)]
#[command(
    long_about = "Records the screen and webcam, pads the capture with intro/outro clips and\nstores the merged video for the docs site.\n\nThe session is fully interactive: pick devices and a recording mode, press\nCtrl+C to stop recording, then name the resulting files.\n\nRun it from the site root; the 'public' directory must already exist."
)]
#[command(
    after_help = "ENVIRONMENT:\n    DOCREC_OUTPUT_DIR      Output directory (default ./public)\n    DOCREC_TEMPLATE_DIR    Directory with intro.png and outro.png\n    DOCREC_PADDING_SECS    Length of each padding clip (default 3)\n    RUST_LOG               Log level (logs: ~/.local/state/docrec/docrec.log.*)"
)]
struct Cli {}

/// Runs the recorder.
///
/// # Exit Codes
/// - 0: Success, or the user cancelled a prompt
/// - 1: Any fatal session error (reported by `main`)
///
/// # Errors
/// - If the recording session fails
pub async fn run() -> Result<(), anyhow::Error> {
    let _cli = Cli::parse();

    if let Err(e) = logging::init_logging() {
        eprintln!("Warning: logging disabled: {e}");
    }

    if let Err(e) = commands::handle_record().await {
        // cliclack already showed "Operation cancelled"
        if let Some(RecordError::Prompt(reason)) = e.downcast_ref::<RecordError>() {
            tracing::info!("Session cancelled at a prompt: {reason}");
            process::exit(0);
        }
        tracing::error!("Session failed: {e:#}");
        return Err(e);
    }

    Ok(())
}
