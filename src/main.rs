mod app;
mod commands;
mod config;
mod error;
mod logging;
mod output;
mod padding;
mod postprocess;
mod process;
mod prompt;
mod recording;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        eprintln!("{}", console::style(format!("Error: {e:#}")).red());
        std::process::exit(1);
    }
}
