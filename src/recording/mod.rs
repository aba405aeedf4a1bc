//! Screen and webcam capture.
//!
//! Device discovery, capture command construction, per-session file paths and
//! supervision of the running capture process.

pub mod args;
pub mod devices;
pub mod ffmpeg;
pub mod session;
pub mod supervisor;

pub use args::{CaptureConfig, CaptureMode};
pub use devices::DeviceSelector;
pub use ffmpeg::Toolchain;
pub use session::RecordingSession;
pub use supervisor::{stop_on_ctrl_c, CaptureState, Supervisor};
