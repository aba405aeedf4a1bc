//! Application command handlers for docrec.
//!
//! # Commands
//! - `record`: the interactive recording session (the only command)

pub mod record;

pub use record::handle_record;
