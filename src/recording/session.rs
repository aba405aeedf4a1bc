//! Per-session file paths and temporary file cleanup.

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

/// Files owned by one recording session, all named after its start time.
#[derive(Debug, Clone)]
pub struct RecordingSession {
    pub raw_path: PathBuf,
    pub final_path: PathBuf,
    pub webcam_only_path: Option<PathBuf>,
    pub concat_list_path: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl RecordingSession {
    pub fn new(output_dir: &Path, started_at: DateTime<Utc>, save_webcam_separate: bool) -> Self {
        let stamp = session_stamp(&started_at);
        Self {
            raw_path: output_dir.join(format!("recording_raw_{stamp}.mp4")),
            final_path: output_dir.join(format!("recording_{stamp}.mp4")),
            webcam_only_path: save_webcam_separate
                .then(|| output_dir.join(format!("webcam_only_{stamp}.mp4"))),
            concat_list_path: output_dir.join(format!("concat_list_{stamp}.txt")),
            started_at,
        }
    }

    pub fn stamp(&self) -> String {
        session_stamp(&self.started_at)
    }
}

/// `20240131_154500` style stamp used in every session file name.
pub fn session_stamp(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}

/// Removes `path`. A file that is already gone counts as removed.
pub fn safe_unlink(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Removes each path independently; failures are reported as warnings and do
/// not stop the remaining removals. Returns the number of failures.
pub fn remove_all(paths: &[&Path]) -> usize {
    let mut failures = 0;
    for path in paths {
        if let Err(e) = safe_unlink(path) {
            failures += 1;
            tracing::warn!("Cleanup warning for {}: {}", path.display(), e);
            eprintln!(
                "{}",
                console::style(format!("⚠️ Cleanup warning: {}: {e}", path.display())).yellow()
            );
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 15, 45, 0).unwrap()
    }

    #[test]
    fn test_paths_share_timestamp() {
        let session = RecordingSession::new(Path::new("public"), at(), true);
        assert_eq!(session.raw_path, PathBuf::from("public/recording_raw_20240131_154500.mp4"));
        assert_eq!(session.final_path, PathBuf::from("public/recording_20240131_154500.mp4"));
        assert_eq!(
            session.webcam_only_path,
            Some(PathBuf::from("public/webcam_only_20240131_154500.mp4"))
        );
        assert_eq!(session.stamp(), "20240131_154500");
    }

    #[test]
    fn test_no_webcam_path_unless_requested() {
        let session = RecordingSession::new(Path::new("public"), at(), false);
        assert!(session.webcam_only_path.is_none());
    }

    #[test]
    fn test_safe_unlink_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.mp4");
        assert!(safe_unlink(&path).is_ok());
        std::fs::write(&path, b"x").unwrap();
        safe_unlink(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_all_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("intro.mp4");
        std::fs::write(&file, b"x").unwrap();
        // A directory cannot be removed with remove_file.
        let failures = remove_all(&[dir.path(), &file]);
        assert_eq!(failures, 1);
        assert!(!file.exists());
    }
}
