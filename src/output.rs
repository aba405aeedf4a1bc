//! Final file naming and placement.

use crate::config::VIDEO_EXTENSION;
use crate::error::Result;
use crate::prompt::PromptService;
use crate::recording::session::remove_all;
use std::path::{Path, PathBuf};

/// Trims `input` and accepts it if it is a bare `.mp4` file name.
pub fn validate_filename(input: &str) -> std::result::Result<String, &'static str> {
    let name = input.trim();
    if name.is_empty() {
        return Err("Filename cannot be empty");
    }
    if !name.to_lowercase().ends_with(VIDEO_EXTENSION) {
        return Err("Filename must end with .mp4");
    }
    if name.contains('/') || name.contains('\\') {
        return Err("Filename must not contain path separators");
    }
    Ok(name.to_string())
}

/// A file placed under its user-chosen name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedFile {
    pub file_name: String,
    pub path: PathBuf,
}

pub struct OutputNamer<'a, P> {
    prompt: &'a P,
    output_dir: &'a Path,
}

impl<'a, P: PromptService> OutputNamer<'a, P> {
    pub fn new(prompt: &'a P, output_dir: &'a Path) -> Self {
        Self { prompt, output_dir }
    }

    /// Names and places the session's videos.
    ///
    /// The main name is asked first; the separate webcam file, when it exists,
    /// is then named and placed; the merged video is placed last.
    pub fn place(&self, merged: &Path, webcam: Option<&Path>) -> Result<(PlacedFile, Option<PlacedFile>)> {
        let final_name = self.ask_name(
            "Enter a filename to save the video as (e.g. `mymodule.mp4`):",
            "mymodule.mp4",
            merged,
            &[],
        )?;

        let webcam_placed = match webcam.filter(|path| path.exists()) {
            Some(webcam_path) => {
                let webcam_name = self.ask_name(
                    "Enter a filename to save the webcam footage as (e.g. `mymodule_webcam.mp4`):",
                    "mymodule_webcam.mp4",
                    webcam_path,
                    &[final_name.as_str(), file_name_of(merged)],
                )?;
                let placed = self.place_file(webcam_path, &webcam_name)?;
                println!("{}", console::style("✅ Webcam video saved.").green());
                Some(placed)
            }
            None => None,
        };

        let placed = self.place_file(merged, &final_name)?;
        println!("{}", console::style("✅ Final recording saved.").green());
        Ok((placed, webcam_placed))
    }

    /// Asks for a name until it is valid, not in `reserved` and, if the target
    /// exists, overwriting it is confirmed.
    fn ask_name(&self, message: &str, placeholder: &str, source: &Path, reserved: &[&str]) -> Result<String> {
        loop {
            let name = self.prompt.input_text(message, placeholder, validate_filename)?;
            if reserved.iter().any(|taken| taken.eq_ignore_ascii_case(&name)) {
                println!(
                    "{}",
                    console::style(format!("{name} is already used by this session. Choose another name.")).yellow()
                );
                continue;
            }
            let destination = self.output_dir.join(&name);
            if destination.exists() && !same_file(&destination, source) {
                let overwrite = self
                    .prompt
                    .confirm(&format!("{name} already exists. Overwrite it?"), false)?;
                if !overwrite {
                    continue;
                }
            }
            return Ok(name);
        }
    }

    fn place_file(&self, source: &Path, name: &str) -> Result<PlacedFile> {
        let destination = self.output_dir.join(name);
        if same_file(&destination, source) {
            tracing::info!("{} already has its final name", source.display());
        } else {
            std::fs::copy(source, &destination)?;
            tracing::info!("Copied {} to {}", source.display(), destination.display());
            remove_all(&[source]);
        }
        Ok(PlacedFile {
            file_name: name.to_string(),
            path: destination,
        })
    }
}

fn file_name_of(path: &Path) -> &str {
    path.file_name().and_then(|name| name.to_str()).unwrap_or_default()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// HTML snippet for embedding the placed video in an MDX page.
pub fn embed_snippet(file_name: &str) -> String {
    format!(
        "<video width=\"100%\" controls>\n    <source src=\"/{file_name}\" type=\"video/mp4\" />\n    Your browser does not support the video tag.\n</video>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::testing::ScriptedPrompt;

    #[test]
    fn test_validate_filename() {
        assert_eq!(validate_filename("clip.mp4"), Ok("clip.mp4".to_string()));
        assert_eq!(validate_filename("clip"), Err("Filename must end with .mp4"));
        assert_eq!(validate_filename(""), Err("Filename cannot be empty"));
        assert_eq!(validate_filename("   "), Err("Filename cannot be empty"));
        assert_eq!(validate_filename("  clip.MP4  "), Ok("clip.MP4".to_string()));
        assert!(validate_filename("../clip.mp4").is_err());
    }

    fn session_files(dir: &Path, with_webcam: bool) -> (PathBuf, Option<PathBuf>) {
        let merged = dir.join("recording_20240101_120000.mp4");
        std::fs::write(&merged, b"merged").unwrap();
        let webcam = with_webcam.then(|| {
            let path = dir.join("webcam_only_20240101_120000.mp4");
            std::fs::write(&path, b"webcam").unwrap();
            path
        });
        (merged, webcam)
    }

    #[test]
    fn test_places_merged_file_and_removes_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let (merged, _) = session_files(dir.path(), false);
        let prompt = ScriptedPrompt::new().type_text("clip").type_text("  lesson.mp4 ");

        let (placed, webcam) = OutputNamer::new(&prompt, dir.path())
            .place(&merged, None)
            .unwrap();

        assert_eq!(placed.file_name, "lesson.mp4");
        assert_eq!(std::fs::read(dir.path().join("lesson.mp4")).unwrap(), b"merged");
        assert!(!merged.exists());
        assert!(webcam.is_none());
        assert_eq!(*prompt.rejections.borrow(), vec!["Filename must end with .mp4"]);
    }

    #[test]
    fn test_places_separate_webcam_file() {
        let dir = tempfile::tempdir().unwrap();
        let (merged, webcam) = session_files(dir.path(), true);
        let prompt = ScriptedPrompt::new()
            .type_text("lesson.mp4")
            .type_text("lesson_webcam.mp4");

        let (_, webcam_placed) = OutputNamer::new(&prompt, dir.path())
            .place(&merged, webcam.as_deref())
            .unwrap();

        let webcam_placed = webcam_placed.unwrap();
        assert_eq!(webcam_placed.file_name, "lesson_webcam.mp4");
        assert_eq!(std::fs::read(&webcam_placed.path).unwrap(), b"webcam");
        assert!(!webcam.unwrap().exists());
        assert!(dir.path().join("lesson.mp4").exists());
        assert_eq!(prompt.asked.borrow().len(), 2);
    }

    #[test]
    fn test_webcam_name_cannot_reuse_main_name() {
        let dir = tempfile::tempdir().unwrap();
        let (merged, webcam) = session_files(dir.path(), true);
        let prompt = ScriptedPrompt::new()
            .type_text("lesson.mp4")
            .type_text("LESSON.mp4")
            .type_text("recording_20240101_120000.mp4")
            .type_text("lesson_webcam.mp4");

        let (placed, webcam_placed) = OutputNamer::new(&prompt, dir.path())
            .place(&merged, webcam.as_deref())
            .unwrap();

        assert_eq!(webcam_placed.unwrap().file_name, "lesson_webcam.mp4");
        assert_eq!(std::fs::read(&placed.path).unwrap(), b"merged");
        assert_eq!(std::fs::read(dir.path().join("lesson_webcam.mp4")).unwrap(), b"webcam");
        assert_eq!(prompt.asked.borrow().len(), 4);
    }

    #[test]
    fn test_missing_webcam_file_is_not_prompted() {
        let dir = tempfile::tempdir().unwrap();
        let (merged, _) = session_files(dir.path(), false);
        let missing = dir.path().join("webcam_only_missing.mp4");
        let prompt = ScriptedPrompt::new().type_text("lesson.mp4");

        let (_, webcam_placed) = OutputNamer::new(&prompt, dir.path())
            .place(&merged, Some(&missing))
            .unwrap();

        assert!(webcam_placed.is_none());
        assert_eq!(prompt.asked.borrow().len(), 1);
    }

    #[test]
    fn test_existing_destination_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let (merged, _) = session_files(dir.path(), false);
        std::fs::write(dir.path().join("taken.mp4"), b"old").unwrap();
        let prompt = ScriptedPrompt::new()
            .type_text("taken.mp4")
            .answer(false)
            .type_text("fresh.mp4");

        let (placed, _) = OutputNamer::new(&prompt, dir.path())
            .place(&merged, None)
            .unwrap();

        assert_eq!(placed.file_name, "fresh.mp4");
        assert_eq!(std::fs::read(dir.path().join("taken.mp4")).unwrap(), b"old");
    }

    #[test]
    fn test_choosing_intermediate_name_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let (merged, _) = session_files(dir.path(), false);
        let prompt = ScriptedPrompt::new().type_text("recording_20240101_120000.mp4");

        let (placed, _) = OutputNamer::new(&prompt, dir.path())
            .place(&merged, None)
            .unwrap();

        assert!(merged.exists());
        assert_eq!(placed.path, dir.path().join("recording_20240101_120000.mp4"));
    }

    #[test]
    fn test_embed_snippet_references_public_path() {
        let snippet = embed_snippet("lesson.mp4");
        assert!(snippet.contains("src=\"/lesson.mp4\""));
        assert!(snippet.starts_with("<video"));
    }
}
