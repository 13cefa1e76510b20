//! Frame-set resolution
//!
//! A clip's frames live flat in one folder, named so that lexicographic
//! order equals temporal order (zero-padded sequence numbers upstream).

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Image extensions recognized as frames, matched case-insensitively
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// List a clip's frame files in lexicographic order.
///
/// Scans only the immediate directory, never subdirectories. A missing or
/// unreadable directory, or one holding no matching images, yields an empty
/// vec; the caller treats that as a skip condition, not an error.
pub fn list_frames(dir: &Path) -> Vec<PathBuf> {
    let mut frames: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_frame_file(path))
        .collect();

    frames.sort();
    frames
}

/// Whether a path carries one of the recognized image extensions
fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }

    #[test]
    fn test_frames_sorted_lexicographically() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "000010.png");
        touch(&dir, "000002.png");
        touch(&dir, "000001.png");

        let names: Vec<String> = list_frames(dir.path())
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["000001.png", "000002.png", "000010.png"]);
    }

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "a.PNG");
        touch(&dir, "b.Jpg");
        touch(&dir, "c.jpeg");
        touch(&dir, "notes.txt");
        touch(&dir, "noext");

        assert_eq!(list_frames(dir.path()).len(), 3);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        assert!(list_frames(Path::new("/nonexistent/frames")).is_empty());
    }

    #[test]
    fn test_empty_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(list_frames(dir.path()).is_empty());
    }

    #[test]
    fn test_subdirectories_are_not_scanned() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("zz.png"), b"x").unwrap();
        touch(&dir, "a.png");

        assert_eq!(list_frames(dir.path()).len(), 1);
    }
}
