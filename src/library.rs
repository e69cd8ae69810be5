//! Local library scan.
//!
//! Walks a folder for audio files and reads their tags into [`SongInfo`].
//! Untagged or unreadable files still yield a record whose title is the
//! filename stem, so every audio file gets a resolution attempt.

use std::path::{Path, PathBuf};

use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use thiserror::Error;
use walkdir::WalkDir;

use crate::models::SongInfo;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("directory not found: {0}")]
    NotADirectory(String),
}

/// Whether `path` has one of `extensions` (lower-case, without the dot).
pub fn is_audio_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| extensions.iter().any(|x| *x == e))
}

/// All audio files below `folder`, recursively, sorted by path.
///
/// Entries that cannot be read (permissions, broken links) are logged and
/// skipped.
pub fn find_audio_files(folder: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, LibraryError> {
    if !folder.is_dir() {
        return Err(LibraryError::NotADirectory(folder.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(folder).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() && is_audio_file(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Read one file's metadata.
///
/// Defaults: title = filename stem, artist = "", no album, no duration.
/// Tag read failures are logged at `warn` and leave the defaults in place.
pub fn read_song_info(path: &Path) -> SongInfo {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut song = SongInfo::new(stem, "").with_file_path(path.display().to_string());

    let tagged_file = match lofty::read_from_path(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("error reading metadata from {}: {}", path.display(), e);
            return song;
        }
    };

    let duration_ms = tagged_file.properties().duration().as_millis();
    if duration_ms > 0 {
        song.duration_ms = Some(duration_ms.min(u128::from(u64::MAX)) as u64);
    }

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        if let Some(title) = non_empty(tag.get_string(&ItemKey::TrackTitle)) {
            song.title = title;
        }
        let artist = non_empty(tag.get_string(&ItemKey::TrackArtist))
            .or_else(|| non_empty(tag.get_string(&ItemKey::AlbumArtist)));
        if let Some(artist) = artist {
            song.artist = artist;
        }
        song.album = non_empty(tag.get_string(&ItemKey::AlbumTitle));
    }

    song
}

/// Scan `folder` and read every audio file found.
pub fn scan_library(folder: &Path, extensions: &[String]) -> Result<Vec<SongInfo>, LibraryError> {
    let files = find_audio_files(folder, extensions)?;
    tracing::info!("found {} audio files in {}", files.len(), folder.display());
    Ok(files.iter().map(|p| read_song_info(p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_AUDIO_EXTENSIONS;
    use std::fs;

    fn extensions() -> Vec<String> {
        DEFAULT_AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_is_audio_file_case_insensitive() {
        let exts = extensions();
        assert!(is_audio_file(Path::new("/m/song.MP3"), &exts));
        assert!(is_audio_file(Path::new("/m/song.flac"), &exts));
        assert!(is_audio_file(Path::new("/m/song.mp+"), &exts));
        assert!(!is_audio_file(Path::new("/m/cover.jpg"), &exts));
        assert!(!is_audio_file(Path::new("/m/README"), &exts));
    }

    #[test]
    fn test_find_audio_files_recursive_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("Album");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("b.mp3"), b"").unwrap();
        fs::write(sub.join("a.flac"), b"").unwrap();
        fs::write(sub.join("cover.jpg"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let files = find_audio_files(dir.path(), &extensions()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.flac", "b.mp3"]);
    }

    #[test]
    fn test_find_audio_files_rejects_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            find_audio_files(&missing, &extensions()),
            Err(LibraryError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_unreadable_tags_fall_back_to_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Μια Αγάπη.mp3");
        fs::write(&path, b"definitely not an mpeg stream").unwrap();

        let song = read_song_info(&path);
        assert_eq!(song.title, "Μια Αγάπη");
        assert_eq!(song.artist, "");
        assert_eq!(song.album, None);
        assert_eq!(song.duration_ms, None);
        assert_eq!(song.file_path, path.display().to_string());
    }

    #[test]
    fn test_scan_library_reads_every_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.mp3"), b"x").unwrap();
        fs::write(dir.path().join("two.ogg"), b"y").unwrap();

        let songs = scan_library(dir.path(), &extensions()).unwrap();
        let titles: Vec<_> = songs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two"]);
    }
}
