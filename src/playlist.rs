//! Resolution report and playlist publishing.
//!
//! The report collects one entry per scanned file. Found entries carry the
//! catalog URI and display fields; not-found entries keep the original
//! [`SongInfo`] so the summary can list them. Publishing goes through the
//! [`PlaylistWriter`] trait and never writes in dry-run mode.

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use rustc_hash::FxHashSet;

use crate::models::{NotFoundReason, Outcome, Resolution, SongInfo};
use crate::search::SearchError;

/// Catalog limit on URIs per add-tracks request
pub const MAX_TRACKS_PER_REQUEST: usize = 100;

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("playlist request failed: {0}")]
    Request(#[from] SearchError),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),
}

/// Write access to the user's playlists.
pub trait PlaylistWriter {
    /// Create a playlist and return its catalog ID.
    fn create_playlist(&self, name: &str, public: bool, description: &str)
        -> Result<String, PlaylistError>;

    /// Append tracks. Implementations must respect [`MAX_TRACKS_PER_REQUEST`].
    fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), PlaylistError>;
}

/// Split URIs into request-sized chunks.
pub fn uri_chunks(uris: &[String]) -> impl Iterator<Item = &[String]> {
    uris.chunks(MAX_TRACKS_PER_REQUEST)
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTrack {
    pub uri: String,
    pub display_name: String,
    pub display_artist: String,
    pub score: f64,
    pub stage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportEntry {
    Found {
        file_path: String,
        track: ResolvedTrack,
    },
    NotFound {
        song: SongInfo,
        reason: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        best_score: Option<f64>,
    },
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ResolutionReport {
    pub entries: Vec<ReportEntry>,
}

impl ResolutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, song: &SongInfo, resolution: &Resolution) {
        let entry = match &resolution.outcome {
            Outcome::Found { result, stage } => ReportEntry::Found {
                file_path: song.file_path.clone(),
                track: ResolvedTrack {
                    uri: result.candidate.uri.clone(),
                    display_name: result.candidate.name.clone(),
                    display_artist: result.candidate.display_artist(),
                    score: result.score,
                    stage: stage.number(),
                },
            },
            Outcome::NotFound(reason) => ReportEntry::NotFound {
                song: song.clone(),
                reason: reason.as_str(),
                best_score: match reason {
                    NotFoundReason::BelowThreshold { best_score } => *best_score,
                    NotFoundReason::NoTitle => None,
                },
            },
        };
        self.entries.push(entry);
    }

    pub fn found(&self) -> impl Iterator<Item = &ResolvedTrack> {
        self.entries.iter().filter_map(|e| match e {
            ReportEntry::Found { track, .. } => Some(track),
            ReportEntry::NotFound { .. } => None,
        })
    }

    pub fn not_found(&self) -> impl Iterator<Item = &SongInfo> {
        self.entries.iter().filter_map(|e| match e {
            ReportEntry::NotFound { song, .. } => Some(song),
            ReportEntry::Found { .. } => None,
        })
    }

    pub fn found_count(&self) -> usize {
        self.found().count()
    }

    pub fn not_found_count(&self) -> usize {
        self.not_found().count()
    }

    /// URIs to publish, in scan order, each at most once.
    pub fn playlist_uris(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        self.found()
            .filter(|t| seen.insert(t.uri.as_str()))
            .map(|t| t.uri.clone())
            .collect()
    }

    pub fn print_summary(&self) {
        println!("\n--- Summary ---");
        println!("Found {} tracks on Spotify.", self.found_count());
        println!(
            "{} tracks not found or below confidence threshold.",
            self.not_found_count()
        );
        if self.not_found_count() > 0 {
            println!("\nTracks not found:");
            for song in self.not_found() {
                println!("  - {} - {}", song.display_title(), song.display_artist());
            }
        }
    }

    /// Write the report as JSON
    pub fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

// ============================================================================
// Publishing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    DryRun,
    NothingToAdd,
    Created { playlist_id: String, tracks: usize },
}

/// Create the playlist and add every found track, unless `dry_run`.
pub fn publish<W: PlaylistWriter + ?Sized>(
    writer: &W,
    name: &str,
    public: bool,
    report: &ResolutionReport,
    dry_run: bool,
) -> Result<PublishOutcome, PlaylistError> {
    if dry_run {
        return Ok(PublishOutcome::DryRun);
    }
    let uris = report.playlist_uris();
    if uris.is_empty() {
        return Ok(PublishOutcome::NothingToAdd);
    }

    let playlist_id = writer.create_playlist(name, public, "")?;
    tracing::info!("created playlist '{}' ({})", name, playlist_id);
    writer.add_tracks(&playlist_id, &uris)?;
    tracing::info!("added {} tracks to playlist {}", uris.len(), playlist_id);

    Ok(PublishOutcome::Created {
        playlist_id,
        tracks: uris.len(),
    })
}
