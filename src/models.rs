//! Core data models for track resolution.
//!
//! This module contains the local and remote track records, the per-file
//! resolution outcome, and the run statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Local Models
// ============================================================================

/// Metadata read from one local audio file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongInfo {
    pub title: String,  // Tag title, or the filename stem when untagged
    pub artist: String, // Empty when untagged
    pub album: Option<String>,
    pub duration_ms: Option<u64>,
    pub file_path: String,
}

impl SongInfo {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_ms: None,
            file_path: String::new(),
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = file_path.into();
        self
    }

    /// Title for display, falling back to the file path.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.file_path
        } else {
            &self.title
        }
    }

    /// Artist for display, "Unknown Artist" when untagged.
    pub fn display_artist(&self) -> &str {
        if self.artist.is_empty() {
            "Unknown Artist"
        } else {
            &self.artist
        }
    }
}

// ============================================================================
// Catalog Models
// ============================================================================

/// Artist credit as returned by the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

/// Track returned by a catalog search, kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrack {
    pub id: String,             // Catalog track ID (e.g., "2takcwOaAZWiXQijPHIx7B")
    pub name: String,           // Canonical track name
    pub artists: Vec<ArtistRef>, // All credited artists in credited order
    pub duration_ms: u64,
    pub uri: String, // e.g., "spotify:track:2takcwOaAZWiXQijPHIx7B"
}

impl CandidateTrack {
    /// Credited artist names joined for display: "Artist1, Artist2"
    pub fn display_artist(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A scored candidate. Only the best one per resolution is kept.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    pub candidate: CandidateTrack,
    pub score: f64,
}

// ============================================================================
// Query Stages
// ============================================================================

/// Search escalation stage. Ordered: earlier stages are more precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryStage {
    /// Cleaned title + artist, field-qualified
    HighPrecision,
    /// Title-only / artist-only / primary-artist alternatives
    PrimaryAlternatives,
    /// Greeklish variants and raw quoted-phrase fallbacks
    Fallback,
}

impl QueryStage {
    pub const ALL: [QueryStage; 3] = [
        QueryStage::HighPrecision,
        QueryStage::PrimaryAlternatives,
        QueryStage::Fallback,
    ];

    /// 1-based stage number used in logs and reports.
    pub fn number(self) -> u8 {
        match self {
            QueryStage::HighPrecision => 1,
            QueryStage::PrimaryAlternatives => 2,
            QueryStage::Fallback => 3,
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}", self.number())
    }
}

// ============================================================================
// Resolution Outcome
// ============================================================================

/// Why a file could not be resolved.
#[derive(Clone, Debug, PartialEq)]
pub enum NotFoundReason {
    /// Local record has no usable title; no remote call was made
    NoTitle,
    /// All stages exhausted (or budget spent) without reaching the minimum score
    BelowThreshold { best_score: Option<f64> },
}

impl NotFoundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotFoundReason::NoTitle => "no_title",
            NotFoundReason::BelowThreshold { .. } => "below_threshold",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Found { result: MatchResult, stage: QueryStage },
    NotFound(NotFoundReason),
}

/// Result of resolving one local file.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub outcome: Outcome,
    /// Remote search calls issued, including failed ones
    pub queries_issued: usize,
    /// Remote search calls that failed and were treated as empty
    pub failed_queries: usize,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, Outcome::Found { .. })
    }

    pub fn matched(&self) -> Option<&MatchResult> {
        match &self.outcome {
            Outcome::Found { result, .. } => Some(result),
            Outcome::NotFound(_) => None,
        }
    }

    pub fn stage(&self) -> Option<QueryStage> {
        match &self.outcome {
            Outcome::Found { stage, .. } => Some(*stage),
            Outcome::NotFound(_) => None,
        }
    }

    pub fn not_found_reason(&self) -> Option<&NotFoundReason> {
        match &self.outcome {
            Outcome::Found { .. } => None,
            Outcome::NotFound(reason) => Some(reason),
        }
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run resolution statistics.
/// Tracks which stage resolved each file and how many remote calls were spent.
#[derive(Default, Debug, Clone, Serialize)]
pub struct ResolutionStats {
    pub total_files: usize,

    // Found, by stage
    pub found_stage1: usize,
    pub found_stage2: usize,
    pub found_stage3: usize,

    // Not found, by reason
    pub not_found_no_title: usize,
    pub not_found_below_threshold: usize,

    // Remote calls
    pub queries_issued: usize,
    pub failed_queries: usize,

    // Timing
    pub elapsed_seconds: f64,
}

impl ResolutionStats {
    /// Fold one resolution into the counters.
    pub fn record(&mut self, resolution: &Resolution) {
        self.total_files += 1;
        self.queries_issued += resolution.queries_issued;
        self.failed_queries += resolution.failed_queries;
        match &resolution.outcome {
            Outcome::Found { stage, .. } => match stage {
                QueryStage::HighPrecision => self.found_stage1 += 1,
                QueryStage::PrimaryAlternatives => self.found_stage2 += 1,
                QueryStage::Fallback => self.found_stage3 += 1,
            },
            Outcome::NotFound(NotFoundReason::NoTitle) => self.not_found_no_title += 1,
            Outcome::NotFound(NotFoundReason::BelowThreshold { .. }) => {
                self.not_found_below_threshold += 1
            }
        }
    }

    pub fn total_found(&self) -> usize {
        self.found_stage1 + self.found_stage2 + self.found_stage3
    }

    pub fn total_not_found(&self) -> usize {
        self.not_found_no_title + self.not_found_below_threshold
    }

    /// Calculate match rate as a percentage
    pub fn match_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            100.0 * self.total_found() as f64 / self.total_files as f64
        }
    }

    /// Average remote calls per file
    pub fn queries_per_file(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            self.queries_issued as f64 / self.total_files as f64
        }
    }

    /// Log stats in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            tracing::info!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
