//! Scoring functions for catalog matching.
//!
//! This module contains all scoring-related functions including:
//! - Title similarity (with Greeklish fallback)
//! - Artist part matching
//! - Duration bonus
//! - Combined weighted score in [0, 1]

use strsim::normalized_levenshtein;

use crate::models::{CandidateTrack, SongInfo};
use crate::normalize::{effective_title, greek_to_greeklish, split_artist_parts};

// ============================================================================
// Weights
// ============================================================================

/// Weight of the title term
pub const TITLE_WEIGHT: f64 = 0.6;

/// Weight of the artist term
pub const ARTIST_WEIGHT: f64 = 0.4;

/// Flat bonus when both durations are known and close
pub const DURATION_BONUS: f64 = 0.1;

/// Durations closer than this earn the bonus
pub const DURATION_TOLERANCE_MS: u64 = 5_000;

/// Minimum normalized Levenshtein similarity for a fuzzy artist part match
pub const ARTIST_PART_SIMILARITY: f64 = 0.8;

// ============================================================================
// Score Breakdown
// ============================================================================

/// How each term contributed to a candidate's score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreBreakdown {
    /// Weighted title term, in [0, TITLE_WEIGHT]
    pub title: f64,
    /// Weighted artist term, in [0, ARTIST_WEIGHT]
    pub artist: f64,
    /// Duration bonus, 0 or DURATION_BONUS
    pub duration: f64,
    /// Sum of the terms, clamped to [0, 1]
    pub total: f64,
}

impl ScoreBreakdown {
    /// Human-readable summary for debug logs
    pub fn summary(&self) -> String {
        format!(
            "total:{:.3} [title:{:.3}, artist:{:.3}, duration:{:.1}]",
            self.total, self.title, self.artist, self.duration
        )
    }
}

// ============================================================================
// Title Similarity
// ============================================================================

/// Similarity between a local title and a catalog track name (0.0 to 1.0).
///
/// The local title is cleaned (falling back to the raw title when cleaning
/// empties it, as the query planner does) and lower-cased; when it is written
/// in Greek its Greeklish form is compared too and the better ratio wins, since
/// the catalog often indexes Greek releases under Latin names.
pub fn title_similarity(local_title: &str, candidate_name: &str) -> f64 {
    let local = effective_title(local_title).to_lowercase();
    let remote = candidate_name.to_lowercase();

    let direct = normalized_levenshtein(&local, &remote);
    let greeklish = greek_to_greeklish(&local);
    if greeklish == local {
        return direct;
    }
    direct.max(normalized_levenshtein(&greeklish.to_lowercase(), &remote))
}

// ============================================================================
// Artist Matching
// ============================================================================

/// Whether one local artist part matches any of the candidate's artist names.
///
/// A part matches when it, or its Greeklish form, is a substring of a
/// candidate name, or is at least `ARTIST_PART_SIMILARITY` similar to one.
/// `candidate_names` must already be lower-cased.
pub fn artist_part_matches(part: &str, candidate_names: &[String]) -> bool {
    let part_lower = part.to_lowercase();
    let part_greeklish = greek_to_greeklish(&part_lower).to_lowercase();

    candidate_names.iter().any(|name| {
        [&part_lower, &part_greeklish].iter().any(|form| {
            name.contains(form.as_str())
                || normalized_levenshtein(form, name) >= ARTIST_PART_SIMILARITY
        })
    })
}

/// Weighted artist term (0.0 to ARTIST_WEIGHT).
///
/// - both sides credited: fraction of local parts matching a candidate artist
/// - neither side credited: full weight (no evidence of mismatch)
/// - exactly one side credited: zero
pub fn artist_score(local_artist: &str, candidate: &CandidateTrack) -> f64 {
    let local_parts = split_artist_parts(local_artist);
    let candidate_names: Vec<String> = candidate
        .artists
        .iter()
        .map(|a| a.name.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();

    match (local_parts.is_empty(), candidate_names.is_empty()) {
        (true, true) => ARTIST_WEIGHT,
        (false, false) => {
            let matched = local_parts
                .iter()
                .filter(|part| artist_part_matches(part, &candidate_names))
                .count();
            ARTIST_WEIGHT * matched as f64 / local_parts.len() as f64
        }
        _ => 0.0,
    }
}

// ============================================================================
// Duration
// ============================================================================

/// Flat bonus when both durations are known and differ by less than 5s.
/// A candidate duration of 0 counts as unknown.
pub fn duration_bonus(local_ms: Option<u64>, candidate_ms: u64) -> f64 {
    match local_ms {
        Some(local) if local > 0 && candidate_ms > 0 => {
            if local.abs_diff(candidate_ms) < DURATION_TOLERANCE_MS {
                DURATION_BONUS
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

// ============================================================================
// Combined Scoring
// ============================================================================

/// Score a candidate against a local record, with the per-term breakdown.
pub fn score_breakdown(local: &SongInfo, candidate: &CandidateTrack) -> ScoreBreakdown {
    let title = TITLE_WEIGHT * title_similarity(&local.title, &candidate.name);
    let artist = artist_score(&local.artist, candidate);
    let duration = duration_bonus(local.duration_ms, candidate.duration_ms);

    // The duration bonus can push the sum past 1.0; scores are clamped so
    // thresholds keep a fixed scale.
    let total = (title + artist + duration).clamp(0.0, 1.0);

    ScoreBreakdown {
        title,
        artist,
        duration,
        total,
    }
}

/// Similarity score in [0, 1] between a local record and one candidate.
pub fn score(local: &SongInfo, candidate: &CandidateTrack) -> f64 {
    score_breakdown(local, candidate).total
}

// ============================================================================
// TESTS
// ============================================================================
