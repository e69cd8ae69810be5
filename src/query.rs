//! Staged search query planning.
//!
//! Builds the ordered list of catalog queries for one local record, grouped
//! into three escalating stages. A query string appears at most once across
//! the whole plan, so a later stage never repeats a call an earlier one made.

use rustc_hash::FxHashSet;

use crate::models::{QueryStage, SongInfo};
use crate::normalize::{collapse_whitespace, effective_title, greek_to_greeklish, split_artist_parts};

// ============================================================================
// Query Formatting
// ============================================================================

/// Strip double quotes (they would break phrase quoting) and collapse whitespace.
fn sanitize_field(field: &str) -> String {
    collapse_whitespace(&field.replace('"', " "))
}

/// Build one search query.
///
/// - title and artist: `track:"<title>" artist:"<artist>"`
/// - one field only: `"<field>"` (a bare phrase beats a lone field filter)
/// - neither: `None`
pub fn build_query(title: &str, artist: &str) -> Option<String> {
    let title = sanitize_field(title);
    let artist = sanitize_field(artist);
    match (title.is_empty(), artist.is_empty()) {
        (false, false) => Some(format!("track:\"{}\" artist:\"{}\"", title, artist)),
        (false, true) => Some(format!("\"{}\"", title)),
        (true, false) => Some(format!("\"{}\"", artist)),
        (true, true) => None,
    }
}

// ============================================================================
// Query Plan
// ============================================================================

/// Queries owned by one stage, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub struct StageQueries {
    pub stage: QueryStage,
    pub queries: Vec<String>,
}

/// The full, deduplicated query plan for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    stages: Vec<StageQueries>,
}

impl QueryPlan {
    /// All three stages in order. A stage may be empty when every query it
    /// would generate was already issued earlier.
    pub fn stages(&self) -> &[StageQueries] {
        &self.stages
    }

    pub fn stage(&self, stage: QueryStage) -> &[String] {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.queries.as_slice())
            .unwrap_or(&[])
    }

    /// Every query in issue order.
    pub fn all_queries(&self) -> Vec<&str> {
        self.stages
            .iter()
            .flat_map(|s| s.queries.iter().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stages.iter().map(|s| s.queries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accumulates stage queries, dropping empties and anything seen before.
struct PlanBuilder {
    seen: FxHashSet<String>,
    stages: Vec<StageQueries>,
}

impl PlanBuilder {
    fn new() -> Self {
        Self {
            seen: FxHashSet::default(),
            stages: Vec::with_capacity(QueryStage::ALL.len()),
        }
    }

    fn stage(&mut self, stage: QueryStage, candidates: impl IntoIterator<Item = Option<String>>) {
        let mut queries = Vec::new();
        for query in candidates.into_iter().flatten() {
            if self.seen.insert(query.clone()) {
                queries.push(query);
            }
        }
        self.stages.push(StageQueries { stage, queries });
    }

    fn finish(self) -> QueryPlan {
        QueryPlan {
            stages: self.stages,
        }
    }
}

/// Plan the staged queries for one local record.
///
/// Stage 1: cleaned title + artist.
/// Stage 2: cleaned title + primary artist (compound artists only), title
/// alone, artist alone.
/// Stage 3: Greeklish combinations, then the raw title and raw artist as
/// bare phrases.
pub fn plan_queries(song: &SongInfo) -> QueryPlan {
    let raw_title = collapse_whitespace(&song.title);
    let artist = collapse_whitespace(&song.artist);

    let title = effective_title(&raw_title);

    let parts = split_artist_parts(&artist);
    let primary = if parts.len() > 1 {
        parts.first().cloned()
    } else {
        None
    };

    let greek_title = greek_to_greeklish(&title);
    let greek_artist = greek_to_greeklish(&artist);

    let mut builder = PlanBuilder::new();

    builder.stage(QueryStage::HighPrecision, [build_query(&title, &artist)]);

    builder.stage(
        QueryStage::PrimaryAlternatives,
        [
            primary.and_then(|p| build_query(&title, &p)),
            build_query(&title, ""),
            build_query("", &artist),
        ],
    );

    builder.stage(
        QueryStage::Fallback,
        [
            build_query(&greek_title, &greek_artist),
            build_query(&greek_title, ""),
            build_query(&greek_title, &artist),
            build_query(&title, &greek_artist),
            build_query(&raw_title, ""),
            build_query("", &artist),
        ],
    );

    builder.finish()
}

// ============================================================================
// TESTS
// ============================================================================
