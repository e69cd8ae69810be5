//! Staged resolution of one local record to a catalog track.
//!
//! The resolver folds the planned stages over a best-so-far accumulator:
//! each query's candidates are scored, the accumulator keeps the single best
//! one, and a stage boundary either accepts it (score at or above the stage's
//! threshold) or escalates to the next stage. Failed searches count as empty
//! results and never abort a resolution.

use std::ops::ControlFlow;

use crate::config::ResolverConfig;
use crate::models::{
    CandidateTrack, MatchResult, NotFoundReason, Outcome, QueryStage, Resolution, SongInfo,
};
use crate::query::{plan_queries, StageQueries};
use crate::scoring::score_breakdown;
use crate::search::{SearchKind, TrackSearch};

// ============================================================================
// Accumulator
// ============================================================================

/// Best-so-far state for one resolution.
#[derive(Debug, Default)]
struct Accumulator {
    best: Option<MatchResult>,
    queries_issued: usize,
    failed_queries: usize,
    /// Stage of the most recently issued query
    last_stage: Option<QueryStage>,
}

impl Accumulator {
    fn best_score(&self) -> Option<f64> {
        self.best.as_ref().map(|m| m.score)
    }

    /// Keep the candidate only if it strictly beats the current best.
    fn observe(&mut self, candidate: CandidateTrack, score: f64) {
        if self.best_score().map_or(true, |best| score > best) {
            self.best = Some(MatchResult { candidate, score });
        }
    }

    fn meets(&self, threshold: f64) -> bool {
        self.best_score().is_some_and(|s| s >= threshold)
    }

    fn found(self, stage: QueryStage) -> Resolution {
        let queries_issued = self.queries_issued;
        let failed_queries = self.failed_queries;
        match self.best {
            Some(result) => Resolution {
                outcome: Outcome::Found { result, stage },
                queries_issued,
                failed_queries,
            },
            None => Self::not_found_with(None, queries_issued, failed_queries),
        }
    }

    fn not_found(self) -> Resolution {
        let best_score = self.best_score();
        Self::not_found_with(best_score, self.queries_issued, self.failed_queries)
    }

    fn not_found_with(best_score: Option<f64>, queries_issued: usize, failed_queries: usize) -> Resolution {
        Resolution {
            outcome: Outcome::NotFound(NotFoundReason::BelowThreshold { best_score }),
            queries_issued,
            failed_queries,
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Drives a [`TrackSearch`] through the staged query plan.
pub struct TrackResolver<S> {
    searcher: S,
    config: ResolverConfig,
}

impl<S: TrackSearch> TrackResolver<S> {
    pub fn new(searcher: S, config: ResolverConfig) -> Self {
        Self { searcher, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn searcher(&self) -> &S {
        &self.searcher
    }

    /// Resolve one local record.
    ///
    /// Returns `NotFound(NoTitle)` without any remote call when the title is
    /// blank. Otherwise the result is `Found` at the first stage whose
    /// threshold the best candidate meets, or `NotFound(BelowThreshold)`.
    pub fn resolve(&self, song: &SongInfo) -> Resolution {
        if song.title.trim().is_empty() {
            tracing::info!(file = %song.file_path, "no title, skipping catalog search");
            return Resolution {
                outcome: Outcome::NotFound(NotFoundReason::NoTitle),
                queries_issued: 0,
                failed_queries: 0,
            };
        }

        let plan = plan_queries(song);
        let flow = plan
            .stages()
            .iter()
            .try_fold(Accumulator::default(), |acc, stage| self.run_stage(song, stage, acc));

        let resolution = match flow {
            ControlFlow::Break(resolution) => resolution,
            ControlFlow::Continue(acc) => acc.not_found(),
        };
        log_resolution(song, &resolution);
        resolution
    }

    fn budget_spent(&self, acc: &Accumulator) -> bool {
        self.config
            .max_queries
            .is_some_and(|max| acc.queries_issued >= max)
    }

    /// Issue every query of one stage, then decide: accept, or escalate.
    fn run_stage(
        &self,
        song: &SongInfo,
        stage: &StageQueries,
        mut acc: Accumulator,
    ) -> ControlFlow<Resolution, Accumulator> {
        for query in &stage.queries {
            if self.budget_spent(&acc) {
                tracing::debug!(
                    file = %song.file_path,
                    budget = acc.queries_issued,
                    "query budget spent during {}",
                    stage.stage
                );
                let reached = acc.last_stage.unwrap_or(stage.stage);
                return ControlFlow::Break(if acc.meets(self.config.min_threshold) {
                    acc.found(reached)
                } else {
                    acc.not_found()
                });
            }
            self.run_query(song, stage.stage, query, &mut acc);
        }

        if acc.meets(self.config.threshold(stage.stage)) {
            ControlFlow::Break(acc.found(stage.stage))
        } else {
            ControlFlow::Continue(acc)
        }
    }

    fn run_query(&self, song: &SongInfo, stage: QueryStage, query: &str, acc: &mut Accumulator) {
        acc.queries_issued += 1;
        acc.last_stage = Some(stage);
        tracing::debug!(%stage, query, "catalog search");

        let candidates = match self
            .searcher
            .search(query, SearchKind::Track, self.config.result_limit)
        {
            Ok(candidates) => candidates,
            Err(e) => {
                acc.failed_queries += 1;
                tracing::warn!(query, error = %e, "catalog search failed, treating as no results");
                return;
            }
        };

        for candidate in candidates {
            let breakdown = score_breakdown(song, &candidate);
            tracing::trace!(
                candidate = %candidate.name,
                artist = %candidate.display_artist(),
                "{}",
                breakdown.summary()
            );
            acc.observe(candidate, breakdown.total);
        }
    }
}

fn log_resolution(song: &SongInfo, resolution: &Resolution) {
    match &resolution.outcome {
        Outcome::Found { result, stage } => tracing::info!(
            file = %song.file_path,
            score = result.score,
            queries = resolution.queries_issued,
            "found {} - {} at {}",
            result.candidate.name,
            result.candidate.display_artist(),
            stage
        ),
        Outcome::NotFound(reason) => tracing::info!(
            file = %song.file_path,
            queries = resolution.queries_issued,
            reason = reason.as_str(),
            "not found: {} - {}",
            song.display_title(),
            song.display_artist()
        ),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtistRef;
    use crate::search::SearchError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn track(id: &str, name: &str, artist: &str) -> CandidateTrack {
        CandidateTrack {
            id: id.to_string(),
            name: name.to_string(),
            artists: vec![ArtistRef {
                name: artist.to_string(),
            }],
            duration_ms: 0,
            uri: format!("spotify:track:{}", id),
        }
    }

    /// Answers from a fixed query → response table; unknown queries are empty.
    #[derive(Default)]
    struct Scripted {
        responses: HashMap<String, Result<Vec<CandidateTrack>, ()>>,
        calls: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn respond(mut self, query: &str, tracks: Vec<CandidateTrack>) -> Self {
            self.responses.insert(query.to_string(), Ok(tracks));
            self
        }

        fn fail(mut self, query: &str) -> Self {
            self.responses.insert(query.to_string(), Err(()));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl TrackSearch for Scripted {
        fn search(
            &self,
            query: &str,
            _kind: SearchKind,
            _limit: usize,
        ) -> Result<Vec<CandidateTrack>, SearchError> {
            self.calls.borrow_mut().push(query.to_string());
            match self.responses.get(query) {
                Some(Ok(tracks)) => Ok(tracks.clone()),
                Some(Err(())) => Err(SearchError::Transport("connection reset".to_string())),
                None => Ok(Vec::new()),
            }
        }
    }

    const STAGE1: &str = r#"track:"Song" artist:"Artist""#;
    const TITLE_ONLY: &str = r#""Song""#;
    const ARTIST_ONLY: &str = r#""Artist""#;

    #[test]
    fn test_stage1_hit_stops_escalation() {
        let search = Scripted::default().respond(STAGE1, vec![track("1", "Song", "Artist")]);
        let resolver = TrackResolver::new(&search, ResolverConfig::default());

        let resolution = resolver.resolve(&SongInfo::new("Song", "Artist"));

        assert_eq!(resolution.stage(), Some(QueryStage::HighPrecision));
        assert_eq!(resolution.queries_issued, 1);
        assert_eq!(search.calls(), vec![STAGE1]);
    }

    #[test]
    fn test_stage2_hit_after_stage1_miss() {
        let search = Scripted::default().respond(TITLE_ONLY, vec![track("2", "Song", "Artist")]);
        let resolver = TrackResolver::new(&search, ResolverConfig::default());

        let resolution = resolver.resolve(&SongInfo::new("Song", "Artist"));

        assert_eq!(resolution.stage(), Some(QueryStage::PrimaryAlternatives));
        // Stage 1 query plus both stage 2 queries
        assert_eq!(search.calls(), vec![STAGE1, TITLE_ONLY, ARTIST_ONLY]);
        assert_eq!(resolution.matched().unwrap().candidate.id, "2");
    }

    #[test]
    fn test_below_threshold_exhausts_all_stages() {
        let search = Scripted::default().respond(
            STAGE1,
            vec![track("1", "Something Else Entirely", "Other")],
        );
        let resolver = TrackResolver::new(&search, ResolverConfig::default());
        let song = SongInfo::new("Song (Official Video)", "Artist");

        let resolution = resolver.resolve(&song);

        assert!(!resolution.is_found());
        match resolution.not_found_reason() {
            Some(NotFoundReason::BelowThreshold { best_score }) => {
                assert!(best_score.unwrap() < 0.65)
            }
            other => panic!("unexpected reason {:?}", other),
        }
        assert_eq!(resolution.queries_issued, plan_queries(&song).len());
    }

    #[test]
    fn test_failed_queries_are_absorbed() {
        let search = Scripted::default()
            .fail(STAGE1)
            .fail(TITLE_ONLY)
            .respond(ARTIST_ONLY, vec![track("3", "Song", "Artist")]);
        let resolver = TrackResolver::new(&search, ResolverConfig::default());

        let resolution = resolver.resolve(&SongInfo::new("Song", "Artist"));

        assert_eq!(resolution.stage(), Some(QueryStage::PrimaryAlternatives));
        assert_eq!(resolution.failed_queries, 2);
        assert_eq!(resolution.queries_issued, 3);
    }

    #[test]
    fn test_no_title_makes_no_calls() {
        let search = Scripted::default();
        let resolver = TrackResolver::new(&search, ResolverConfig::default());

        let resolution = resolver.resolve(&SongInfo::new("   ", "Anyone"));

        assert_eq!(resolution.not_found_reason(), Some(&NotFoundReason::NoTitle));
        assert_eq!(resolution.queries_issued, 0);
        assert!(search.calls().is_empty());
    }

    #[test]
    fn test_equal_score_keeps_first_candidate() {
        let search = Scripted::default().respond(
            STAGE1,
            vec![track("first", "Song", "Artist"), track("second", "Song", "Artist")],
        );
        let resolver = TrackResolver::new(&search, ResolverConfig::default());

        let resolution = resolver.resolve(&SongInfo::new("Song", "Artist"));

        assert_eq!(resolution.matched().unwrap().candidate.id, "first");
    }

    #[test]
    fn test_budget_caps_remote_calls() {
        let search = Scripted::default();
        let config = ResolverConfig {
            max_queries: Some(2),
            ..ResolverConfig::default()
        };
        let resolver = TrackResolver::new(&search, config);

        let resolution = resolver.resolve(&SongInfo::new("Song (Official Video)", "Artist"));

        assert_eq!(resolution.queries_issued, 2);
        assert_eq!(search.calls().len(), 2);
        assert!(!resolution.is_found());
    }

    #[test]
    fn test_budget_spent_still_accepts_min_threshold() {
        // Title matches, artist does not: 0.6 score, above a 0.55 minimum
        let search = Scripted::default().respond(STAGE1, vec![track("1", "Song", "Nobody")]);
        let config = ResolverConfig {
            max_queries: Some(1),
            min_threshold: 0.55,
            ..ResolverConfig::default()
        };
        let resolver = TrackResolver::new(&search, config);

        let resolution = resolver.resolve(&SongInfo::new("Song", "Artist"));

        // Credited to the stage that issued the last query, not the next one
        assert_eq!(resolution.stage(), Some(QueryStage::HighPrecision));
        assert_eq!(resolution.queries_issued, 1);
    }

    #[test]
    fn test_budget_spent_mid_stage_reports_that_stage() {
        let search = Scripted::default().respond(TITLE_ONLY, vec![track("1", "Song", "Nobody")]);
        let config = ResolverConfig {
            max_queries: Some(2),
            min_threshold: 0.55,
            ..ResolverConfig::default()
        };
        let resolver = TrackResolver::new(&search, config);

        let resolution = resolver.resolve(&SongInfo::new("Song", "Artist"));

        assert_eq!(search.calls(), vec![STAGE1, TITLE_ONLY]);
        assert_eq!(resolution.stage(), Some(QueryStage::PrimaryAlternatives));
    }

    #[test]
    fn test_noise_only_title_can_be_accepted() {
        let query = r#"track:"HD" artist:"Artist""#;
        let search = Scripted::default().respond(query, vec![track("hd", "HD", "Artist")]);
        let resolver = TrackResolver::new(&search, ResolverConfig::default());

        let resolution = resolver.resolve(&SongInfo::new("HD", "Artist"));

        assert_eq!(resolution.stage(), Some(QueryStage::HighPrecision));
        assert_eq!(resolution.matched().unwrap().candidate.id, "hd");
        assert_eq!(search.calls(), vec![query]);
    }

    #[test]
    fn test_custom_thresholds_change_exit_stage() {
        let search = Scripted::default().respond(STAGE1, vec![track("1", "Song", "Nobody")]);
        let config = ResolverConfig {
            stage1_threshold: 0.5,
            ..ResolverConfig::default()
        };
        let resolver = TrackResolver::new(&search, config);

        let resolution = resolver.resolve(&SongInfo::new("Song", "Artist"));

        assert_eq!(resolution.stage(), Some(QueryStage::HighPrecision));
        assert!((resolution.matched().unwrap().score - 0.6).abs() < 1e-9);
    }
}
