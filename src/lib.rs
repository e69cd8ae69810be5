//! playlist-resolve library - track resolution engine and its collaborators.
//!
//! Local audio files are matched to Spotify catalog tracks through staged,
//! budgeted free-text searches scored against the local tags.

pub mod config;
pub mod library;
pub mod models;
pub mod normalize;
pub mod playlist;
pub mod progress;
pub mod query;
pub mod resolver;
pub mod scoring;
pub mod search;
pub mod spotify;

pub use config::{AppConfig, ResolverConfig};
pub use models::{CandidateTrack, NotFoundReason, Outcome, QueryStage, Resolution, SongInfo};
pub use resolver::TrackResolver;
pub use search::{SearchError, SearchKind, TrackSearch};
