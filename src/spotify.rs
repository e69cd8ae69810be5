//! Spotify Web API client.
//!
//! Thin blocking client over `ureq`: track search for the resolver and
//! playlist creation for the writer. Authentication is an already-issued
//! OAuth bearer token; acquiring or refreshing one is out of scope.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::models::CandidateTrack;
use crate::playlist::{uri_chunks, PlaylistError, PlaylistWriter};
use crate::search::{SearchError, SearchKind, TrackSearch};

const USER_AGENT: &str = concat!("playlist-resolve/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    // The API occasionally returns null entries
    #[serde(default)]
    items: Vec<Option<CandidateTrack>>,
}

impl SearchResponse {
    fn into_tracks(self) -> Vec<CandidateTrack> {
        self.tracks
            .map(|page| page.items.into_iter().flatten().collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct IdObject {
    id: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct SpotifyClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl SpotifyClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(20))
                .user_agent(USER_AGENT)
                .build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, SearchError> {
        let mut req = self
            .agent
            .get(&self.url(path))
            .set("Authorization", &self.authorization());
        for &(k, v) in params {
            req = req.query(k, v);
        }
        let resp = req.call().map_err(request_error)?;
        resp.into_json().map_err(|e| SearchError::Decode(e.to_string()))
    }

    fn post_json<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T, SearchError> {
        let resp = self
            .agent
            .post(&self.url(path))
            .set("Authorization", &self.authorization())
            .send_json(body)
            .map_err(request_error)?;
        resp.into_json().map_err(|e| SearchError::Decode(e.to_string()))
    }

    /// ID of the user the token belongs to.
    pub fn current_user_id(&self) -> Result<String, PlaylistError> {
        let me: IdObject = self.get_json("me", &[])?;
        me.id.ok_or(PlaylistError::MissingField("id"))
    }
}

fn request_error(err: ureq::Error) -> SearchError {
    match err {
        ureq::Error::Status(status, resp) => SearchError::Status {
            status,
            body: resp.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(t) => SearchError::Transport(t.to_string()),
    }
}

impl TrackSearch for SpotifyClient {
    fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: usize,
    ) -> Result<Vec<CandidateTrack>, SearchError> {
        let limit = limit.to_string();
        let resp: SearchResponse = self.get_json(
            "search",
            &[("q", query), ("type", kind.as_str()), ("limit", limit.as_str())],
        )?;
        Ok(resp.into_tracks())
    }
}

impl PlaylistWriter for SpotifyClient {
    fn create_playlist(&self, name: &str, public: bool, description: &str) -> Result<String, PlaylistError> {
        let user_id = self.current_user_id()?;
        let playlist: IdObject = self.post_json(
            &format!("users/{}/playlists", user_id),
            json!({
                "name": name,
                "public": public,
                "description": description,
            }),
        )?;
        playlist.id.ok_or(PlaylistError::MissingField("id"))
    }

    fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), PlaylistError> {
        for chunk in uri_chunks(uris) {
            let _: serde_json::Value = self.post_json(
                &format!("playlists/{}/tracks", playlist_id),
                json!({ "uris": chunk }),
            )?;
            tracing::debug!("added {} tracks to {}", chunk.len(), playlist_id);
        }
        Ok(())
    }
}
