use serde::{Deserialize, Serialize};

/// Spotify OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub scope: String,
}

/// Spotify user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Any catalog object, reduced to its id.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyObjectRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPage<T> {
    pub items: Vec<Option<T>>,
}

/// `GET /v1/search`. Only the key matching the requested type is present.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySearchResponse {
    pub tracks: Option<SpotifyPage<SpotifyObjectRef>>,
    pub albums: Option<SpotifyPage<SpotifyObjectRef>>,
    pub artists: Option<SpotifyPage<SpotifyObjectRef>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePlaylistRequest<'a> {
    pub name: &'a str,
    pub public: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdsRequest<'a> {
    pub ids: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct UrisRequest {
    pub uris: Vec<String>,
}

/// Error body returned by the Web API: `{"error": {"status": 400, "message": "..."}}`
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyErrorEnvelope {
    pub error: SpotifyErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyErrorBody {
    pub message: String,
}
