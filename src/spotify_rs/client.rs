use std::time::Duration;

use reqwest::StatusCode;

use crate::ports::destination::{DestinationService, SearchType, ServiceError};
use crate::spotify_rs::types::{
    CreatePlaylistRequest, IdsRequest, SpotifyErrorEnvelope, SpotifyObjectRef,
    SpotifySearchResponse, SpotifyUser, UrisRequest,
};

const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const SEARCH_LIMIT: u32 = 10;

/// Spotify API client
pub struct SpotifyClient {
    access_token: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl SpotifyClient {
    pub fn new(access_token: String, timeout: Duration) -> Self {
        Self {
            access_token,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ServiceError> {
        let response = request
            .bearer_auth(&self.access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        Err(classify_failure(status, retry_after.as_deref(), &body))
    }

    async fn json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ServiceError> {
        self.send(request).await?.json().await.map_err(decode_error)
    }
}

fn send_error(error: reqwest::Error) -> ServiceError {
    if error.is_timeout() {
        ServiceError::Timeout
    } else {
        ServiceError::Request(error)
    }
}

fn decode_error(error: reqwest::Error) -> ServiceError {
    if error.is_timeout() {
        ServiceError::Timeout
    } else {
        ServiceError::Decode(error)
    }
}

/// Seconds to wait from a `Retry-After` header. Missing or unparsable values mean one second.
fn parse_retry_after(value: Option<&str>) -> u64 {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(1)
}

fn classify_failure(status: StatusCode, retry_after: Option<&str>, body: &str) -> ServiceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ServiceError::RateLimited {
            retry_after_secs: parse_retry_after(retry_after),
        };
    }

    let message = match serde_json::from_str::<SpotifyErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        Err(_) => body.to_string(),
    };

    ServiceError::Api {
        status: status.as_u16(),
        message,
    }
}

fn track_uri(id: &str) -> String {
    format!("spotify:track:{}", id)
}

fn search_hits(response: SpotifySearchResponse, kind: SearchType) -> Vec<String> {
    let page = match kind {
        SearchType::Track => response.tracks,
        SearchType::Album => response.albums,
        SearchType::Artist => response.artists,
    };

    page.map(|page| {
        page.items
            .into_iter()
            .flatten()
            .map(|SpotifyObjectRef { id }| id)
            .collect()
    })
    .unwrap_or_default()
}

#[async_trait::async_trait]
impl DestinationService for SpotifyClient {
    async fn current_user(&self) -> Result<String, ServiceError> {
        let user: SpotifyUser = self
            .json(self.client.get(format!("{}/me", SPOTIFY_API_URL)))
            .await?;
        Ok(user.id)
    }

    async fn search(&self, query: &str, kind: SearchType) -> Result<Vec<String>, ServiceError> {
        let url = format!(
            "{}/search?q={}&type={}&limit={}",
            SPOTIFY_API_URL,
            urlencoding::encode(query),
            kind,
            SEARCH_LIMIT
        );
        let response: SpotifySearchResponse = self.json(self.client.get(url)).await?;
        Ok(search_hits(response, kind))
    }

    async fn create_playlist(&self, user_id: &str, title: &str) -> Result<String, ServiceError> {
        let url = format!(
            "{}/users/{}/playlists",
            SPOTIFY_API_URL,
            urlencoding::encode(user_id)
        );
        let created: SpotifyObjectRef = self
            .json(self.client.post(url).json(&CreatePlaylistRequest {
                name: title,
                public: true,
            }))
            .await?;
        Ok(created.id)
    }

    async fn add_library_tracks(&self, ids: &[String]) -> Result<(), ServiceError> {
        self.send(
            self.client
                .put(format!("{}/me/tracks", SPOTIFY_API_URL))
                .json(&IdsRequest { ids }),
        )
        .await?;
        Ok(())
    }

    // Playlist ids are global, the owner is only part of the port for other destinations.
    async fn add_playlist_tracks(
        &self,
        _user_id: &str,
        playlist_id: &str,
        ids: &[String],
    ) -> Result<(), ServiceError> {
        let uris = ids.iter().map(|id| track_uri(id)).collect();
        self.send(
            self.client
                .post(format!("{}/playlists/{}/tracks", SPOTIFY_API_URL, playlist_id))
                .json(&UrisRequest { uris }),
        )
        .await?;
        Ok(())
    }

    async fn add_library_albums(&self, ids: &[String]) -> Result<(), ServiceError> {
        self.send(
            self.client
                .put(format!("{}/me/albums", SPOTIFY_API_URL))
                .json(&IdsRequest { ids }),
        )
        .await?;
        Ok(())
    }

    async fn follow_artists(&self, ids: &[String]) -> Result<(), ServiceError> {
        self.send(
            self.client
                .put(format!("{}/me/following?type=artist", SPOTIFY_API_URL))
                .json(&IdsRequest { ids }),
        )
        .await?;
        Ok(())
    }

    async fn upload_playlist_cover(
        &self,
        playlist_id: &str,
        base64_jpeg: &str,
    ) -> Result<(), ServiceError> {
        self.send(
            self.client
                .put(format!("{}/playlists/{}/images", SPOTIFY_API_URL, playlist_id))
                .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
                .body(base64_jpeg.to_string()),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("3")), 3);
        assert_eq!(parse_retry_after(Some(" 12 ")), 12);
        assert_eq!(parse_retry_after(Some("soon")), 1);
        assert_eq!(parse_retry_after(None), 1);
    }

    #[test]
    fn test_429_is_rate_limited() {
        let error = classify_failure(StatusCode::TOO_MANY_REQUESTS, Some("7"), "");
        assert!(matches!(
            error,
            ServiceError::RateLimited {
                retry_after_secs: 7
            }
        ));
    }

    #[test]
    fn test_api_error_uses_spotify_message() {
        let body = r#"{"error": {"status": 400, "message": "Only valid bearer authentication supported"}}"#;
        let error = classify_failure(StatusCode::BAD_REQUEST, None, body);

        match error {
            ServiceError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Only valid bearer authentication supported");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_falls_back_to_body_or_reason() {
        match classify_failure(StatusCode::BAD_GATEWAY, None, "upstream down") {
            ServiceError::Api { message, .. } => assert_eq!(message, "upstream down"),
            other => panic!("unexpected error: {other:?}"),
        }
        match classify_failure(StatusCode::NOT_FOUND, None, "") {
            ServiceError::Api { message, .. } => assert_eq!(message, "Not Found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_search_hits_follow_requested_type_and_skip_nulls() {
        let body = r#"{"albums": {"items": [{"id": "a1", "name": "x"}, null, {"id": "a2"}]}}"#;
        let response: SpotifySearchResponse = serde_json::from_str(body).unwrap();

        assert_eq!(
            search_hits(response.clone(), SearchType::Album),
            vec!["a1", "a2"]
        );
        assert!(search_hits(response, SearchType::Track).is_empty());
    }

    #[test]
    fn test_track_uri() {
        assert_eq!(track_uri("4uLU6hMCjMI75M1A2tKUQC"), "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
    }
}
