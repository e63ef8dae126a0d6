use std::fmt;

/// Errors a destination call can fail with.
///
/// The retry policy in `services::transfer::retry` inspects these, so adapters must map
/// HTTP 429 to [`ServiceError::RateLimited`] and request timeouts to [`ServiceError::Timeout`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("Request timed out")]
    Timeout,
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Failed to send http request: {0}")]
    Request(#[source] reqwest::Error),
    #[error("Failed to parse response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// The kind of catalog object a search is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchType {
    Track,
    Album,
    Artist,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchType::Track => "track",
            SearchType::Album => "album",
            SearchType::Artist => "artist",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port trait wrapping the destination (Spotify) API capabilities used by the transfer.
///
/// Implementations live in `spotify_rs::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DestinationService: Send + Sync {
    /// Id of the account the mutations are applied to.
    async fn current_user(&self) -> Result<String, ServiceError>;

    /// Ids of the search hits, in the service's own relevance order.
    async fn search(&self, query: &str, kind: SearchType) -> Result<Vec<String>, ServiceError>;

    async fn create_playlist(&self, user_id: &str, title: &str) -> Result<String, ServiceError>;

    async fn add_library_tracks(&self, ids: &[String]) -> Result<(), ServiceError>;

    async fn add_playlist_tracks(
        &self,
        user_id: &str,
        playlist_id: &str,
        ids: &[String],
    ) -> Result<(), ServiceError>;

    async fn add_library_albums(&self, ids: &[String]) -> Result<(), ServiceError>;

    async fn follow_artists(&self, ids: &[String]) -> Result<(), ServiceError>;

    async fn upload_playlist_cover(
        &self,
        playlist_id: &str,
        base64_jpeg: &str,
    ) -> Result<(), ServiceError>;
}
