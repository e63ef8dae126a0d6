use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;

/// Decoupled representation of a source-side track.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTrack {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub available: bool,
}

/// Decoupled representation of a source-side album.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceAlbum {
    pub id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceArtist {
    pub id: String,
    pub name: String,
}

/// Thin reference to a track as returned by listing endpoints (likes, playlist contents).
///
/// `track` is only populated when the listing embeds the full track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRef {
    pub id: String,
    pub album_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub track: Option<SourceTrack>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikedAlbum {
    pub timestamp: Option<DateTime<Utc>>,
    pub album: SourceAlbum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikedArtist {
    pub timestamp: Option<DateTime<Utc>>,
    pub artist: SourceArtist,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistCover {
    /// Fully qualified download url for the cover picture.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourcePlaylist {
    pub kind: u64,
    pub owner_uid: String,
    pub title: String,
    /// Several users contribute tracks; the listing only carries thin references.
    pub collective: bool,
    pub cover: Option<PlaylistCover>,
}

/// Port trait wrapping the source (Yandex Music) API capabilities used by the transfer.
///
/// Implementations live in `yandex_rs::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SourceService: Send + Sync {
    async fn favorite_tracks(&self) -> Result<Vec<TrackRef>>;

    async fn playlists(&self) -> Result<Vec<SourcePlaylist>>;

    async fn playlist_tracks(&self, playlist: &SourcePlaylist) -> Result<Vec<TrackRef>>;

    /// Full tracks for the given ids. The order of the result is not guaranteed.
    async fn tracks_by_ids(&self, ids: &[String]) -> Result<Vec<SourceTrack>>;

    async fn favorite_albums(&self) -> Result<Vec<LikedAlbum>>;

    async fn favorite_artists(&self) -> Result<Vec<LikedArtist>>;

    async fn download_cover(&self, cover: &PlaylistCover) -> Result<Vec<u8>>;
}
