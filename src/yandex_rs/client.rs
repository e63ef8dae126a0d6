use std::time::Duration;

use chrono::{DateTime, Utc};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde::de::DeserializeOwned;

use crate::ports::source::{
    LikedAlbum, LikedArtist, PlaylistCover, SourceAlbum, SourceArtist, SourcePlaylist,
    SourceService, SourceTrack, TrackRef,
};
use crate::yandex_rs::types::{
    AccountStatus, Cover, Envelope, LikedAlbumEntry, LikedArtistEntry, LikesLibrary, TrackShort,
    YandexAlbum, YandexArtist, YandexPlaylist, YandexTrack,
};

const YANDEX_API_URL: &str = "https://api.music.yandex.net";

/// Yandex Music API client, bound to the account that owns the token.
pub struct YandexClient {
    token: String,
    uid: String,
    client: reqwest::Client,
    timeout: Duration,
    cover_size: String,
}

impl YandexClient {
    /// Resolves the account behind `token`.
    pub async fn connect(token: String, timeout: Duration, cover_size: String) -> Result<Self> {
        let mut client = Self {
            token,
            uid: String::new(),
            client: reqwest::Client::new(),
            timeout,
            cover_size,
        };

        let status: AccountStatus = client
            .get(format!("{}/account/status", YANDEX_API_URL))
            .await
            .wrap_err("Failed to fetch the Yandex Music account")?;
        log::info!(
            "Yandex Music account: {} ({})",
            status.account.login.as_deref().unwrap_or("unknown"),
            status.account.uid
        );
        client.uid = status.account.uid;

        Ok(client)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(reqwest::header::AUTHORIZATION, format!("OAuth {}", self.token))
            .timeout(self.timeout)
    }

    async fn unwrap_result<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T> {
        let envelope: Envelope<T> = request.send().await?.error_for_status()?.json().await?;
        Ok(envelope.result)
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        log::debug!("GET {}", url);
        Self::unwrap_result(self.authorized(self.client.get(url))).await
    }

    fn user_url(&self, path: &str) -> String {
        format!("{}/users/{}/{}", YANDEX_API_URL, self.uid, path)
    }

    fn convert_playlist(&self, playlist: YandexPlaylist) -> SourcePlaylist {
        SourcePlaylist {
            kind: playlist.kind,
            owner_uid: playlist
                .owner
                .map(|owner| owner.uid)
                .unwrap_or(playlist.uid),
            title: playlist.title,
            collective: playlist.collective,
            cover: playlist
                .cover
                .as_ref()
                .and_then(|cover| cover_url(cover, &self.cover_size))
                .map(|url| PlaylistCover { url }),
        }
    }
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(timestamp) => Some(timestamp.with_timezone(&Utc)),
        Err(error) => {
            log::debug!("Ignoring unparsable timestamp {:?}: {}", value, error);
            None
        }
    }
}

/// Download url of an uploaded playlist picture. Generated mosaics have no usable cover.
fn cover_url(cover: &Cover, size: &str) -> Option<String> {
    if cover.kind.as_deref() != Some("pic") {
        return None;
    }
    cover
        .uri
        .as_ref()
        .map(|uri| format!("https://{}", uri.replace("%%", size)))
}

fn artist_names(artists: Vec<YandexArtist>) -> Vec<String> {
    artists.into_iter().map(|artist| artist.name).collect()
}

impl From<YandexTrack> for SourceTrack {
    fn from(track: YandexTrack) -> Self {
        SourceTrack {
            id: track.id,
            title: track.title,
            artists: artist_names(track.artists),
            available: track.available,
        }
    }
}

impl From<YandexAlbum> for SourceAlbum {
    fn from(album: YandexAlbum) -> Self {
        SourceAlbum {
            id: album.id,
            title: album.title,
            artists: artist_names(album.artists),
            available: album.available,
        }
    }
}

impl From<YandexArtist> for SourceArtist {
    fn from(artist: YandexArtist) -> Self {
        SourceArtist {
            id: artist.id,
            name: artist.name,
        }
    }
}

impl From<TrackShort> for TrackRef {
    fn from(short: TrackShort) -> Self {
        TrackRef {
            timestamp: parse_timestamp(short.timestamp.as_deref()),
            id: short.id,
            album_id: short.album_id,
            track: short.track.map(SourceTrack::from),
        }
    }
}

#[async_trait::async_trait]
impl SourceService for YandexClient {
    async fn favorite_tracks(&self) -> Result<Vec<TrackRef>> {
        let likes: LikesLibrary = self.get(self.user_url("likes/tracks")).await?;
        Ok(likes.library.tracks.into_iter().map(TrackRef::from).collect())
    }

    async fn playlists(&self) -> Result<Vec<SourcePlaylist>> {
        let playlists: Vec<YandexPlaylist> = self.get(self.user_url("playlists/list")).await?;
        Ok(playlists
            .into_iter()
            .map(|playlist| self.convert_playlist(playlist))
            .collect())
    }

    async fn playlist_tracks(&self, playlist: &SourcePlaylist) -> Result<Vec<TrackRef>> {
        let url = format!(
            "{}/users/{}/playlists/{}",
            YANDEX_API_URL, playlist.owner_uid, playlist.kind
        );
        let full: YandexPlaylist = self
            .get(url)
            .await
            .wrap_err_with(|| format!("Failed to fetch playlist {}", playlist.title))?;
        Ok(full.tracks.into_iter().map(TrackRef::from).collect())
    }

    async fn tracks_by_ids(&self, ids: &[String]) -> Result<Vec<SourceTrack>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let track_ids = ids.join(",");
        let request = self.authorized(
            self.client
                .post(format!("{}/tracks", YANDEX_API_URL))
                .form(&[
                    ("track-ids", track_ids.as_str()),
                    ("with-positions", "false"),
                ]),
        );
        let tracks: Vec<YandexTrack> = Self::unwrap_result(request).await?;
        Ok(tracks.into_iter().map(SourceTrack::from).collect())
    }

    async fn favorite_albums(&self) -> Result<Vec<LikedAlbum>> {
        let entries: Vec<LikedAlbumEntry> =
            self.get(self.user_url("likes/albums?rich=true")).await?;
        Ok(entries
            .into_iter()
            .map(|entry| LikedAlbum {
                timestamp: parse_timestamp(entry.timestamp.as_deref()),
                album: entry.album.into(),
            })
            .collect())
    }

    async fn favorite_artists(&self) -> Result<Vec<LikedArtist>> {
        let entries: Vec<LikedArtistEntry> = self
            .get(self.user_url("likes/artists?with-timestamps=true"))
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| LikedArtist {
                timestamp: parse_timestamp(entry.timestamp.as_deref()),
                artist: entry.artist.into(),
            })
            .collect())
    }

    async fn download_cover(&self, cover: &PlaylistCover) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(&cover.url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
