use serde::{Deserialize, Deserializer};

/// Every Yandex Music response wraps its payload in `{"result": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub result: T,
}

/// Ids come back as numbers on some endpoints and as strings on others.
fn flexible_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(id) => id.to_string(),
        Id::Text(id) => id,
    })
}

fn flexible_optional_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "flexible_id")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountStatus {
    pub account: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(deserialize_with = "flexible_id")]
    pub uid: String,
    pub login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YandexArtist {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YandexTrack {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artists: Vec<YandexArtist>,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YandexAlbum {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artists: Vec<YandexArtist>,
    #[serde(default)]
    pub available: bool,
}

/// Track reference as listed in likes and playlists.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackShort {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(default, deserialize_with = "flexible_optional_id")]
    pub album_id: Option<String>,
    pub timestamp: Option<String>,
    pub track: Option<YandexTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikesLibrary {
    pub library: TrackList,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackList {
    #[serde(default)]
    pub tracks: Vec<TrackShort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikedAlbumEntry {
    pub timestamp: Option<String>,
    pub album: YandexAlbum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikedArtistEntry {
    pub timestamp: Option<String>,
    pub artist: YandexArtist,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cover {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    #[serde(deserialize_with = "flexible_id")]
    pub uid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YandexPlaylist {
    #[serde(deserialize_with = "flexible_id")]
    pub uid: String,
    pub kind: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub collective: bool,
    pub cover: Option<Cover>,
    pub owner: Option<Owner>,
    /// Only filled when a single playlist is requested.
    #[serde(default)]
    pub tracks: Vec<TrackShort>,
}
