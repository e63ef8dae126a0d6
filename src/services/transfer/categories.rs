use std::collections::HashMap;

use chrono::{DateTime, Utc};
use color_eyre::eyre::{Result, WrapErr};

use crate::ports::destination::DestinationService;
use crate::ports::image::ImageCodec;
use crate::ports::source::{
    LikedAlbum, LikedArtist, PlaylistCover, SourcePlaylist, SourceService, SourceTrack, TrackRef,
};
use crate::services::transfer::applier::Mutation;
use crate::services::transfer::entity::SourceEntity;
use crate::services::transfer::report::ImportReport;
use crate::services::transfer::{Category, Importer};

/// How many items of a freshly sorted list are echoed to the log.
const PREVIEW_LEN: usize = 5;

/// Source items that may carry the moment they were liked or added.
pub trait Chronological {
    fn timestamp(&self) -> Option<DateTime<Utc>>;
    fn source_id(&self) -> &str;
}

impl Chronological for TrackRef {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn source_id(&self) -> &str {
        &self.id
    }
}

impl Chronological for LikedAlbum {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn source_id(&self) -> &str {
        &self.album.id
    }
}

impl Chronological for LikedArtist {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    fn source_id(&self) -> &str {
        &self.artist.id
    }
}

/// Sorts oldest first when the list carries timestamps (judged by its first item).
///
/// The sort is stable; items without a timestamp sort as the unix epoch.
pub fn sort_chronologically<T: Chronological>(items: &mut [T], what: &str) {
    if items.first().and_then(|item| item.timestamp()).is_none() {
        return;
    }

    log::info!(
        "Sorting {} {} by timestamp (oldest first)...",
        items.len(),
        what
    );
    items.sort_by_key(|item| item.timestamp().unwrap_or(DateTime::<Utc>::UNIX_EPOCH));

    for (index, item) in items.iter().take(PREVIEW_LEN).enumerate() {
        log::info!(
            "{} {}: {} - Timestamp: {}",
            what,
            index,
            item.source_id(),
            item.timestamp()
                .map(|timestamp| timestamp.to_rfc3339())
                .unwrap_or_else(|| "N/A".to_string())
        );
    }
    if items.len() > PREVIEW_LEN {
        log::info!("... and {} more {}", items.len() - PREVIEW_LEN, what);
    }
}

/// Puts bulk-fetched tracks back into `order`. Ids that were not fetched are dropped.
pub fn reassemble_in_order(order: &[String], fetched: Vec<SourceTrack>) -> Vec<SourceTrack> {
    let by_id: HashMap<String, SourceTrack> = fetched
        .into_iter()
        .map(|track| (track.id.clone(), track))
        .collect();

    order
        .iter()
        .filter_map(|id| {
            let track = by_id.get(id).cloned();
            if track.is_none() {
                log::warn!("Could not find track with ID {} in fetched tracks", id);
            }
            track
        })
        .collect()
}

impl<D: DestinationService> Importer<D> {
    pub(crate) async fn import_likes<S: SourceService>(
        &self,
        source: &S,
        report: &mut ImportReport,
    ) -> Result<()> {
        let section = Category::Likes.name();
        report.section(section);

        let mut likes = source
            .favorite_tracks()
            .await
            .wrap_err("Failed to fetch liked tracks")?;
        sort_chronologically(&mut likes, "liked tracks");

        // the likes listing only carries ids
        let order: Vec<String> = likes
            .iter()
            .filter(|like| like.album_id.is_some())
            .map(|like| like.id.clone())
            .collect();
        let tracks = if order.is_empty() {
            Vec::new()
        } else {
            let fetched = source
                .tracks_by_ids(&order)
                .await
                .wrap_err("Failed to fetch liked track details")?;
            reassemble_in_order(&order, fetched)
        };
        log::info!(
            "Importing {} liked tracks in chronological order...",
            tracks.len()
        );

        let ids = self
            .resolve_all(
                tracks.into_iter().map(SourceEntity::from),
                report.section(section),
            )
            .await?;
        self.applier()
            .apply(&ids, Mutation::LibraryTracks, report.section(section))
            .await;

        Ok(())
    }

    pub(crate) async fn import_playlists<S: SourceService, I: ImageCodec>(
        &self,
        source: &S,
        codec: &I,
        report: &mut ImportReport,
    ) -> Result<()> {
        let playlists = source
            .playlists()
            .await
            .wrap_err("Failed to fetch playlists")?;

        for playlist in playlists {
            let destination = &self.destination;
            let playlist_id = self
                .caller
                .call("create playlist", || {
                    destination.create_playlist(&self.user_id, &playlist.title)
                })
                .await
                .wrap_err_with(|| format!("Failed to create playlist {}", playlist.title))?;

            log::info!("Importing playlist {}...", playlist.title);

            if let Some(cover) = &playlist.cover {
                if let Err(error) = self.upload_cover(source, codec, &playlist_id, cover).await {
                    log::warn!(
                        "Failed to upload cover for playlist {}: {:#}",
                        playlist.title,
                        error
                    );
                }
            }

            report.section(&playlist.title);

            let tracks = self.playlist_tracks(source, &playlist).await?;
            log::info!(
                "Processing {} tracks for playlist {}",
                tracks.len(),
                playlist.title
            );

            let ids = self
                .resolve_all(
                    tracks.into_iter().map(SourceEntity::from),
                    report.section(&playlist.title),
                )
                .await?;
            self.applier()
                .apply(
                    &ids,
                    Mutation::PlaylistTracks {
                        user_id: &self.user_id,
                        playlist_id: &playlist_id,
                    },
                    report.section(&playlist.title),
                )
                .await;
        }

        Ok(())
    }

    /// The playlist's tracks, oldest addition first.
    async fn playlist_tracks<S: SourceService>(
        &self,
        source: &S,
        playlist: &SourcePlaylist,
    ) -> Result<Vec<SourceTrack>> {
        log::info!("Fetching tracks for playlist: {}", playlist.title);
        let mut refs = source
            .playlist_tracks(playlist)
            .await
            .wrap_err_with(|| format!("Failed to fetch tracks of playlist {}", playlist.title))?;
        sort_chronologically(&mut refs, "playlist tracks");

        if !playlist.collective {
            let tracks = refs
                .into_iter()
                .filter_map(|track_ref| {
                    if track_ref.track.is_none() {
                        log::warn!(
                            "Missing track data for track {} in playlist {}",
                            track_ref.id,
                            playlist.title
                        );
                    }
                    track_ref.track
                })
                .collect();
            return Ok(tracks);
        }

        if refs.is_empty() {
            return Ok(Vec::new());
        }

        // collective playlists list thin references, refetch and keep the sorted order
        let order: Vec<String> = refs.iter().map(|track_ref| track_ref.id.clone()).collect();
        let fetched = source
            .tracks_by_ids(&order)
            .await
            .wrap_err_with(|| format!("Failed to fetch tracks of playlist {}", playlist.title))?;

        Ok(reassemble_in_order(&order, fetched))
    }

    async fn upload_cover<S: SourceService, I: ImageCodec>(
        &self,
        source: &S,
        codec: &I,
        playlist_id: &str,
        cover: &PlaylistCover,
    ) -> Result<()> {
        let image = source
            .download_cover(cover)
            .await
            .wrap_err("Failed to download playlist cover")?;
        let encoded = codec.to_base64_jpeg(&image)?;

        let destination = &self.destination;
        self.caller
            .call("upload playlist cover", || {
                destination.upload_playlist_cover(playlist_id, &encoded)
            })
            .await
            .wrap_err("Failed to upload playlist cover")?;

        Ok(())
    }

    pub(crate) async fn import_albums<S: SourceService>(
        &self,
        source: &S,
        report: &mut ImportReport,
    ) -> Result<()> {
        let section = Category::Albums.name();
        report.section(section);

        let mut likes = source
            .favorite_albums()
            .await
            .wrap_err("Failed to fetch liked albums")?;
        sort_chronologically(&mut likes, "albums");

        log::info!(
            "Importing {} albums in chronological order...",
            likes.len()
        );
        let ids = self
            .resolve_all(
                likes.into_iter().map(|like| SourceEntity::from(like.album)),
                report.section(section),
            )
            .await?;
        self.applier()
            .apply(&ids, Mutation::LibraryAlbums, report.section(section))
            .await;

        Ok(())
    }

    pub(crate) async fn import_artists<S: SourceService>(
        &self,
        source: &S,
        report: &mut ImportReport,
    ) -> Result<()> {
        let section = Category::Artists.name();
        report.section(section);

        let mut likes = source
            .favorite_artists()
            .await
            .wrap_err("Failed to fetch liked artists")?;
        sort_chronologically(&mut likes, "artists");

        log::info!(
            "Importing {} artists in chronological order...",
            likes.len()
        );
        let ids = self
            .resolve_all(
                likes.into_iter().map(|like| SourceEntity::from(like.artist)),
                report.section(section),
            )
            .await?;
        self.applier()
            .apply(&ids, Mutation::FollowArtists, report.section(section))
            .await;

        Ok(())
    }
}
