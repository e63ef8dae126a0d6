use std::time::Duration;

use crate::ports::destination::DestinationService;
use crate::services::transfer::entity::ResolvedId;
use crate::services::transfer::report::ReportSection;
use crate::services::transfer::retry::{CallError, RetryingCaller};

/// The destination write a batch of resolved ids is replayed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation<'a> {
    LibraryTracks,
    PlaylistTracks {
        user_id: &'a str,
        playlist_id: &'a str,
    },
    LibraryAlbums,
    FollowArtists,
}

impl Mutation<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Mutation::LibraryTracks => "save track",
            Mutation::PlaylistTracks { .. } => "add playlist track",
            Mutation::LibraryAlbums => "save album",
            Mutation::FollowArtists => "follow artist",
        }
    }
}

/// Writes resolved ids to the destination one at a time, in order.
///
/// Bulk writes are not guaranteed to keep their order on the destination, so every id gets its
/// own request followed by a pause. A failing id is recorded and skipped.
pub struct OrderedBatchApplier<'a, D: DestinationService> {
    destination: &'a D,
    caller: &'a RetryingCaller,
    pause: Duration,
}

impl<'a, D: DestinationService> OrderedBatchApplier<'a, D> {
    pub fn new(destination: &'a D, caller: &'a RetryingCaller, pause: Duration) -> Self {
        Self {
            destination,
            caller,
            pause,
        }
    }

    /// Returns how many ids were written.
    pub async fn apply(
        &self,
        ids: &[ResolvedId],
        mutation: Mutation<'_>,
        failures: &mut ReportSection,
    ) -> usize {
        if ids.is_empty() {
            log::info!("No valid items to add");
            return 0;
        }

        log::info!("Adding {} items one by one...", ids.len());

        let mut added = 0;
        for (index, resolved) in ids.iter().enumerate() {
            log::info!("Adding item {}/{}: {}", index + 1, ids.len(), resolved.id);

            match self.submit(&resolved.id, mutation).await {
                Ok(()) => {
                    added += 1;
                    log::info!("Item {} successfully added", index + 1);
                    tokio::time::sleep(self.pause).await;
                }
                Err(error) => {
                    log::error!("Error adding item {}: {}", resolved.id, error);
                    failures.record(resolved.id.clone());
                }
            }
        }

        added
    }

    async fn submit(&self, id: &str, mutation: Mutation<'_>) -> Result<(), CallError> {
        let ids = [id.to_string()];
        let destination = self.destination;
        let what = mutation.describe();

        match mutation {
            Mutation::LibraryTracks => {
                self.caller
                    .call(what, || destination.add_library_tracks(&ids))
                    .await
            }
            Mutation::PlaylistTracks {
                user_id,
                playlist_id,
            } => {
                self.caller
                    .call(what, || {
                        destination.add_playlist_tracks(user_id, playlist_id, &ids)
                    })
                    .await
            }
            Mutation::LibraryAlbums => {
                self.caller
                    .call(what, || destination.add_library_albums(&ids))
                    .await
            }
            Mutation::FollowArtists => {
                self.caller
                    .call(what, || destination.follow_artists(&ids))
                    .await
            }
        }
    }

    /// Adds ids to a playlist in sequential chunks of `chunk_size`.
    ///
    /// Only chunk order is preserved, so this is meant for freshly created playlists. The first
    /// failing chunk stops the upload.
    pub async fn apply_in_chunks(
        &self,
        ids: &[ResolvedId],
        user_id: &str,
        playlist_id: &str,
        chunk_size: usize,
    ) -> Result<usize, CallError> {
        let chunks: Vec<Vec<String>> = ids
            .chunks(chunk_size.max(1))
            .map(|chunk| chunk.iter().map(|resolved| resolved.id.clone()).collect())
            .collect();
        log::info!("Processing {} chunks of tracks", chunks.len());

        let destination = self.destination;
        for (index, chunk) in chunks.iter().enumerate() {
            log::info!(
                "Adding chunk {}/{} with {} tracks to playlist",
                index + 1,
                chunks.len(),
                chunk.len()
            );
            self.caller
                .call("add playlist tracks", || {
                    destination.add_playlist_tracks(user_id, playlist_id, chunk)
                })
                .await?;
            log::info!("Chunk {} successfully added", index + 1);
        }

        Ok(ids.len())
    }
}
