use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;

use crate::ports::destination::DestinationService;
use crate::services::transfer::Importer;
use crate::services::transfer::entity::SourceEntity;
use crate::services::transfer::report::ImportReport;

/// One record of a bulk-import file: `{"artist": "...", "track": "...", "timestamp": 123}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonTrackQuery {
    pub artist: String,
    pub track: String,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl JsonTrackQuery {
    pub fn query(&self) -> String {
        format!("{} {}", self.artist, self.track)
    }
}

pub fn load_queries(path: &Path) -> Result<Vec<JsonTrackQuery>> {
    let contents = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read import file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .wrap_err_with(|| format!("Failed to parse import file: {}", path.display()))
}

/// Oldest first, if the first record carries a timestamp. Missing timestamps count as zero.
pub fn sort_queries(queries: &mut [JsonTrackQuery]) {
    if queries.first().is_none_or(|query| query.timestamp.is_none()) {
        return;
    }

    log::info!("Sorting JSON tracks by timestamp (oldest first)...");
    queries.sort_by(|a, b| {
        a.timestamp
            .unwrap_or(0.0)
            .total_cmp(&b.timestamp.unwrap_or(0.0))
    });

    for (index, query) in queries.iter().take(5).enumerate() {
        log::info!(
            "Track {}: {} - {} - Timestamp: {}",
            index,
            query.artist,
            query.track,
            query.timestamp.unwrap_or(0.0)
        );
    }
    if queries.len() > 5 {
        log::info!("... and {} more tracks", queries.len() - 5);
    }
}

impl<D: DestinationService> Importer<D> {
    /// Resolves every record of the file at `path` and adds the matches to a new playlist.
    pub async fn run_json_import(&self, path: &Path) -> Result<ImportReport> {
        let queries = load_queries(path)?;
        self.import_queries(queries).await
    }

    pub async fn import_queries(&self, mut queries: Vec<JsonTrackQuery>) -> Result<ImportReport> {
        sort_queries(&mut queries);

        let playlist_name = &self.options.json_playlist_name;
        let mut report = ImportReport::new();

        let ids = self
            .resolve_all(
                queries
                    .iter()
                    .map(|query| SourceEntity::FreeformQuery(query.query())),
                report.section(playlist_name),
            )
            .await?;

        let destination = &self.destination;
        let playlist_id = self
            .caller
            .call("create playlist", || {
                destination.create_playlist(&self.user_id, playlist_name)
            })
            .await
            .wrap_err_with(|| format!("Failed to create playlist {}", playlist_name))?;
        log::info!("Created playlist '{}' with ID {}", playlist_name, playlist_id);

        self.applier()
            .apply_in_chunks(
                &ids,
                &self.user_id,
                &playlist_id,
                self.options.json_chunk_size,
            )
            .await
            .wrap_err("Failed to add tracks to the imported playlist")?;

        Ok(report)
    }
}
