pub mod applier;
pub mod categories;
pub mod entity;
pub mod json_import;
pub mod report;
pub mod resolver;
pub mod retry;

use std::collections::HashSet;
use std::time::Duration;

use color_eyre::eyre::{Result, WrapErr};

use crate::ports::destination::DestinationService;
use crate::ports::image::ImageCodec;
use crate::ports::source::SourceService;
use crate::services::transfer::applier::OrderedBatchApplier;
use crate::services::transfer::entity::{ResolvedId, SourceEntity};
use crate::services::transfer::report::{ImportReport, ReportSection};
use crate::services::transfer::resolver::{ItemResolver, ResolveError};
use crate::services::transfer::retry::{RetryPolicy, RetryingCaller};

/// The parts of a library that can be transferred, in the order they are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Category {
    Likes,
    Playlists,
    Albums,
    Artists,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Likes,
        Category::Playlists,
        Category::Albums,
        Category::Artists,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Likes => "Likes",
            Category::Playlists => "Playlists",
            Category::Albums => "Albums",
            Category::Artists => "Artists",
        }
    }

    /// Categories to run, in processing order, without the skipped ones.
    pub fn selected(skip: &HashSet<Category>) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| !skip.contains(category))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Disables the first-artist fallback search.
    pub strict_search: bool,
    /// Only transfer tracks and albums the source marks as unavailable.
    pub only_unavailable: bool,
    pub retry: RetryPolicy,
    /// Pause after every successful one-by-one write.
    pub add_item_delay: Duration,
    pub json_chunk_size: usize,
    pub json_playlist_name: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            strict_search: false,
            only_unavailable: false,
            retry: RetryPolicy::default(),
            add_item_delay: Duration::from_secs(1),
            json_chunk_size: 50,
            json_playlist_name: "Imported from JSON".to_string(),
        }
    }
}

/// Replays a source library into the destination account.
pub struct Importer<D: DestinationService> {
    destination: D,
    caller: RetryingCaller,
    user_id: String,
    options: ImportOptions,
}

impl<D: DestinationService> Importer<D> {
    /// Looks up the destination account the import writes to.
    pub async fn connect(destination: D, options: ImportOptions) -> Result<Self> {
        let caller = RetryingCaller::new(options.retry.clone());
        let user_id = caller
            .call("current user", || destination.current_user())
            .await
            .wrap_err("Failed to fetch the destination user")?;
        log::info!("User ID: {}", user_id);

        Ok(Self {
            destination,
            caller,
            user_id,
            options,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Runs every category not in `skip`. A category that hits a fatal error is noted in the
    /// report and the run moves on to the next one.
    pub async fn run_full_import<S: SourceService, I: ImageCodec>(
        &self,
        source: &S,
        codec: &I,
        skip: &HashSet<Category>,
    ) -> ImportReport {
        let mut report = ImportReport::new();

        for category in Category::selected(skip) {
            log::info!("Importing {}", category.name());
            let outcome = match category {
                Category::Likes => self.import_likes(source, &mut report).await,
                Category::Playlists => self.import_playlists(source, codec, &mut report).await,
                Category::Albums => self.import_albums(source, &mut report).await,
                Category::Artists => self.import_artists(source, &mut report).await,
            };

            if let Err(error) = outcome {
                log::error!("Importing {} stopped: {:#}", category.name(), error);
                report.record_aborted(category.name(), error);
            }
        }

        report
    }

    fn resolver(&self) -> ItemResolver<'_, D> {
        ItemResolver::new(&self.destination, &self.caller, self.options.strict_search)
    }

    fn applier(&self) -> OrderedBatchApplier<'_, D> {
        OrderedBatchApplier::new(&self.destination, &self.caller, self.options.add_item_delay)
    }

    /// Resolves entities in order, recording the ones that could not be matched.
    ///
    /// Only exhausted timeouts are returned as errors.
    async fn resolve_all(
        &self,
        entities: impl IntoIterator<Item = SourceEntity>,
        failures: &mut ReportSection,
    ) -> Result<Vec<ResolvedId>> {
        let resolver = self.resolver();
        let mut resolved = Vec::new();

        for entity in entities {
            if self.options.only_unavailable && entity.availability() == Some(true) {
                log::debug!("Skipping available item: {}", entity.short_name());
                continue;
            }

            match resolver.resolve(&entity).await {
                Ok(id) => {
                    log::info!("OK");
                    resolved.push(id);
                }
                Err(ResolveError::NotFound { label }) => {
                    log::warn!("NO");
                    failures.record(label);
                }
                Err(error) if error.is_fatal() => {
                    return Err(error)
                        .wrap_err_with(|| format!("Failed to look up {}", entity.short_name()));
                }
                Err(error) => {
                    log::warn!("NO: {}", error);
                    failures.record(entity.short_name());
                }
            }
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::ports::destination::{MockDestinationService, ServiceError};
    use crate::ports::image::MockImageCodec;
    use crate::ports::source::{LikedArtist, MockSourceService, SourceArtist};

    pub(crate) fn fast_options() -> ImportOptions {
        ImportOptions {
            add_item_delay: Duration::ZERO,
            ..ImportOptions::default()
        }
    }

    fn destination_for_user() -> MockDestinationService {
        let mut destination = MockDestinationService::new();
        destination
            .expect_current_user()
            .times(1)
            .returning(|| Ok("me".into()));
        destination
    }

    #[test]
    fn test_selected_keeps_order_and_drops_skipped() {
        let skip = HashSet::from([Category::Playlists]);
        assert_eq!(
            Category::selected(&skip),
            vec![Category::Likes, Category::Albums, Category::Artists]
        );
        assert_eq!(Category::selected(&HashSet::new()), Category::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_connect_fetches_user_through_retry() {
        let mut destination = MockDestinationService::new();
        let mut seq = mockall::Sequence::new();
        destination
            .expect_current_user()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(ServiceError::Timeout));
        destination
            .expect_current_user()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok("me".into()));

        let importer = Importer::connect(destination, fast_options()).await.unwrap();
        assert_eq!(importer.user_id(), "me");
    }

    #[tokio::test]
    async fn test_connect_fails_on_api_error() {
        let mut destination = MockDestinationService::new();
        destination.expect_current_user().returning(|| {
            Err(ServiceError::Api {
                status: 401,
                message: "invalid token".into(),
            })
        });

        let result = Importer::connect(destination, fast_options()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_full_import_runs_selected_categories_only() {
        let mut destination = destination_for_user();
        destination
            .expect_search()
            .returning(|query, _| Ok(vec![format!("id-{query}")]));
        destination
            .expect_follow_artists()
            .times(1)
            .returning(|_| Ok(()));

        let mut source = MockSourceService::new();
        source.expect_favorite_artists().times(1).returning(|| {
            Ok(vec![LikedArtist {
                timestamp: None,
                artist: SourceArtist {
                    id: "1".into(),
                    name: "Band".into(),
                },
            }])
        });
        source.expect_favorite_tracks().never();
        source.expect_playlists().never();
        source.expect_favorite_albums().never();

        let importer = Importer::connect(destination, fast_options()).await.unwrap();
        let skip = HashSet::from([Category::Likes, Category::Playlists, Category::Albums]);
        let report = importer
            .run_full_import(&source, &MockImageCodec::new(), &skip)
            .await;

        assert!(report.is_clean());
        let names: Vec<_> = report.sections().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Artists"]);
    }

    #[tokio::test]
    async fn test_failed_category_does_not_stop_the_run() {
        let mut destination = destination_for_user();
        destination
            .expect_search()
            .returning(|_, _| Err(ServiceError::Timeout));

        let followed = Arc::new(Mutex::new(0));
        let counter = followed.clone();
        destination.expect_follow_artists().returning(move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        let mut source = MockSourceService::new();
        source
            .expect_favorite_tracks()
            .returning(|| Err(color_eyre::eyre::eyre!("source is down")));
        source.expect_favorite_artists().returning(|| {
            Ok(vec![LikedArtist {
                timestamp: None,
                artist: SourceArtist {
                    id: "1".into(),
                    name: "Band".into(),
                },
            }])
        });

        let importer = Importer::connect(destination, fast_options()).await.unwrap();
        let skip = HashSet::from([Category::Playlists, Category::Albums]);
        let report = importer
            .run_full_import(&source, &MockImageCodec::new(), &skip)
            .await;

        let aborted: Vec<_> = report.aborted().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(aborted, vec!["Likes", "Artists"]);
        assert_eq!(*followed.lock().unwrap(), 0);
    }
}
