use crate::ports::destination::{DestinationService, SearchType};
use crate::services::transfer::entity::{MAX_LABEL_CHARS, ResolvedId, SearchTerms, SourceEntity};
use crate::services::transfer::retry::{CallError, RetryingCaller};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Nothing found for {label}")]
    NotFound { label: String },
    #[error(transparent)]
    Call(#[from] CallError),
}

impl ResolveError {
    /// Whether the failure should stop the whole category rather than just this item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::Call(CallError::TimedOut { .. }))
    }
}

/// Finds the destination counterpart of a source entity by searching for it.
///
/// The destination's own relevance ranking is trusted: the first hit wins.
pub struct ItemResolver<'a, D: DestinationService> {
    destination: &'a D,
    caller: &'a RetryingCaller,
    strict_search: bool,
}

impl<'a, D: DestinationService> ItemResolver<'a, D> {
    pub fn new(destination: &'a D, caller: &'a RetryingCaller, strict_search: bool) -> Self {
        Self {
            destination,
            caller,
            strict_search,
        }
    }

    pub async fn resolve(&self, entity: &SourceEntity) -> Result<ResolvedId, ResolveError> {
        let terms = SearchTerms::for_entity(entity);
        if terms.truncated {
            log::info!(
                "Name too long, trimming to {} characters. May affect search accuracy",
                MAX_LABEL_CHARS
            );
        }

        log::info!("Importing {}: {}...", terms.kind, terms.label);
        let mut found = self.search(&terms.query, terms.kind).await?;

        if found.is_empty() && self.should_fall_back(entity) {
            // Full artist lists under-match when one of the names is spelled differently
            if let (Some(first_artist), Some(title)) = (entity.artists().first(), entity.title()) {
                let query = format!("{} {}", first_artist, title);
                found = self.search(&query, terms.kind).await?;
            }
        }

        match found.into_iter().next() {
            Some(id) => Ok(ResolvedId {
                id,
                kind: terms.kind,
            }),
            None => Err(ResolveError::NotFound { label: terms.label }),
        }
    }

    fn should_fall_back(&self, entity: &SourceEntity) -> bool {
        !self.strict_search
            && !matches!(entity, SourceEntity::Artist(_))
            && entity.artists().len() > 1
    }

    async fn search(&self, query: &str, kind: SearchType) -> Result<Vec<String>, CallError> {
        log::info!("Searching \"{}\"...", query);
        let destination = self.destination;
        self.caller
            .call("search", || destination.search(query, kind))
            .await
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;

    use super::*;
    use crate::ports::destination::{MockDestinationService, ServiceError};
    use crate::ports::source::{SourceArtist, SourceTrack};

    fn track(title: &str, artists: &[&str]) -> SourceEntity {
        SourceEntity::Track(SourceTrack {
            id: "1".into(),
            title: title.into(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            available: true,
        })
    }

    #[tokio::test]
    async fn test_resolve_returns_first_hit() {
        let mut destination = MockDestinationService::new();
        destination
            .expect_search()
            .withf(|query, kind| query == "Artist Song" && *kind == SearchType::Track)
            .times(1)
            .returning(|_, _| Ok(vec!["first".into(), "second".into()]));

        let caller = RetryingCaller::default();
        let resolver = ItemResolver::new(&destination, &caller, false);

        let resolved = resolver.resolve(&track("Song", &["Artist"])).await.unwrap();
        assert_eq!(
            resolved,
            ResolvedId {
                id: "first".into(),
                kind: SearchType::Track
            }
        );
    }

    #[tokio::test]
    async fn test_fallback_uses_first_artist_once() {
        let mut destination = MockDestinationService::new();
        let mut seq = Sequence::new();
        destination
            .expect_search()
            .withf(|query, _| query == "Artist A, Artist B Song")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![]));
        destination
            .expect_search()
            .withf(|query, kind| query == "Artist A Song" && *kind == SearchType::Track)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec!["fallback-id".into()]));

        let caller = RetryingCaller::default();
        let resolver = ItemResolver::new(&destination, &caller, false);

        let resolved = resolver
            .resolve(&track("Song", &["Artist A", "Artist B"]))
            .await
            .unwrap();
        assert_eq!(resolved.id, "fallback-id");
    }

    #[tokio::test]
    async fn test_fallback_miss_is_not_found() {
        let mut destination = MockDestinationService::new();
        destination
            .expect_search()
            .times(2)
            .returning(|_, _| Ok(vec![]));

        let caller = RetryingCaller::default();
        let resolver = ItemResolver::new(&destination, &caller, false);

        let error = resolver
            .resolve(&track("Song", &["Artist A", "Artist B"]))
            .await
            .unwrap_err();
        assert!(
            matches!(error, ResolveError::NotFound { ref label } if label == "Artist A, Artist B - Song")
        );
    }

    #[tokio::test]
    async fn test_strict_search_never_falls_back() {
        let mut destination = MockDestinationService::new();
        destination
            .expect_search()
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let caller = RetryingCaller::default();
        let resolver = ItemResolver::new(&destination, &caller, true);

        let error = resolver
            .resolve(&track("Song", &["Artist A", "Artist B"]))
            .await
            .unwrap_err();
        assert!(matches!(error, ResolveError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_single_artist_never_falls_back() {
        let mut destination = MockDestinationService::new();
        destination
            .expect_search()
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let caller = RetryingCaller::default();
        let resolver = ItemResolver::new(&destination, &caller, false);

        let result = resolver.resolve(&track("Song", &["Only"])).await;
        assert!(matches!(result, Err(ResolveError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_artist_searches_by_name_without_fallback() {
        let mut destination = MockDestinationService::new();
        destination
            .expect_search()
            .withf(|query, kind| query == "Band" && *kind == SearchType::Artist)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let caller = RetryingCaller::default();
        let resolver = ItemResolver::new(&destination, &caller, false);

        let artist = SourceEntity::Artist(SourceArtist {
            id: "7".into(),
            name: "Band".into(),
        });
        let error = resolver.resolve(&artist).await.unwrap_err();
        assert!(matches!(error, ResolveError::NotFound { ref label } if label == "Band"));
    }

    #[tokio::test]
    async fn test_long_names_are_searched_truncated() {
        let mut destination = MockDestinationService::new();
        destination
            .expect_search()
            .withf(|query, _| query.chars().count() <= MAX_LABEL_CHARS)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let caller = RetryingCaller::default();
        let resolver = ItemResolver::new(&destination, &caller, false);

        let title = "Very long title ".repeat(20);
        let error = resolver
            .resolve(&track(&title, &["Artist"]))
            .await
            .unwrap_err();
        match error {
            ResolveError::NotFound { label } => {
                assert_eq!(label.chars().count(), MAX_LABEL_CHARS)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_search_error_is_propagated() {
        let mut destination = MockDestinationService::new();
        destination.expect_search().times(1).returning(|_, _| {
            Err(ServiceError::Api {
                status: 400,
                message: "bad query".into(),
            })
        });

        let caller = RetryingCaller::default();
        let resolver = ItemResolver::new(&destination, &caller, false);

        let error = resolver
            .resolve(&SourceEntity::FreeformQuery("x".into()))
            .await
            .unwrap_err();
        assert!(!error.is_fatal());
        assert!(matches!(
            error,
            ResolveError::Call(CallError::Service(ServiceError::Api { .. }))
        ));
    }

    #[tokio::test]
    async fn test_exhausted_timeouts_are_fatal() {
        let mut destination = MockDestinationService::new();
        destination
            .expect_search()
            .times(6)
            .returning(|_, _| Err(ServiceError::Timeout));

        let caller = RetryingCaller::default();
        let resolver = ItemResolver::new(&destination, &caller, false);

        let error = resolver
            .resolve(&SourceEntity::FreeformQuery("x".into()))
            .await
            .unwrap_err();
        assert!(error.is_fatal());
    }
}
