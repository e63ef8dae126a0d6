use crate::ports::destination::SearchType;
use crate::ports::source::{SourceAlbum, SourceArtist, SourceTrack};

/// The destination search endpoint rejects longer queries.
pub const MAX_LABEL_CHARS: usize = 100;

/// Anything the transfer can look up on the destination.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEntity {
    Track(SourceTrack),
    Album(SourceAlbum),
    Artist(SourceArtist),
    /// A ready-made search string, e.g. `"<artist> <track>"` from a bulk-import file.
    FreeformQuery(String),
}

impl SourceEntity {
    pub fn search_type(&self) -> SearchType {
        match self {
            SourceEntity::Track(_) | SourceEntity::FreeformQuery(_) => SearchType::Track,
            SourceEntity::Album(_) => SearchType::Album,
            SourceEntity::Artist(_) => SearchType::Artist,
        }
    }

    /// Contributing artist names. Empty for artists and free-form queries.
    pub fn artists(&self) -> &[String] {
        match self {
            SourceEntity::Track(track) => &track.artists,
            SourceEntity::Album(album) => &album.artists,
            SourceEntity::Artist(_) | SourceEntity::FreeformQuery(_) => &[],
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            SourceEntity::Track(track) => Some(&track.title),
            SourceEntity::Album(album) => Some(&album.title),
            SourceEntity::Artist(_) | SourceEntity::FreeformQuery(_) => None,
        }
    }

    /// The source's availability flag, for the entities that carry one.
    pub fn availability(&self) -> Option<bool> {
        match self {
            SourceEntity::Track(track) => Some(track.available),
            SourceEntity::Album(album) => Some(album.available),
            SourceEntity::Artist(_) | SourceEntity::FreeformQuery(_) => None,
        }
    }

    /// Human readable name, `"Artist1, Artist2 - Title"` for tracks and albums.
    pub fn display_label(&self) -> String {
        match self {
            SourceEntity::Track(SourceTrack { title, artists, .. })
            | SourceEntity::Album(SourceAlbum { title, artists, .. }) => {
                format!("{} - {}", artists.join(", "), title)
            }
            SourceEntity::Artist(artist) => artist.name.clone(),
            SourceEntity::FreeformQuery(query) => query.clone(),
        }
    }

    /// Name recorded in the report when the lookup errors out before a label is known.
    pub fn short_name(&self) -> String {
        match self {
            SourceEntity::Track(track) => track.title.clone(),
            SourceEntity::Album(album) => album.title.clone(),
            SourceEntity::Artist(artist) => artist.name.clone(),
            SourceEntity::FreeformQuery(query) => query.clone(),
        }
    }
}

impl From<SourceTrack> for SourceEntity {
    fn from(track: SourceTrack) -> Self {
        SourceEntity::Track(track)
    }
}

impl From<SourceAlbum> for SourceEntity {
    fn from(album: SourceAlbum) -> Self {
        SourceEntity::Album(album)
    }
}

impl From<SourceArtist> for SourceEntity {
    fn from(artist: SourceArtist) -> Self {
        SourceEntity::Artist(artist)
    }
}

/// What gets sent to the destination search endpoint for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    /// Name used in logs and in the failure report.
    pub label: String,
    pub query: String,
    pub kind: SearchType,
    pub truncated: bool,
}

impl SearchTerms {
    pub fn for_entity(entity: &SourceEntity) -> Self {
        let kind = entity.search_type();

        if let SourceEntity::FreeformQuery(query) = entity {
            return Self {
                label: query.clone(),
                query: query.clone(),
                kind,
                truncated: false,
            };
        }

        let mut label = entity.display_label();
        let truncated = label.chars().count() > MAX_LABEL_CHARS;
        if truncated {
            label = label.chars().take(MAX_LABEL_CHARS).collect();
        }

        // "- " confuses the destination's relevance ranking
        let query = label.replace("- ", "");

        Self {
            label,
            query,
            kind,
            truncated,
        }
    }
}

/// A destination id, tagged with the kind of object it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    pub id: String,
    pub kind: SearchType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, artists: &[&str]) -> SourceEntity {
        SourceEntity::Track(SourceTrack {
            id: "1".into(),
            title: title.into(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            available: true,
        })
    }

    #[test]
    fn test_track_terms_join_artists_and_strip_dash() {
        let terms = SearchTerms::for_entity(&track("Song", &["Artist A", "Artist B"]));

        assert_eq!(terms.label, "Artist A, Artist B - Song");
        assert_eq!(terms.query, "Artist A, Artist B Song");
        assert_eq!(terms.kind, SearchType::Track);
        assert!(!terms.truncated);
    }

    #[test]
    fn test_album_terms_use_album_type() {
        let album = SourceEntity::Album(SourceAlbum {
            id: "9".into(),
            title: "Record".into(),
            artists: vec!["Band".into()],
            available: false,
        });

        let terms = SearchTerms::for_entity(&album);
        assert_eq!(terms.label, "Band - Record");
        assert_eq!(terms.kind, SearchType::Album);
    }

    #[test]
    fn test_artist_terms_use_name_only() {
        let artist = SourceEntity::Artist(SourceArtist {
            id: "3".into(),
            name: "Some - Name".into(),
        });

        let terms = SearchTerms::for_entity(&artist);
        assert_eq!(terms.label, "Some - Name");
        assert_eq!(terms.query, "Some Name");
        assert_eq!(terms.kind, SearchType::Artist);
    }

    #[test]
    fn test_freeform_query_is_used_verbatim() {
        let query = SourceEntity::FreeformQuery("Artist - Track".into());

        let terms = SearchTerms::for_entity(&query);
        assert_eq!(terms.query, "Artist - Track");
        assert_eq!(terms.kind, SearchType::Track);
    }

    #[test]
    fn test_long_label_is_truncated_to_exactly_100_chars() {
        let title = "x".repeat(150);
        let terms = SearchTerms::for_entity(&track(&title, &["Artist"]));

        assert!(terms.truncated);
        assert_eq!(terms.label.chars().count(), MAX_LABEL_CHARS);
        assert!(terms.label.starts_with("Artist - x"));
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let title = "й".repeat(120);
        let terms = SearchTerms::for_entity(&track(&title, &["Би-2"]));

        assert_eq!(terms.label.chars().count(), MAX_LABEL_CHARS);
    }

    #[test]
    fn test_label_of_exactly_100_chars_is_kept() {
        // "A - " is four characters
        let title = "t".repeat(96);
        let terms = SearchTerms::for_entity(&track(&title, &["A"]));

        assert!(!terms.truncated);
        assert_eq!(terms.label.chars().count(), 100);
    }
}
