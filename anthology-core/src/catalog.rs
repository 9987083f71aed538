//! The fixed song catalog.
//!
//! The catalog is built once at startup and never mutated. Songs are ordered by
//! track number; the anthology tracks follow the standard album.

/// A single catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Song {
    /// Unique identifier
    pub id: u32,
    /// Song title as shown in the song list and sent to the analysis provider
    pub title: String,
    /// Position on the album
    pub track_number: u32,
    /// Whether the song belongs to the anthology edition
    pub is_anthology: bool,
}

impl Song {
    pub fn new(id: u32, title: impl Into<String>, track_number: u32, is_anthology: bool) -> Self {
        Self {
            id,
            title: title.into(),
            track_number,
            is_anthology,
        }
    }
}

/// (title, is_anthology) in track order. Ids and track numbers are 1-based positions.
const BUILTIN_TRACKS: &[(&str, bool)] = &[
    ("Fortnight (feat. Post Malone)", false),
    ("The Tortured Poets Department", false),
    ("My Boy Only Breaks His Favorite Toys", false),
    ("Down Bad", false),
    ("So Long, London", false),
    ("But Daddy I Love Him", false),
    ("Fresh Out the Slammer", false),
    ("Florida!!! (feat. Florence + The Machine)", false),
    ("Guilty as Sin?", false),
    ("Who's Afraid of Little Old Me?", false),
    ("I Can Fix Him (No Really I Can)", false),
    ("loml", false),
    ("I Can Do It With a Broken Heart", false),
    ("The Smallest Man Who Ever Lived", false),
    ("The Alchemy", false),
    ("Clara Bow", false),
    ("The Black Dog", true),
    ("imgonnagetyouback", true),
    ("The Albatross", true),
    ("Chloe or Sam or Sophia or Marcus", true),
    ("How Did It End?", true),
    ("So High School", true),
    ("I Hate It Here", true),
    ("thanK you aIMee", true),
    ("I Look in People's Windows", true),
    ("The Prophecy", true),
    ("Cassandra", true),
    ("Peter", true),
    ("The Bolter", true),
    ("Robin", true),
    ("The Manuscript", true),
];

/// Read-only, ordered list of songs
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    songs: Vec<Song>,
}

impl Catalog {
    /// Build a catalog from an explicit song list, ordered by track number
    #[must_use]
    pub fn new(mut songs: Vec<Song>) -> Self {
        songs.sort_by_key(|s| s.track_number);
        Self { songs }
    }

    /// The built-in album catalog
    #[must_use]
    pub fn builtin() -> Self {
        let songs = (1u32..)
            .zip(BUILTIN_TRACKS)
            .map(|(n, (title, is_anthology))| Song::new(n, *title, n, *is_anthology))
            .collect();
        Self { songs }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Song> {
        self.songs.iter()
    }

    /// Look up a song by id
    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Song> {
        self.songs.iter().find(|s| s.id == id)
    }

    /// Songs from the standard edition
    pub fn standard(&self) -> impl Iterator<Item = &Song> {
        self.songs.iter().filter(|s| !s.is_anthology)
    }

    /// Songs only present on the anthology edition
    pub fn anthology(&self) -> impl Iterator<Item = &Song> {
        self.songs.iter().filter(|s| s.is_anthology)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_size() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 31);
        assert_eq!(catalog.standard().count(), 16);
        assert_eq!(catalog.anthology().count(), 15);
    }

    #[test]
    fn test_builtin_ids_are_unique_and_ordered() {
        let catalog = Catalog::builtin();
        let ids: Vec<u32> = catalog.iter().map(|s| s.id).collect();
        let expected: Vec<u32> = (1..=31).collect();
        assert_eq!(ids, expected);
        assert!(catalog.iter().all(|s| s.id == s.track_number));
    }

    #[test]
    fn test_get_by_id() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.get(12).map(|s| s.title.as_str()), Some("loml"));
        assert!(catalog.get(17).is_some_and(|s| s.is_anthology));
        assert!(catalog.get(0).is_none());
        assert!(catalog.get(32).is_none());
    }

    #[test]
    fn test_new_sorts_by_track_number() {
        let catalog = Catalog::new(vec![
            Song::new(7, "Second", 2, false),
            Song::new(3, "First", 1, false),
        ]);
        let titles: Vec<&str> = catalog.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }
}
