/// Utility functions for parsing multi-value metadata fields

use regex::Regex;
use std::sync::OnceLock;

use crate::db::models::Artist;

/// Get the regex pattern for splitting artist credits
fn get_separator_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        // Match any of: semicolon, comma, ampersand, "ft.", "feat." (any case)
        Regex::new(r"(?i)\s*;\s*|\s*,\s*|\s*&\s*|\s*\bft\.\s*|\s*\bfeat\.\s*")
            .expect("artist separator pattern is valid")
    })
}

/// Parse a multi-value field into individual values
///
/// Splits on: `; , & ft. feat.`
///
/// # Examples
/// ```
/// use queueboard_lib::metadata::parser::parse_multi_value;
///
/// let artists = parse_multi_value("Artist A, Artist B & Artist C");
/// assert_eq!(artists, vec!["Artist A", "Artist B", "Artist C"]);
/// ```
pub fn parse_multi_value(value: &str) -> Vec<String> {
    if value.is_empty() {
        return vec![];
    }

    let regex = get_separator_regex();

    regex
        .split(value)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Parse an artist tag into ordered artist credits
pub fn parse_artists(artist: &str) -> Vec<Artist> {
    parse_multi_value(artist)
        .into_iter()
        .map(Artist::named)
        .collect()
}
