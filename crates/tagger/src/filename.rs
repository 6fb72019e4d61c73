use std::path::Path;

use common::TrackData;

use crate::normalize::{clean_string_with, split_extension};

/// Builds the record implied by a file's location and cleaned name.
///
/// With at least artist/album/file components, the parent folder names the
/// album (optionally prefixed `[YYYY] `) and the one above it the artist.
/// A purely numeric first word of the name is the track number.
pub fn track_data_from_path(path: &Path, cleaned_name: &str, extensions: &[String]) -> TrackData {
    let mut data = TrackData::default();

    let album_dir = path.parent();
    let artist_name = album_dir
        .and_then(|dir| dir.parent())
        .and_then(|dir| dir.file_name());
    let album_name = album_dir.and_then(|dir| dir.file_name());
    if let (Some(album_name), Some(artist_name)) = (album_name, artist_name) {
        let album = clean_string_with(&album_name.to_string_lossy(), extensions);
        match split_year_prefix(&album) {
            Some((year, title)) => {
                data.year = Some(year);
                data.album = Some(title.to_string());
            }
            None => data.album = Some(album),
        }
        data.artist = Some(clean_string_with(&artist_name.to_string_lossy(), extensions));
    }

    let (stem, _) = split_extension(cleaned_name, extensions);
    let words: Vec<&str> = stem.split_whitespace().collect();
    let title_words = match words.split_first() {
        Some((first, rest)) if is_track_number(first) => {
            data.track = first.parse().ok();
            rest
        }
        _ => &words[..],
    };
    if !title_words.is_empty() {
        data.title = Some(title_words.join(" "));
    }

    data
}

fn is_track_number(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_digit())
}

/// Splits `[1995] Name` into the year and the name.
fn split_year_prefix(input: &str) -> Option<(i32, &str)> {
    let rest = input.strip_prefix('[')?;
    let year_str = rest.get(..4)?;
    if !year_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let title = rest.get(4..)?.strip_prefix("] ")?;
    let year = year_str.parse::<i32>().ok()?;
    Some((year, title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::default_extensions;

    fn derive(path: &str, cleaned: &str) -> TrackData {
        track_data_from_path(Path::new(path), cleaned, &default_extensions())
    }

    #[test]
    fn reads_artist_album_and_track() {
        let data = derive(
            "music/the_beatles/help!/01 - help.mp3",
            "01 Help.mp3",
        );
        assert_eq!(data.artist.as_deref(), Some("The Beatles"));
        assert_eq!(data.album.as_deref(), Some("Help!"));
        assert_eq!(data.track, Some(1));
        assert_eq!(data.title.as_deref(), Some("Help"));
        assert_eq!(data.year, None);
    }

    #[test]
    fn reads_year_prefixed_album_folder() {
        let data = derive("Queen/[1975] a night at the opera/x.mp3", "Bohemian Rhapsody.mp3");
        assert_eq!(data.year, Some(1975));
        assert_eq!(data.album.as_deref(), Some("A Night at the Opera"));
        assert_eq!(data.track, None);
        assert_eq!(data.title.as_deref(), Some("Bohemian Rhapsody"));
    }

    #[test]
    fn shallow_paths_carry_no_album() {
        let data = derive("loose/02 Song.mp3", "02 Song.mp3");
        assert_eq!(data.album, None);
        assert_eq!(data.artist, None);
        assert_eq!(data.track, Some(2));
    }

    #[test]
    fn mixed_leading_token_is_part_of_the_title() {
        let data = derive("a/b/c.mp3", "1st Song.mp3");
        assert_eq!(data.track, None);
        assert_eq!(data.title.as_deref(), Some("1st Song"));
    }

    #[test]
    fn number_only_name_has_no_title() {
        let data = derive("a/b/07.mp3", "07.mp3");
        assert_eq!(data.track, Some(7));
        assert_eq!(data.title, None);

        let data = derive("a/b/c.mp3", "");
        assert_eq!(data.title, None);
        assert_eq!(data.track, None);
    }

    #[test]
    fn year_prefix_requires_exact_shape() {
        assert_eq!(split_year_prefix("[1999] Album"), Some((1999, "Album")));
        assert_eq!(split_year_prefix("[99] Album"), None);
        assert_eq!(split_year_prefix("[1999]Album"), None);
        assert_eq!(split_year_prefix("1999 Album"), None);
    }
}
