use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Canonical metadata for one audio file.
///
/// Every field is optional: `None` means no source supplied a value, which is
/// not the same thing as a source supplying an empty string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub track: Option<u32>,
    #[serde(default)]
    pub genre: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl TrackData {
    pub fn is_empty(&self) -> bool {
        self == &TrackData::default()
    }
}

impl fmt::Display for TrackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().unwrap_or("");
        let album = self.album.as_deref().unwrap_or("");
        let artist = self.artist.as_deref().unwrap_or("");
        write!(
            f,
            "#{:02} '{}' - '{}' by '{}'",
            self.track.unwrap_or(0),
            title,
            album,
            artist
        )?;
        match self.year {
            Some(year) => write!(f, " in {}.", year),
            None => write!(f, "."),
        }
    }
}

/// A located audio file together with its reconciled record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackFile {
    pub id: String,
    pub path: PathBuf,
    pub relpath: String,
    pub folder_relpath: String,
    pub cleaned_name: String,
    pub data: TrackData,
    #[serde(default)]
    pub tag_errors: Vec<String>,
}

pub fn stable_id(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

pub fn relpath_from(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(path_to_slash_string(rel))
}

fn path_to_slash_string(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    parts.join("/")
}
