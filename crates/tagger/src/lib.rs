//! Filename cleaning, metadata reconciliation and the directory scan that
//! ties them to the tag codecs.

pub mod filename;
pub mod normalize;
pub mod reconcile;
pub mod reduce;
pub mod scan;
pub mod standardize;

use std::path::PathBuf;

use metadata::TagError;

pub use filename::track_data_from_path;
pub use normalize::{clean_string, clean_string_with, default_extensions, CleanFilename};
pub use reconcile::{reconcile, Sources};
pub use reduce::{clean_folder, remove_common_words};
pub use scan::{scan, write_track, ScanOptions, ScanReport, WritePlan};
pub use standardize::{find_duplicates, standardize_albums, DuplicateGroup};

#[derive(Debug)]
pub enum TaggerError {
    Io(std::io::Error),
    Tag(TagError),
    MissingRoot(PathBuf),
}

impl std::fmt::Display for TaggerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaggerError::Io(err) => write!(f, "io error: {}", err),
            TaggerError::Tag(err) => write!(f, "tag error: {}", err),
            TaggerError::MissingRoot(path) => write!(f, "music folder not found: {:?}", path),
        }
    }
}

impl std::error::Error for TaggerError {}

impl From<std::io::Error> for TaggerError {
    fn from(err: std::io::Error) -> Self {
        TaggerError::Io(err)
    }
}

impl From<TagError> for TaggerError {
    fn from(err: TagError) -> Self {
        TaggerError::Tag(err)
    }
}
