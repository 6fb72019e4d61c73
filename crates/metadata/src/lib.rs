//! Binary codecs for the two legacy ID3 tag layouts.
//!
//! `id3v1` handles the fixed 128-byte trailer (plus the 227-byte extended
//! block), `id3v2` the header-prefixed frame tag at the start of the file.
//! Both expose a "not present" outcome as `Ok(None)` rather than an error.

pub mod bytefield;
pub mod id3v1;
pub mod id3v2;

use std::fs;
use std::path::{Path, PathBuf};

pub use id3v1::Id3v1Tag;
pub use id3v2::Id3v2Tag;

/// Settings threaded into every write-capable call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Permit rewriting the input file in place.
    pub force: bool,
    /// Zero bytes appended after the frames of a rebuilt ID3v2 tag.
    pub padding: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            force: false,
            padding: id3v2::DEFAULT_PADDING,
        }
    }
}

#[derive(Debug)]
pub enum TagError {
    Io(std::io::Error),
    Format(&'static str),
    Corrupted(String),
    Range { field: &'static str, value: i64 },
    OverwriteRefused(PathBuf),
}

impl std::fmt::Display for TagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagError::Io(err) => write!(f, "io error: {}", err),
            TagError::Format(marker) => write!(f, "missing {} tag marker", marker),
            TagError::Corrupted(reason) => write!(f, "corrupted tag: {}", reason),
            TagError::Range { field, value } => {
                write!(f, "{} value {} does not fit its tag field", field, value)
            }
            TagError::OverwriteRefused(path) => {
                write!(f, "refusing to overwrite {:?} without force", path)
            }
        }
    }
}

impl std::error::Error for TagError {}

impl From<std::io::Error> for TagError {
    fn from(err: std::io::Error) -> Self {
        TagError::Io(err)
    }
}

/// Picks the file a writer should produce, enforcing the overwrite policy.
pub(crate) fn resolve_output(
    input: &Path,
    output: Option<&Path>,
    options: &WriteOptions,
) -> Result<PathBuf, TagError> {
    let target = output.unwrap_or(input);
    if !options.force && same_file(input, target) {
        return Err(TagError::OverwriteRefused(target.to_path_buf()));
    }
    Ok(target.to_path_buf())
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_output, TagError, WriteOptions};
    use std::path::Path;

    #[test]
    fn refuses_in_place_write_without_force() {
        let input = Path::new("song.mp3");
        let err = resolve_output(input, None, &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, TagError::OverwriteRefused(_)));

        let err = resolve_output(input, Some(input), &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, TagError::OverwriteRefused(_)));
    }

    #[test]
    fn allows_in_place_write_with_force() {
        let options = WriteOptions {
            force: true,
            ..WriteOptions::default()
        };
        let target = resolve_output(Path::new("song.mp3"), None, &options).unwrap();
        assert_eq!(target, Path::new("song.mp3"));
    }

    #[test]
    fn allows_separate_output_without_force() {
        let target = resolve_output(
            Path::new("song.mp3"),
            Some(Path::new("song.tagged.mp3")),
            &WriteOptions::default(),
        )
        .unwrap();
        assert_eq!(target, Path::new("song.tagged.mp3"));
    }
}
