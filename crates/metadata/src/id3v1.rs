//! ID3v1 / ID3v1.1 trailer tags, with the optional 227-byte `TAG+` block.

use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use common::TrackData;

use crate::bytefield::{pack, strip};
use crate::{resolve_output, TagError, WriteOptions};

pub const TAG_SIZE: usize = 128;
pub const EXT_TAG_SIZE: usize = 227;
pub const FULL_TAG_SIZE: usize = TAG_SIZE + EXT_TAG_SIZE;

/// Genre byte written when the record carries no genre.
pub const GENRE_UNKNOWN: u8 = 255;

const TAG_MARKER: &[u8] = b"TAG";
const EXT_TAG_MARKER: &[u8] = b"TAG+";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Id3v1Version {
    V10,
    V11,
}

impl Id3v1Version {
    pub fn minor(self) -> u8 {
        match self {
            Id3v1Version::V10 => 0,
            Id3v1Version::V11 => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3v1Tag {
    pub version: Id3v1Version,
    pub data: TrackData,
    pub comment: String,
    pub genre: u8,
    pub is_extended: bool,
}

impl Id3v1Tag {
    /// Decodes a trailer tag. `ext_header` is the 227 bytes preceding the
    /// tag and is ignored unless it starts with `TAG+`.
    pub fn parse(header: &[u8; TAG_SIZE], ext_header: &[u8]) -> Result<Self, TagError> {
        if !header.starts_with(TAG_MARKER) {
            return Err(TagError::Format("TAG"));
        }

        let mut data = TrackData {
            title: Some(strip(&header[3..33])),
            artist: Some(strip(&header[33..63])),
            album: Some(strip(&header[63..93])),
            year: parse_year(&strip(&header[93..97])),
            ..TrackData::default()
        };

        let (version, comment) = if header[125] == 0 && header[126] != 0 {
            data.track = Some(u32::from(header[126]));
            (Id3v1Version::V11, strip(&header[97..125]))
        } else {
            (Id3v1Version::V10, strip(&header[97..127]))
        };
        let genre = header[127];
        data.comment = Some(comment.clone());
        data.genre = Some(u32::from(genre));

        let is_extended =
            ext_header.len() >= EXT_TAG_SIZE && ext_header.starts_with(EXT_TAG_MARKER);
        if is_extended {
            append(&mut data.title, &ext_header[4..64]);
            append(&mut data.artist, &ext_header[64..124]);
            append(&mut data.album, &ext_header[124..184]);
        }

        Ok(Self {
            version,
            data,
            comment,
            genre,
            is_extended,
        })
    }

    pub fn track_data(&self) -> &TrackData {
        &self.data
    }

    pub fn into_track_data(self) -> TrackData {
        self.data
    }
}

impl fmt::Display for Id3v1Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID3v1.{}{}",
            self.version.minor(),
            if self.is_extended { "+" } else { "" }
        )
    }
}

fn append(target: &mut Option<String>, field: &[u8]) {
    if let Some(text) = target.as_mut() {
        text.push_str(&strip(field));
    }
}

fn parse_year(text: &str) -> Option<i32> {
    if text.is_empty() {
        return None;
    }
    text.parse().ok()
}

/// Encodes `data` as an ID3v1.1 tag with a blank comment.
pub fn serialize(data: &TrackData) -> Result<[u8; TAG_SIZE], TagError> {
    let year = match data.year {
        Some(year) if (0..=9999).contains(&year) => format!("{:04}", year).into_bytes(),
        Some(year) => {
            return Err(TagError::Range {
                field: "year",
                value: i64::from(year),
            })
        }
        None => vec![0; 4],
    };
    let track = byte_field("track", data.track.unwrap_or(0))?;
    let genre = match data.genre {
        Some(genre) => byte_field("genre", genre)?,
        None => GENRE_UNKNOWN,
    };

    let mut out = [0u8; TAG_SIZE];
    out[0..3].copy_from_slice(TAG_MARKER);
    out[3..33].copy_from_slice(&pack(data.title.as_deref(), 30));
    out[33..63].copy_from_slice(&pack(data.artist.as_deref(), 30));
    out[63..93].copy_from_slice(&pack(data.album.as_deref(), 30));
    out[93..97].copy_from_slice(&year);
    // 97..125 comment and 125 version marker stay zero.
    out[126] = track;
    out[127] = genre;
    Ok(out)
}

fn byte_field(field: &'static str, value: u32) -> Result<u8, TagError> {
    u8::try_from(value).map_err(|_| TagError::Range {
        field,
        value: i64::from(value),
    })
}

/// Length of the trailer tag at the end of `tail`, which must hold the last
/// bytes of the file (up to `FULL_TAG_SIZE` of them).
pub fn trailing_tag_size(tail: &[u8]) -> usize {
    let len = tail.len();
    if len < TAG_SIZE || !tail[len - TAG_SIZE..].starts_with(TAG_MARKER) {
        return 0;
    }
    if len >= FULL_TAG_SIZE && tail[len - FULL_TAG_SIZE..].starts_with(EXT_TAG_MARKER) {
        FULL_TAG_SIZE
    } else {
        TAG_SIZE
    }
}

/// Size on disk of the trailer tag, 0 when there is none. The stream
/// position is restored before returning.
pub fn tag_size<R: Read + Seek>(reader: &mut R) -> Result<usize, TagError> {
    let tail = read_tail(reader)?;
    Ok(trailing_tag_size(&tail))
}

/// Reads the trailer tag, returning `Ok(None)` when the file has none.
pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Option<Id3v1Tag>, TagError> {
    let tail = read_tail(reader)?;
    if tail.len() < TAG_SIZE {
        return Ok(None);
    }
    let (ext_header, header) = tail.split_at(tail.len() - TAG_SIZE);
    let header: &[u8; TAG_SIZE] = match header.try_into() {
        Ok(header) => header,
        Err(_) => return Ok(None),
    };
    if !header.starts_with(TAG_MARKER) {
        return Ok(None);
    }
    Id3v1Tag::parse(header, ext_header).map(Some)
}

pub fn read_from_path(path: &Path) -> Result<Option<Id3v1Tag>, TagError> {
    let mut file = File::open(path)?;
    read_from(&mut file)
}

/// Replaces (or appends) the trailer tag of `input`, writing the result to
/// `output`, or back to `input` when `options.force` allows it.
pub fn write_to_path(
    input: &Path,
    output: Option<&Path>,
    data: &TrackData,
    options: &WriteOptions,
) -> Result<(), TagError> {
    let target = resolve_output(input, output, options)?;
    let tag = serialize(data)?;

    let mut contents = fs::read(input)?;
    let tail_start = contents.len().saturating_sub(FULL_TAG_SIZE);
    let existing = trailing_tag_size(&contents[tail_start..]);
    contents.truncate(contents.len() - existing);
    contents.extend_from_slice(&tag);

    fs::write(&target, contents)?;
    Ok(())
}

fn read_tail<R: Read + Seek>(reader: &mut R) -> Result<Vec<u8>, TagError> {
    let cursor = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    let want = len.min(FULL_TAG_SIZE as u64);
    reader.seek(SeekFrom::End(-(want as i64)))?;
    let mut tail = Vec::with_capacity(want as usize);
    let result = reader.by_ref().take(want).read_to_end(&mut tail);
    reader.seek(SeekFrom::Start(cursor))?;
    result?;
    Ok(tail)
}
