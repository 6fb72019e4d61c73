//! ID3v2 frame tags.
//!
//! The outer body size is a 7-bit-per-byte (synchsafe) integer while each
//! frame size is a plain big-endian `u32`. Both are kept as found.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use common::TrackData;
use tracing::{debug, warn};

use crate::bytefield::{is_latin1, latin1_bytes};
use crate::{resolve_output, TagError, WriteOptions};

pub const HEADER_SIZE: usize = 10;
pub const FRAME_HEADER_SIZE: usize = 10;
pub const DEFAULT_PADDING: usize = 1024;

const TAG_MARKER: &[u8] = b"ID3";
const MAX_BODY_SIZE: usize = 0x0FFF_FFFF;

const FLAG_UNSYNCHRONISATION: u8 = 0x80;
const FLAG_EXTENDED_HEADER: u8 = 0x40;
const FLAG_FOOTER: u8 = 0x10;

pub type FrameId = [u8; 4];

pub const TITLE: FrameId = *b"TIT2";
pub const ARTIST: FrameId = *b"TPE1";
pub const ALBUM: FrameId = *b"TALB";
pub const TRACK: FrameId = *b"TRCK";
pub const YEAR: FrameId = *b"TYER";

/// Frames whose content is owned by the canonical record.
pub const RECOGNIZED: [FrameId; 5] = [ALBUM, TITLE, ARTIST, TRACK, YEAR];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TagHeader {
    major: u8,
    revision: u8,
    flags: u8,
    size: u32,
}

impl TagHeader {
    fn parse(bytes: &[u8]) -> Result<Self, TagError> {
        if bytes.len() < HEADER_SIZE || !bytes.starts_with(TAG_MARKER) {
            return Err(TagError::Format("ID3"));
        }
        if bytes[3] == 0xFF || bytes[4] == 0xFF {
            return Err(TagError::Corrupted(format!(
                "invalid version {}.{}",
                bytes[3], bytes[4]
            )));
        }
        if bytes[6..10].iter().any(|b| b & 0x80 != 0) {
            return Err(TagError::Corrupted(
                "size byte has its high bit set".to_string(),
            ));
        }
        Ok(Self {
            major: bytes[3],
            revision: bytes[4],
            flags: bytes[5],
            size: decode_synchsafe(&bytes[6..10]),
        })
    }

    fn end(&self) -> usize {
        HEADER_SIZE + self.size as usize
    }

    /// Header, body and the v2.4 footer when present.
    fn total_len(&self) -> usize {
        if self.major >= 4 && self.flags & FLAG_FOOTER != 0 {
            self.end() + HEADER_SIZE
        } else {
            self.end()
        }
    }

    fn is_unsynchronised(&self) -> bool {
        self.flags & FLAG_UNSYNCHRONISATION != 0
    }

    /// The part of the body holding frames: unsynchronisation reversed and
    /// the extended header skipped.
    fn frame_area<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, TagError> {
        let body = &bytes[HEADER_SIZE..self.end().min(bytes.len())];
        let mut area = if self.is_unsynchronised() {
            Cow::Owned(resynchronise(body))
        } else {
            Cow::Borrowed(body)
        };
        if self.flags & FLAG_EXTENDED_HEADER != 0 {
            let skip = extended_header_len(self.major, &area)?;
            area = match area {
                Cow::Borrowed(body) => Cow::Borrowed(&body[skip..]),
                Cow::Owned(mut body) => {
                    body.drain(..skip);
                    Cow::Owned(body)
                }
            };
        }
        Ok(area)
    }
}

/// v2.3 stores the size of the rest of the extended header as a plain
/// integer; v2.4 stores the whole length as a synchsafe one.
fn extended_header_len(major: u8, body: &[u8]) -> Result<usize, TagError> {
    if body.len() < 4 {
        return Err(TagError::Corrupted(
            "extended header is truncated".to_string(),
        ));
    }
    let len = if major >= 4 {
        decode_synchsafe(&body[..4]) as usize
    } else {
        4 + u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as usize
    };
    if len > body.len() {
        return Err(TagError::Corrupted(format!(
            "extended header of {} bytes overruns the tag body",
            len
        )));
    }
    Ok(len)
}

/// Drops the zero byte inserted after every 0xFF.
fn resynchronise(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut previous = 0u8;
    for &byte in bytes {
        if !(previous == 0xFF && byte == 0x00) {
            out.push(byte);
        }
        previous = byte;
    }
    out
}

fn decode_synchsafe(bytes: &[u8]) -> u32 {
    (u32::from(bytes[0]) << 21)
        | (u32::from(bytes[1]) << 14)
        | (u32::from(bytes[2]) << 7)
        | u32::from(bytes[3])
}

fn encode_synchsafe(size: usize) -> Result<[u8; 4], TagError> {
    if size > MAX_BODY_SIZE {
        return Err(TagError::Range {
            field: "tag size",
            value: size as i64,
        });
    }
    Ok([
        ((size >> 21) & 0x7F) as u8,
        ((size >> 14) & 0x7F) as u8,
        ((size >> 7) & 0x7F) as u8,
        (size & 0x7F) as u8,
    ])
}

/// One frame as laid out in the tag body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub id: FrameId,
    pub payload: &'a [u8],
    /// Header and payload together.
    pub bytes: &'a [u8],
}

/// Walks the frames of a tag body, stopping at padding or at the first
/// frame that would run past the declared body.
pub struct Frames<'a> {
    body: &'a [u8],
    offset: usize,
}

impl<'a> Frames<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self { body, offset: 0 }
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = RawFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.offset;
        if start + FRAME_HEADER_SIZE > self.body.len() || self.body[start] == 0 {
            return None;
        }
        let header = &self.body[start..start + FRAME_HEADER_SIZE];
        let id: FrameId = [header[0], header[1], header[2], header[3]];
        let size = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
        let end = match (start + FRAME_HEADER_SIZE).checked_add(size) {
            Some(end) if end <= self.body.len() => end,
            _ => {
                debug!(
                    "Frame {} of {} bytes overruns the tag body; stopping",
                    frame_name(&id),
                    size
                );
                self.offset = self.body.len();
                return None;
            }
        };
        self.offset = end;
        Some(RawFrame {
            id,
            payload: &self.body[start + FRAME_HEADER_SIZE..end],
            bytes: &self.body[start..end],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id3v2Tag {
    pub major: u8,
    pub revision: u8,
    /// Declared body size, excluding the 10-byte header.
    pub size: u32,
    frames: BTreeMap<FrameId, Vec<u8>>,
}

impl Id3v2Tag {
    /// Decodes a tag from bytes that begin with the tag header. A body shorter
    /// than the declared size (truncated file) is walked as far as it goes.
    pub fn parse(bytes: &[u8]) -> Result<Self, TagError> {
        let header = TagHeader::parse(bytes)?;
        let area = header.frame_area(bytes)?;

        let mut frames = BTreeMap::new();
        for frame in Frames::new(&area) {
            if RECOGNIZED.contains(&frame.id) {
                frames.insert(frame.id, frame.payload.to_vec());
            } else {
                debug!("Skipping frame {}", frame_name(&frame.id));
            }
        }

        Ok(Self {
            major: header.major,
            revision: header.revision,
            size: header.size,
            frames,
        })
    }

    pub fn frame(&self, id: &FrameId) -> Option<&[u8]> {
        self.frames.get(id).map(Vec::as_slice)
    }

    pub fn frames(&self) -> impl Iterator<Item = (&FrameId, &[u8])> {
        self.frames.iter().map(|(id, payload)| (id, payload.as_slice()))
    }

    pub fn text(&self, id: &FrameId) -> Option<String> {
        self.frame(id).and_then(decode_text)
    }

    pub fn track_data(&self) -> TrackData {
        TrackData {
            title: self.text(&TITLE),
            artist: self.text(&ARTIST),
            album: self.text(&ALBUM),
            year: self.text(&YEAR).and_then(|text| text.trim().parse().ok()),
            track: self.text(&TRACK).and_then(|text| parse_track(&text)),
            ..TrackData::default()
        }
    }
}

impl fmt::Display for Id3v2Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID3v2.{}.{}", self.major, self.revision)
    }
}

fn frame_name(id: &FrameId) -> String {
    String::from_utf8_lossy(id).into_owned()
}

fn parse_track(text: &str) -> Option<u32> {
    let head = text.split('/').next().unwrap_or(text).trim();
    head.parse().ok()
}

/// Decodes a text frame payload: one encoding byte, then the text.
pub fn decode_text(payload: &[u8]) -> Option<String> {
    let (&encoding, rest) = payload.split_first()?;
    let text = match encoding {
        1 => decode_utf16(rest, false),
        2 => decode_utf16(rest, true),
        3 => String::from_utf8_lossy(rest).into_owned(),
        _ => rest.iter().map(|&b| char::from(b)).collect(),
    };
    let value = text
        .split('\0')
        .map(str::trim)
        .find(|part| !part.is_empty())
        .unwrap_or("");
    Some(value.to_string())
}

fn decode_utf16(bytes: &[u8], big_endian_default: bool) -> String {
    let (big_endian, bytes) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (false, rest),
        [0xFE, 0xFF, rest @ ..] => (true, rest),
        _ => (big_endian_default, bytes),
    };
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

fn encode_text(text: &str, major: u8) -> Vec<u8> {
    if major >= 4 {
        let mut out = vec![3];
        out.extend_from_slice(text.as_bytes());
        return out;
    }
    if is_latin1(text) {
        let mut out = vec![0];
        out.extend(latin1_bytes(text));
        return out;
    }
    let mut out = vec![1, 0xFF, 0xFE];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

fn build_frame(id: FrameId, payload: &[u8]) -> Result<Vec<u8>, TagError> {
    let size = u32::try_from(payload.len()).map_err(|_| TagError::Range {
        field: "frame size",
        value: payload.len() as i64,
    })?;
    let mut out = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    out.extend_from_slice(&id);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(payload);
    Ok(out)
}

/// Builds a replacement tag: foreign frames of `existing` are copied through
/// untouched, the recognized frames are rebuilt from `data`.
pub fn rebuild(
    existing: Option<&[u8]>,
    data: &TrackData,
    padding: usize,
) -> Result<Vec<u8>, TagError> {
    let mut major = 3;
    let mut revision = 0;
    let mut body = Vec::new();

    if let Some(existing) = existing {
        let header = TagHeader::parse(existing)?;
        if header.major >= 4 && header.is_unsynchronised() {
            return Err(TagError::Corrupted(
                "unsynchronised ID3v2.4 frames cannot be copied".to_string(),
            ));
        }
        if header.major >= 3 {
            major = header.major;
            revision = header.revision;
            let area = header.frame_area(existing)?;
            for frame in Frames::new(&area) {
                if !RECOGNIZED.contains(&frame.id) {
                    body.extend_from_slice(frame.bytes);
                }
            }
        } else {
            warn!(
                "Dropping ID3v2.{} frames; rewriting as ID3v2.3",
                header.major
            );
        }
    }

    let values = [
        (TITLE, data.title.clone()),
        (ARTIST, data.artist.clone()),
        (ALBUM, data.album.clone()),
        (TRACK, data.track.map(|track| track.to_string())),
        (YEAR, data.year.map(|year| year.to_string())),
    ];
    for (id, value) in values {
        let Some(value) = value.filter(|value| !value.is_empty()) else {
            continue;
        };
        body.extend(build_frame(id, &encode_text(&value, major))?);
    }

    let size = encode_synchsafe(body.len() + padding)?;
    let mut out = Vec::with_capacity(HEADER_SIZE + body.len() + padding);
    out.extend_from_slice(TAG_MARKER);
    out.extend_from_slice(&[major, revision, 0]);
    out.extend_from_slice(&size);
    out.extend(body);
    out.resize(out.len() + padding, 0);
    Ok(out)
}

/// Splits file contents into the leading tag (if any) and the rest.
pub fn split_tag(contents: &[u8]) -> Result<(Option<&[u8]>, &[u8]), TagError> {
    if !contents.starts_with(TAG_MARKER) {
        return Ok((None, contents));
    }
    let header = TagHeader::parse(contents)?;
    let end = header.total_len().min(contents.len());
    Ok((Some(&contents[..end]), &contents[end..]))
}

/// Reads the tag at the start of the stream, `Ok(None)` when there is none.
/// The stream position is restored before returning.
pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Option<Id3v2Tag>, TagError> {
    let cursor = reader.stream_position()?;
    let result = read_at_start(reader);
    reader.seek(SeekFrom::Start(cursor))?;
    result
}

fn read_at_start<R: Read + Seek>(reader: &mut R) -> Result<Option<Id3v2Tag>, TagError> {
    reader.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::with_capacity(HEADER_SIZE);
    reader
        .by_ref()
        .take(HEADER_SIZE as u64)
        .read_to_end(&mut bytes)?;
    if bytes.len() < HEADER_SIZE || !bytes.starts_with(TAG_MARKER) {
        return Ok(None);
    }
    let header = TagHeader::parse(&bytes)?;
    reader
        .by_ref()
        .take(u64::from(header.size))
        .read_to_end(&mut bytes)?;
    Id3v2Tag::parse(&bytes).map(Some)
}

pub fn read_from_path(path: &Path) -> Result<Option<Id3v2Tag>, TagError> {
    let mut file = File::open(path)?;
    read_from(&mut file)
}

/// Rewrites the leading tag of `input` with `data`, keeping foreign frames
/// and the audio that follows the tag.
pub fn write_to_path(
    input: &Path,
    output: Option<&Path>,
    data: &TrackData,
    options: &WriteOptions,
) -> Result<(), TagError> {
    let target = resolve_output(input, output, options)?;
    let contents = fs::read(input)?;
    let (existing, audio) = split_tag(&contents)?;
    let tag = rebuild(existing, data, options.padding)?;

    let mut out = Vec::with_capacity(tag.len() + audio.len());
    out.extend(tag);
    out.extend_from_slice(audio);
    fs::write(&target, out)?;
    Ok(())
}
