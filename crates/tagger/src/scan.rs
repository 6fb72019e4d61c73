use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use common::{relpath_from, stable_id, TrackFile};
use metadata::{id3v1, id3v2, TagError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::filename::track_data_from_path;
use crate::normalize::{default_extensions, is_audio_file};
use crate::reconcile::Sources;
use crate::reduce::clean_folder;
use crate::standardize::{find_duplicates, standardize_albums, DuplicateGroup};
use crate::TaggerError;

#[derive(Clone, Debug)]
pub struct ScanOptions {
    pub extensions: Vec<String>,
    pub standardize_albums: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            standardize_albums: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanReport {
    pub folders: usize,
    pub files: Vec<TrackFile>,
    pub duplicates: Vec<DuplicateGroup>,
}

impl ScanReport {
    pub fn tag_error_count(&self) -> usize {
        self.files.iter().filter(|file| !file.tag_errors.is_empty()).count()
    }
}

/// Walks `root`, building one reconciled record per audio file.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<ScanReport, TaggerError> {
    if !root.is_dir() {
        return Err(TaggerError::MissingRoot(root.to_path_buf()));
    }

    let folders = collect_folders(root, &options.extensions);
    info!("Found {} folders with audio files", folders.len());

    let mut files = Vec::new();
    for (dir, names) in &folders {
        let folder_relpath = relpath_from(root, dir).unwrap_or_default();
        let cleaned = clean_folder(names, &options.extensions);
        for entry in cleaned {
            let path = dir.join(&entry.original);
            let relpath = match relpath_from(root, &path) {
                Some(rel) => rel,
                None => continue,
            };
            let mut sources = Sources {
                filename: Some(track_data_from_path(
                    &path,
                    &entry.cleaned,
                    &options.extensions,
                )),
                ..Sources::default()
            };
            let mut tag_errors = Vec::new();

            match id3v1::read_from_path(&path) {
                Ok(Some(tag)) => {
                    debug!("{} tag found in {:?}", tag, path);
                    sources.id3v1 = Some(tag.into_track_data());
                }
                Ok(None) => {}
                Err(err) => record_tag_error(&path, "ID3v1", err, &mut tag_errors),
            }
            match id3v2::read_from_path(&path) {
                Ok(Some(tag)) => {
                    debug!("{} tag found in {:?}", tag, path);
                    sources.id3v2 = Some(tag.track_data());
                }
                Ok(None) => {}
                Err(err) => record_tag_error(&path, "ID3v2", err, &mut tag_errors),
            }

            files.push(TrackFile {
                id: stable_id(&relpath),
                path,
                relpath,
                folder_relpath: folder_relpath.clone(),
                cleaned_name: entry.cleaned,
                data: sources.reconcile(),
                tag_errors,
            });
        }
    }

    if options.standardize_albums {
        standardize_albums(&mut files);
    }
    let duplicates = find_duplicates(&files);
    if !duplicates.is_empty() {
        info!("Found {} duplicate groups", duplicates.len());
    }

    Ok(ScanReport {
        folders: folders.len(),
        files,
        duplicates,
    })
}

fn record_tag_error(path: &Path, kind: &str, err: TagError, errors: &mut Vec<String>) {
    warn!("Failed to read {} tag for {:?}: {}", kind, path, err);
    errors.push(format!("{}: {}", kind, err));
}

/// Audio filenames per directory, both sorted.
fn collect_folders(root: &Path, extensions: &[String]) -> BTreeMap<PathBuf, Vec<String>> {
    let mut folders: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_audio_file(&name, extensions) {
            continue;
        }
        if let Some(parent) = entry.path().parent() {
            folders.entry(parent.to_path_buf()).or_default().push(name);
        }
    }

    for names in folders.values_mut() {
        names.sort();
    }
    folders
}

/// Which tag layouts to write, and how.
#[derive(Clone, Copy, Debug, Default)]
pub struct WritePlan {
    pub id3v1: bool,
    pub id3v2: bool,
    pub options: metadata::WriteOptions,
}

/// Writes the reconciled record back into the file in place.
pub fn write_track(file: &TrackFile, plan: &WritePlan) -> Result<(), TaggerError> {
    if plan.id3v2 {
        id3v2::write_to_path(&file.path, None, &file.data, &plan.options)?;
    }
    if plan.id3v1 {
        id3v1::write_to_path(&file.path, None, &file.data, &plan.options)?;
    }
    debug!("Wrote tags for {:?}", file.path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::TrackData;
    use std::fs;

    fn touch(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn tagged(data: &TrackData) -> Vec<u8> {
        let mut contents = vec![0xFFu8, 0xFB, 0x90, 0x00];
        contents.extend_from_slice(&id3v1::serialize(data).unwrap());
        contents
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan(&dir.path().join("absent"), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, TaggerError::MissingRoot(_)));
    }

    #[test]
    fn builds_records_from_paths_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let album = dir.path().join("the_beatles").join("[1965] help!");
        touch(&album.join("01 - The Beatles - Help.mp3"), &[0u8; 16]);
        touch(
            &album.join("02 - The Beatles - Yesterday.mp3"),
            &tagged(&TrackData {
                title: Some("Yesterday (Remastered)".to_string()),
                ..TrackData::default()
            }),
        );
        touch(&album.join("cover.jpg"), b"jpeg");

        let report = scan(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(report.folders, 1);
        assert_eq!(report.files.len(), 2);

        let first = &report.files[0];
        assert_eq!(first.relpath, "the_beatles/[1965] help!/01 - The Beatles - Help.mp3");
        assert_eq!(first.cleaned_name, "01 Help.mp3");
        assert_eq!(first.data.title.as_deref(), Some("Help"));
        assert_eq!(first.data.artist.as_deref(), Some("The Beatles"));
        assert_eq!(first.data.album.as_deref(), Some("Help!"));
        assert_eq!(first.data.year, Some(1965));
        assert_eq!(first.data.track, Some(1));
        assert!(first.tag_errors.is_empty());

        let second = &report.files[1];
        assert_eq!(second.data.title.as_deref(), Some("Yesterday (Remastered)"));
        assert_eq!(second.data.track, Some(2));
        assert_eq!(second.data.album.as_deref(), Some("Help!"));
    }

    #[test]
    fn records_corrupted_frame_tags() {
        let dir = tempfile::tempdir().unwrap();
        let mut contents = b"ID3\x03\x00\x00\x80\x00\x00\x00".to_vec();
        contents.extend_from_slice(&[0u8; 32]);
        touch(&dir.path().join("a").join("b").join("song.mp3"), &contents);

        let report = scan(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(report.tag_error_count(), 1);
        assert!(report.files[0].tag_errors[0].starts_with("ID3v2"));
        assert_eq!(report.files[0].data.title.as_deref(), Some("Song"));
    }

    #[test]
    fn writes_reconciled_record_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queen").join("jazz").join("03 Jealousy.mp3");
        touch(&path, &[0xFFu8, 0xFB, 0x90, 0x00]);

        let report = scan(dir.path(), &ScanOptions::default()).unwrap();
        let plan = WritePlan {
            id3v1: true,
            id3v2: true,
            options: metadata::WriteOptions {
                force: true,
                padding: 64,
            },
        };
        write_track(&report.files[0], &plan).unwrap();

        let v1 = id3v1::read_from_path(&path).unwrap().unwrap();
        assert_eq!(v1.data.title.as_deref(), Some("Jealousy"));
        assert_eq!(v1.data.track, Some(3));
        let v2 = id3v2::read_from_path(&path).unwrap().unwrap();
        assert_eq!(v2.track_data().album.as_deref(), Some("Jazz"));
        assert_eq!(v2.track_data().artist.as_deref(), Some("Queen"));
    }

    #[test]
    fn write_without_force_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x").join("y").join("song.mp3");
        touch(&path, &[0u8; 8]);
        let report = scan(dir.path(), &ScanOptions::default()).unwrap();
        let plan = WritePlan {
            id3v1: true,
            ..WritePlan::default()
        };
        let err = write_track(&report.files[0], &plan).unwrap_err();
        assert!(matches!(
            err,
            TaggerError::Tag(TagError::OverwriteRefused(_))
        ));
    }
}
