//! Folder-wide and collection-wide policy applied after reconciliation.

use std::collections::{BTreeMap, HashMap};

use common::TrackFile;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Files that describe the same recording; `kept` is the first in path order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub kept: String,
    pub duplicates: Vec<String>,
}

/// Gives every file of a folder the folder's majority album and year.
///
/// Absent and empty values do not vote; a tie goes to the value seen first.
pub fn standardize_albums(files: &mut [TrackFile]) {
    let mut folders: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, file) in files.iter().enumerate() {
        folders
            .entry(file.folder_relpath.clone())
            .or_default()
            .push(idx);
    }

    for (folder, members) in folders {
        let album = majority(
            members
                .iter()
                .filter_map(|&idx| files[idx].data.album.clone())
                .filter(|album| !album.is_empty()),
        );
        let year = majority(members.iter().filter_map(|&idx| files[idx].data.year));

        if let Some(album) = &album {
            debug!("Standardizing album of {:?} to {:?}", folder, album);
        }
        for idx in members {
            let data = &mut files[idx].data;
            if album.is_some() {
                data.album = album.clone();
            }
            if year.is_some() {
                data.year = year;
            }
        }
    }
}

fn majority<T, I>(values: I) -> Option<T>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().map_or(true, |(_, top)| count > *top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Groups files whose artist, album and title match, ignoring case.
/// Files missing any of the three are never considered duplicates.
pub fn find_duplicates(files: &[TrackFile]) -> Vec<DuplicateGroup> {
    let mut order: Vec<(String, Vec<String>)> = Vec::new();
    let mut index: HashMap<(String, String, String), usize> = HashMap::new();

    for file in files {
        let Some(key) = duplicate_key(file) else {
            continue;
        };
        match index.get(&key) {
            Some(&slot) => order[slot].1.push(file.relpath.clone()),
            None => {
                index.insert(key, order.len());
                order.push((file.relpath.clone(), Vec::new()));
            }
        }
    }

    order
        .into_iter()
        .filter(|(_, duplicates)| !duplicates.is_empty())
        .map(|(kept, duplicates)| DuplicateGroup { kept, duplicates })
        .collect()
}

fn duplicate_key(file: &TrackFile) -> Option<(String, String, String)> {
    let key = |value: &Option<String>| {
        value
            .as_deref()
            .map(|text| text.trim().to_lowercase())
            .filter(|text| !text.is_empty())
    };
    Some((
        key(&file.data.artist)?,
        key(&file.data.album)?,
        key(&file.data.title)?,
    ))
}
