//! Removal of words that every filename in a folder shares at the same
//! position, typically the artist or album name baked into each file.

use crate::normalize::{clean_string_with, split_extension, CleanFilename};

/// Cleans every filename of one folder and strips their common words.
pub fn clean_folder(filenames: &[String], extensions: &[String]) -> Vec<CleanFilename> {
    let mut batch: Vec<CleanFilename> = filenames
        .iter()
        .map(|name| CleanFilename {
            original: name.clone(),
            cleaned: clean_string_with(name, extensions),
        })
        .collect();
    reduce_batch(&mut batch, extensions);
    batch
}

/// Rewrites the `cleaned` names of `batch` in place.
pub fn reduce_batch(batch: &mut [CleanFilename], extensions: &[String]) {
    let mut names: Vec<String> = batch.iter().map(|entry| entry.cleaned.clone()).collect();
    remove_common_words(&mut names, extensions);
    for (entry, name) in batch.iter_mut().zip(names) {
        entry.cleaned = name;
    }
}

/// Blanks words shared by every name at the same position.
///
/// The front pass may step over one leading word that differs (a track
/// number, say) before giving up; the back pass stops at the first
/// difference. Extensions are set aside while comparing.
pub fn remove_common_words(names: &mut [String], extensions: &[String]) {
    if names.len() < 2 {
        return;
    }

    let mut suffixes = Vec::with_capacity(names.len());
    let mut words: Vec<Vec<String>> = Vec::with_capacity(names.len());
    for name in names.iter() {
        let (stem, ext) = split_extension(name, extensions);
        suffixes.push(ext.unwrap_or("").to_string());
        words.push(stem.split_whitespace().map(str::to_string).collect());
    }

    forward_pass(&mut words);
    for list in &mut words {
        list.retain(|word| !word.is_empty());
    }
    backward_pass(&mut words);

    for ((name, list), suffix) in names.iter_mut().zip(words).zip(suffixes) {
        let kept: Vec<String> = list.into_iter().filter(|word| !word.is_empty()).collect();
        *name = kept.join(" ") + &suffix;
    }
}

fn shortest(words: &[Vec<String>]) -> usize {
    words.iter().map(Vec::len).min().unwrap_or(0)
}

fn shared_at<F>(words: &[Vec<String>], position: F) -> bool
where
    F: Fn(&[String]) -> usize,
{
    let Some((first, rest)) = words.split_first() else {
        return false;
    };
    let word = &first[position(first)];
    rest.iter().all(|list| &list[position(list)] == word)
}

fn blank_at<F>(words: &mut [Vec<String>], position: F)
where
    F: Fn(&[String]) -> usize,
{
    for list in words.iter_mut() {
        let idx = position(list);
        list[idx].clear();
    }
}

fn forward_pass(words: &mut [Vec<String>]) {
    for idx in 0..shortest(words) {
        if shared_at(words, |_| idx) {
            blank_at(words, |_| idx);
        } else if idx > 0 {
            break;
        }
    }
}

fn backward_pass(words: &mut [Vec<String>]) {
    for offset in 1..=shortest(words) {
        let position = |list: &[String]| list.len() - offset;
        if !shared_at(words, position) {
            break;
        }
        blank_at(words, position);
    }
}
