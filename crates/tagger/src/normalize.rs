use serde::{Deserialize, Serialize};

/// Words kept lower-case unless they open the name.
const MINOR_WORDS: &[&str] = &["and", "at", "of", "or", "the"];

pub const DEFAULT_EXTENSIONS: &[&str] = &["mp3"];

pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

/// A filename and its display form. Only `cleaned` is rewritten by the
/// folder-wide common word pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanFilename {
    pub original: String,
    pub cleaned: String,
}

/// Splits a recognized audio extension (including its dot) off `name`.
pub fn split_extension<'a>(name: &'a str, extensions: &[String]) -> (&'a str, Option<&'a str>) {
    if let Some(idx) = name.rfind('.') {
        let ext = &name[idx + 1..];
        if extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)) {
            return (&name[..idx], Some(&name[idx..]));
        }
    }
    (name, None)
}

pub fn is_audio_file(name: &str, extensions: &[String]) -> bool {
    split_extension(name, extensions).1.is_some()
}

/// Cleans a name using the default audio extensions.
pub fn clean_string(name: &str) -> String {
    clean_string_with(name, &default_extensions())
}

/// Turns separators into spaces, collapses runs of whitespace and fixes
/// capitalisation. A recognized extension keeps its dot.
pub fn clean_string_with(name: &str, extensions: &[String]) -> String {
    let (stem, ext) = split_extension(name, extensions);
    let mut text: String = stem
        .chars()
        .map(|ch| match ch {
            '.' | '-' | '_' => ' ',
            other => other,
        })
        .collect();
    if let Some(ext) = ext {
        text.push_str(ext);
    }
    let text = text.to_lowercase();

    let words: Vec<String> = text
        .split_whitespace()
        .enumerate()
        .map(|(idx, word)| {
            if idx > 0 && MINOR_WORDS.contains(&word) {
                word.to_string()
            } else {
                capitalize(word)
            }
        })
        .collect();
    words.join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
