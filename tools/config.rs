use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use metadata::WriteOptions;
use serde::{Deserialize, Serialize};
use tagger::{default_extensions, ScanOptions, WritePlan};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    pub version: u32,
    pub music_root: String,
    pub extensions: Vec<String>,
    pub write_id3v1: bool,
    pub write_id3v2: bool,
    pub standardize_albums: bool,
    pub id3v2_padding: usize,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            music_root: String::new(),
            extensions: default_extensions(),
            write_id3v1: true,
            write_id3v2: false,
            standardize_albums: true,
            id3v2_padding: metadata::id3v2::DEFAULT_PADDING,
        }
    }
}

impl TaggerConfig {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            extensions: self.extensions.clone(),
            standardize_albums: self.standardize_albums,
        }
    }

    /// Plan for writing records back into the scanned files themselves.
    pub fn write_plan(&self) -> WritePlan {
        WritePlan {
            id3v1: self.write_id3v1,
            id3v2: self.write_id3v2,
            options: WriteOptions {
                force: true,
                padding: self.id3v2_padding,
            },
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "cannot access config: {}", err),
            ConfigError::Yaml(err) => write!(f, "invalid config: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

/// `MUSIC_TAGGER_CONFIG` when set, else `config.yaml` next to the binary.
pub fn config_path_from_env() -> PathBuf {
    if let Some(value) = env::var_os("MUSIC_TAGGER_CONFIG").filter(|value| !value.is_empty()) {
        return PathBuf::from(value);
    }
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    exe_dir.unwrap_or_default().join("config.yaml")
}

/// Loads the config at `path`; the flag tells whether a file was found.
/// A missing file yields the defaults and is not created.
pub fn load_config(path: &Path) -> Result<(TaggerConfig, bool), ConfigError> {
    if !path.exists() {
        return Ok((TaggerConfig::default(), false));
    }

    let contents = fs::read_to_string(path)?;
    let mut config: TaggerConfig = serde_yaml::from_str(&contents)?;
    if config.version < CONFIG_VERSION {
        config.version = CONFIG_VERSION;
    }
    config.extensions = config
        .extensions
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();
    if config.extensions.is_empty() {
        config.extensions = default_extensions();
    }
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &TaggerConfig) -> Result<(), ConfigError> {
    let yaml = serde_yaml::to_string(config)?;
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)?,
        _ => {}
    }
    fs::write(path, yaml)?;
    Ok(())
}

/// A relative `music_root` is taken from the directory holding the config.
pub fn resolve_music_root(config_path: &Path, music_root: &str) -> Option<PathBuf> {
    let music_root = music_root.trim();
    if music_root.is_empty() {
        return None;
    }
    let music_root = Path::new(music_root);
    if music_root.is_absolute() {
        return Some(music_root.to_path_buf());
    }
    let config_dir = config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Some(config_dir.join(music_root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, found) = load_config(&dir.path().join("config.yaml")).unwrap();
        assert!(!found);
        assert_eq!(config, TaggerConfig::default());
        assert!(!dir.path().join("config.yaml").exists());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = TaggerConfig {
            music_root: "/srv/music".to_string(),
            write_id3v2: true,
            ..TaggerConfig::default()
        };
        save_config(&path, &config).unwrap();
        let (loaded, found) = load_config(&path).unwrap();
        assert!(found);
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults_and_normalizes_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "write_id3v2: true\nextensions: [\".MP3\", \" flac \", \"\"]\n").unwrap();
        let (config, _) = load_config(&path).unwrap();
        assert!(config.write_id3v2);
        assert!(config.write_id3v1);
        assert_eq!(config.extensions, vec!["mp3", "flac"]);

        fs::write(&path, "extensions: []\n").unwrap();
        let (config, _) = load_config(&path).unwrap();
        assert_eq!(config.extensions, default_extensions());
    }

    #[test]
    fn invalid_yaml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "write_id3v1: [not a bool\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn music_root_resolves_against_config_dir() {
        let config_path = Path::new("/etc/tagger/config.yaml");
        assert_eq!(
            resolve_music_root(config_path, "music"),
            Some(PathBuf::from("/etc/tagger/music"))
        );
        assert_eq!(
            resolve_music_root(config_path, "/srv/music"),
            Some(PathBuf::from("/srv/music"))
        );
        assert_eq!(resolve_music_root(config_path, "  "), None);
        assert_eq!(
            resolve_music_root(Path::new("config.yaml"), "music"),
            Some(PathBuf::from("./music"))
        );
    }

    #[test]
    fn stale_force_key_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "force: true\nwrite_id3v1: false\n").unwrap();
        let (config, found) = load_config(&path).unwrap();
        assert!(found);
        assert!(!config.write_id3v1);
    }

    #[test]
    fn write_plan_targets_scanned_files() {
        let config = TaggerConfig {
            id3v2_padding: 12,
            ..TaggerConfig::default()
        };
        let plan = config.write_plan();
        assert!(plan.options.force);
        assert_eq!(plan.options.padding, 12);
        assert!(plan.id3v1);
        assert!(!plan.id3v2);
    }
}
