mod config;

use std::env;
use std::path::PathBuf;

use common::TrackFile;
use config::{config_path_from_env, load_config, resolve_music_root, save_config, TaggerConfig};
use tagger::{scan, write_track, ScanReport};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: music_tagger [FOLDER] [-f] [-v] [--json] [--config PATH] [--init-config]
  -f             write the reconciled tags back to the files
  -v             verbose logging
  --json         print the scan report as JSON
  --config PATH  read settings from PATH instead of MUSIC_TAGGER_CONFIG
  --init-config  write a default config file and exit
  -h, --help     print this message";

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    folder: Option<PathBuf>,
    force: bool,
    verbose: bool,
    json: bool,
    config: Option<PathBuf>,
    init_config: bool,
    help: bool,
}

fn parse_args<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-f" => parsed.force = true,
            "-v" => parsed.verbose = true,
            "--json" => parsed.json = true,
            "--init-config" => parsed.init_config = true,
            "--config" => {
                let value = args.next().ok_or("--config needs a path")?;
                parsed.config = Some(PathBuf::from(value));
            }
            "-h" | "--help" => parsed.help = true,
            flag if flag.starts_with('-') => {
                return Err(format!("unknown option {}\n{}", flag, USAGE));
            }
            _ if parsed.folder.is_none() => parsed.folder = Some(PathBuf::from(&arg)),
            _ => return Err(format!("unexpected argument {}\n{}", arg, USAGE)),
        }
    }
    Ok(parsed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.config.clone().unwrap_or_else(config_path_from_env);
    if args.init_config {
        save_config(&config_path, &TaggerConfig::default())?;
        info!("Wrote default config to {:?}", config_path);
        return Ok(());
    }

    let (config, found) = load_config(&config_path)?;
    if found {
        info!("Loaded config from {:?}", config_path);
    }

    let music_root = args
        .folder
        .clone()
        .or_else(|| resolve_music_root(&config_path, &config.music_root))
        .or_else(|| env::var_os("MUSIC_ROOT").map(PathBuf::from));
    let Some(music_root) = music_root else {
        eprintln!("no music folder given\n{}", USAGE);
        std::process::exit(2);
    };

    let report = scan(&music_root, &config.scan_options())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if args.force {
        let plan = config.write_plan();
        let mut failed = 0usize;
        for file in &report.files {
            if let Err(err) = write_track(file, &plan) {
                warn!("Failed to write tags for {:?}: {}", file.path, err);
                failed += 1;
            }
        }
        info!(
            "Wrote tags for {} of {} files",
            report.files.len() - failed,
            report.files.len()
        );
    }

    Ok(())
}

fn print_report(report: &ScanReport) {
    for file in &report.files {
        print_file(file);
    }
    for group in &report.duplicates {
        println!("Duplicate of {}:", group.kept);
        for path in &group.duplicates {
            println!("  {}", path);
        }
    }
    println!(
        "Scanned: {} folders, {} files, {} with tag errors, {} duplicate groups",
        report.folders,
        report.files.len(),
        report.tag_error_count(),
        report.duplicates.len()
    );
}

fn print_file(file: &TrackFile) {
    println!("{}: {}", file.relpath, file.data);
    for error in &file.tag_errors {
        println!("  ! {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_args, CliArgs};
    use std::path::PathBuf;

    fn args(values: &[&str]) -> Result<CliArgs, String> {
        parse_args(values.iter().map(|value| value.to_string()))
    }

    #[test]
    fn parses_folder_and_flags() {
        let parsed = args(&["music", "-f", "-v", "--json"]).unwrap();
        assert_eq!(
            parsed,
            CliArgs {
                folder: Some(PathBuf::from("music")),
                force: true,
                verbose: true,
                json: true,
                ..CliArgs::default()
            }
        );
    }

    #[test]
    fn folder_is_optional() {
        let parsed = args(&["--config", "tagger.yaml"]).unwrap();
        assert_eq!(parsed.folder, None);
        assert_eq!(parsed.config, Some(PathBuf::from("tagger.yaml")));
    }

    #[test]
    fn help_is_a_flag_not_an_error() {
        let parsed = args(&["music", "--help"]).unwrap();
        assert!(parsed.help);
        assert!(args(&["-h"]).unwrap().help);
        assert!(!args(&["music"]).unwrap().help);
    }

    #[test]
    fn rejects_unknown_and_extra_arguments() {
        assert!(args(&["music", "-x"]).unwrap_err().starts_with("unknown option -x"));
        assert!(args(&["a", "b"]).unwrap_err().starts_with("unexpected argument b"));
        assert!(args(&["--config"]).is_err());
    }
}
