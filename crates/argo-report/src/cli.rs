//! Command-line argument parsing.

use std::path::PathBuf;

use thiserror::Error;

pub const USAGE: &str = "usage: argo-report [--write-baseline] <measurement.json>...";

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// Store the derived baseline for the configured profile.
    pub write_baseline: bool,
    /// Aggregate measurement files to merge, in the order given.
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("no measurement files given")]
    NoFiles,

    #[error("unknown option: {0}")]
    UnknownOption(String),
}

/// Parses arguments, excluding the program name.
///
/// Everything after a literal `--` is treated as a file name.
pub fn parse_args<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = String>,
{
    let mut write_baseline = false;
    let mut files = Vec::new();
    let mut options_done = false;

    for arg in args {
        if options_done || !arg.starts_with("--") {
            if !arg.trim().is_empty() {
                files.push(PathBuf::from(arg));
            }
            continue;
        }
        match arg.as_str() {
            "--" => options_done = true,
            "--write-baseline" => write_baseline = true,
            _ => return Err(ArgsError::UnknownOption(arg)),
        }
    }

    if files.is_empty() {
        return Err(ArgsError::NoFiles);
    }
    Ok(Args {
        write_baseline,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn files_only() {
        let parsed = parse_args(args(&["a.json", "b.json"])).expect("should parse");
        assert!(!parsed.write_baseline);
        assert_eq!(parsed.files, [PathBuf::from("a.json"), PathBuf::from("b.json")]);
    }

    #[test]
    fn write_baseline_flag_anywhere() {
        let parsed = parse_args(args(&["a.json", "--write-baseline"])).expect("should parse");
        assert!(parsed.write_baseline);
        assert_eq!(parsed.files, [PathBuf::from("a.json")]);
    }

    #[test]
    fn double_dash_ends_options() {
        let parsed = parse_args(args(&["--", "--write-baseline"])).expect("should parse");
        assert!(!parsed.write_baseline);
        assert_eq!(parsed.files, [PathBuf::from("--write-baseline")]);
    }

    #[test]
    fn no_files_is_an_error() {
        assert_eq!(parse_args(args(&[])), Err(ArgsError::NoFiles));
        assert_eq!(
            parse_args(args(&["--write-baseline"])),
            Err(ArgsError::NoFiles)
        );
    }

    #[test]
    fn unknown_option_is_an_error() {
        assert_eq!(
            parse_args(args(&["--verbose", "a.json"])),
            Err(ArgsError::UnknownOption("--verbose".to_string()))
        );
    }
}
