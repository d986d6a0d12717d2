//! Turning parsed flags into exactly one command.
//!
//! Validation is pure: nothing here touches the filesystem or the engine.

use std::path::PathBuf;
use std::str::FromStr;

use crate::cli::Args;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fingerprint(FingerprintArgs),
    Recognize(RecognizeArgs),
    /// Nothing requested; the caller prints help.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintArgs {
    /// A directory plus the extension of the files to take from it.
    WithExtension { path: PathBuf, extension: String },
    /// A single path; rejected later if it turns out to be a directory.
    PathOnly { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizeSource {
    Microphone,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizeArgs {
    pub source: RecognizeSource,
    /// Capture seconds or file path, untouched.
    pub argument: String,
}

impl FromStr for RecognizeSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mic" | "microphone" => Ok(RecognizeSource::Microphone),
            "file" => Ok(RecognizeSource::File),
            other => Err(AppError::Usage(format!(
                "invalid recognize source '{}' (expected mic, microphone or file)",
                other
            ))),
        }
    }
}

impl Command {
    pub fn from_args(args: &Args) -> Result<Self> {
        Self::from_groups(args.fingerprint.as_deref(), args.recognize.as_deref())
    }

    /// Validate the two argument groups; `None` means the flag was absent.
    pub fn from_groups(fingerprint: Option<&[String]>, recognize: Option<&[String]>) -> Result<Self> {
        match (fingerprint, recognize) {
            (None, None) => Ok(Command::None),
            (Some(_), Some(_)) => Err(AppError::Usage(
                "--fingerprint and --recognize cannot be used together".to_string(),
            )),
            (Some(values), None) => parse_fingerprint(values).map(Command::Fingerprint),
            (None, Some(values)) => parse_recognize(values).map(Command::Recognize),
        }
    }
}

fn parse_fingerprint(values: &[String]) -> Result<FingerprintArgs> {
    match values {
        [path, extension] => {
            if extension.trim_start_matches('.').is_empty() {
                return Err(AppError::Usage(format!(
                    "invalid extension '{}'",
                    extension
                )));
            }
            Ok(FingerprintArgs::WithExtension {
                path: PathBuf::from(path),
                extension: extension.clone(),
            })
        }
        [path] => Ok(FingerprintArgs::PathOnly {
            path: PathBuf::from(path),
        }),
        [] => Err(AppError::Usage(
            "--fingerprint needs a file, or a directory and an extension".to_string(),
        )),
        _ => Err(AppError::Usage(format!(
            "--fingerprint takes at most 2 values, got {}",
            values.len()
        ))),
    }
}

fn parse_recognize(values: &[String]) -> Result<RecognizeArgs> {
    match values {
        [source, argument] => Ok(RecognizeArgs {
            source: source.parse()?,
            argument: argument.clone(),
        }),
        _ => Err(AppError::Usage(format!(
            "--recognize takes exactly 2 values (source and argument), got {}",
            values.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_neither_group_is_none() {
        assert_eq!(Command::from_groups(None, None).unwrap(), Command::None);
    }

    #[test]
    fn test_both_groups_rejected() {
        let fp = strings(&["./songs", "mp3"]);
        let rec = strings(&["file", "./clip.wav"]);

        let err = Command::from_groups(Some(fp.as_slice()), Some(rec.as_slice())).unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));
    }

    #[test]
    fn test_fingerprint_two_values() {
        let fp = strings(&["./songs", "mp3"]);
        assert_eq!(
            Command::from_groups(Some(fp.as_slice()), None).unwrap(),
            Command::Fingerprint(FingerprintArgs::WithExtension {
                path: PathBuf::from("./songs"),
                extension: "mp3".to_string(),
            })
        );
    }

    #[test]
    fn test_fingerprint_one_value() {
        let fp = strings(&["./song.wav"]);
        assert_eq!(
            Command::from_groups(Some(fp.as_slice()), None).unwrap(),
            Command::Fingerprint(FingerprintArgs::PathOnly {
                path: PathBuf::from("./song.wav"),
            })
        );
    }

    #[test]
    fn test_fingerprint_flag_without_values_rejected() {
        let err = Command::from_groups(Some(&[][..]), None).unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));
    }

    #[test]
    fn test_fingerprint_blank_extension_rejected() {
        for ext in ["", ".", ".."] {
            let fp = strings(&["./songs", ext]);
            assert!(matches!(
                Command::from_groups(Some(fp.as_slice()), None),
                Err(AppError::Usage(_))
            ));
        }
    }

    #[test]
    fn test_recognize_sources() {
        for (source, expected) in [
            ("mic", RecognizeSource::Microphone),
            ("microphone", RecognizeSource::Microphone),
            ("file", RecognizeSource::File),
        ] {
            let rec = strings(&[source, "10"]);
            assert_eq!(
                Command::from_groups(None, Some(rec.as_slice())).unwrap(),
                Command::Recognize(RecognizeArgs {
                    source: expected,
                    argument: "10".to_string(),
                })
            );
        }
    }

    #[test]
    fn test_recognize_source_is_case_sensitive() {
        let rec = strings(&["MIC", "10"]);
        let err = Command::from_groups(None, Some(rec.as_slice())).unwrap_err();
        assert!(err.to_string().contains("MIC"));
    }

    #[test]
    fn test_recognize_unknown_source_named_in_error() {
        let rec = strings(&["radio", "fm"]);
        match Command::from_groups(None, Some(rec.as_slice())) {
            Err(AppError::Usage(msg)) => assert!(msg.contains("radio")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_recognize_argument_passed_through() {
        let rec = strings(&["file", "  ./odd name.WAV "]);
        match Command::from_groups(None, Some(rec.as_slice())).unwrap() {
            Command::Recognize(args) => assert_eq!(args.argument, "  ./odd name.WAV "),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_recognize_wrong_arity_rejected() {
        let rec = strings(&["mic"]);
        assert!(matches!(
            Command::from_groups(None, Some(rec.as_slice())),
            Err(AppError::Usage(_))
        ));
    }

    proptest! {
        /// Any flag combination yields a command or a usage error, never a panic.
        #[test]
        fn validation_is_total(
            fp in proptest::option::of(prop::collection::vec(".*", 0..4)),
            rec in proptest::option::of(prop::collection::vec(".*", 0..4)),
        ) {
            match Command::from_groups(fp.as_deref(), rec.as_deref()) {
                Ok(_) | Err(AppError::Usage(_)) => {}
                Err(other) => prop_assert!(false, "unexpected error class: {}", other),
            }
        }

        /// Supplying both groups is always a usage error.
        #[test]
        fn both_groups_always_rejected(
            fp in prop::collection::vec("[a-z./]{1,10}", 0..3),
            rec in prop::collection::vec("[a-z./]{1,10}", 0..3),
        ) {
            let result = Command::from_groups(Some(fp.as_slice()), Some(rec.as_slice()));
            prop_assert!(matches!(result, Err(AppError::Usage(_))));
        }
    }
}
