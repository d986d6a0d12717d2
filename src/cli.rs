use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "audiomark")]
#[command(author = "Guillermo Quinteros <gu.quinteros@gmail.com>")]
#[command(version)]
#[command(about = "Audio fingerprinting - build a fingerprint database, recognize from mic or file", long_about = None)]
pub struct Args {
    /// Path to configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fingerprint a file, or every file with EXTENSION in a directory
    #[arg(short, long, num_args = 0..=2, value_names = ["PATH", "EXTENSION"])]
    pub fingerprint: Option<Vec<String>>,

    /// Recognize what is playing: `mic SECONDS` or `file PATH`
    #[arg(short, long, num_args = 2, value_names = ["SOURCE", "ARG"])]
    pub recognize: Option<Vec<String>>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output recognition results as JSON
    #[arg(short, long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_fingerprint_directory_and_extension() {
        let args = Args::try_parse_from(["audiomark", "--fingerprint", "./songs", "mp3"]).unwrap();
        assert_eq!(
            args.fingerprint,
            Some(vec!["./songs".to_string(), "mp3".to_string()])
        );
        assert!(args.recognize.is_none());
    }

    #[test]
    fn test_fingerprint_flag_without_values() {
        let args = Args::try_parse_from(["audiomark", "-f"]).unwrap();
        assert_eq!(args.fingerprint, Some(vec![]));
    }

    #[test]
    fn test_recognize_requires_two_values() {
        assert!(Args::try_parse_from(["audiomark", "--recognize", "mic"]).is_err());

        let args = Args::try_parse_from(["audiomark", "-r", "file", "./clip.wav", "-c", "x.cnf"])
            .unwrap();
        assert_eq!(
            args.recognize,
            Some(vec!["file".to_string(), "./clip.wav".to_string()])
        );
        assert_eq!(args.config, Some(PathBuf::from("x.cnf")));
    }

    #[test]
    fn test_no_flags() {
        let args = Args::try_parse_from(["audiomark"]).unwrap();
        assert!(args.fingerprint.is_none());
        assert!(args.recognize.is_none());
        assert!(args.config.is_none());
    }
}
