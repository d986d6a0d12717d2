use crate::command::{RecognizeArgs, RecognizeSource};
use crate::engine::{Engine, Match, Recognizer};
use crate::error::{AppError, Result};
use tracing::{debug, info};

/// Pick how audio is obtained. The argument is forwarded as typed.
pub fn select_recognizer(args: &RecognizeArgs) -> Recognizer {
    match args.source {
        RecognizeSource::Microphone => Recognizer::Microphone {
            seconds: args.argument.clone(),
        },
        RecognizeSource::File => Recognizer::File {
            path: args.argument.clone(),
        },
    }
}

/// Recognize and return the printable report.
pub fn run<E: Engine>(engine: &E, args: &RecognizeArgs, json: bool) -> Result<String> {
    let recognizer = select_recognizer(args);
    debug!(?recognizer, "Recognizing");

    let matches = engine.recognize(&recognizer)?;
    let best = matches.first().ok_or(AppError::EmptyResult)?;

    info!(
        song = %best.song_name,
        confidence = best.fingerprinted_confidence,
        candidates = matches.len(),
        "Best match"
    );

    Ok(format_report(best, &matches, json))
}

fn format_report(best: &Match, matches: &[Match], json: bool) -> String {
    if json {
        let output = serde_json::json!({
            "best": best,
            "results": matches,
        });
        return format!("{:#}", output);
    }

    format!(
        "{:#}\nMost possible song is: {} with confidence {}",
        serde_json::json!(matches),
        best.song_name,
        best.fingerprinted_confidence
    )
}
