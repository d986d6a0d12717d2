use crate::command::FingerprintArgs;
use crate::engine::Engine;
use crate::error::{AppError, Result};
use std::collections::BTreeSet;
use tracing::info;

/// Extension in the form the engine expects: exactly one leading dot.
pub fn normalize_extension(extension: &str) -> String {
    format!(".{}", extension.trim_start_matches('.'))
}

/// Fingerprint a directory (with extension) or a single file.
///
/// The engine is called at most once, and never when the target is rejected.
pub fn run<E: Engine>(engine: &E, args: &FingerprintArgs, workers: usize, quiet: bool) -> Result<()> {
    match args {
        FingerprintArgs::WithExtension { path, extension } => {
            let extension = normalize_extension(extension);
            if !quiet {
                println!(
                    "Fingerprinting all {} files in the {} directory",
                    extension,
                    path.display()
                );
            }

            let extensions = BTreeSet::from([extension]);
            engine.fingerprint_directory(path, &extensions, workers)?;
        }
        FingerprintArgs::PathOnly { path } => {
            if path.is_dir() {
                return Err(AppError::AmbiguousTarget(path.display().to_string()));
            }

            info!(file = %path.display(), "Fingerprinting file");
            engine.fingerprint_file(path)?;
        }
    }

    Ok(())
}
