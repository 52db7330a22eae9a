//! Single-file conversion: MILXLY file in, NVG file out.
//!
//! Output is written to a temporary file next to the destination and moved
//! into place only after the transcoder finished successfully, so a failed
//! conversion never leaves a partial NVG file behind.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::diagnostics::Diagnostics;
use crate::emitter::{BufferedEmitter, EmitStrategy, IncrementalEmitter};
use crate::error::{ConversionError, Result, TranscodeResult};
use crate::transcoder::{StreamingTranscoder, TranscodeOptions, TranscodeReport};

/// Suffix appended to the input file name when no output path is given
pub const DEFAULT_OUTPUT_SUFFIX: &str = ".nvg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub transcode: TranscodeOptions,
    pub strategy: EmitStrategy,
    pub output_suffix: String,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            transcode: TranscodeOptions::default(),
            strategy: EmitStrategy::default(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

/// Outcome of one successful file conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub report: TranscodeReport,
}

/// `plan.milxly` becomes `plan.milxly.nvg` with the default suffix
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Convert `input` into `output`, or into the default output path.
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    options: &ConversionOptions,
    diagnostics: &dyn Diagnostics,
) -> Result<ConversionOutcome> {
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(input, &options.output_suffix),
    };

    if same_file(input, &output)? {
        return Err(ConversionError::InvalidOutputTarget {
            path: output,
            reason: "output would overwrite the input file".to_string(),
        });
    }
    if output.is_dir() {
        return Err(ConversionError::InvalidOutputTarget {
            path: output,
            reason: "output path is a directory".to_string(),
        });
    }

    diagnostics.debug(
        "convert",
        format!("Converting {} into {}", input.display(), output.display()),
    );
    let source = File::open(input)?;

    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staging = staging_file(parent)?;

    let transcoded = {
        let transcoder = StreamingTranscoder::new(options.transcode.clone(), diagnostics);
        let sink = BufWriter::new(staging.as_file_mut());
        run_strategy(&transcoder, BufReader::new(source), sink, options.strategy)
    };

    let report = match transcoded {
        Ok(report) => report,
        Err(e) => {
            // A destination from an earlier run would no longer match its input
            match std::fs::remove_file(&output) {
                Err(remove) if remove.kind() != ErrorKind::NotFound => diagnostics.warn(
                    "convert",
                    format!("Could not remove stale {}: {}", output.display(), remove),
                ),
                _ => {}
            }
            return Err(e.for_file(input));
        }
    };

    staging.persist(&output).map_err(|e| e.error)?;

    diagnostics.info(
        "convert",
        format!(
            "{} -> {} ({} nodes)",
            input.display(),
            output.display(),
            report.nodes_emitted
        ),
    );

    Ok(ConversionOutcome {
        input: input.to_path_buf(),
        output,
        report,
    })
}

/// Whether `output` names the same file as `input`, also when one is
/// relative and the other absolute or when `output` does not exist yet.
fn same_file(input: &Path, output: &Path) -> std::io::Result<bool> {
    let input = input.canonicalize()?;
    let output = match output.canonicalize() {
        Ok(resolved) => resolved,
        Err(_) => {
            let Some(name) = output.file_name() else {
                return Ok(false);
            };
            let parent = match output.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            match parent.canonicalize() {
                Ok(parent) => parent.join(name),
                // A missing directory cannot hold the input
                Err(_) => return Ok(false),
            }
        }
    };
    Ok(input == output)
}

/// Temporary file in `dir` with the mode a plain `File::create` would give.
///
/// The mode is the open mode, so the process umask still applies to it.
#[cfg(unix)]
fn staging_file(dir: &Path) -> std::io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    tempfile::Builder::new()
        .permissions(std::fs::Permissions::from_mode(0o666))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn staging_file(dir: &Path) -> std::io::Result<NamedTempFile> {
    NamedTempFile::new_in(dir)
}

fn run_strategy<R: std::io::Read, W: Write>(
    transcoder: &StreamingTranscoder<'_>,
    input: R,
    mut sink: W,
    strategy: EmitStrategy,
) -> TranscodeResult<TranscodeReport> {
    let report = match strategy {
        EmitStrategy::Buffered => {
            let mut emitter = BufferedEmitter::new(&mut sink);
            transcoder.transcode(input, &mut emitter)?
        }
        EmitStrategy::Incremental => {
            let mut emitter = IncrementalEmitter::new(&mut sink);
            transcoder.transcode(input, &mut emitter)?
        }
    };
    sink.flush()?;
    Ok(report)
}
