//! Concurrent conversion engine
//!
//! - **Async orchestration**: file discovery and per-file tasks run on tokio
//! - **Blocking transcoding**: each file is converted inside `spawn_blocking`
//! - **Bounded concurrency**: a semaphore caps the number of files in flight
//!
//! Every file is converted independently. A failure is recorded in that file's
//! result and, unless fail-fast is enabled, does not affect other files.

use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::convert::{ConversionOptions, ConversionOutcome, convert_file};
use crate::diagnostics::{CollectingDiagnostics, Diagnostic, Diagnostics, Tee};
use crate::error::{ConversionError, Result};
use crate::file_discovery::FileDiscovery;
use crate::transcoder::TranscodeReport;

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of files converted at the same time
    pub max_concurrent_conversions: usize,
    /// Stop starting new conversions after the first failure
    pub fail_fast: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_conversions: num_cpus::get(),
            fail_fast: false,
        }
    }
}

/// Status of a single file conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStatus {
    Converted,
    Failed { message: String },
    /// Not attempted
    Skipped { reason: String },
}

impl ConversionStatus {
    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionStatus::Converted)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConversionStatus::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ConversionStatus::Skipped { .. })
    }
}

/// Result of converting a single file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConversionResult {
    pub input: PathBuf,
    /// Written NVG file, only set on success
    pub output: Option<PathBuf>,
    pub status: ConversionStatus,
    pub duration: Duration,
    pub report: Option<TranscodeReport>,
    /// Warnings and errors reported while converting this file
    pub warnings: Vec<Diagnostic>,
}

impl FileConversionResult {
    pub fn converted(
        outcome: ConversionOutcome,
        duration: Duration,
        warnings: Vec<Diagnostic>,
    ) -> Self {
        Self {
            input: outcome.input,
            output: Some(outcome.output),
            status: ConversionStatus::Converted,
            duration,
            report: Some(outcome.report),
            warnings,
        }
    }

    pub fn failed(
        input: PathBuf,
        error: ConversionError,
        duration: Duration,
        warnings: Vec<Diagnostic>,
    ) -> Self {
        Self {
            input,
            output: None,
            status: ConversionStatus::Failed {
                message: error.to_string(),
            },
            duration,
            report: None,
            warnings,
        }
    }

    pub fn skipped(input: PathBuf, reason: String) -> Self {
        Self {
            input,
            output: None,
            status: ConversionStatus::Skipped { reason },
            duration: Duration::ZERO,
            report: None,
            warnings: Vec::new(),
        }
    }
}

/// Progress update sent after each finished file
#[derive(Debug, Clone)]
pub struct ConversionProgress {
    pub current_file: PathBuf,
    pub completed: usize,
    pub total: usize,
}

pub type ProgressCallback = Arc<dyn Fn(ConversionProgress) + Send + Sync>;

/// Aggregated results of converting multiple files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResults {
    pub started_at: DateTime<Utc>,
    pub total_files: usize,
    pub converted_files: usize,
    pub failed_files: usize,
    pub skipped_files: usize,
    pub records_seen: usize,
    pub nodes_emitted: usize,
    /// Recovered per-record problems over all files
    pub record_warnings: usize,
    /// Wall-clock duration of the whole run
    pub total_duration: Duration,
    pub average_duration: Duration,
    pub throughput_files_per_second: f64,
    pub file_results: Vec<FileConversionResult>,
}

impl ConversionResults {
    /// Aggregate individual file results into a summary
    pub fn aggregate(file_results: Vec<FileConversionResult>) -> Self {
        let total_files = file_results.len();
        let mut converted_files = 0;
        let mut failed_files = 0;
        let mut skipped_files = 0;
        let mut records_seen = 0;
        let mut nodes_emitted = 0;
        let mut record_warnings = 0;
        let mut busy = Duration::ZERO;

        for result in &file_results {
            match result.status {
                ConversionStatus::Converted => converted_files += 1,
                ConversionStatus::Failed { .. } => failed_files += 1,
                ConversionStatus::Skipped { .. } => skipped_files += 1,
            }
            if let Some(ref report) = result.report {
                records_seen += report.records_seen;
                nodes_emitted += report.nodes_emitted;
                record_warnings += report.warning_count();
            }
            busy += result.duration;
        }

        let average_duration = if total_files > 0 {
            busy / total_files as u32
        } else {
            Duration::ZERO
        };

        let mut results = Self {
            started_at: Utc::now(),
            total_files,
            converted_files,
            failed_files,
            skipped_files,
            records_seen,
            nodes_emitted,
            record_warnings,
            total_duration: busy,
            average_duration,
            throughput_files_per_second: 0.0,
            file_results,
        };
        results.set_total_duration(busy);
        results
    }

    fn set_total_duration(&mut self, total: Duration) {
        self.total_duration = total;
        self.throughput_files_per_second = if total.as_secs_f64() > 0.0 {
            self.total_files as f64 / total.as_secs_f64()
        } else {
            0.0
        };
    }

    pub fn all_converted(&self) -> bool {
        self.converted_files == self.total_files && self.total_files > 0
    }

    pub fn has_failures(&self) -> bool {
        self.failed_files > 0
    }

    /// Success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.converted_files as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Converts many files concurrently
pub struct ConversionEngine {
    options: Arc<ConversionOptions>,
    diagnostics: Arc<dyn Diagnostics>,
    config: EngineConfig,
}

impl ConversionEngine {
    pub fn new(
        options: ConversionOptions,
        diagnostics: Arc<dyn Diagnostics>,
        config: EngineConfig,
    ) -> Self {
        Self {
            options: Arc::new(options),
            diagnostics,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Discover input files under `path` and convert each of them
    pub async fn convert_path(
        &self,
        path: &Path,
        file_discovery: &FileDiscovery,
    ) -> Result<ConversionResults> {
        self.convert_path_with_progress(path, file_discovery, None)
            .await
    }

    pub async fn convert_path_with_progress(
        &self,
        path: &Path,
        file_discovery: &FileDiscovery,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<ConversionResults> {
        let started_at = Utc::now();
        let run_start = Instant::now();

        let files = file_discovery.discover_files(path).await?;
        self.diagnostics.debug(
            "engine",
            format!("Discovered {} files under {}", files.len(), path.display()),
        );

        let file_results = self
            .convert_files_with_progress(files, progress_callback)
            .await?;

        let mut results = ConversionResults::aggregate(file_results);
        results.started_at = started_at;
        results.set_total_duration(run_start.elapsed());
        Ok(results)
    }

    pub async fn convert_files(&self, files: Vec<PathBuf>) -> Result<Vec<FileConversionResult>> {
        self.convert_files_with_progress(files, None).await
    }

    pub async fn convert_files_with_progress(
        &self,
        files: Vec<PathBuf>,
        progress_callback: Option<ProgressCallback>,
    ) -> Result<Vec<FileConversionResult>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let total = files.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let aborted = Arc::new(AtomicBool::new(false));
        let semaphore = Arc::new(tokio::sync::Semaphore::new(
            self.config.max_concurrent_conversions.max(1),
        ));

        let tasks: Vec<_> = files
            .into_iter()
            .map(|input| {
                let options = Arc::clone(&self.options);
                let diagnostics = Arc::clone(&self.diagnostics);
                let semaphore = Arc::clone(&semaphore);
                let completed = Arc::clone(&completed);
                let aborted = Arc::clone(&aborted);
                let progress_callback = progress_callback.clone();
                let fail_fast = self.config.fail_fast;

                tokio::spawn(async move {
                    let _permit = semaphore.acquire().await.map_err(|_| {
                        ConversionError::Concurrency {
                            details: "Failed to acquire conversion semaphore".to_string(),
                        }
                    })?;

                    let result = if fail_fast && aborted.load(Ordering::SeqCst) {
                        FileConversionResult::skipped(
                            input.clone(),
                            "an earlier file failed".to_string(),
                        )
                    } else {
                        Self::convert_in_background(input.clone(), None, options, diagnostics)
                            .await
                    };

                    if result.status.is_failed() {
                        aborted.store(true, Ordering::SeqCst);
                    }

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = progress_callback {
                        callback(ConversionProgress {
                            current_file: input,
                            completed: done,
                            total,
                        });
                    }

                    Ok::<FileConversionResult, ConversionError>(result)
                })
            })
            .collect();

        let task_results =
            try_join_all(tasks)
                .await
                .map_err(|e| ConversionError::Concurrency {
                    details: format!("Task join error: {}", e),
                })?;

        let mut file_results = Vec::with_capacity(task_results.len());
        for result in task_results {
            file_results.push(result?);
        }
        Ok(file_results)
    }

    /// Convert one file, optionally into an explicit output path
    pub async fn convert_single_file(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> FileConversionResult {
        Self::convert_in_background(
            input.to_path_buf(),
            output.map(Path::to_path_buf),
            Arc::clone(&self.options),
            Arc::clone(&self.diagnostics),
        )
        .await
    }

    async fn convert_in_background(
        input: PathBuf,
        output: Option<PathBuf>,
        options: Arc<ConversionOptions>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> FileConversionResult {
        let start = Instant::now();
        let task_input = input.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let collected = CollectingDiagnostics::new();
            let tee = Tee::new(diagnostics.as_ref(), &collected);
            let result = convert_file(&task_input, output.as_deref(), &options, &tee);
            (result, collected.warnings())
        })
        .await;

        let duration = start.elapsed();
        match joined {
            Ok((Ok(outcome), warnings)) => {
                FileConversionResult::converted(outcome, duration, warnings)
            }
            Ok((Err(e), warnings)) => FileConversionResult::failed(input, e, duration, warnings),
            Err(e) => FileConversionResult::failed(
                input,
                ConversionError::Concurrency {
                    details: format!("Join error: {}", e),
                },
                duration,
                Vec::new(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GOOD: &str = r#"<MilXLayer><MilXGraphic><PointList><Point X="1" Y="2"/></PointList></MilXGraphic><MilXGraphic><PointList/></MilXGraphic></MilXLayer>"#;
    const BROKEN: &str = "<MilXLayer><MilXGraphic>";

    fn engine(config: EngineConfig) -> (ConversionEngine, Arc<CollectingDiagnostics>) {
        let diagnostics = Arc::new(CollectingDiagnostics::new());
        let engine = ConversionEngine::new(
            ConversionOptions::default(),
            diagnostics.clone(),
            config,
        );
        (engine, diagnostics)
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_status_predicates() {
        assert!(ConversionStatus::Converted.is_converted());
        let failed = ConversionStatus::Failed {
            message: "bad".to_string(),
        };
        assert!(failed.is_failed());
        assert!(!failed.is_converted());
        assert!(
            ConversionStatus::Skipped {
                reason: "x".to_string()
            }
            .is_skipped()
        );
    }

    #[test]
    fn test_results_aggregation() {
        let outcome = ConversionOutcome {
            input: PathBuf::from("a.milxly"),
            output: PathBuf::from("a.milxly.nvg"),
            report: TranscodeReport {
                records_seen: 3,
                records_converted: 2,
                records_unmapped: 1,
                nodes_emitted: 2,
                ..TranscodeReport::default()
            },
        };
        let results = vec![
            FileConversionResult::converted(outcome, Duration::from_millis(100), Vec::new()),
            FileConversionResult::failed(
                PathBuf::from("b.milxly"),
                ConversionError::Config("broken".to_string()),
                Duration::from_millis(50),
                Vec::new(),
            ),
            FileConversionResult::skipped(PathBuf::from("c.milxly"), "aborted".to_string()),
        ];

        let aggregated = ConversionResults::aggregate(results);

        assert_eq!(aggregated.total_files, 3);
        assert_eq!(aggregated.converted_files, 1);
        assert_eq!(aggregated.failed_files, 1);
        assert_eq!(aggregated.skipped_files, 1);
        assert_eq!(aggregated.records_seen, 3);
        assert_eq!(aggregated.nodes_emitted, 2);
        assert_eq!(aggregated.record_warnings, 1);
        assert_eq!(aggregated.average_duration, Duration::from_millis(50));
        assert!(aggregated.has_failures());
        assert!(!aggregated.all_converted());
    }

    #[test]
    fn test_empty_results() {
        let aggregated = ConversionResults::aggregate(Vec::new());
        assert_eq!(aggregated.total_files, 0);
        assert_eq!(aggregated.success_rate(), 0.0);
        assert!(!aggregated.all_converted());
        assert!(!aggregated.has_failures());
    }

    #[tokio::test]
    async fn test_convert_files_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "good.milxly", GOOD);
        let broken = write(&dir, "broken.milxly", BROKEN);
        let (engine, diagnostics) = engine(EngineConfig {
            max_concurrent_conversions: 2,
            fail_fast: false,
        });

        let results = engine
            .convert_files(vec![good.clone(), broken.clone()])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].status.is_converted());
        assert_eq!(results[0].warnings.len(), 1);
        assert!(results[1].status.is_failed());
        assert!(dir.path().join("good.milxly.nvg").exists());
        assert!(!dir.path().join("broken.milxly.nvg").exists());

        // The shared sink saw the per-record warning as well
        assert!(!diagnostics.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_files() {
        let dir = TempDir::new().unwrap();
        let broken = write(&dir, "a.milxly", BROKEN);
        let good = write(&dir, "b.milxly", GOOD);
        let (engine, _) = engine(EngineConfig {
            max_concurrent_conversions: 1,
            fail_fast: true,
        });

        let results = engine.convert_files(vec![broken, good]).await.unwrap();

        assert!(results[0].status.is_failed());
        assert!(results[1].status.is_skipped());
    }

    #[tokio::test]
    async fn test_convert_single_file_with_explicit_output() {
        let dir = TempDir::new().unwrap();
        let input = write(&dir, "plan.milxly", GOOD);
        let target = dir.path().join("custom.nvg");
        let (engine, _) = engine(EngineConfig::default());

        let result = engine.convert_single_file(&input, Some(&target)).await;

        assert!(result.status.is_converted());
        assert_eq!(result.output, Some(target.clone()));
        assert_eq!(result.report.unwrap().nodes_emitted, 1);
        assert!(target.exists());
    }

    #[tokio::test]
    async fn test_convert_path_reports_progress() {
        let dir = TempDir::new().unwrap();
        write(&dir, "one.milxly", GOOD);
        write(&dir, "two.milxly", GOOD);
        write(&dir, "notes.txt", "ignored");
        let (engine, _) = engine(EngineConfig::default());

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |progress| {
            assert_eq!(progress.total, 2);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let results = engine
            .convert_path_with_progress(dir.path(), &FileDiscovery::new(), Some(callback))
            .await
            .unwrap();

        assert_eq!(results.total_files, 2);
        assert!(results.all_converted());
        assert_eq!(results.nodes_emitted, 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
