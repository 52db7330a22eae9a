//! Run summary rendering, human-readable or JSON.

use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::engine::{ConversionResults, ConversionStatus, FileConversionResult};

pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_results(&self, results: &ConversionResults) -> Result<String, serde_json::Error> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(results),
            OutputFormat::Human => Ok(self.format_human(results)),
        }
    }

    fn format_human(&self, results: &ConversionResults) -> String {
        let mut output = String::new();

        match self.verbosity {
            VerbosityLevel::Quiet => {
                for file_result in &results.file_results {
                    if file_result.status.is_failed() {
                        output.push_str(&self.format_file_result(file_result));
                        output.push('\n');
                    }
                }
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                output.push_str(&self.format_summary(results));
                output.push('\n');

                for file_result in &results.file_results {
                    if self.verbosity == VerbosityLevel::Verbose
                        || !file_result.status.is_converted()
                    {
                        output.push_str(&self.format_file_result(file_result));
                        output.push('\n');
                    }
                }
            }
        }

        output
    }

    pub fn format_file_result(&self, result: &FileConversionResult) -> String {
        let input = result.input.display();
        let duration_str = format_duration(result.duration);

        let mut output = match &result.status {
            ConversionStatus::Converted => {
                let nodes = result.report.as_ref().map_or(0, |r| r.nodes_emitted);
                let target = result
                    .output
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                format!(
                    "{}  {} -> {} ({}) - {} node{}",
                    self.colorize("✓ CONVERTED", "32"),
                    input,
                    target,
                    duration_str,
                    nodes,
                    if nodes == 1 { "" } else { "s" }
                )
            }
            ConversionStatus::Failed { message } => format!(
                "{}  {} ({}) - {}",
                self.colorize("✗ FAILED", "31"),
                input,
                duration_str,
                message
            ),
            ConversionStatus::Skipped { reason } => format!(
                "{}  {} - {}",
                self.colorize("- SKIPPED", "36"),
                input,
                reason
            ),
        };

        if self.verbosity == VerbosityLevel::Verbose {
            for warning in &result.warnings {
                output.push_str(&format!("\n    {}", warning));
            }
        }
        output
    }

    fn format_summary(&self, results: &ConversionResults) -> String {
        let mut output = String::new();
        output.push_str("Conversion Summary:\n");
        output.push_str(&format!("  Total files: {}\n", results.total_files));
        output.push_str(&format!(
            "  {} {}\n",
            self.colorize("Converted:", "32"),
            results.converted_files
        ));

        if results.failed_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Failed:", "31"),
                results.failed_files
            ));
        }
        if results.skipped_files > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Skipped:", "36"),
                results.skipped_files
            ));
        }

        output.push_str(&format!(
            "  Records: {} ({} nodes written)\n",
            results.records_seen, results.nodes_emitted
        ));
        if results.record_warnings > 0 {
            output.push_str(&format!(
                "  {} {}\n",
                self.colorize("Record warnings:", "33"),
                results.record_warnings
            ));
        }
        output.push_str(&format!(
            "  Duration: {}\n",
            format_duration(results.total_duration)
        ));

        if self.verbosity == VerbosityLevel::Verbose {
            output.push_str(&format!(
                "  Throughput: {:.1} files/sec\n",
                results.throughput_files_per_second
            ));
        }

        output
    }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
