use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::emitter::EmitStrategy;
use crate::mapping::MappingPolicy;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show failures
    Quiet,
    #[default]
    Normal,
    /// Also list every file and its warnings
    Verbose,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Default `env_logger` filter for this verbosity
    pub fn log_filter(self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

/// Format of the run summary printed to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Convert MILXLY documents to NATO Vector Graphics (NVG)
#[derive(Parser, Debug, Clone)]
#[command(name = "milxly2nvg")]
#[command(about = "Convert MILXLY military symbology documents to NVG")]
#[command(version)]
pub struct Cli {
    /// Directory to scan or single file to convert
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output file, only valid when PATH is a single file
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// File extensions to process (comma-separated)
    #[arg(
        short = 'e',
        long = "extensions",
        help = "File extensions to process (e.g., 'milxly,xml')"
    )]
    pub extensions: Option<String>,

    /// Number of files converted concurrently
    #[arg(short = 't', long = "threads")]
    pub threads: Option<usize>,

    /// Suffix appended to input file names to build output names
    #[arg(long = "suffix")]
    pub suffix: Option<String>,

    /// How a record's points become NVG nodes
    #[arg(long = "policy", value_enum)]
    pub policy: Option<MappingPolicy>,

    /// How the NVG document is assembled
    #[arg(long = "strategy", value_enum)]
    pub strategy: Option<EmitStrategy>,

    /// Include file patterns (glob syntax)
    #[arg(long = "include", action = clap::ArgAction::Append)]
    pub include_patterns: Vec<String>,

    /// Exclude file patterns (glob syntax)
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Descend into subdirectories
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,

    /// Stop starting new conversions after the first failure
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    #[arg(long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long = "quiet",
        help = "Only report failures",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Extensions given on the command line, without leading dots
    pub fn get_extensions(&self) -> Option<Vec<String>> {
        self.extensions.as_ref().map(|list| {
            list.split(',')
                .map(|s| s.trim().trim_start_matches('.').to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.path.exists() {
            return Err(format!("Path does not exist: {}", self.path.display()));
        }
        if self.output.is_some() && !self.path.is_file() {
            return Err("--output requires PATH to be a single file".to_string());
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_basic_cli_parsing() {
        let cli = Cli::try_parse_from(["milxly2nvg", "/tmp"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("/tmp"));
        assert_eq!(cli.output, None);
        assert_eq!(cli.policy, None);
        assert!(!cli.recursive);
    }

    #[test]
    fn test_path_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["milxly2nvg"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("."));
    }

    #[test]
    fn test_conversion_flags() {
        let cli = Cli::try_parse_from([
            "milxly2nvg",
            "--policy",
            "each-point",
            "--strategy",
            "incremental",
            "--format",
            "json",
            "-e",
            ".milxly, xml",
            "-r",
            "plans",
        ])
        .unwrap();

        assert_eq!(cli.policy, Some(MappingPolicy::EachPoint));
        assert_eq!(cli.strategy, Some(EmitStrategy::Incremental));
        assert_eq!(cli.output_format, Some(OutputFormat::Json));
        assert_eq!(
            cli.get_extensions(),
            Some(vec!["milxly".to_string(), "xml".to_string()])
        );
        assert!(cli.recursive);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["milxly2nvg", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_output_requires_single_file() {
        let dir = TempDir::new().unwrap();
        let cli = Cli::try_parse_from([
            "milxly2nvg",
            dir.path().to_str().unwrap(),
            "-o",
            "out.nvg",
        ])
        .unwrap();
        assert!(cli.validate().is_err());

        let file = dir.path().join("plan.milxly");
        std::fs::write(&file, "<MilXLayer/>").unwrap();
        let cli =
            Cli::try_parse_from(["milxly2nvg", file.to_str().unwrap(), "-o", "out.nvg"]).unwrap();
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(
            VerbosityLevel::from_flags(false, true),
            VerbosityLevel::Quiet
        );
        assert_eq!(
            VerbosityLevel::from_flags(true, false),
            VerbosityLevel::Verbose
        );
        assert_eq!(VerbosityLevel::Verbose.log_filter(), "debug");
    }
}
