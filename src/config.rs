use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::convert::{ConversionOptions, DEFAULT_OUTPUT_SUFFIX};
use crate::emitter::EmitStrategy;
use crate::engine::EngineConfig;
use crate::file_discovery::{DEFAULT_EXTENSION, FileDiscovery};
use crate::mapping::MappingPolicy;
use crate::record::RECORD_ELEMENT;
use crate::transcoder::TranscodeOptions;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const ENV_PREFIX: &str = "MILXLY2NVG_";

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub conversion: ConversionConfig,
    pub files: FileConfig,
    pub output: OutputConfig,
}

/// Conversion settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversionConfig {
    /// Number of files converted concurrently
    pub threads: Option<usize>,
    /// Stop starting new conversions after the first failure
    pub fail_fast: bool,
    /// Appended to the input file name to build the output name
    pub output_suffix: String,
    pub policy: MappingPolicy,
    pub strategy: EmitStrategy,
    /// Local name of record elements
    pub record_element: String,
}

/// File processing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub extensions: Vec<String>,
    /// Include patterns (glob syntax)
    pub include_patterns: Vec<String>,
    /// Exclude patterns (glob syntax)
    pub exclude_patterns: Vec<String>,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Depth limit when recursive (None = unlimited)
    pub max_depth: Option<usize>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbose: bool,
    /// Failures only
    pub quiet: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            threads: None,
            fail_fast: false,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            policy: MappingPolicy::default(),
            strategy: EmitStrategy::default(),
            record_element: RECORD_ELEMENT.to_string(),
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            include_patterns: vec![],
            exclude_patterns: vec![],
            recursive: false,
            max_depth: None,
        }
    }
}

impl Config {
    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.output.verbose, self.output.quiet)
    }

    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            transcode: TranscodeOptions {
                record_element: self.conversion.record_element.clone(),
                policy: self.conversion.policy,
            },
            strategy: self.conversion.strategy,
            output_suffix: self.conversion.output_suffix.clone(),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_concurrent_conversions: ConfigManager::get_thread_count(self),
            fail_fast: self.conversion.fail_fast,
        }
    }

    /// File discovery matching the `files` section
    pub fn file_discovery(&self) -> crate::error::Result<FileDiscovery> {
        let max_depth = if self.files.recursive {
            self.files.max_depth
        } else {
            Some(0)
        };

        FileDiscovery::new()
            .with_extensions(self.files.extensions.clone())
            .with_max_depth(max_depth)
            .with_include_patterns(self.files.include_patterns.clone())?
            .with_exclude_patterns(self.files.exclude_patterns.clone())
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(cli, &SystemEnvProvider).await
    }

    pub async fn load_config_with(cli: &Cli, env: &impl EnvProvider) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;

        // CLI arguments have the highest precedence
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find a configuration file in the current directory or the user config directory
    pub async fn find_config_file() -> Result<Option<Config>> {
        let mut directories = vec![PathBuf::from(".")];
        if let Some(config_dir) = dirs::config_dir() {
            directories.push(config_dir.join("milxly2nvg"));
        }
        Self::find_config_file_in(&directories).await
    }

    pub async fn find_config_file_in(directories: &[PathBuf]) -> Result<Option<Config>> {
        let config_names = [
            "milxly2nvg.toml",
            "milxly2nvg.json",
            ".milxly2nvg.toml",
            ".milxly2nvg.json",
        ];

        for directory in directories {
            for name in &config_names {
                let path = directory.join(name);
                if path.exists() {
                    log::debug!("Using configuration file {}", path.display());
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            env.get(&key).map(|value| (key, value))
        };
        let invalid = |key: &str, value: &str| {
            ConfigError::Environment(format!("Invalid {} value: {}", key, value))
        };

        // Conversion settings
        if let Some((key, threads)) = var("THREADS") {
            config.conversion.threads =
                Some(threads.parse().map_err(|_| invalid(&key, &threads))?);
        }

        if let Some((key, fail_fast)) = var("FAIL_FAST") {
            config.conversion.fail_fast =
                fail_fast.parse().map_err(|_| invalid(&key, &fail_fast))?;
        }

        if let Some((_, suffix)) = var("SUFFIX") {
            config.conversion.output_suffix = suffix;
        }

        if let Some((key, policy)) = var("POLICY") {
            config.conversion.policy =
                MappingPolicy::from_str(&policy, true).map_err(|_| invalid(&key, &policy))?;
        }

        if let Some((key, strategy)) = var("STRATEGY") {
            config.conversion.strategy =
                EmitStrategy::from_str(&strategy, true).map_err(|_| invalid(&key, &strategy))?;
        }

        if let Some((_, element)) = var("RECORD_ELEMENT") {
            config.conversion.record_element = element;
        }

        // File settings
        if let Some((_, extensions)) = var("EXTENSIONS") {
            config.files.extensions = extensions
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some((key, recursive)) = var("RECURSIVE") {
            config.files.recursive =
                recursive.parse().map_err(|_| invalid(&key, &recursive))?;
        }

        if let Some((key, depth)) = var("MAX_DEPTH") {
            config.files.max_depth = Some(depth.parse().map_err(|_| invalid(&key, &depth))?);
        }

        // Output settings
        if let Some((key, verbose)) = var("VERBOSE") {
            config.output.verbose = verbose.parse().map_err(|_| invalid(&key, &verbose))?;
        }

        if let Some((key, quiet)) = var("QUIET") {
            config.output.quiet = quiet.parse().map_err(|_| invalid(&key, &quiet))?;
        }

        if let Some((key, format)) = var("FORMAT") {
            config.output.format =
                OutputFormat::from_str(&format, true).map_err(|_| invalid(&key, &format))?;
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        // Conversion settings
        if cli.threads.is_some() {
            config.conversion.threads = cli.threads;
        }
        if cli.fail_fast {
            config.conversion.fail_fast = true;
        }
        if let Some(suffix) = &cli.suffix {
            config.conversion.output_suffix = suffix.clone();
        }
        if let Some(policy) = cli.policy {
            config.conversion.policy = policy;
        }
        if let Some(strategy) = cli.strategy {
            config.conversion.strategy = strategy;
        }

        // File settings
        if let Some(extensions) = cli.get_extensions() {
            config.files.extensions = extensions;
        }
        if !cli.include_patterns.is_empty() {
            config.files.include_patterns = cli.include_patterns.clone();
        }
        if !cli.exclude_patterns.is_empty() {
            config.files.exclude_patterns = cli.exclude_patterns.clone();
        }
        if cli.recursive {
            config.files.recursive = true;
        }

        // Output settings
        if let Some(format) = cli.output_format {
            config.output.format = format;
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence for non-empty values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        // Conversion settings
        if override_config.conversion.threads.is_some() {
            base.conversion.threads = override_config.conversion.threads;
        }
        base.conversion.fail_fast = override_config.conversion.fail_fast;
        if !override_config.conversion.output_suffix.is_empty() {
            base.conversion.output_suffix = override_config.conversion.output_suffix;
        }
        base.conversion.policy = override_config.conversion.policy;
        base.conversion.strategy = override_config.conversion.strategy;
        if !override_config.conversion.record_element.is_empty() {
            base.conversion.record_element = override_config.conversion.record_element;
        }

        // File settings
        if !override_config.files.extensions.is_empty() {
            base.files.extensions = override_config.files.extensions;
        }
        if !override_config.files.include_patterns.is_empty() {
            base.files.include_patterns = override_config.files.include_patterns;
        }
        if !override_config.files.exclude_patterns.is_empty() {
            base.files.exclude_patterns = override_config.files.exclude_patterns;
        }
        base.files.recursive = override_config.files.recursive;
        if override_config.files.max_depth.is_some() {
            base.files.max_depth = override_config.files.max_depth;
        }

        // Output settings
        base.output = override_config.output;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if let Some(threads) = config.conversion.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        let suffix = &config.conversion.output_suffix;
        if suffix.is_empty() {
            return Err(ConfigError::Validation(
                "Output suffix must not be empty".to_string(),
            ));
        }
        if suffix.contains('/') || suffix.contains('\\') {
            return Err(ConfigError::Validation(format!(
                "Output suffix must not contain path separators: {}",
                suffix
            )));
        }

        if config.conversion.record_element.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Record element name must not be empty".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.files.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "At least one file extension must be specified".to_string(),
            ));
        }

        for ext in &config.files.extensions {
            if ext.contains('/') || ext.contains('\\') || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "Invalid file extension: {}",
                    ext
                )));
            }
        }

        Ok(())
    }

    /// Get the effective thread count
    pub fn get_thread_count(config: &Config) -> usize {
        config.conversion.threads.unwrap_or_else(num_cpus::get)
    }
}
