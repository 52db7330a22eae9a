use clap::Parser;
use tempfile::TempDir;

use milxly2nvg::config::{ConfigError, ConfigManager};
use milxly2nvg::{Cli, EmitStrategy, MappingPolicy, OutputFormat, VerbosityLevel};

use crate::common::mocks::MockEnvProvider;

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["milxly2nvg"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn test_environment_between_file_and_cli() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("milxly2nvg.json");
    std::fs::write(
        &config_path,
        r#"{ "conversion": { "policy": "each-point", "output_suffix": ".file.nvg" } }"#,
    )
    .unwrap();

    let env = MockEnvProvider::new()
        .with("MILXLY2NVG_SUFFIX", ".env.nvg")
        .with("MILXLY2NVG_STRATEGY", "incremental");

    let config = ConfigManager::load_config_with(
        &cli(&["--config", config_path.to_str().unwrap(), "--suffix", ".cli.nvg"]),
        &env,
    )
    .await
    .unwrap();

    assert_eq!(config.conversion.policy, MappingPolicy::EachPoint);
    assert_eq!(config.conversion.strategy, EmitStrategy::Incremental);
    assert_eq!(config.conversion.output_suffix, ".cli.nvg");
}

#[tokio::test]
async fn test_quiet_flag_overrides_verbose_environment() {
    let env = MockEnvProvider::new().with("MILXLY2NVG_VERBOSE", "true");
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("empty.toml");
    std::fs::write(&config_path, "").unwrap();

    let config = ConfigManager::load_config_with(
        &cli(&["--config", config_path.to_str().unwrap(), "-q"]),
        &env,
    )
    .await
    .unwrap();

    assert_eq!(config.verbosity(), VerbosityLevel::Quiet);
    assert_eq!(config.output.format, OutputFormat::Human);
}

#[tokio::test]
async fn test_invalid_environment_is_reported() {
    let env = MockEnvProvider::new().with("MILXLY2NVG_THREADS", "0");
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("empty.toml");
    std::fs::write(&config_path, "").unwrap();

    let result =
        ConfigManager::load_config_with(&cli(&["--config", config_path.to_str().unwrap()]), &env)
            .await;

    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[tokio::test]
async fn test_recursive_discovery_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("a/b");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(temp_dir.path().join("top.milxly"), "<MilXLayer/>").unwrap();
    std::fs::write(nested.join("deep.milxly"), "<MilXLayer/>").unwrap();

    let config_path = temp_dir.path().join("cfg.toml");
    std::fs::write(&config_path, "[files]\nrecursive = true\n").unwrap();

    let config = ConfigManager::load_config_with(
        &cli(&["--config", config_path.to_str().unwrap()]),
        &MockEnvProvider::new(),
    )
    .await
    .unwrap();

    let files = config
        .file_discovery()
        .unwrap()
        .discover_files(temp_dir.path())
        .await
        .unwrap();
    assert_eq!(files.len(), 2);
}
