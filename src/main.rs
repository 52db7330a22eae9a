use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use milxly2nvg::cli::Cli;
use milxly2nvg::config::ConfigManager;
use milxly2nvg::diagnostics::LogDiagnostics;
use milxly2nvg::engine::{ConversionEngine, ConversionProgress, ConversionResults, ProgressCallback};
use milxly2nvg::output::Output;

/// Every discovered file converted (or nothing to do)
const EXIT_SUCCESS: u8 = 0;
/// At least one file failed to convert
const EXIT_FAILURES: u8 = 1;
/// Usage or configuration error
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(results) if results.has_failures() => ExitCode::from(EXIT_FAILURES),
        Ok(_) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

async fn run(cli: Cli) -> Result<ConversionResults> {
    if let Err(message) = cli.validate() {
        bail!(message);
    }

    let config = ConfigManager::load_config(&cli)
        .await
        .context("Failed to load configuration")?;

    let verbosity = config.verbosity();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(verbosity.log_filter()),
    )
    .init();

    let engine = ConversionEngine::new(
        config.conversion_options(),
        Arc::new(LogDiagnostics),
        config.engine_config(),
    );

    let results = if cli.path.is_file() {
        log::info!("Converting {}", cli.path.display());
        let result = engine
            .convert_single_file(&cli.path, cli.output.as_deref())
            .await;
        ConversionResults::aggregate(vec![result])
    } else {
        let discovery = config
            .file_discovery()
            .context("Invalid file selection")?;
        let progress: ProgressCallback = Arc::new(|progress: ConversionProgress| {
            log::info!(
                "[{}/{}] {}",
                progress.completed,
                progress.total,
                progress.current_file.display()
            );
        });

        let results = engine
            .convert_path_with_progress(&cli.path, &discovery, Some(progress))
            .await
            .with_context(|| format!("Failed to convert files in {}", cli.path.display()))?;
        if results.total_files == 0 {
            log::warn!(
                "No files with extension {} found in {}",
                config.files.extensions.join(", "),
                cli.path.display()
            );
        }
        results
    };

    let rendered = Output::new(config.output.format, verbosity)
        .format_results(&results)
        .context("Failed to render results")?;
    print!("{}", rendered);
    if !rendered.is_empty() && !rendered.ends_with('\n') {
        println!();
    }

    Ok(results)
}
