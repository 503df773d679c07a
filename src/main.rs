use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use vartree::cli::CliArgs;
use vartree::inspect::inspect_program;
use vartree_config::logging::{
    default_log_file_path, ensure_log_dir, log_level_to_filter, rotate_log_files,
    DEFAULT_MAX_LOG_FILES, DEFAULT_MAX_LOG_SIZE,
};
use vartree_config::{default_config_dir, load_config, Config};

/// Environment variable naming the log level, below `RUST_LOG`.
const LOG_ENV: &str = "VARTREE_LOG";

fn run(cli: CliArgs) -> Result<()> {
    let config_dir = cli.config_dir.clone().unwrap_or_else(default_config_dir);
    let project_dir = env::current_dir().ok();
    let config = load_config(&config_dir, project_dir.as_deref())
        .with_context(|| format!("failed to load configuration from {}", config_dir.display()))?;

    init_logging(&config);
    info!(program = %cli.program, depth = cli.depth, "vartree starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let output = runtime.block_on(inspect_program(&config, &cli))?;
    print!("{output}");
    Ok(())
}

/// Install the global subscriber writing to the log file.
///
/// `RUST_LOG` wins over `VARTREE_LOG`, which wins over `log.level`.
fn init_logging(config: &Config) {
    let log_path = config.log.file.clone().unwrap_or_else(default_log_file_path);
    let level = env::var(LOG_ENV)
        .map(|raw| log_level_to_filter(&raw))
        .unwrap_or_else(|_| config.log.level.as_filter());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match open_log_file(&log_path) {
        Ok(log_file) => tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(log_file))
            .with_ansi(false)
            .with_env_filter(env_filter)
            .init(),
        Err(e) => {
            eprintln!("vartree: logging disabled: {e:#}");
            tracing_subscriber::fmt()
                .with_writer(std::io::sink)
                .with_env_filter(env_filter)
                .init();
        }
    }
    info!(log = %log_path.display(), "log level: {level}");
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    ensure_log_dir(path)
        .with_context(|| format!("failed to create log directory for {}", path.display()))?;
    rotate_log_files(path, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES)
        .with_context(|| format!("failed to rotate {}", path.display()))?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

fn main() {
    let cli = CliArgs::parse();
    if let Err(e) = run(cli) {
        eprintln!("vartree: {:#}", e);
        std::process::exit(1);
    }
}
