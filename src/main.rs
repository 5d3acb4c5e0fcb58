//! sheetql - query and update Excel worksheets with SQL.

use sheetql::app;
use sheetql::cli::Cli;
use sheetql::config::Config;
use sheetql::logging::{init_file_logging, init_stderr_logging, report_error, DEFAULT_LEVEL};
use tracing::info;

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    let config = Config::load_from_file(&config_path);
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| DEFAULT_LEVEL.to_string());

    match cli.log_file.as_deref() {
        Some(log_file) => {
            if let Err(e) = init_file_logging(log_file, &level) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        None => init_stderr_logging(&level),
    }
    info!("Loaded config from: {}", config_path.display());

    let result = config.and_then(|config| {
        let stdout = std::io::stdout();
        app::run(&cli, &config, &mut stdout.lock())
    });

    if let Err(e) = result {
        report_error(&e, cli.log_file.is_some(), &mut std::io::stderr());
        std::process::exit(1);
    }
}
