//! `portal_watch`: polls the student portal and announces notifications it
//! has not announced before.
mod cli;
mod config;
mod logging;
mod run;

use std::process::ExitCode;

use cli::{CliError, USAGE};
use config::WatchConfig;
use watch_logging::watch_error;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = match cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(CliError::HelpRequested) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{err}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let config = match WatchConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    logging::initialize(&config.log);

    match run::execute(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            watch_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
