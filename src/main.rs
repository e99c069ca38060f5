// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, build the API
//   client and hand it to the command handlers.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zeg_cli::api::ApiClient;
use zeg_cli::cli::{Cli, Command};
use zeg_cli::{auth, commands, ui};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.command.standard().verbose;

    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if verbose {
                ui::print_error(&format!("Unhandled exception: {e:?}"));
            } else {
                ui::print_error(&format!("Unhandled exception: {e}"));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let standard = cli.command.standard();
    let token = auth::resolve_token(standard.token.clone());
    let api = ApiClient::new(&standard.url, token)?;

    match &cli.command {
        Command::Login(_) => {
            let (username, password) = ui::prompt_credentials()?;
            let spinner = ui::spinner("Logging in...");
            let saved = auth::login(&api, username, password);
            spinner.finish_and_clear();
            println!("User token saved to {}.", saved?.display());
            Ok(())
        }
        command => match command.resource_action() {
            Some((action, args)) => commands::run(action, &api, args),
            None => Ok(()),
        },
    }
}
