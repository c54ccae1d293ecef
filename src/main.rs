// Entrypoint for the CLI application.
// - Settles credentials (command line or stored file) before anything else.
// - Offers a self update, then runs the single selected action.
// - Exit codes: 0 success, 1 for any usage, resolution or request failure.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use crossterm::style::Stylize;
use tracing_subscriber::EnvFilter;

use letscrate::actions::{Options, Outcome, Session};
use letscrate::api::ApiClient;
use letscrate::cli::{self, Cli};
use letscrate::config::{self, CredentialStore, Endpoints, Notice};
use letscrate::error::Error;
use letscrate::output::{Printer, Settings};
use letscrate::transport::HttpTransport;
use letscrate::{ui, update};

fn init_tracing(cli: &Cli) {
    let default = if cli.debug {
        "letscrate=debug"
    } else if cli.verbose {
        "letscrate=info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn print_notice(printer: &mut Printer, notice: Notice) {
    match notice {
        Notice::InvalidKey(key) => {
            printer.warning(&format!("The configuration file has an invalid entry: \"{key}\"."))
        }
        Notice::LoadedFromFile => tracing::info!("loaded credentials from configuration file"),
        Notice::NoConfigFile => tracing::info!("no stored credentials"),
        Notice::DifferentCredentials => printer
            .echo("The credentials you entered differ from the ones stored in the configuration file."),
        Notice::CredentialsUpdated => printer.echo("Credentials updated."),
        Notice::CredentialsSaved(path) => {
            printer.echo(&format!("Saved credentials at {}.", path.display()))
        }
        Notice::SaveFailed(message) => printer.warning(&message),
    }
}

/// Offer a newer release. `Ok(true)` means the binary was replaced and the
/// run should stop here.
fn offer_update(printer: &mut Printer, transport: &HttpTransport, endpoints: &Endpoints) -> anyhow::Result<bool> {
    match update::check(transport, &endpoints.update_manifest, update::VERSION) {
        Err(e) => {
            tracing::info!(error = %format!("{e:#}"), "update check failed");
            printer.warning("Couldn't check for new versions.");
            Ok(false)
        }
        Ok(update::Check::UpToDate) => Ok(false),
        Ok(update::Check::Ahead(remote)) => {
            tracing::info!(local = update::VERSION, %remote, "local build is ahead");
            printer.warning("Using newer version than server.");
            Ok(false)
        }
        Ok(update::Check::Available(release)) => {
            printer.echo("There is a new version available.");
            if !ui::ask("Would you like to download it now?")? {
                return Ok(false);
            }
            let target = std::env::current_exe()?;
            match update::install(transport, &release, &target) {
                Ok(()) => {
                    let done = "SUCCESS! LetsCrate has been updated to the latest version!";
                    if printer.settings.color {
                        printer.echo(&done.to_owned().green().to_string());
                    } else {
                        printer.echo(done);
                    }
                    tracing::info!(version = %release.version, "updated");
                    printer.echo("Please re-enter your latest command to start using the new version.");
                    Ok(true)
                }
                Err(e) => {
                    tracing::info!(error = %format!("{e:#}"), "update download failed");
                    printer.error("Couldn't download new version.", None);
                    Ok(false)
                }
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let endpoints = Endpoints::from_env();
    let mut printer = Printer::stdio(Settings::terminal(cli.quiet, cli.ids, &endpoints.short_links));

    let action = match cli.action() {
        Ok(Some(action)) => action,
        Ok(None) => {
            Cli::command().print_help()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            printer.report(&e);
            return Ok(ExitCode::from(e.exit_code() as u8));
        }
    };

    let login = match cli.credentials() {
        Ok(login) => login,
        Err(e) => {
            printer.report(&e);
            return Ok(ExitCode::from(e.exit_code() as u8));
        }
    };

    let store = CredentialStore::from_env();
    let mut notices = Vec::new();
    let mut prompt = |question: &str| ui::ask(question);
    let credentials = config::reconcile(login, &store, &mut prompt, &mut notices)?;
    for notice in notices {
        print_notice(&mut printer, notice);
    }
    let Some(credentials) = credentials else {
        let e = Error::MissingCredentials;
        printer.report(&e);
        return Ok(ExitCode::from(e.exit_code() as u8));
    };

    let api = ApiClient::from_env(credentials)?;
    if !cli.no_update_check && offer_update(&mut printer, api.transport(), api.endpoints())? {
        return Ok(ExitCode::SUCCESS);
    }

    let options = Options {
        regex: cli.regexp,
        progress: !cli.quiet,
        target_dir: std::env::current_dir()?,
    };
    let mut session = Session::new(api, printer, options);
    match session.run(&action, &cli.args) {
        Ok(Outcome::Success) => Ok(ExitCode::SUCCESS),
        Ok(Outcome::PartialFailure) => Ok(ExitCode::FAILURE),
        Err(e) => {
            session.printer_mut().report(&e);
            Ok(ExitCode::from(e.exit_code() as u8))
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    if cli.version {
        println!("{}", cli::version_string());
        return Ok(ExitCode::SUCCESS);
    }
    init_tracing(&cli);
    run(cli)
}
