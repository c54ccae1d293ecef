/// CLI argument definitions via clap derive.
///
/// Every operation is a flag and exactly one of them may be given per run;
/// the positional arguments are the files, names or IDs it works on.
use clap::{ArgAction, Parser};

use crate::config::Credentials;
use crate::error::{Error, Result};

const USAGE: &str = "letscrate <-l username:password> [options] file1 file2 ...\n       \
                     letscrate <-l username:password> [options] name1 name2 ...";

#[derive(Debug, Parser)]
#[command(
    name = "letscrate",
    about = "Command-line client for the Let's Crate file storage service",
    override_usage = USAGE,
    disable_version_flag = true
)]
pub struct Cli {
    /// Login with this username and password.
    #[arg(short = 'l', long, value_name = "USERNAME:PASSWORD", help_heading = "Login")]
    pub login: Option<String>,

    /// Upload files to crate.
    #[arg(short = 'u', long, value_name = "CRATE", help_heading = "File functions")]
    pub upload: Option<String>,

    /// Delete files with names *
    #[arg(short = 'r', long, help_heading = "File functions")]
    pub delete: bool,

    /// List all files.
    #[arg(short = 'a', long, help_heading = "File functions")]
    pub list: bool,

    /// Download files with names *
    #[arg(short = 'd', long, help_heading = "File functions")]
    pub download: bool,

    /// Search for files with names.
    #[arg(short = 's', long, help_heading = "File functions")]
    pub search: bool,

    /// Show files with IDs.
    #[arg(short = 'i', long, help_heading = "File functions")]
    pub id: bool,

    /// Create new crates with names.
    #[arg(short = 'N', long, help_heading = "Crate functions")]
    pub newcrate: bool,

    /// List all crates (or files in crates, if names are passed).
    #[arg(short = 'A', long, help_heading = "Crate functions")]
    pub listcrates: bool,

    /// Download crates with names *
    #[arg(short = 'D', long, help_heading = "Crate functions")]
    pub downloadcrates: bool,

    /// Search for crates with names.
    #[arg(short = 'S', long, help_heading = "Crate functions")]
    pub searchcrates: bool,

    /// Rename crate to name.
    #[arg(long, value_name = "CRATE", help_heading = "Crate functions")]
    pub renamecrate: Option<String>,

    /// Delete crates with names *
    #[arg(short = 'R', long, help_heading = "Crate functions")]
    pub deletecrate: bool,

    /// Download everything in your account.
    #[arg(long, help_heading = "Misc. options")]
    pub downloadall: bool,

    /// Treat names as regular expressions.
    #[arg(long, help_heading = "Misc. options")]
    pub regexp: bool,

    /// Only test the credentials.
    #[arg(short = 't', long, help_heading = "Misc. options")]
    pub test: bool,

    /// Print IDs when listing files/crates.
    #[arg(long, help_heading = "Misc. options")]
    pub ids: bool,

    /// Output extra info to the terminal.
    #[arg(short = 'v', long, help_heading = "Misc. options")]
    pub verbose: bool,

    /// Do not output anything to the terminal.
    #[arg(short = 'q', long, help_heading = "Misc. options")]
    pub quiet: bool,

    /// Do not check for a newer version before running.
    #[arg(long, help_heading = "Misc. options")]
    pub no_update_check: bool,

    /// Output version.
    #[arg(long, action = ArgAction::SetTrue, help_heading = "Misc. options")]
    pub version: bool,

    /// Print decoded server responses.
    #[arg(long, hide = true)]
    pub debug: bool,

    /// Files, names or IDs the action works on.
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,
}

/// The single operation selected for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    TestCredentials,
    UploadFiles { krate: String },
    DeleteFiles,
    ListFiles,
    DownloadFiles,
    SearchFiles,
    ShowFiles,
    CreateCrates,
    ListCrates,
    DownloadCrates,
    SearchCrates,
    RenameCrate { krate: String },
    DeleteCrates,
    DownloadAll,
}

impl Cli {
    /// The selected action, `None` when no action flag was given.
    ///
    /// # Errors
    ///
    /// `Error::TooManyActions` when more than one was given.
    pub fn action(&self) -> Result<Option<Action>> {
        let candidates = [
            self.test.then_some(Action::TestCredentials),
            self.upload
                .clone()
                .map(|krate| Action::UploadFiles { krate }),
            self.delete.then_some(Action::DeleteFiles),
            self.list.then_some(Action::ListFiles),
            self.download.then_some(Action::DownloadFiles),
            self.search.then_some(Action::SearchFiles),
            self.id.then_some(Action::ShowFiles),
            self.newcrate.then_some(Action::CreateCrates),
            self.listcrates.then_some(Action::ListCrates),
            self.downloadcrates.then_some(Action::DownloadCrates),
            self.searchcrates.then_some(Action::SearchCrates),
            self.renamecrate
                .clone()
                .map(|krate| Action::RenameCrate { krate }),
            self.deletecrate.then_some(Action::DeleteCrates),
            self.downloadall.then_some(Action::DownloadAll),
        ];
        let mut selected: Vec<Action> = candidates.into_iter().flatten().collect();
        match selected.len() {
            0 => Ok(None),
            1 => Ok(selected.pop()),
            n => Err(Error::TooManyActions(n)),
        }
    }

    /// Parsed `-l` credentials, if given.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        self.login.as_deref().map(parse_login).transpose()
    }
}

/// Split `username:password`. Anything but exactly two parts is rejected.
pub fn parse_login(login: &str) -> Result<Credentials> {
    let parts: Vec<&str> = login.split(':').collect();
    match parts.as_slice() {
        [user, pass] if !user.is_empty() && !pass.is_empty() => Ok(Credentials::new(*user, *pass)),
        _ => Err(Error::MalformedLogin(login.to_owned())),
    }
}

/// `LetsCrate v1.10.3 (API Version 1)`.
pub fn version_string() -> String {
    format!(
        "LetsCrate {} (API Version {})",
        crate::update::VERSION,
        crate::config::API_VERSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["letscrate"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn no_action_selected() {
        assert_eq!(parse(&[]).action().unwrap(), None);
        assert_eq!(parse(&["--ids", "-q"]).action().unwrap(), None);
    }

    #[test]
    fn one_action_with_positionals() {
        let cli = parse(&["-u", "Photos", "a.jpg", "b.jpg"]);
        assert_eq!(
            cli.action().unwrap(),
            Some(Action::UploadFiles { krate: "Photos".into() })
        );
        assert_eq!(cli.args, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn rename_takes_target_and_new_name() {
        let cli = parse(&["--renamecrate", "Old", "New"]);
        assert_eq!(
            cli.action().unwrap(),
            Some(Action::RenameCrate { krate: "Old".into() })
        );
        assert_eq!(cli.args, vec!["New"]);
    }

    #[test]
    fn more_than_one_action_is_rejected() {
        let err = parse(&["-a", "-A", "-t"]).action().unwrap_err();
        assert!(matches!(err, Error::TooManyActions(3)));
    }

    #[test]
    fn login_needs_two_parts() {
        assert_eq!(parse_login("bob:pw").unwrap(), Credentials::new("bob", "pw"));
        assert!(matches!(parse_login("bob"), Err(Error::MalformedLogin(_))));
        assert!(matches!(parse_login("bob:pw:x"), Err(Error::MalformedLogin(_))));
        assert!(matches!(parse_login(":pw"), Err(Error::MalformedLogin(_))));
    }

    #[test]
    fn version_mentions_api() {
        assert!(version_string().starts_with("LetsCrate v"));
        assert!(version_string().ends_with("(API Version 1)"));
    }
}
