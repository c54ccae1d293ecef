// Error module: every failure the client can report to the user.
//
// Most variants carry the "argument" a failed request was about so the
// output layer can print it right-aligned next to the message, e.g.
//   Error: No files were found that match that name.        <report>

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("More than one action was selected. Please select only one action.")]
    TooManyActions(usize),

    #[error("You need to have an account to use the Let's Crate API.")]
    MissingCredentials,

    #[error("Credentials invalid, please input them in the format \"username:password\"")]
    MalformedLogin(String),

    #[error("The request timed out.")]
    Timeout,

    /// No HTTP response at all (DNS, refused connection, TLS...).
    #[error("{0}")]
    Connection(String),

    #[error("Connection error. Code: {0}")]
    HttpStatus(u16),

    #[error("Unexpected response from server: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service answered with a `failure` envelope.
    #[error("{message}")]
    Rejected { message: String, argument: String },

    #[error("A file ID is a 5 digit number. Use -a to list your files's IDs.")]
    InvalidFileId(String),

    #[error("A crate ID is a 5 digit number. Use -A to list your crates's IDs.")]
    InvalidCrateId(String),

    #[error("No files were found that match that name.")]
    NoFilesFound(String),

    #[error("No crates were found that match that name.")]
    NoCratesFound(String),

    #[error("More than 1 file matched that name. Please make your query more specific, or use --regexp if you meant this to happen.")]
    TooManyFiles(String),

    #[error("More than 1 crate matched that name. Please make your query more specific, or use --regexp if you meant this to happen.")]
    TooManyCrates(String),

    #[error("Invalid regular expression: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Is the crate password protected? The API doesn't allow downloading files with passwords. Email hi@letscrate.com to ask for that feature.")]
    PasswordProtected(String),

    /// A server-supplied name that is not a single path component.
    #[error("The name is not a plain file name. Refusing to write outside the download folder.")]
    UnsafeName(String),

    #[error("Couldn't download file list. Exiting.")]
    ListingUnavailable(#[source] Box<Error>),

    #[error("Exactly one new name is needed to rename a crate.")]
    RenameArity(usize),

    #[error("The credentials are invalid.")]
    InvalidCredentials(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// The text printed between angle brackets after the message, if any.
    pub fn argument(&self) -> Option<String> {
        match self {
            Error::TooManyActions(n) => Some(n.to_string()),
            Error::MalformedLogin(login) => Some(login.clone()),
            Error::Timeout => Some("TimeOut".into()),
            Error::Connection(_) | Error::HttpStatus(_) => Some("HTTPError".into()),
            Error::Rejected { argument, .. } => Some(argument.clone()),
            Error::InvalidFileId(arg)
            | Error::InvalidCrateId(arg)
            | Error::NoFilesFound(arg)
            | Error::NoCratesFound(arg)
            | Error::TooManyFiles(arg)
            | Error::TooManyCrates(arg)
            | Error::PasswordProtected(arg)
            | Error::UnsafeName(arg)
            | Error::InvalidCredentials(arg) => Some(arg.clone()),
            Error::InvalidPattern { pattern, .. } => Some(pattern.clone()),
            Error::RenameArity(n) => Some(n.to_string()),
            Error::MissingCredentials
            | Error::Decode(_)
            | Error::ListingUnavailable(_)
            | Error::Io { .. } => None,
        }
    }

    /// Hint printed on its own line after the error, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::TooManyActions(_) => Some("Use the -h flag for help, or read the README."),
            Error::MissingCredentials => Some(
                "If you don't have one yet, you can create an account at letscrate.com.\n\
                 Use the \"-l\" switch to specify your login credentials.",
            ),
            _ => None,
        }
    }

    /// Attach the argument a rejected request was about.
    pub fn with_argument(self, arg: &str) -> Self {
        match self {
            Error::Rejected { message, .. } => Error::Rejected {
                message,
                argument: arg.to_owned(),
            },
            other => other,
        }
    }

    /// Process exit code for an error that aborts the run. Usage errors and
    /// names that do not resolve alike exit with 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        1
    }
}
