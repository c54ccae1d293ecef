// Configuration: where the service lives and who we are.
//
// Endpoints come from the environment (with the public service as the
// default), credentials from `-l` or from a small KEY=VALUE cache file under
// the user's home directory.

use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "1";
pub const DEFAULT_API_URL: &str = "https://api.letscrate.com/1/";
pub const DEFAULT_SHORT_URL: &str = "http://lts.cr/";
pub const DEFAULT_DOWNLOAD_URL: &str = "http://letscrate.com/";
pub const DEFAULT_UPDATE_URL: &str = "https://raw.github.com/frcepeda/LetsCrate/master/.current";

/// Basic-auth login for the API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Base URLs of the service. Each one can be overridden from the
/// environment, which is also how the tests point the client elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api: String,
    pub short_links: String,
    pub downloads: String,
    pub update_manifest: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            api: DEFAULT_API_URL.into(),
            short_links: DEFAULT_SHORT_URL.into(),
            downloads: DEFAULT_DOWNLOAD_URL.into(),
            update_manifest: DEFAULT_UPDATE_URL.into(),
        }
    }
}

impl Endpoints {
    /// Read `LETSCRATE_API_URL`, `LETSCRATE_SHORT_URL`,
    /// `LETSCRATE_DOWNLOAD_URL` and `LETSCRATE_UPDATE_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Endpoints::default();
        let base = |key: &str, default: String| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(|v| with_trailing_slash(v.trim()))
                .unwrap_or(default)
        };
        Endpoints {
            api: base("LETSCRATE_API_URL", defaults.api),
            short_links: base("LETSCRATE_SHORT_URL", defaults.short_links),
            downloads: base("LETSCRATE_DOWNLOAD_URL", defaults.downloads),
            update_manifest: lookup("LETSCRATE_UPDATE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.update_manifest),
        }
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{url}/")
    }
}

/// Contents of the credential cache file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StoredConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Keys we did not recognise, reported as warnings.
    pub unknown_keys: Vec<String>,
}

impl StoredConfig {
    pub fn parse(text: &str) -> Self {
        let mut config = StoredConfig::default();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').unwrap_or((line, ""));
            match key {
                "USERNAME" => config.username = Some(value.to_owned()),
                "PASSWORD" => config.password = Some(value.to_owned()),
                other => config.unknown_keys.push(other.to_owned()),
            }
        }
        config
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some(Credentials::new(u.clone(), p.clone())),
            _ => None,
        }
    }

    pub fn render(credentials: &Credentials) -> String {
        format!(
            "USERNAME={}\nPASSWORD={}\n",
            credentials.username, credentials.password
        )
    }
}

/// The credential cache file on disk.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialStore { path: path.into() }
    }

    /// `LETSCRATE_CONFIG` if set, otherwise `~/.config/letscrate/config`.
    pub fn from_env() -> Self {
        if let Some(path) = std::env::var_os("LETSCRATE_CONFIG") {
            return CredentialStore::new(path);
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        CredentialStore::new(home.join(".config").join("letscrate").join("config"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet.
    pub fn load(&self) -> Result<Option<StoredConfig>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(StoredConfig::parse(&text))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read configuration file {}", self.path.display())),
        }
    }

    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        fs::write(&self.path, StoredConfig::render(credentials))
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        restrict_permissions(&self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Something that can answer a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

impl<F: FnMut(&str) -> Result<bool>> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self(prompt)
    }
}

/// What happened while reconciling `-l` with the cache file. The caller
/// turns these into terminal output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    InvalidKey(String),
    LoadedFromFile,
    NoConfigFile,
    DifferentCredentials,
    CredentialsUpdated,
    CredentialsSaved(PathBuf),
    SaveFailed(String),
}

/// Pick the credentials for this run and keep the cache file in sync.
///
/// With a login from the command line the cache is offered an update (when
/// it differs) or created (when missing). Without one the cache is the only
/// source.
pub fn reconcile(
    login: Option<Credentials>,
    store: &CredentialStore,
    prompt: &mut dyn Confirm,
    notices: &mut Vec<Notice>,
) -> Result<Option<Credentials>> {
    let stored = store.load()?;
    if let Some(config) = &stored {
        notices.extend(config.unknown_keys.iter().cloned().map(Notice::InvalidKey));
    }

    let Some(login) = login else {
        return Ok(match stored.and_then(|c| c.credentials()) {
            Some(creds) => {
                notices.push(Notice::LoadedFromFile);
                Some(creds)
            }
            None => {
                notices.push(Notice::NoConfigFile);
                None
            }
        });
    };

    match stored {
        Some(config) => {
            let same = config.username.as_deref() == Some(login.username.as_str())
                && config.password.as_deref() == Some(login.password.as_str());
            if !same {
                notices.push(Notice::DifferentCredentials);
                if prompt.confirm("Would you like to update the stored credentials?")? {
                    match store.save(&login) {
                        Ok(()) => notices.push(Notice::CredentialsUpdated),
                        Err(e) => notices.push(Notice::SaveFailed(format!(
                            "Couldn't update configuration file. ({e:#})"
                        ))),
                    }
                }
            }
        }
        None => {
            if prompt.confirm("Would you like to save your login data so it isn't needed next time?")? {
                match store.save(&login) {
                    Ok(()) => notices.push(Notice::CredentialsSaved(store.path().to_path_buf())),
                    Err(e) => notices.push(Notice::SaveFailed(format!(
                        "Couldn't create configuration file. ({e:#})"
                    ))),
                }
            }
        }
    }
    Ok(Some(login))
}
