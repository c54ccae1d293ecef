// Self update: compare our version with the published one and, if asked
// to, replace the running executable with the newer release.
//
// The release manifest is a small text file whose first token is the
// version (`v1.10.3`) and whose optional second token is the download URL
// of the new binary.

use anyhow::{anyhow, Context, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use crate::transport::{Request, Transport};

pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Used when the manifest does not name a download URL.
pub const DEFAULT_BINARY_URL: &str =
    "https://github.com/frcepeda/LetsCrate/releases/latest/download/letscrate";

/// Parsed release manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub url: String,
}

impl Release {
    pub fn parse(text: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let version = tokens.next()?.to_owned();
        let url = tokens.next().unwrap_or(DEFAULT_BINARY_URL).to_owned();
        Some(Release { version, url })
    }
}

fn components(version: &str) -> Vec<u64> {
    version
        .trim()
        .trim_start_matches(['v', 'V'])
        .split('.')
        .map(|part| {
            part.chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .unwrap_or(0)
        })
        .collect()
}

/// Compare dotted versions numerically; missing components count as zero,
/// so `v1.10` equals `v1.10.0` and `v1.9.9` is older than `v1.10`.
pub fn compare_versions(local: &str, remote: &str) -> Ordering {
    let (a, b) = (components(local), components(remote));
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Result of checking the release manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    UpToDate,
    Available(Release),
    /// The local build is newer than the published one.
    Ahead(String),
}

pub fn check<T: Transport>(transport: &T, manifest_url: &str, local: &str) -> Result<Check> {
    tracing::info!(manifest_url, "checking for new versions");
    let res = transport
        .execute(Request::get(manifest_url))
        .map_err(|e| anyhow!("{e}"))?;
    if !res.is_success() {
        return Err(anyhow!("Connection error. Code: {}", res.status));
    }
    let text = String::from_utf8_lossy(&res.body);
    let release = Release::parse(&text).ok_or_else(|| anyhow!("empty release manifest"))?;
    tracing::info!(version = %release.version, "server has version");
    Ok(match compare_versions(local, &release.version) {
        Ordering::Less => Check::Available(release),
        Ordering::Greater => Check::Ahead(release.version),
        Ordering::Equal => Check::UpToDate,
    })
}

/// Download `release` and atomically replace the executable at `target`.
pub fn install<T: Transport>(transport: &T, release: &Release, target: &Path) -> Result<()> {
    let res = transport
        .execute(Request::get(&release.url).transfer())
        .map_err(|e| anyhow!("{e}"))?;
    if !res.is_success() || res.body.is_empty() {
        return Err(anyhow!("Connection error. Code: {}", res.status));
    }

    let staging = target.with_extension("download");
    fs::write(&staging, &res.body)
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    make_executable(&staging)?;
    fs::rename(&staging, target)
        .with_context(|| format!("Failed to replace {}", target.display()))?;
    tracing::info!(target = %target.display(), version = %release.version, "installed update");
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
