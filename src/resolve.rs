// Name resolution: turn what the user typed into file and crate IDs.
//
// Anything that already looks like an ID (five digits) is used as is.
// Everything else is searched, case-insensitively, in the account listing.
// A name has to match exactly one item unless regex mode is on, in which
// case every match is taken.

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::model::{CrateInfo, FileInfo, Id, Listing};

/// True for strings made of exactly five ASCII digits.
pub fn is_valid_id(s: &str) -> bool {
    s.len() == 5 && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_id(s: &str) -> Option<Id> {
    is_valid_id(s).then(|| s.parse().ok()).flatten()
}

/// Case-insensitive, unanchored matcher for item names.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    regex: Regex,
}

impl NameMatcher {
    /// In regex mode an invalid pattern is an error; otherwise a name that
    /// is not a valid pattern (`report (1).pdf`) is matched literally.
    pub fn new(pattern: &str, regex_mode: bool) -> Result<Self> {
        let build = |p: &str| RegexBuilder::new(p).case_insensitive(true).build();
        match build(pattern) {
            Ok(regex) => Ok(NameMatcher { regex }),
            Err(source) if regex_mode => Err(Error::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            }),
            Err(_) => {
                let regex = build(&regex::escape(pattern)).map_err(|source| Error::InvalidPattern {
                    pattern: pattern.to_owned(),
                    source,
                })?;
                Ok(NameMatcher { regex })
            }
        }
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

pub fn search_files<'a>(listing: &'a Listing, matcher: &NameMatcher) -> Vec<&'a FileInfo> {
    listing.files().filter(|f| matcher.is_match(&f.name)).collect()
}

pub fn search_crates<'a>(listing: &'a Listing, matcher: &NameMatcher) -> Vec<&'a CrateInfo> {
    listing
        .crates
        .iter()
        .filter(|c| matcher.is_match(&c.name))
        .collect()
}

pub fn file_by_id(listing: &Listing, id: Id) -> Option<&FileInfo> {
    listing.files().find(|f| f.id == id)
}

pub fn crate_by_id(listing: &Listing, id: Id) -> Option<&CrateInfo> {
    listing.crates.iter().find(|c| c.id == id)
}

pub fn file_name(listing: &Listing, id: Id) -> Option<&str> {
    file_by_id(listing, id).map(|f| f.name.as_str())
}

pub fn crate_name(listing: &Listing, id: Id) -> Option<&str> {
    crate_by_id(listing, id).map(|c| c.name.as_str())
}

/// Which side of the listing a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    File,
    Crate,
}

impl Kind {
    fn not_found(self, name: &str) -> Error {
        match self {
            Kind::File => Error::NoFilesFound(name.to_owned()),
            Kind::Crate => Error::NoCratesFound(name.to_owned()),
        }
    }

    fn too_many(self, name: &str) -> Error {
        match self {
            Kind::File => Error::TooManyFiles(name.to_owned()),
            Kind::Crate => Error::TooManyCrates(name.to_owned()),
        }
    }

    fn matches(self, listing: &Listing, matcher: &NameMatcher) -> Vec<Id> {
        match self {
            Kind::File => search_files(listing, matcher).iter().map(|f| f.id).collect(),
            Kind::Crate => search_crates(listing, matcher).iter().map(|c| c.id).collect(),
        }
    }
}

fn resolve_ids(listing: &Listing, names: &[String], regex_mode: bool, kind: Kind) -> Result<Vec<Id>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        if let Some(id) = parse_id(name) {
            ids.push(id);
            continue;
        }
        let matcher = NameMatcher::new(name, regex_mode)?;
        let found = kind.matches(listing, &matcher);
        tracing::info!(name = %name, matches = found.len(), "resolved name");
        match found.len() {
            0 => return Err(kind.not_found(name)),
            1 => ids.extend(found),
            _ if regex_mode => ids.extend(found),
            _ => return Err(kind.too_many(name)),
        }
    }
    Ok(ids)
}

/// Map file names (or IDs) to file IDs.
pub fn resolve_file_ids(listing: &Listing, names: &[String], regex_mode: bool) -> Result<Vec<Id>> {
    resolve_ids(listing, names, regex_mode, Kind::File)
}

/// Map crate names (or IDs) to crate IDs.
pub fn resolve_crate_ids(listing: &Listing, names: &[String], regex_mode: bool) -> Result<Vec<Id>> {
    resolve_ids(listing, names, regex_mode, Kind::Crate)
}

/// Resolve the single crate an upload or rename targets. Regex mode does
/// not relax this: exactly one crate has to match.
pub fn resolve_crate_id(listing: &Listing, name: &str) -> Result<Id> {
    if let Some(id) = parse_id(name) {
        return Ok(id);
    }
    let ids = resolve_ids(listing, &[name.to_owned()], false, Kind::Crate)?;
    ids.into_iter()
        .next()
        .ok_or_else(|| Error::NoCratesFound(name.to_owned()))
}
