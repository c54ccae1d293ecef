// Wire types for the Let's Crate API.
//
// Every response body is a JSON object. A request failed when any top-level
// value is the string "failure"; the human readable reason lives in
// `message`. Successful payloads keep the data under a resource key
// (`crates`, `crate`, `item`, `file`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{Error, Result};

/// Numeric identifier of a file or crate. The service is not consistent
/// about sending numbers or strings, so both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Id(pub u64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Id(n)),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(Id)
                .map_err(|_| serde::de::Error::custom(format!("invalid id {s:?}"))),
        }
    }
}

impl std::str::FromStr for Id {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Id)
    }
}

/// A file stored inside a crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: Id,
    pub name: String,
    pub short_code: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A crate. `files` is only present in the full listing and is `null` for
/// empty crates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrateInfo {
    pub id: Id,
    pub name: String,
    pub short_code: String,
    #[serde(default)]
    pub files: Option<Vec<FileInfo>>,
}

impl CrateInfo {
    pub fn files(&self) -> &[FileInfo] {
        self.files.as_deref().unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }
}

/// Every crate in the account together with its files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub crates: Vec<CrateInfo>,
}

impl Listing {
    pub fn files(&self) -> impl Iterator<Item = &FileInfo> {
        self.crates.iter().flat_map(CrateInfo::files)
    }
}

#[derive(Debug, Deserialize)]
pub struct ItemPayload {
    pub item: FileInfo,
}

#[derive(Debug, Deserialize)]
pub struct FilePayload {
    pub file: FileInfo,
}

#[derive(Debug, Deserialize)]
pub struct CratePayload {
    #[serde(rename = "crate")]
    pub krate: CrateInfo,
}

/// Outcome discriminant of a response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure(String),
}

/// Inspect the top-level values of a response for the `failure` marker.
pub fn status_of(body: &Value) -> Status {
    let failed = body
        .as_object()
        .map(|map| map.values().any(|v| v.as_str() == Some("failure")))
        .unwrap_or(false);
    if failed {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("The server reported a failure.")
            .to_owned();
        Status::Failure(message)
    } else {
        Status::Success
    }
}

/// Whether any top-level value is the string `success`.
pub fn reports_success(body: &Value) -> bool {
    body.as_object()
        .map(|map| map.values().any(|v| v.as_str() == Some("success")))
        .unwrap_or(false)
}

/// Decode a response body, turning `failure` envelopes into errors.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let value: Value = serde_json::from_slice(body)?;
    tracing::debug!(body = %value, "decoded response");
    match status_of(&value) {
        Status::Failure(message) => Err(Error::Rejected {
            message,
            argument: String::new(),
        }),
        Status::Success => Ok(serde_json::from_value(value)?),
    }
}
