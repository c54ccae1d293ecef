// Transport module: the HTTP seam between the API wrappers and the network.
//
// `ApiClient` only builds `Request` values and reads `Response` values; the
// blocking reqwest client lives behind the `Transport` trait so the rest of
// the crate can be exercised with canned responses.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, LOCATION};
use reqwest::redirect::Policy;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Credentials;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Empty,
    Form(Vec<(String, String)>),
    /// Text fields plus one file sent as the `file` part.
    Multipart {
        fields: Vec<(String, String)>,
        file: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub credentials: Option<Credentials>,
    pub body: Body,
    pub follow_redirects: bool,
    /// File uploads and downloads: only connecting is time limited.
    pub transfer: bool,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            method: Method::Get,
            url: url.into(),
            credentials: None,
            body: Body::Empty,
            follow_redirects: true,
            transfer: false,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Request {
            method: Method::Post,
            ..Request::get(url)
        }
    }

    pub fn basic_auth(mut self, credentials: &Credentials) -> Self {
        self.credentials = Some(credentials.clone());
        self
    }

    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = Body::Form(
            fields
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        );
        self
    }

    pub fn multipart(mut self, fields: &[(&str, &str)], file: PathBuf) -> Self {
        self.body = Body::Multipart {
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            file,
        };
        self
    }

    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn transfer(mut self) -> Self {
        self.transfer = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Something that can perform a single HTTP exchange.
pub trait Transport {
    fn execute(&self, request: Request) -> Result<Response>;
}

/// Build the `Authorization: Basic ...` header for a set of credentials.
pub fn basic_auth_header(credentials: &Credentials) -> HeaderValue {
    let token = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
    let mut value = HeaderValue::from_str(&format!("Basic {token}"))
        .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
    value.set_sensitive(true);
    value
}

/// Blocking reqwest transport. Keeps three clients because reqwest fixes
/// the redirect policy and timeouts at build time.
pub struct HttpTransport {
    client: Client,
    no_redirect: Client,
    transfer: Client,
}

impl HttpTransport {
    /// `timeout` bounds connecting, and the whole exchange for API calls.
    /// Transfers run as long as the server keeps sending.
    pub fn new(timeout: Duration) -> Result<Self> {
        let user_agent = concat!("letscrate/", env!("CARGO_PKG_VERSION"));
        let build = |policy: Policy, total: Option<Duration>| {
            Client::builder()
                .user_agent(user_agent)
                .connect_timeout(timeout)
                .timeout(total)
                .redirect(policy)
                .build()
                .map_err(|e| Error::Connection(format!("Failed to build HTTP client: {e}")))
        };
        Ok(HttpTransport {
            client: build(Policy::default(), Some(timeout))?,
            no_redirect: build(Policy::none(), Some(timeout))?,
            transfer: build(Policy::default(), None)?,
        })
    }

    fn auth_headers(credentials: Option<&Credentials>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(c) = credentials {
            headers.insert(AUTHORIZATION, basic_auth_header(c));
        }
        headers
    }
}

fn map_send_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Connection(err.to_string())
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: Request) -> Result<Response> {
        let client = if request.transfer {
            &self.transfer
        } else if request.follow_redirects {
            &self.client
        } else {
            &self.no_redirect
        };
        tracing::debug!(method = ?request.method, url = %request.url, "sending request");

        let builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        }
        .headers(Self::auth_headers(request.credentials.as_ref()));

        let builder = match request.body {
            Body::Empty => builder,
            Body::Form(fields) => builder.form(&fields),
            Body::Multipart { fields, file } => {
                let handle = File::open(&file)
                    .map_err(|e| Error::io(format!("Failed to open {}", file.display()), e))?;
                let file_name = file
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".into());
                let part = multipart::Part::reader(handle)
                    .file_name(file_name)
                    .mime_str("application/octet-stream")
                    .map_err(map_send_error)?;
                let form = fields
                    .into_iter()
                    .fold(multipart::Form::new(), |form, (k, v)| form.text(k, v))
                    .part("file", part);
                builder.multipart(form)
            }
        };

        let res = builder.send().map_err(map_send_error)?;
        let status = res.status().as_u16();
        let location = res
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = res.bytes().map_err(map_send_error)?.to_vec();
        tracing::debug!(status, bytes = body.len(), "received response");

        Ok(Response {
            status,
            location,
            body,
        })
    }
}
