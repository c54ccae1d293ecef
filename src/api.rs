// API client module: one thin wrapper per Let's Crate endpoint.
//
// Every call is a single blocking request with basic credentials; the JSON
// envelope is decoded by `model::decode`, which turns `failure` answers into
// `Error::Rejected`. The actual HTTP exchange is delegated to a `Transport`.

use std::path::Path;
use std::time::Duration;

use crate::config::{Credentials, Endpoints};
use crate::error::{Error, Result};
use crate::model::{self, CratePayload, CrateInfo, FilePayload, FileInfo, Id, ItemPayload, Listing};
use crate::transport::{HttpTransport, Request, Response, Transport};

/// Connect timeout, and the overall limit for API calls. File transfers
/// have no overall limit.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// API client holding the transport, the service endpoints and the
/// credentials used for authenticated calls.
pub struct ApiClient<T = HttpTransport> {
    transport: T,
    endpoints: Endpoints,
    credentials: Credentials,
}

impl ApiClient<HttpTransport> {
    /// Create a client for the endpoints configured in the environment
    /// (`LETSCRATE_API_URL` and friends), falling back to the public service.
    pub fn from_env(credentials: Credentials) -> Result<Self> {
        Ok(ApiClient::new(
            HttpTransport::new(DEFAULT_TIMEOUT)?,
            Endpoints::from_env(),
            credentials,
        ))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, endpoints: Endpoints, credentials: Credentials) -> Self {
        ApiClient {
            transport,
            endpoints,
            credentials,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api, path)
    }

    /// Send a request and insist on a 2xx answer.
    fn send(&self, request: Request) -> Result<Response> {
        let res = self.transport.execute(request)?;
        if res.is_success() {
            Ok(res)
        } else {
            Err(Error::HttpStatus(res.status))
        }
    }

    fn get_json<R: serde::de::DeserializeOwned>(&self, path: &str) -> Result<R> {
        let req = Request::get(self.url(path)).basic_auth(&self.credentials);
        model::decode(&self.send(req)?.body)
    }

    fn post_json<R: serde::de::DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> Result<R> {
        let mut req = Request::post(self.url(path)).basic_auth(&self.credentials);
        if !form.is_empty() {
            req = req.form(form);
        }
        model::decode(&self.send(req)?.body)
    }

    /// Check the credentials. `Ok(false)` means the server answered but did
    /// not accept them.
    pub fn authenticate(&self) -> Result<bool> {
        let req = Request::get(self.url("users/authenticate.json")).basic_auth(&self.credentials);
        let res = self.transport.execute(req)?;
        if res.status == 401 {
            return Ok(false);
        }
        if !res.is_success() {
            return Err(Error::HttpStatus(res.status));
        }
        let value: serde_json::Value = serde_json::from_slice(&res.body)?;
        tracing::debug!(body = %value, "decoded response");
        Ok(model::reports_success(&value))
    }

    /// Every crate with its files.
    pub fn list_files(&self) -> Result<Listing> {
        self.get_json("files/list.json")
    }

    pub fn show_file(&self, id: Id) -> Result<FileInfo> {
        let payload: ItemPayload = self.get_json(&format!("files/show/{id}.json"))?;
        Ok(payload.item)
    }

    /// Upload one local file into a crate using multipart/form-data.
    pub fn upload_file(&self, path: &Path, crate_id: Id) -> Result<FileInfo> {
        let crate_id = crate_id.to_string();
        let req = Request::post(self.url("files/upload.json"))
            .basic_auth(&self.credentials)
            .multipart(&[("crate_id", crate_id.as_str())], path.to_path_buf())
            .transfer();
        let payload: FilePayload = model::decode(&self.send(req)?.body)?;
        Ok(payload.file)
    }

    pub fn delete_file(&self, id: Id) -> Result<()> {
        let _: serde_json::Value = self.post_json(&format!("files/destroy/{id}.json"), &[])?;
        Ok(())
    }

    /// Crates without their files.
    pub fn list_crates(&self) -> Result<Vec<CrateInfo>> {
        let listing: Listing = self.get_json("crates/list.json")?;
        Ok(listing.crates)
    }

    pub fn create_crate(&self, name: &str) -> Result<CrateInfo> {
        let payload: CratePayload = self.post_json("crates/add.json", &[("name", name)])?;
        Ok(payload.krate)
    }

    pub fn rename_crate(&self, id: Id, name: &str) -> Result<CrateInfo> {
        let payload: CratePayload =
            self.post_json(&format!("crates/rename/{id}.json"), &[("name", name)])?;
        Ok(payload.krate)
    }

    pub fn delete_crate(&self, id: Id) -> Result<()> {
        let _: serde_json::Value = self.post_json(&format!("crates/destroy/{id}.json"), &[])?;
        Ok(())
    }

    /// The public page of a file answers with a redirect to the real
    /// download location. Password protected files do not redirect.
    pub fn resolve_download_url(&self, short_code: &str) -> Result<String> {
        let req = Request::get(format!("{}{}", self.endpoints.downloads, short_code)).no_redirects();
        let res = self.transport.execute(req)?;
        match res.location {
            Some(location) if res.is_redirect() => {
                tracing::info!(%location, "got long URL");
                Ok(location)
            }
            _ if res.is_success() || res.is_redirect() => {
                Err(Error::PasswordProtected(short_code.to_owned()))
            }
            _ => Err(Error::HttpStatus(res.status)),
        }
    }

    /// Plain unauthenticated GET returning the body.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        Ok(self.send(Request::get(url).transfer())?.body)
    }
}
