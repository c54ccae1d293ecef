// Actions: run the selected operation against the API and print the result.
//
// A `Session` is built once per run. It fetches the account listing at most
// once (name resolution, downloads and lookups all read from it) and keeps
// going after per-argument failures, remembering that something failed so
// the process can exit non-zero.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::api::ApiClient;
use crate::cli::Action;
use crate::error::{Error, Result};
use crate::model::{CrateInfo, FileInfo, Id, Listing};
use crate::output::Printer;
use crate::resolve::{self, NameMatcher};
use crate::transport::Transport;
use crate::ui;

/// Flags that change how an action behaves.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Take every match of a name instead of insisting on one.
    pub regex: bool,
    /// Show transfer spinners.
    pub progress: bool,
    /// Directory downloads are written into.
    pub target_dir: PathBuf,
}

/// Outcome of a run that did not abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// At least one argument failed and was reported.
    PartialFailure,
}

/// True when `name` is exactly one normal path component, so joining it
/// to a directory stays inside that directory.
fn is_plain_name(name: &str) -> bool {
    let mut parts = Path::new(name).components();
    matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None))
}

pub struct Session<T: Transport, O: Write, E: Write> {
    api: ApiClient<T>,
    printer: Printer<O, E>,
    options: Options,
    listing: Option<Listing>,
    failed: bool,
}

impl<T: Transport, O: Write, E: Write> Session<T, O, E> {
    pub fn new(api: ApiClient<T>, printer: Printer<O, E>, options: Options) -> Self {
        Session {
            api,
            printer,
            options,
            listing: None,
            failed: false,
        }
    }

    pub fn printer(&self) -> &Printer<O, E> {
        &self.printer
    }

    pub fn printer_mut(&mut self) -> &mut Printer<O, E> {
        &mut self.printer
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    /// Run one action over the positional arguments.
    ///
    /// # Errors
    ///
    /// Errors that make the rest of the run pointless: the listing could not
    /// be fetched, a name did not resolve, the upload target is invalid.
    pub fn run(&mut self, action: &Action, args: &[String]) -> Result<Outcome> {
        tracing::info!(?action, args = args.len(), "running action");
        match action {
            Action::TestCredentials => self.test_credentials()?,
            Action::UploadFiles { krate } => self.upload_files(krate, args)?,
            Action::DeleteFiles => self.delete_files(args)?,
            Action::ListFiles => self.list_files()?,
            Action::DownloadFiles => self.download_files(args)?,
            Action::SearchFiles => self.search_files(args)?,
            Action::ShowFiles => self.show_files(args),
            Action::CreateCrates => self.create_crates(args),
            Action::ListCrates => self.list_crates(args)?,
            Action::DownloadCrates => self.download_crates(args)?,
            Action::SearchCrates => self.search_crates(args)?,
            Action::RenameCrate { krate } => self.rename_crate(krate, args)?,
            Action::DeleteCrates => self.delete_crates(args)?,
            Action::DownloadAll => self.download_all()?,
        }
        Ok(if self.failed {
            Outcome::PartialFailure
        } else {
            Outcome::Success
        })
    }

    /// Report a failure for one argument and carry on.
    fn fail(&mut self, err: Error, argument: &str) {
        self.failed = true;
        self.printer.report(&err.with_argument(argument));
    }

    /// The account listing, fetched on first use.
    fn listing(&mut self) -> Result<&Listing> {
        if self.listing.is_none() {
            tracing::info!("downloading file list");
            let listing = self
                .api
                .list_files()
                .map_err(|e| Error::ListingUnavailable(Box::new(e)))?;
            self.listing = Some(listing);
        }
        Ok(self.listing.get_or_insert_with(Listing::default))
    }

    fn test_credentials(&mut self) -> Result<()> {
        let user = self.api.credentials().username.clone();
        tracing::info!(%user, "testing credentials");
        match self.api.authenticate() {
            Ok(true) => self.printer.echo("The credentials are valid."),
            Ok(false) => self.fail(Error::InvalidCredentials(format!("User:{user}")), ""),
            Err(e) => self.fail(e, &user),
        }
        Ok(())
    }

    fn upload_files(&mut self, krate: &str, files: &[String]) -> Result<()> {
        let crate_id = if resolve::is_valid_id(krate) {
            krate.parse().map_err(|_| Error::InvalidCrateId(krate.to_owned()))?
        } else {
            tracing::info!(krate, "mapping name to crate");
            resolve::resolve_crate_id(self.listing()?, krate)?
        };

        for file in files {
            let path = Path::new(file);
            let size = match fs::metadata(path) {
                Ok(meta) if meta.is_file() => meta.len(),
                Ok(_) => {
                    let err = std::io::Error::from(std::io::ErrorKind::InvalidInput);
                    self.fail(Error::io(format!("{file} is not a file"), err), file);
                    continue;
                }
                Err(e) => {
                    self.fail(Error::io(format!("Failed to open {file}"), e), file);
                    continue;
                }
            };
            tracing::info!(file, %crate_id, "uploading file");
            let spinner = ui::spinner(format!("Uploading {file}..."), self.options.progress);
            let result = self.api.upload_file(path, crate_id);
            spinner.finish_and_clear();
            match result {
                Ok(uploaded) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| file.clone());
                    let line = self
                        .printer
                        .file_line(&name, Some(size), &uploaded.short_code, uploaded.id);
                    self.printer.echo(&line);
                }
                Err(e) => self.fail(e, file),
            }
        }
        Ok(())
    }

    fn delete_files(&mut self, names: &[String]) -> Result<()> {
        let regex = self.options.regex;
        let listing = self.listing()?;
        let targets: Vec<(Id, String)> = resolve::resolve_file_ids(listing, names, regex)?
            .into_iter()
            .map(|id| (id, resolve::file_name(listing, id).map_or_else(|| id.to_string(), str::to_owned)))
            .collect();

        for (id, name) in targets {
            tracing::info!(%id, "deleting file");
            match self.api.delete_file(id) {
                Ok(()) => self.printer.echo(&format!("{name} deleted.")),
                Err(e) => self.fail(e, &name),
            }
        }
        Ok(())
    }

    fn list_files(&mut self) -> Result<()> {
        let crates = self.listing()?.crates.clone();
        for c in &crates {
            self.printer.crate_with_files(c);
        }
        Ok(())
    }

    fn download_files(&mut self, names: &[String]) -> Result<()> {
        let regex = self.options.regex;
        let listing = self.listing()?;
        let ids = resolve::resolve_file_ids(listing, names, regex)?;
        let files: Vec<Result<FileInfo>> = ids
            .into_iter()
            .map(|id| {
                resolve::file_by_id(listing, id)
                    .cloned()
                    .ok_or_else(|| Error::NoFilesFound(id.to_string()))
            })
            .collect();

        let dir = self.options.target_dir.clone();
        for file in files {
            match file {
                Ok(file) => self.download_file(&file, &dir),
                Err(e) => {
                    let arg = e.argument().unwrap_or_default();
                    self.fail(e, &arg);
                }
            }
        }
        Ok(())
    }

    /// Download one file into `dir`, skipping names that already exist.
    fn download_file(&mut self, file: &FileInfo, dir: &Path) {
        if !is_plain_name(&file.name) {
            self.fail(Error::UnsafeName(file.name.clone()), &file.name);
            return;
        }
        let dest = dir.join(&file.name);
        if dest.exists() {
            self.printer
                .warning(&format!("\"{}\" already exists. Skipping.", file.name));
            return;
        }
        tracing::info!(id = %file.id, "downloading file");
        let spinner = ui::spinner(format!("Downloading {}...", file.name), self.options.progress);
        let result = self
            .api
            .resolve_download_url(&file.short_code)
            .and_then(|url| self.api.fetch(&url))
            .and_then(|body| {
                fs::write(&dest, body)
                    .map_err(|e| Error::io(format!("Failed to write {}", dest.display()), e))
            });
        spinner.finish_and_clear();
        match result {
            Ok(()) => self.printer.downloaded(&file.name),
            Err(e) => self.fail(e, &file.name),
        }
    }

    fn search_files(&mut self, patterns: &[String]) -> Result<()> {
        let regex = self.options.regex;
        for pattern in patterns {
            let matcher = match NameMatcher::new(pattern, regex) {
                Ok(m) => m,
                Err(e) => {
                    self.fail(e, pattern);
                    continue;
                }
            };
            tracing::info!(%pattern, "searching for files");
            let found: Vec<FileInfo> = resolve::search_files(self.listing()?, &matcher)
                .into_iter()
                .cloned()
                .collect();
            if found.is_empty() {
                self.fail(Error::NoFilesFound(pattern.clone()), pattern);
            } else {
                self.printer.header(pattern);
                for f in &found {
                    self.printer.file(f);
                }
            }
        }
        Ok(())
    }

    fn show_files(&mut self, ids: &[String]) {
        for arg in ids {
            let id = match arg.parse::<Id>() {
                Ok(id) if resolve::is_valid_id(arg) => id,
                _ => {
                    self.fail(Error::InvalidFileId(arg.clone()), arg);
                    continue;
                }
            };
            tracing::info!(%id, "getting file info");
            match self.api.show_file(id) {
                Ok(f) => self.printer.file(&f),
                Err(e) => self.fail(e, arg),
            }
        }
    }

    fn create_crates(&mut self, names: &[String]) {
        for name in names {
            tracing::info!(%name, "creating crate");
            match self.api.create_crate(name) {
                Ok(c) => self.printer.krate(&c),
                Err(e) => self.fail(e, name),
            }
        }
    }

    fn list_crates(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            tracing::info!("listing all crates");
            match self.api.list_crates() {
                Ok(crates) => {
                    for c in &crates {
                        self.printer.krate(c);
                    }
                }
                Err(e) => self.fail(e, "crates"),
            }
            return Ok(());
        }

        let regex = self.options.regex;
        for name in names {
            let crates: Vec<CrateInfo> = if resolve::is_valid_id(name) {
                let id: Id = name.parse().map_err(|_| Error::InvalidCrateId(name.clone()))?;
                resolve::crate_by_id(self.listing()?, id).cloned().into_iter().collect()
            } else {
                let matcher = match NameMatcher::new(name, regex) {
                    Ok(m) => m,
                    Err(e) => {
                        self.fail(e, name);
                        continue;
                    }
                };
                resolve::search_crates(self.listing()?, &matcher)
                    .into_iter()
                    .cloned()
                    .collect()
            };
            if crates.is_empty() {
                self.fail(Error::NoCratesFound(name.clone()), name);
            }
            for c in &crates {
                self.printer.crate_with_files(c);
            }
        }
        Ok(())
    }

    fn download_crates(&mut self, names: &[String]) -> Result<()> {
        let regex = self.options.regex;
        let ids = resolve::resolve_crate_ids(self.listing()?, names, regex)?;
        for id in ids {
            self.download_crate(id)?;
        }
        Ok(())
    }

    /// Download every file of a crate into a folder named after it.
    fn download_crate(&mut self, id: Id) -> Result<()> {
        let Some(krate) = resolve::crate_by_id(self.listing()?, id).cloned() else {
            self.fail(Error::NoCratesFound(id.to_string()), &id.to_string());
            return Ok(());
        };
        if krate.is_empty() {
            self.printer
                .warning(&format!("The crate \"{}\" is empty. Skipping.", krate.name));
            return Ok(());
        }

        if !is_plain_name(&krate.name) {
            self.fail(Error::UnsafeName(krate.name.clone()), &krate.name);
            return Ok(());
        }
        let folder = self.options.target_dir.join(&krate.name);
        match fs::create_dir(&folder) {
            Ok(()) => self
                .printer
                .echo(&format!("Created folder \"{}\"", krate.name)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => self.printer.warning(&format!(
                "The folder \"{}\" already exists. Files will be downloaded there.",
                krate.name
            )),
            Err(e) => {
                self.fail(Error::io(format!("Failed to create {}", folder.display()), e), &krate.name);
                return Ok(());
            }
        }
        for file in krate.files() {
            self.download_file(file, &folder);
        }
        Ok(())
    }

    fn search_crates(&mut self, patterns: &[String]) -> Result<()> {
        let regex = self.options.regex;
        for pattern in patterns {
            let matcher = match NameMatcher::new(pattern, regex) {
                Ok(m) => m,
                Err(e) => {
                    self.fail(e, pattern);
                    continue;
                }
            };
            tracing::info!(%pattern, "searching for crates");
            let found: Vec<CrateInfo> = resolve::search_crates(self.listing()?, &matcher)
                .into_iter()
                .cloned()
                .collect();
            if found.is_empty() {
                self.fail(Error::NoCratesFound(pattern.clone()), pattern);
            } else {
                self.printer.header(pattern);
                for c in &found {
                    self.printer.krate(c);
                }
            }
        }
        Ok(())
    }

    fn rename_crate(&mut self, krate: &str, new_names: &[String]) -> Result<()> {
        let [new_name] = new_names else {
            return Err(Error::RenameArity(new_names.len()));
        };
        let listing = self.listing()?;
        let id = resolve::resolve_crate_id(listing, krate)?;
        let previous = resolve::crate_name(listing, id).map_or_else(|| id.to_string(), str::to_owned);

        tracing::info!(%id, %new_name, "renaming crate");
        match self.api.rename_crate(id, new_name) {
            Ok(renamed) => self
                .printer
                .echo(&format!("Renamed {previous} to {}.", renamed.name)),
            Err(e) => self.fail(e, new_name),
        }
        Ok(())
    }

    fn delete_crates(&mut self, names: &[String]) -> Result<()> {
        let regex = self.options.regex;
        let listing = self.listing()?;
        let targets: Vec<(Id, String)> = resolve::resolve_crate_ids(listing, names, regex)?
            .into_iter()
            .map(|id| (id, resolve::crate_name(listing, id).map_or_else(|| id.to_string(), str::to_owned)))
            .collect();

        for (id, name) in targets {
            tracing::info!(%id, "deleting crate");
            match self.api.delete_crate(id) {
                Ok(()) => self.printer.echo(&format!("{name} deleted.")),
                Err(e) => self.fail(e, &name),
            }
        }
        Ok(())
    }

    fn download_all(&mut self) -> Result<()> {
        let ids: Vec<Id> = self.listing()?.crates.iter().map(|c| c.id).collect();
        for id in ids {
            self.download_crate(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, Endpoints};
    use crate::output::{test_printer, Width};
    use crate::transport::fake::{redirect, FakeTransport};
    use crate::transport::Response;

    const LISTING: &str = r#"{
        "status": "success",
        "crates": [
            {"id": 10001, "name": "Photos", "short_code": "cp", "files": [
                {"id": 20001, "name": "beach.jpg", "short_code": "fa", "size": 1500},
                {"id": 20002, "name": "beach-night.jpg", "short_code": "fb", "size": 2500000}
            ]},
            {"id": 10002, "name": "Docs", "short_code": "cd", "files": [
                {"id": 20003, "name": "cv.pdf", "short_code": "fc", "size": 12}
            ]},
            {"id": 10003, "name": "Empty", "short_code": "ce", "files": null}
        ]
    }"#;

    fn session(transport: FakeTransport, options: Options) -> Session<FakeTransport, Vec<u8>, Vec<u8>> {
        let endpoints = Endpoints {
            api: "https://api.test/1/".into(),
            short_links: "http://lts.cr/".into(),
            downloads: "http://dl.test/".into(),
            update_manifest: "http://up.test/.current".into(),
        };
        let api = ApiClient::new(transport, endpoints, Credentials::new("alice", "pw"));
        Session::new(api, test_printer(Width::Unknown, false), options)
    }

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_owned()).collect()
    }

    fn with_listing() -> FakeTransport {
        FakeTransport::new().json("files/list.json", LISTING)
    }

    #[test]
    fn list_files_prints_every_crate() {
        let mut s = session(with_listing(), Options::default());
        assert_eq!(s.run(&Action::ListFiles, &[]).unwrap(), Outcome::Success);
        let out = s.printer().stdout_text();
        assert!(out.contains("Photos\t\t  URL: http://lts.cr/cp"));
        assert!(out.contains("* beach-night.jpg\t\t  2.5 MB  URL: http://lts.cr/fb"));
        assert!(out.contains("* cv.pdf\t\t  12 B  URL: http://lts.cr/fc"));
        assert!(out.contains("* Crate is empty."));
    }

    #[test]
    fn listing_is_fetched_once() {
        let transport = with_listing()
            .json("files/destroy/20003.json", r#"{"status":"success"}"#)
            .json("files/destroy/20001.json", r#"{"status":"success"}"#);
        let mut s = session(transport, Options::default());
        s.run(&Action::DeleteFiles, &args(&["cv", "^beach\\.jpg$"])).unwrap();
        assert_eq!(s.api().transport().count("files/list.json"), 1);
        assert_eq!(s.printer().stdout_text(), "cv.pdf deleted.\nbeach.jpg deleted.\n");
    }

    #[test]
    fn ambiguous_delete_aborts_without_regexp() {
        let mut s = session(with_listing(), Options::default());
        let err = s.run(&Action::DeleteFiles, &args(&["beach"])).unwrap_err();
        assert!(matches!(err, Error::TooManyFiles(_)));
        assert_eq!(s.api().transport().requests.borrow().len(), 1);
    }

    #[test]
    fn regexp_deletes_every_match() {
        let transport = with_listing()
            .json("files/destroy/20001.json", r#"{"status":"success"}"#)
            .json("files/destroy/20002.json", r#"{"status":"failure","message":"Locked"}"#);
        let opts = Options {
            regex: true,
            ..Options::default()
        };
        let mut s = session(transport, opts);
        assert_eq!(
            s.run(&Action::DeleteFiles, &args(&["beach"])).unwrap(),
            Outcome::PartialFailure
        );
        assert_eq!(s.printer().stdout_text(), "beach.jpg deleted.\n");
        assert_eq!(
            s.printer().stderr_text(),
            "Error: Locked\t<beach-night.jpg>\n"
        );
    }

    #[test]
    fn listing_failure_is_fatal() {
        let transport = FakeTransport::new().on("files/list.json", Err(Error::Timeout));
        let mut s = session(transport, Options::default());
        let err = s.run(&Action::ListFiles, &[]).unwrap_err();
        assert!(matches!(err, Error::ListingUnavailable(_)));
    }

    #[test]
    fn search_reports_misses_and_continues() {
        let mut s = session(with_listing(), Options::default());
        let outcome = s.run(&Action::SearchFiles, &args(&["music", "BEACH"])).unwrap();
        assert_eq!(outcome, Outcome::PartialFailure);
        let out = s.printer().stdout_text();
        assert!(out.starts_with("BEACH:\n* beach.jpg"));
        assert!(s
            .printer()
            .stderr_text()
            .contains("No files were found that match that name.\t<music>"));
    }

    #[test]
    fn search_crates_prints_header_and_crates() {
        let mut s = session(with_listing(), Options::default());
        s.run(&Action::SearchCrates, &args(&["^doc"])).unwrap();
        assert_eq!(
            s.printer().stdout_text(),
            "^doc:\nDocs\t\t  URL: http://lts.cr/cd\n"
        );
    }

    #[test]
    fn show_files_validates_ids() {
        let transport = FakeTransport::new().json(
            "files/show/20003.json",
            r#"{"status":"success","item":{"id":20003,"name":"cv.pdf","short_code":"fc","size":12}}"#,
        );
        let mut s = session(transport, Options::default());
        let outcome = s.run(&Action::ShowFiles, &args(&["cv", "20003"])).unwrap();
        assert_eq!(outcome, Outcome::PartialFailure);
        assert!(s.printer().stderr_text().contains("A file ID is a 5 digit number."));
        assert_eq!(s.printer().stdout_text(), "* cv.pdf\t\t  12 B  URL: http://lts.cr/fc\n");
    }

    #[test]
    fn create_crates_prints_each() {
        let transport = FakeTransport::new()
            .json("crates/add.json", r#"{"status":"success","crate":{"id":"10010","name":"A","short_code":"a"}}"#)
            .json("crates/add.json", r#"{"status":"success","crate":{"id":"10011","name":"B","short_code":"b"}}"#);
        let mut s = session(transport, Options::default());
        s.run(&Action::CreateCrates, &args(&["A", "B"])).unwrap();
        assert_eq!(
            s.printer().stdout_text(),
            "A\t\t  URL: http://lts.cr/a\nB\t\t  URL: http://lts.cr/b\n"
        );
    }

    #[test]
    fn rename_uses_previous_name() {
        let transport = with_listing().json(
            "crates/rename/10002.json",
            r#"{"status":"success","crate":{"id":"10002","name":"Papers","short_code":"cd"}}"#,
        );
        let mut s = session(transport, Options::default());
        s.run(&Action::RenameCrate { krate: "docs".into() }, &args(&["Papers"]))
            .unwrap();
        assert_eq!(s.printer().stdout_text(), "Renamed Docs to Papers.\n");
    }

    #[test]
    fn rename_needs_exactly_one_name() {
        let mut s = session(with_listing(), Options::default());
        let err = s
            .run(&Action::RenameCrate { krate: "docs".into() }, &args(&["a", "b"]))
            .unwrap_err();
        assert!(matches!(err, Error::RenameArity(2)));
    }

    #[test]
    fn list_crates_by_id_and_name() {
        let mut s = session(with_listing(), Options::default());
        s.run(&Action::ListCrates, &args(&["10003", "docs"])).unwrap();
        let out = s.printer().stdout_text();
        assert!(out.contains("Empty\t\t  URL: http://lts.cr/ce\n* Crate is empty."));
        assert!(out.contains("Docs\t\t  URL: http://lts.cr/cd\n* cv.pdf"));
    }

    #[test]
    fn list_crates_without_names_uses_crate_endpoint() {
        let transport = FakeTransport::new().json(
            "crates/list.json",
            r#"{"crates":[{"id":1,"name":"Solo","short_code":"s"}]}"#,
        );
        let mut s = session(transport, Options::default());
        s.run(&Action::ListCrates, &[]).unwrap();
        assert_eq!(s.printer().stdout_text(), "Solo\t\t  URL: http://lts.cr/s\n");
        assert_eq!(s.api().transport().count("files/list.json"), 0);
    }

    #[test]
    fn download_writes_file_and_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("beach.jpg"), b"old").unwrap();
        let transport = with_listing()
            .on("dl.test/fc", Ok(redirect("http://cdn.test/cv.pdf")))
            .json("cdn.test/cv.pdf", "PDFDATA");
        let opts = Options {
            target_dir: dir.path().to_path_buf(),
            ..Options::default()
        };
        let mut s = session(transport, opts);
        s.run(&Action::DownloadFiles, &args(&["cv.pdf", "20001"])).unwrap();
        assert_eq!(std::fs::read(dir.path().join("cv.pdf")).unwrap(), b"PDFDATA");
        assert_eq!(std::fs::read(dir.path().join("beach.jpg")).unwrap(), b"old");
        assert_eq!(s.printer().stdout_text(), "cv.pdf downloaded.\n");
        assert!(s
            .printer()
            .stderr_text()
            .contains("\"beach.jpg\" already exists. Skipping."));
    }

    #[test]
    fn password_protected_download_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let transport = with_listing().json("dl.test/fc", "<form>password</form>");
        let opts = Options {
            target_dir: dir.path().to_path_buf(),
            ..Options::default()
        };
        let mut s = session(transport, opts);
        let outcome = s.run(&Action::DownloadFiles, &args(&["cv"])).unwrap();
        assert_eq!(outcome, Outcome::PartialFailure);
        assert!(s.printer().stderr_text().contains("password protected"));
        assert!(!dir.path().join("cv.pdf").exists());
    }

    #[test]
    fn names_must_stay_inside_target_dir() {
        assert!(is_plain_name("cv.pdf"));
        assert!(is_plain_name("Photo backup"));
        assert!(!is_plain_name("/etc/passwd"));
        assert!(!is_plain_name("../up.txt"));
        assert!(!is_plain_name("a/b.txt"));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name(""));
    }

    #[test]
    fn server_names_cannot_escape_download_dir() {
        let root = tempfile::tempdir().unwrap();
        let cwd = root.path().join("cwd");
        std::fs::create_dir(&cwd).unwrap();
        let outside = root.path().join("outside.txt");
        let listing = serde_json::json!({
            "crates": [
                {"id": 10001, "name": "Mixed", "short_code": "cm", "files": [
                    {"id": 20001, "name": outside.to_string_lossy(), "short_code": "fa", "size": 5},
                    {"id": 20002, "name": "../up.txt", "short_code": "fb", "size": 5},
                    {"id": 20003, "name": "ok.txt", "short_code": "fc", "size": 2}
                ]},
                {"id": 10002, "name": "..", "short_code": "cp", "files": [
                    {"id": 20004, "name": "x.txt", "short_code": "fd", "size": 1}
                ]}
            ]
        });
        let transport = FakeTransport::new()
            .json("files/list.json", &listing.to_string())
            .on("dl.test/fa", Ok(redirect("http://cdn.test/a")))
            .on("dl.test/fb", Ok(redirect("http://cdn.test/b")))
            .on("dl.test/fc", Ok(redirect("http://cdn.test/c")))
            .on("dl.test/fd", Ok(redirect("http://cdn.test/d")))
            .json("cdn.test/a", "PWNED")
            .json("cdn.test/b", "PWNED")
            .json("cdn.test/c", "ok")
            .json("cdn.test/d", "PWNED");
        let opts = Options {
            target_dir: cwd.clone(),
            ..Options::default()
        };
        let mut s = session(transport, opts);
        let outcome = s.run(&Action::DownloadAll, &[]).unwrap();

        assert_eq!(outcome, Outcome::PartialFailure);
        assert!(!outside.exists());
        assert!(!root.path().join("up.txt").exists());
        assert!(!root.path().join("x.txt").exists());
        assert_eq!(std::fs::read(cwd.join("Mixed/ok.txt")).unwrap(), b"ok");
        assert_eq!(s.printer().stdout_text(), "Created folder \"Mixed\"\nok.txt downloaded.\n");
        let err = s.printer().stderr_text();
        assert!(err.contains("<../up.txt>"));
        assert!(err.contains("<..>"));
        assert_eq!(s.api().transport().count("cdn.test/a"), 0);
    }

    #[test]
    fn download_all_creates_folders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Docs")).unwrap();
        let transport = with_listing()
            .on("dl.test/fa", Ok(redirect("http://cdn.test/a")))
            .on("dl.test/fb", Ok(redirect("http://cdn.test/b")))
            .on("dl.test/fc", Ok(redirect("http://cdn.test/c")))
            .json("cdn.test/a", "A")
            .json("cdn.test/b", "B")
            .json("cdn.test/c", "C");
        let opts = Options {
            target_dir: dir.path().to_path_buf(),
            ..Options::default()
        };
        let mut s = session(transport, opts);
        assert_eq!(s.run(&Action::DownloadAll, &[]).unwrap(), Outcome::Success);
        assert_eq!(std::fs::read(dir.path().join("Photos/beach.jpg")).unwrap(), b"A");
        assert_eq!(std::fs::read(dir.path().join("Photos/beach-night.jpg")).unwrap(), b"B");
        assert_eq!(std::fs::read(dir.path().join("Docs/cv.pdf")).unwrap(), b"C");
        assert!(!dir.path().join("Empty").exists());
        let err = s.printer().stderr_text();
        assert!(err.contains("The folder \"Docs\" already exists."));
        assert!(err.contains("The crate \"Empty\" is empty. Skipping."));
        assert!(s.printer().stdout_text().contains("Created folder \"Photos\""));
    }

    #[test]
    fn upload_resolves_crate_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, vec![b'x'; 2000]).unwrap();
        let transport = with_listing().json(
            "files/upload.json",
            r#"{"status":"success","file":{"id":20100,"name":"notes.txt","short_code":"nt"}}"#,
        );
        let mut s = session(transport, Options::default());
        let path = file.to_string_lossy().into_owned();
        s.run(&Action::UploadFiles { krate: "docs".into() }, &[path]).unwrap();
        assert_eq!(
            s.printer().stdout_text(),
            "* notes.txt\t\t  2.0 kB  URL: http://lts.cr/nt\n"
        );
        let requests = s.api().transport().requests.borrow();
        let upload = requests.iter().find(|r| r.url.ends_with("upload.json")).unwrap();
        assert!(matches!(
            &upload.body,
            crate::transport::Body::Multipart { fields, .. } if fields[0].1 == "10002"
        ));
    }

    #[test]
    fn upload_with_id_skips_listing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.bin");
        std::fs::write(&file, b"1").unwrap();
        let transport = FakeTransport::new().json(
            "files/upload.json",
            r#"{"status":"success","file":{"id":20101,"name":"a.bin","short_code":"ab"}}"#,
        );
        let mut s = session(transport, Options::default());
        let missing = dir.path().join("missing.bin").to_string_lossy().into_owned();
        let outcome = s
            .run(
                &Action::UploadFiles { krate: "10002".into() },
                &[file.to_string_lossy().into_owned(), missing],
            )
            .unwrap();
        assert_eq!(outcome, Outcome::PartialFailure);
        assert_eq!(s.api().transport().count("files/list.json"), 0);
        assert_eq!(s.api().transport().count("files/upload.json"), 1);
    }

    #[test]
    fn test_credentials_never_prints_password() {
        let transport = FakeTransport::new().on(
            "users/authenticate.json",
            Ok(Response { status: 401, location: None, body: vec![] }),
        );
        let mut s = session(transport, Options::default());
        s.run(&Action::TestCredentials, &[]).unwrap();
        let err = s.printer().stderr_text();
        assert!(err.contains("The credentials are invalid.\t<User:alice>"));
        assert!(!err.contains("pw"));
    }
}
