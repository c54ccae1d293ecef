// Library root
// -----------
// This crate exposes the library surface behind the `letscrate` binary.
// `main.rs` parses the command line, settles the credentials and then hands
// the selected action to `actions::Session`.
//
// Module responsibilities:
// - `api`: one wrapper per Let's Crate endpoint, built on a `Transport`.
// - `transport`: the HTTP exchange itself (reqwest, basic auth, redirects).
// - `model`: wire types and the success/failure envelope.
// - `resolve`: turning names and patterns into file or crate IDs.
// - `actions`: runs an action over its arguments and prints the outcome.
// - `output`: terminal-width aware formatting of listings and errors.
// - `config`: endpoints and the stored credentials file.
// - `update`: self update against the published release manifest.
// - `cli`: command line definition.
// - `ui`: prompts and spinners.
pub mod actions;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod resolve;
pub mod transport;
pub mod ui;
pub mod update;

pub use error::{Error, Result};
