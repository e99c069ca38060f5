// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) parses arguments and hands off to these modules.
//
// Module responsibilities:
// - `api`: blocking HTTP client for the platform's REST API.
// - `auth`: login and token persistence.
// - `cli`: command line argument model.
// - `commands`: one handler per action and resource type.
// - `config`: YAML command configuration.
// - `upload`: the bulk image upload pipeline behind `update imageset`.
// - `ui`: prompts, highlighted output and progress bars.
pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod ui;
pub mod upload;

pub use error::{Error, Result};
