//! Resource command handlers.
//!
//! Each handler is a thin wrapper over one or two REST calls; the only
//! long running flow is `update imageset`, which drives the upload pipeline.

pub mod collections;
pub mod datasets;
pub mod imagesets;
pub mod projects;

use std::path::Path;

use anyhow::{bail, Context as _, Result};

use crate::api::ApiClient;
use crate::cli::{Action, Resource, ResourceArgs};

/// Everything a handler needs: the client and the parsed arguments.
pub struct Context<'a> {
    pub api: &'a ApiClient,
    pub args: &'a ResourceArgs,
}

impl Context<'_> {
    pub fn project(&self) -> Result<&str> {
        self.args
            .project
            .as_deref()
            .context("a project id is required, pass it with --project")
    }

    pub fn id(&self) -> Result<&str> {
        match self.args.id.as_deref() {
            Some(id) => Ok(id),
            None => bail!("a {} id is required", self.args.resource),
        }
    }

    pub fn config_path(&self) -> Result<&Path> {
        self.args
            .config
            .as_deref()
            .context("Configuration file path missing, pass it with --config")
    }

    /// Project scoped API prefix.
    pub fn api_url(&self) -> Result<String> {
        Ok(self.api.api_url(self.project()?))
    }
}

/// Dispatch `action` on the resource named in `args`.
pub fn run(action: Action, api: &ApiClient, args: &ResourceArgs) -> Result<()> {
    if !api.has_token() {
        tracing::warn!("no token found, run `zeg login` or pass --token");
    }
    let ctx = Context { api, args };
    match (action, args.resource) {
        (Action::Get, Resource::Collections) => collections::get(&ctx),
        (Action::Create, Resource::Collections) => collections::create(&ctx),
        (Action::Update, Resource::Collections) => collections::update(&ctx),
        (Action::Delete, Resource::Collections) => collections::delete(&ctx),
        (Action::Publish, Resource::Collections) => collections::publish(&ctx),
        (Action::Get, Resource::Dataset) => datasets::get(&ctx),
        (Action::Update, Resource::Dataset) => datasets::update(&ctx),
        (Action::Delete, Resource::Dataset) => datasets::delete(&ctx),
        (Action::Get, Resource::Imageset) => imagesets::get(&ctx),
        (Action::Update, Resource::Imageset) => imagesets::update(&ctx),
        (Action::Delete, Resource::Imageset) => imagesets::delete(&ctx),
        (Action::Get, Resource::Projects) => projects::list(&ctx),
        (action, resource) => bail!("`{action} {resource}` is not supported"),
    }
}
