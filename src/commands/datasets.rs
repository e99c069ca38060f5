//! Dataset commands.

use std::path::Path;

use anyhow::{Context as _, Result};

use super::Context;
use crate::config::{self, DatasetConfig};
use crate::ui;

fn dataset_url(ctx: &Context<'_>, id: &str) -> Result<String> {
    Ok(format!("{}datasets/{}", ctx.api_url()?, id))
}

/// Content type for a data file, guessed from its extension.
pub fn data_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string()
}

pub fn get(ctx: &Context<'_>) -> Result<()> {
    let id = ctx.id()?;
    ui::print_id("dataset", id);
    let res = ctx
        .api
        .get_json(&dataset_url(ctx, id)?)
        .context("Failed to get dataset")?;
    ui::print_json(&res)
}

/// Replace a dataset's data with a local file.
pub fn update(ctx: &Context<'_>) -> Result<()> {
    let id = ctx.id()?;
    ui::print_id("dataset", id);
    let config: DatasetConfig = config::load(ctx.config_path()?)?;
    let path = &config.file_config.path;
    let url = format!("{}/file", dataset_url(ctx, id)?);

    let spinner = ui::spinner("Uploading...");
    let res = ctx.api.post_file(&url, path, &data_mime(path));
    spinner.finish_and_clear();
    let res = res.with_context(|| format!("Failed to upload {}", path.display()))?;
    ui::print_json(&res)
}

pub fn delete(ctx: &Context<'_>) -> Result<()> {
    let id = ctx.id()?;
    ui::print_id("dataset", id);
    ctx.api
        .delete(&dataset_url(ctx, id)?)
        .context("Failed to delete dataset")?;
    println!("Deleted.");
    Ok(())
}
