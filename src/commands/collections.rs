//! Collection commands.

use anyhow::{bail, Context as _, Result};
use serde_json::{json, Value};

use super::Context;
use crate::config::{self, CollectionConfig, PublishConfig};
use crate::ui;

fn collection_url(ctx: &Context<'_>, id: &str) -> Result<String> {
    Ok(format!("{}collections/{}", ctx.api_url()?, id))
}

/// Get one collection, or list all of them when no id is given.
pub fn get(ctx: &Context<'_>) -> Result<()> {
    let url = match ctx.args.id.as_deref() {
        Some(id) => {
            ui::print_id("collection", id);
            collection_url(ctx, id)?
        }
        None => format!("{}collections/", ctx.api_url()?),
    };
    let res = ctx.api.get_json(&url).context("Failed to get collection")?;
    ui::print_json(&res)
}

pub fn create(ctx: &Context<'_>) -> Result<()> {
    let config: CollectionConfig = config::load(ctx.config_path()?)?;
    if config.name.is_none() {
        bail!("a collection needs a name");
    }
    let url = format!("{}collections/", ctx.api_url()?);
    let res = ctx
        .api
        .post_json(&url, &config)
        .context("Failed to create collection")?;
    ui::print_json(&res)
}

/// Overlay the configured fields on an existing collection document.
pub fn merge_collection(mut collection: Value, config: &CollectionConfig) -> Result<Value> {
    let Some(fields) = collection.as_object_mut() else {
        bail!("collection response is not an object");
    };
    if let Value::Object(changes) = serde_json::to_value(config)? {
        fields.extend(changes);
    }
    Ok(collection)
}

pub fn update(ctx: &Context<'_>) -> Result<()> {
    let id = ctx.id()?;
    ui::print_id("collection", id);
    let config: CollectionConfig = config::load(ctx.config_path()?)?;
    let url = collection_url(ctx, id)?;

    let current = ctx.api.get_json(&url)?;
    let collection = merge_collection(current["collection"].clone(), &config)?;
    let res = ctx
        .api
        .put_json(&url, &collection)
        .context("Failed to update collection")?;
    ui::print_json(&res)
}

pub fn delete(ctx: &Context<'_>) -> Result<()> {
    let id = ctx.id()?;
    ui::print_id("collection", id);
    ctx.api
        .delete(&collection_url(ctx, id)?)
        .context("Failed to delete collection")?;
    println!("Deleted.");
    Ok(())
}

pub fn publish(ctx: &Context<'_>) -> Result<()> {
    let id = ctx.id()?;
    ui::print_id("collection", id);
    let config: PublishConfig = config::load(ctx.config_path()?)?;
    let url = format!("{}/publish", collection_url(ctx, id)?);
    let body = json!({
        "publish": config.publish,
        "target_project": config.destination_project,
    });
    let res = ctx
        .api
        .post_json(&url, &body)
        .context("Failed to publish collection")?;
    ui::print_json(&res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_only_configured_fields() {
        let current = json!({ "id": "c1", "name": "Old", "description": "keep" });
        let config = CollectionConfig {
            name: Some("New".into()),
            ..CollectionConfig::default()
        };
        let merged = merge_collection(current, &config).unwrap();
        assert_eq!(
            merged,
            json!({ "id": "c1", "name": "New", "description": "keep" })
        );
    }

    #[test]
    fn merge_needs_an_object() {
        assert!(merge_collection(Value::Null, &CollectionConfig::default()).is_err());
    }
}
