//! Imageset commands.

use anyhow::{bail, Context as _, Result};
use serde_json::{json, Value};

use super::Context;
use crate::api;
use crate::config::{ImagesetConfig, ImagesetType};
use crate::ui;
use crate::upload::{self, Backend, Pipeline, RemoteImageset};

fn imageset_url(ctx: &Context<'_>, id: &str) -> Result<String> {
    Ok(format!("{}imagesets/{}", ctx.api_url()?, id))
}

pub fn get(ctx: &Context<'_>) -> Result<()> {
    let id = ctx.id()?;
    ui::print_id("imageset", id);
    let res = ctx
        .api
        .get_json(&imageset_url(ctx, id)?)
        .context("Failed to get imageset")?;
    ui::print_json(&res)
}

pub fn delete(ctx: &Context<'_>) -> Result<()> {
    let id = ctx.id()?;
    ui::print_id("imageset", id);
    ctx.api
        .delete(&imageset_url(ctx, id)?)
        .context("Failed to delete imageset")?;
    println!("Deleted.");
    Ok(())
}

/// Refuse to switch the type of an imageset that already holds images.
pub fn check_can_update(ims_type: ImagesetType, imageset: &Value) -> Result<()> {
    let marker = match ims_type {
        ImagesetType::File => "/source/upload",
        ImagesetType::Url => "/source/transfer/url",
    };
    if imageset.pointer(marker).is_some() {
        return Ok(());
    }
    let has_images = imageset["images"]
        .as_array()
        .map(|images| !images.is_empty())
        .unwrap_or(false);
    if has_images {
        bail!("Chosen imageset already has images, cannot change type");
    }
    Ok(())
}

/// Imageset body that has the platform fetch images from a dataset column.
///
/// Images are processed in the `upload` category and scheduled on the
/// collection's own node group, `collection_<collection_id>`.
pub fn url_imageset_body(config: &ImagesetConfig) -> Value {
    json!({
        "name": "Imageset created by CLI",
        "source": {
            "dataset_id": config.dataset_id,
            "transfer": {
                "url": {
                    "dataset_column": config.dataset_column,
                },
            },
        },
        "processing_category": "upload",
        "node_groups": [format!("collection_{}", config.collection_id)],
    })
}

/// Dataset joining the imageset's image names to a dataset column.
pub fn join_dataset_body(imageset_id: &str, config: &ImagesetConfig) -> Value {
    json!({
        "name": "join dataset",
        "source": {
            "imageset_id": imageset_id,
            "dataset_id": config.dataset_id,
            "imageset_name_join_to_dataset": {
                "dataset_column": config.dataset_column,
            },
        },
    })
}

pub fn update(ctx: &Context<'_>) -> Result<()> {
    let id = ctx.id()?;
    ui::print_id("imageset", id);
    let config = ImagesetConfig::load(ctx.config_path()?)?;
    let url = imageset_url(ctx, id)?;

    let current = ctx.api.get_json(&url).context("Failed to get imageset")?;
    check_can_update(config.imageset_type, &current["imageset"])?;

    match config.imageset_type {
        ImagesetType::Url => {
            ctx.api
                .put_json(&url, &url_imageset_body(&config))
                .context("Failed to update imageset")?;
        }
        ImagesetType::File => upload_files(ctx, id, &config)?,
    }

    update_join_dataset(ctx, id, &config)
}

fn upload_files(ctx: &Context<'_>, id: &str, config: &ImagesetConfig) -> Result<()> {
    let files = config.file_config()?;
    let found = upload::discover(&files.paths, &files.discover_options());
    tracing::info!(
        images = found.assets.len(),
        bytes = found.total_size,
        "found images to upload"
    );

    let remote = RemoteImageset::new(ctx.api.clone(), ctx.project()?, id);
    let uploader = Backend::from_large_image_flag(config.use_wsi).uploader(api::upload_client()?);
    let progress = ui::UploadProgress::new();
    let summary = Pipeline::new(&remote, uploader.as_ref())
        .run(&found.assets, &progress)
        .context("Upload aborted")?;

    if summary.missing() > 0 {
        tracing::warn!(
            missing = summary.missing(),
            healed = summary.healed,
            "some images did not upload"
        );
    }
    Ok(())
}

/// Pulls the collection out of a `GET collections/{id}` response and links
/// it to `join_id`.
pub fn attach_join_dataset(mut current: Value, join_id: Value) -> Result<Value> {
    let Some(mut collection) = current.get_mut("collection").map(Value::take) else {
        bail!("response has no collection");
    };
    let Some(fields) = collection.as_object_mut() else {
        bail!("collection is not an object");
    };
    fields.insert("join_dataset_id".into(), join_id);
    Ok(collection)
}

fn update_join_dataset(ctx: &Context<'_>, id: &str, config: &ImagesetConfig) -> Result<()> {
    let join_url = format!("{}datasets/", ctx.api_url()?);
    let join = ctx
        .api
        .post_json(&join_url, &join_dataset_body(id, config))
        .context("Failed to create join dataset")?;
    let join_id = join["dataset"]["id"].clone();
    if join_id.is_null() {
        bail!("join dataset response carried no id");
    }

    let collection_url = format!("{}collections/{}", ctx.api_url()?, config.collection_id);
    let current = ctx.api.get_json(&collection_url)?;
    let collection = attach_join_dataset(current, join_id)
        .with_context(|| format!("collection {} not found", config.collection_id))?;
    ctx.api
        .put_json(&collection_url, &collection)
        .context("Failed to attach join dataset to collection")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> ImagesetConfig {
        ImagesetConfig::from_yaml(yaml).unwrap()
    }

    fn url_config() -> ImagesetConfig {
        config(
            "imageset_type: url\ncollection_id: test-collection-id\ndataset_id: my ds id\ndataset_column: foo\n",
        )
    }

    #[test]
    fn url_imageset_body_binds_column() {
        let body = url_imageset_body(&url_config());
        assert_eq!(
            body,
            json!({
                "name": "Imageset created by CLI",
                "source": {
                    "dataset_id": "my ds id",
                    "transfer": { "url": { "dataset_column": "foo" } },
                },
                "processing_category": "upload",
                "node_groups": ["collection_test-collection-id"],
            })
        );
    }

    #[test]
    fn join_dataset_links_imageset_and_column() {
        let body = join_dataset_body("ims1", &url_config());
        assert_eq!(body["source"]["imageset_id"], "ims1");
        assert_eq!(body["source"]["dataset_id"], "my ds id");
        assert_eq!(
            body["source"]["imageset_name_join_to_dataset"]["dataset_column"],
            "foo"
        );
    }

    #[test]
    fn same_type_can_always_update() {
        let ims = json!({ "source": { "upload": {} }, "images": [{}, {}] });
        assert!(check_can_update(ImagesetType::File, &ims).is_ok());
    }

    #[test]
    fn empty_imageset_can_change_type() {
        let ims = json!({ "source": { "upload": {} }, "images": [] });
        assert!(check_can_update(ImagesetType::Url, &ims).is_ok());
        assert!(check_can_update(ImagesetType::Url, &json!({})).is_ok());
    }

    #[test]
    fn populated_imageset_cannot_change_type() {
        let ims = json!({ "source": { "transfer": { "url": {} } }, "images": [{}] });
        assert!(check_can_update(ImagesetType::File, &ims).is_err());
    }

    #[test]
    fn join_dataset_is_attached_to_collection() {
        let current = json!({ "collection": { "id": "c1", "name": "cats" } });
        let collection = attach_join_dataset(current, json!("join1")).unwrap();
        assert_eq!(
            collection,
            json!({ "id": "c1", "name": "cats", "join_dataset_id": "join1" })
        );
    }

    #[test]
    fn unexpected_collection_responses_are_errors() {
        for current in [
            json!([1, 2]),
            json!("collection"),
            json!(null),
            json!({}),
            json!({ "collection": [] }),
            json!({ "collection": null }),
        ] {
            assert!(attach_join_dataset(current, json!("join1")).is_err());
        }
    }
}
