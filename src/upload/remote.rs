//! Imageset endpoints used by the upload pipeline.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::UploadResult;
use crate::api::ApiClient;
use crate::error::{Error, Result};

/// The remote side of an upload job: one imageset's capacity, signed
/// destinations, positional completion and gap healing.
pub trait ImagesetApi: Send + Sync {
    /// Reserves `delta` more slots and returns the imageset's new size.
    fn extend(&self, delta: u64) -> Result<u64>;

    /// Returns one upload destination per id, in a single round trip.
    fn signed_destinations(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>>;

    /// Registers `images` at slots `start..start + images.len()`. `None`
    /// entries are placeholders for assets that failed to upload.
    fn complete_bulk(&self, start: u64, images: &[Option<UploadResult>]) -> Result<()>;

    /// Fills every slot that never received an image with a placeholder.
    fn replace_empties(&self) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct Extended {
    new_size: u64,
}

/// [`ImagesetApi`] over the platform's REST endpoints.
pub struct RemoteImageset {
    api: ApiClient,
    url: String,
}

impl RemoteImageset {
    pub fn new(api: ApiClient, project: &str, imageset_id: &str) -> Self {
        let url = format!("{}imagesets/{}", api.api_url(project), imageset_id);
        RemoteImageset { api, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ImagesetApi for RemoteImageset {
    fn extend(&self, delta: u64) -> Result<u64> {
        let url = format!("{}/extend", self.url);
        let res = self.api.post_json(&url, &json!({ "delta": delta }))?;
        let extended: Extended = serde_json::from_value(res)?;
        if extended.new_size < delta {
            return Err(Error::Storage(format!(
                "imageset reported size {} after reserving {} slots",
                extended.new_size, delta
            )));
        }
        Ok(extended.new_size)
    }

    fn signed_destinations(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>> {
        let url = format!("{}/signed_blob_url", self.url);
        let res = self.api.post_json(&url, &json!({ "ids": ids }))?;
        Ok(serde_json::from_value(res)?)
    }

    fn complete_bulk(&self, start: u64, images: &[Option<UploadResult>]) -> Result<()> {
        let url = format!("{}/images_bulk?start={}", self.url, start);
        self.api.post_json(&url, &json!({ "images": images }))?;
        Ok(())
    }

    fn replace_empties(&self) -> Result<()> {
        let url = format!("{}/replace_empties", self.url);
        self.api.post_json(&url, &json!({}))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imageset_url_is_project_scoped() {
        let api = ApiClient::new("https://example.com", None).unwrap();
        let remote = RemoteImageset::new(api, "p1", "ims9");
        assert_eq!(
            remote.url(),
            "https://example.com/api/v0/project/p1/imagesets/ims9"
        );
    }

    #[test]
    fn completion_payload_keeps_placeholders() {
        let ok = UploadResult {
            asset_id: Uuid::nil(),
            name: "a.png".into(),
            size: 3,
            mime: "image/png".into(),
        };
        let images = vec![Some(ok), None];
        let body = json!({ "images": images });
        assert_eq!(body["images"][0]["blob_id"], Uuid::nil().to_string());
        assert_eq!(body["images"][0]["mimetype"], "image/png");
        assert!(body["images"][1].is_null());
    }
}
