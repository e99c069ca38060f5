//! Storage backends that asset bytes are pushed to.
//!
//! The platform hands out one signed destination per asset. Most jobs PUT
//! straight to that URL; large-image (whole slide) jobs go through a blob
//! storage client that stages big files in blocks.

use std::fs::File;
use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::blocking::{Body, Client};
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::Asset;
use crate::api::check_status;
use crate::error::{Error, Result};

/// Host that relative signed paths are resolved against.
pub const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

const AZURE_BLOB_SUFFIX: &str = ".blob.core.windows.net";
const STORAGE_API_VERSION: &str = "2020-10-02";

/// Files above this are staged in blocks of this size.
pub const BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// Pushes one asset's bytes to its signed destination.
pub trait Uploader: Send + Sync {
    fn upload(&self, asset: &Asset, destination: &str) -> Result<()>;
}

/// Which backend a job uploads through; fixed for the whole job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    SignedUrl,
    StorageClient,
}

impl Backend {
    pub fn from_large_image_flag(large_image: bool) -> Self {
        if large_image {
            Backend::StorageClient
        } else {
            Backend::SignedUrl
        }
    }

    pub fn uploader(self, client: Client) -> Box<dyn Uploader> {
        match self {
            Backend::SignedUrl => Box::new(SignedUrlUploader::new(client)),
            Backend::StorageClient => Box::new(StorageClientUploader::new(client)),
        }
    }
}

/// Resolves vendor-relative destinations to an absolute storage URL.
pub fn absolute_destination(destination: &str) -> String {
    if destination.starts_with('/') {
        format!("{GCS_ENDPOINT}{destination}")
    } else {
        destination.to_string()
    }
}

fn is_azure_blob(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.ends_with(AZURE_BLOB_SUFFIX)))
        .unwrap_or(false)
}

/// Plain authenticated PUT of the whole file to the signed URL.
pub struct SignedUrlUploader {
    client: Client,
}

impl SignedUrlUploader {
    pub fn new(client: Client) -> Self {
        SignedUrlUploader { client }
    }
}

impl Uploader for SignedUrlUploader {
    fn upload(&self, asset: &Asset, destination: &str) -> Result<()> {
        let url = absolute_destination(destination);
        let file = File::open(&asset.path)?;
        tracing::debug!(url = %url, name = %asset.name, "PUT");

        let mut req = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, asset.mime.as_str())
            .body(Body::sized(file, asset.size));
        if is_azure_blob(&url) {
            req = req.header("x-ms-blob-type", "BlockBlob");
        }
        check_status(req.send()?)?;
        Ok(())
    }
}

/// A signed blob URL split into the parts the storage service addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    pub account: String,
    pub container: String,
    pub blob: String,
    pub sas_token: String,
}

impl BlobLocation {
    /// Parses `https://{account}.blob.core.windows.net/{container}/{blob}?{sas}`.
    pub fn parse(destination: &str) -> Result<Self> {
        let url = Url::parse(destination)
            .map_err(|e| Error::Destination(format!("{destination}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::Destination(format!("{destination}: missing host")))?;
        let account = host
            .strip_suffix(AZURE_BLOB_SUFFIX)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| Error::Destination(format!("{host} is not a blob storage account")))?;

        let mut segments = url.path().trim_start_matches('/').splitn(2, '/');
        let container = segments.next().filter(|s| !s.is_empty());
        let blob = segments.next().filter(|s| !s.is_empty());
        let (Some(container), Some(blob)) = (container, blob) else {
            return Err(Error::Destination(format!(
                "{destination}: expected /<container>/<blob>"
            )));
        };
        let sas_token = url
            .query()
            .filter(|q| !q.is_empty())
            .ok_or_else(|| Error::Destination(format!("{destination}: missing SAS token")))?;

        Ok(BlobLocation {
            account: account.to_string(),
            container: container.to_string(),
            blob: blob.to_string(),
            sas_token: sas_token.to_string(),
        })
    }

    pub fn blob_url(&self) -> String {
        format!(
            "https://{}{}/{}/{}",
            self.account, AZURE_BLOB_SUFFIX, self.container, self.blob
        )
    }

    fn request_url(&self, operation: &str) -> String {
        format!("{}?{}{}", self.blob_url(), self.sas_token, operation)
    }
}

/// Fixed-width block id for the `index`th block, base64 encoded.
pub fn block_id(index: usize) -> String {
    STANDARD.encode(format!("block-{index:08}"))
}

/// Body of a Put Block List request committing `ids` in order.
pub fn block_list_xml(ids: &[String]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><BlockList>"#);
    for id in ids {
        xml.push_str("<Latest>");
        xml.push_str(id);
        xml.push_str("</Latest>");
    }
    xml.push_str("</BlockList>");
    xml
}

/// Blob storage client authorised by the SAS token in each destination.
pub struct StorageClientUploader {
    client: Client,
    block_size: u64,
}

impl StorageClientUploader {
    pub fn new(client: Client) -> Self {
        StorageClientUploader {
            client,
            block_size: BLOCK_SIZE,
        }
    }

    fn put_blob(&self, location: &BlobLocation, asset: &Asset) -> Result<()> {
        let file = File::open(&asset.path)?;
        let req = self
            .client
            .put(location.request_url(""))
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header(CONTENT_TYPE, asset.mime.as_str())
            .body(Body::sized(file, asset.size));
        check_status(req.send()?)?;
        Ok(())
    }

    fn put_blocks(&self, location: &BlobLocation, asset: &Asset) -> Result<()> {
        let mut file = File::open(&asset.path)?;
        let mut ids = Vec::new();
        loop {
            let mut block = Vec::with_capacity(self.block_size as usize);
            (&mut file).take(self.block_size).read_to_end(&mut block)?;
            if block.is_empty() {
                break;
            }
            let id = block_id(ids.len());
            let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
            let req = self
                .client
                .put(location.request_url(&format!("&comp=block&blockid={encoded}")))
                .header("x-ms-version", STORAGE_API_VERSION)
                .body(block);
            check_status(req.send()?)?;
            ids.push(id);
        }

        tracing::debug!(blob = %location.blob, blocks = ids.len(), "committing block list");
        let req = self
            .client
            .put(location.request_url("&comp=blocklist"))
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("x-ms-blob-content-type", asset.mime.as_str())
            .header(CONTENT_TYPE, "application/xml")
            .body(block_list_xml(&ids));
        check_status(req.send()?)?;
        Ok(())
    }
}

impl Uploader for StorageClientUploader {
    fn upload(&self, asset: &Asset, destination: &str) -> Result<()> {
        let location = BlobLocation::parse(destination)?;
        tracing::debug!(
            account = %location.account,
            container = %location.container,
            blob = %location.blob,
            "uploading to blob storage"
        );
        if asset.size <= self.block_size {
            self.put_blob(&location, asset)
        } else {
            self.put_blocks(&location, asset)
        }
    }
}
