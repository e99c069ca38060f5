//! Command configuration files.
//!
//! Every resource command that needs more than an id takes a YAML file via
//! `--config`. Files are parsed straight into typed structs; unknown keys are
//! rejected so typos surface before any request is made.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::upload::DiscoverOptions;

/// Reads and parses a YAML configuration file.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(serde_yaml::from_str(&content)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagesetType {
    /// Images uploaded from local files.
    File,
    /// Images fetched by the platform from URLs in a dataset column.
    Url,
}

/// Local files feeding a `file` imageset.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub recursive: bool,
    /// Forces a content type and accepts files without an image extension.
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl FileConfig {
    pub fn discover_options(&self) -> DiscoverOptions {
        DiscoverOptions {
            recursive: self.recursive,
            mime_override: self.mime_type.clone(),
        }
    }
}

/// `update imageset` configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImagesetConfig {
    pub imageset_type: ImagesetType,
    #[serde(default)]
    pub file_config: Option<FileConfig>,
    pub collection_id: String,
    pub dataset_id: String,
    pub dataset_column: String,
    /// Whole-slide images; uploads go through the blob storage client.
    #[serde(default)]
    pub use_wsi: bool,
}

impl ImagesetConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.imageset_type == ImagesetType::File {
            let files = self.file_config()?;
            if files.paths.is_empty() {
                return Err(Error::Config("file_config.paths must not be empty".into()));
            }
        }
        Ok(())
    }

    pub fn file_config(&self) -> Result<&FileConfig> {
        self.file_config
            .as_ref()
            .ok_or_else(|| Error::Config("file imagesets need a file_config section".into()))
    }
}

/// `create collections` / `update collections` configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
}

/// `publish collection` configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    #[serde(default = "default_publish")]
    pub publish: bool,
    pub destination_project: String,
}

fn default_publish() -> bool {
    true
}

/// `update dataset` configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub file_config: DatasetFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetFile {
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn file_imageset() {
        let config = ImagesetConfig::from_yaml(
            r#"
            imageset_type: file
            file_config:
                paths:
                    - images/
                    - extra/one.png
                recursive: true
            collection_id: c1
            dataset_id: d1
            dataset_column: Name
            "#,
        )
        .unwrap();
        assert_eq!(config.imageset_type, ImagesetType::File);
        let files = config.file_config().unwrap();
        assert_eq!(files.paths.len(), 2);
        let options = files.discover_options();
        assert!(options.recursive);
        assert!(options.mime_override.is_none());
        assert!(!config.use_wsi);
    }

    #[test]
    fn url_imageset_needs_no_files() {
        let config = ImagesetConfig::from_yaml(
            r#"
            imageset_type: url
            collection_id: c1
            dataset_id: d1
            dataset_column: image_url
            "#,
        )
        .unwrap();
        assert_eq!(config.imageset_type, ImagesetType::Url);
        assert!(config.file_config.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ImagesetConfig::from_yaml(
            r#"
            imageset_type: file
            foo_config:
                paths: [test]
            collection_id: c1
            dataset_id: d1
            dataset_column: Name
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn unknown_imageset_type_is_rejected() {
        let err = ImagesetConfig::from_yaml(
            r#"
            imageset_type: foo
            collection_id: c1
            dataset_id: d1
            dataset_column: Name
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn file_imageset_without_paths_is_rejected() {
        let missing = ImagesetConfig::from_yaml(
            r#"
            imageset_type: file
            collection_id: c1
            dataset_id: d1
            dataset_column: Name
            "#,
        );
        assert!(matches!(missing, Err(Error::Config(_))));

        let empty = ImagesetConfig::from_yaml(
            r#"
            imageset_type: file
            file_config:
                paths: []
            collection_id: c1
            dataset_id: d1
            dataset_column: Name
            "#,
        );
        assert!(matches!(empty, Err(Error::Config(_))));
    }

    #[test]
    fn loads_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("publish.yaml");
        fs::write(&path, "destination_project: abc\n").unwrap();
        let config: PublishConfig = load(&path).unwrap();
        assert!(config.publish);
        assert_eq!(config.destination_project, "abc");

        assert!(load::<PublishConfig>(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn collection_fields_are_optional() {
        let config: CollectionConfig = serde_yaml::from_str("name: Birds\n").unwrap();
        let body = serde_json::to_value(&config).unwrap();
        assert_eq!(body, serde_json::json!({ "name": "Birds" }));
    }
}
