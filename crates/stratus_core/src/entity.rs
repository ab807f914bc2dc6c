use crate::asset::Asset;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Row key of the pointer marking the current version of an application.
pub const DEFAULT_ROW_KEY: &str = "__default";

/// How an entity write treats a row that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    /// Every field of the existing row is dropped before the write.
    Replace,
    /// Fields absent from the new entity are kept.
    Merge,
}

/// A row in the version table.
///
/// - `PartitionKey`: the application name.
/// - `RowKey`: "2.4.0", "2", "2-latest" or "__default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntity {
    #[serde(rename = "PartitionKey")]
    pub partition_key: String,

    #[serde(rename = "RowKey")]
    pub row_key: String,

    /// Column name to value. List and config columns hold JSON text.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl VersionEntity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// A row describing one deployed version of an application.
    ///
    /// `Stylesheets` is only written when the bundle has any.
    pub fn release(
        app: &str,
        row_key: &str,
        assets: &[Asset],
        package_config: &Value,
        skyux_config: &Value,
    ) -> Result<Self, serde_json::Error> {
        let scripts: Vec<&Asset> = assets.iter().filter(|a| a.is_script()).collect();
        let stylesheets: Vec<&Asset> = assets.iter().filter(|a| a.is_stylesheet()).collect();

        let mut entity = Self::new(app, row_key)
            .with_field("Scripts", serde_json::to_string(&scripts)?)
            .with_field("PackageConfig", serde_json::to_string(package_config)?)
            .with_field("SkyUXConfig", serde_json::to_string(skyux_config)?);

        if !stylesheets.is_empty() {
            entity = entity.with_field("Stylesheets", serde_json::to_string(&stylesheets)?);
        }

        Ok(entity)
    }

    /// The `__default` row pointing an application at its current version.
    pub fn pointer(app: &str, version: &str) -> Self {
        Self::new(app, DEFAULT_ROW_KEY).with_field("Version", version)
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// The application description registered with the portal in SPA mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaDescriptor {
    pub name: String,
    pub package_config: Value,
    pub sky_ux_config: Value,
    pub scripts: Vec<Asset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stylesheets: Option<Vec<Asset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_element_tag_name: Option<String>,
}

impl SpaDescriptor {
    /// Splits `assets` into scripts and stylesheets; anything else is dropped.
    pub fn new(
        name: impl Into<String>,
        package_config: Value,
        sky_ux_config: Value,
        assets: Vec<Asset>,
    ) -> Self {
        let (scripts, rest): (Vec<Asset>, Vec<Asset>) =
            assets.into_iter().partition(Asset::is_script);
        let stylesheets: Vec<Asset> = rest.into_iter().filter(Asset::is_stylesheet).collect();

        Self {
            name: name.into(),
            package_config,
            sky_ux_config,
            scripts,
            stylesheets: (!stylesheets.is_empty()).then_some(stylesheets),
            root_element_tag_name: None,
        }
    }

    pub fn with_root_element(mut self, tag_name: Option<String>) -> Self {
        self.root_element_tag_name = tag_name;
        self
    }
}

/// Marks `version` as the current version of `name` on the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub name: String,
    pub version: String,
}
