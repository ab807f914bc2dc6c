use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_ASSETS_GLOB: &str = "assets/**/*.*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployMode {
    /// The portal owns version resolution; assets get content-hashed names.
    Spa,
    /// Every asset is namespaced by version and aliases live in the table.
    Static,
}

impl DeployMode {
    pub fn from_static_flag(is_static_client: bool) -> Self {
        if is_static_client {
            DeployMode::Static
        } else {
            DeployMode::Spa
        }
    }
}

/// Settings as collected from flags, environment and config files.
///
/// Nothing is required at this point; [`Settings::validate`] turns them into
/// [`DeploySettings`] and reports every missing field at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub name: Option<String>,
    pub version: Option<String>,
    pub azure_storage_account: Option<String>,
    pub azure_storage_access_key: Option<String>,
    pub azure_storage_table_name: Option<String>,
    pub is_static_client: Option<bool>,
    pub hash_file_names: Option<bool>,
    pub assets_glob: Option<String>,
    pub package_config: Option<Value>,
    pub skyux_config: Option<Value>,
    pub root_element_tag_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploySettings {
    /// Application name. Doubles as the blob container and the partition key.
    pub name: String,
    pub version: String,
    pub storage_account: String,
    pub access_key: String,
    pub table_name: String,
    pub mode: DeployMode,
    /// Defaults to `true`.
    pub hash_file_names: bool,
    /// Glob, relative to the output root, of images and fonts to upload.
    pub assets_glob: String,
    pub package_config: Value,
    pub skyux_config: Value,
    pub root_element_tag_name: Option<String>,
}

/// Trimmed `value`; blank strings count as missing.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Settings {
    pub fn validate(self) -> Result<DeploySettings, ValidationError> {
        let name = present(self.name);
        let version = present(self.version);
        let storage_account = present(self.azure_storage_account);
        let access_key = present(self.azure_storage_access_key);
        let table_name = present(self.azure_storage_table_name);

        let missing: Vec<&'static str> = [
            ("name", name.is_none()),
            ("version", version.is_none()),
            ("azure_storage_account", storage_account.is_none()),
            ("azure_storage_access_key", access_key.is_none()),
            ("azure_storage_table_name", table_name.is_none()),
            ("is_static_client", self.is_static_client.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        match (
            name,
            version,
            storage_account,
            access_key,
            table_name,
            self.is_static_client,
        ) {
            (
                Some(name),
                Some(version),
                Some(storage_account),
                Some(access_key),
                Some(table_name),
                Some(is_static_client),
            ) => Ok(DeploySettings {
                name,
                version,
                storage_account,
                access_key,
                table_name,
                mode: DeployMode::from_static_flag(is_static_client),
                hash_file_names: self.hash_file_names.unwrap_or(true),
                assets_glob: present(self.assets_glob)
                    .unwrap_or_else(|| DEFAULT_ASSETS_GLOB.to_string()),
                package_config: self.package_config.unwrap_or(Value::Null),
                skyux_config: self.skyux_config.unwrap_or(Value::Null),
                root_element_tag_name: present(self.root_element_tag_name),
            }),
            _ => Err(ValidationError::MissingSettings(missing)),
        }
    }
}

impl DeploySettings {
    pub fn is_static(&self) -> bool {
        self.mode == DeployMode::Static
    }
}
