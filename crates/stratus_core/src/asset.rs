use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where the bytes of an [`Asset`] live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// A file on disk, uploaded straight from its path.
    File(PathBuf),
    /// Text content read into memory, e.g. a compiled bundle.
    Inline(Bytes),
}

/// The declared role of an asset inside an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetKind {
    #[default]
    Script,
    Stylesheet,
    Other(String),
}

impl AssetKind {
    pub fn as_str(&self) -> &str {
        match self {
            AssetKind::Script => "script",
            AssetKind::Stylesheet => "stylesheet",
            AssetKind::Other(kind) => kind,
        }
    }
}

impl From<String> for AssetKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "script" => AssetKind::Script,
            "stylesheet" => AssetKind::Stylesheet,
            _ => AssetKind::Other(value),
        }
    }
}

impl From<AssetKind> for String {
    fn from(value: AssetKind) -> Self {
        match value {
            AssetKind::Other(kind) => kind,
            kind => kind.as_str().to_string(),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single deployable file.
///
/// Only `name`, `size`, `sri`, `type` and (for versioned bundles) `version`
/// are serialized. That is the shape stored in version rows and sent to the
/// portal; the content itself never leaves through serde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// The object-store key, e.g. "main.3f2a….js" or "2.4.0/main.js".
    pub name: String,

    /// `None` for metadata-only records built without content.
    #[serde(skip)]
    pub source: Option<AssetSource>,

    /// Size in bytes
    pub size: u64,

    /// MD5 of the content, hex encoded. Embedded into hashed file names.
    #[serde(skip)]
    pub content_hash: String,

    /// Subresource integrity digest, e.g. "sha384-oqVuAfXR…".
    #[serde(rename = "sri")]
    pub integrity: String,

    #[serde(rename = "type")]
    pub kind: AssetKind,

    /// The version namespace of a statically hosted bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Asset {
    pub fn is_script(&self) -> bool {
        self.kind == AssetKind::Script
    }

    pub fn is_stylesheet(&self) -> bool {
        self.kind == AssetKind::Stylesheet
    }

    /// True when the asset carries in-memory text content.
    pub fn is_inline(&self) -> bool {
        matches!(self.source, Some(AssetSource::Inline(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(kind: AssetKind) -> Asset {
        Asset {
            name: "1.2.3/main.js".to_string(),
            source: Some(AssetSource::Inline(Bytes::from_static(b"x"))),
            size: 1,
            content_hash: "9dd4e461268c8034f5c8564e155c67a6".to_string(),
            integrity: "sha384-abc".to_string(),
            kind,
            version: Some("1.2.3".to_string()),
        }
    }

    #[test]
    fn serializes_only_public_shape() {
        let json = serde_json::to_value(asset(AssetKind::Script)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "1.2.3/main.js",
                "size": 1,
                "sri": "sha384-abc",
                "type": "script",
                "version": "1.2.3"
            })
        );
    }

    #[test]
    fn omits_missing_version() {
        let mut a = asset(AssetKind::Stylesheet);
        a.version = None;
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(
            json,
            r#"{"name":"1.2.3/main.js","size":1,"sri":"sha384-abc","type":"stylesheet"}"#
        );
    }

    #[test]
    fn kind_keeps_unknown_values() {
        let kind: AssetKind = serde_json::from_str(r#""font""#).unwrap();
        assert_eq!(kind, AssetKind::Other("font".to_string()));
        assert_eq!(serde_json::to_string(&kind).unwrap(), r#""font""#);
        assert!(asset(AssetKind::Script).is_script());
        assert!(asset(AssetKind::Script).is_inline());
    }
}
