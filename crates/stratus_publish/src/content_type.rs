use stratus_core::asset::{Asset, AssetSource};

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type of inline text whose name has no recognizable extension.
///
/// Historically every inline bundle was published as JavaScript; names without
/// an extension keep that behavior.
pub const LEGACY_TEXT_CONTENT_TYPE: &str = "application/javascript";

/// Resolves the content type an asset is published with.
pub fn content_type_for(asset: &Asset) -> String {
    match (mime_guess::from_path(&asset.name).first(), &asset.source) {
        (Some(mime), _) => mime.essence_str().to_string(),
        (None, Some(AssetSource::Inline(_))) => LEGACY_TEXT_CONTENT_TYPE.to_string(),
        (None, _) => OCTET_STREAM.to_string(),
    }
}

/// Content type for a blob key, falling back to generic binary.
pub fn content_type_for_key(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::path::PathBuf;
    use stratus_core::asset::AssetKind;

    fn asset(name: &str, source: Option<AssetSource>) -> Asset {
        Asset {
            name: name.to_string(),
            source,
            size: 0,
            content_hash: String::new(),
            integrity: String::new(),
            kind: AssetKind::Script,
            version: None,
        }
    }

    fn inline(name: &str) -> Asset {
        asset(name, Some(AssetSource::Inline(Bytes::from_static(b"x"))))
    }

    fn file(name: &str) -> Asset {
        asset(name, Some(AssetSource::File(PathBuf::from(name))))
    }

    #[test]
    fn stylesheets_are_css() {
        assert_eq!(content_type_for(&inline("asset-name1.css")), "text/css");
    }

    #[test]
    fn inline_without_extension_is_javascript() {
        assert_eq!(content_type_for(&inline("asset-name1")), LEGACY_TEXT_CONTENT_TYPE);
    }

    #[test]
    fn files_use_their_extension() {
        assert_eq!(content_type_for(&file("2.0.0/assets/logo.jpg")), "image/jpeg");
        assert_eq!(content_type_for(&file("icons/sprite.svg")), "image/svg+xml");
    }

    #[test]
    fn unknown_files_are_binary() {
        assert_eq!(content_type_for(&file("asset-name2.#%*@)")), OCTET_STREAM);
        assert_eq!(content_type_for(&asset("no-source", None)), OCTET_STREAM);
    }

    #[test]
    fn keys_fall_back_to_binary() {
        assert_eq!(content_type_for_key("LICENSE"), OCTET_STREAM);
        assert_eq!(content_type_for_key("main.css"), "text/css");
    }
}
