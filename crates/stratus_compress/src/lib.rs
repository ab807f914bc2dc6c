//! # Stratus Compress
//!
//! Pre-compression of text-like assets. An asset qualifies when its content
//! type is on [`COMPRESSIBLE_CONTENT_TYPES`] and it is at least
//! [`MIN_COMPRESSIBLE_SIZE`] bytes; smaller payloads are left alone since
//! compressing them rarely saves anything.
//!
//! Qualifying payloads always get both a brotli and a gzip variant.

use brotli::enc::backward_references::{BrotliEncoderMode, BrotliEncoderParams};
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{self, Write};
use std::path::Path;
use stratus_core::asset::Asset;

pub const MIN_COMPRESSIBLE_SIZE: u64 = 1000;

pub const BROTLI_MAX_QUALITY: i32 = 11;

pub const COMPRESSIBLE_CONTENT_TYPES: &[&str] = &[
    "text/html",
    "text/css",
    "text/plain",
    "text/xml",
    "text/x-component",
    "text/javascript",
    "application/x-javascript",
    "application/javascript",
    "application/json",
    "application/manifest+json",
    "application/vnd.api+json",
    "application/xml",
    "application/xhtml+xml",
    "application/rss+xml",
    "application/atom+xml",
    "application/vnd.ms-fontobject",
    "application/x-font-ttf",
    "application/x-font-opentype",
    "application/x-font-truetype",
    "image/svg+xml",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "font/ttf",
    "font/eot",
    "font/otf",
    "font/opentype",
];

/// Tunes the brotli encoder to the kind of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    /// UTF-8 text supplied as a string.
    Text,
    /// Raw file bytes.
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub brotli: Bytes,
    pub gzip: Bytes,
}

/// Whether `content_type` is on the allow-list. Parameters such as
/// `; charset=utf-8` are ignored.
pub fn is_compressible_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    COMPRESSIBLE_CONTENT_TYPES.contains(&essence.as_str())
}

pub fn is_compressible(asset: &Asset, content_type: &str) -> bool {
    is_compressible_type(content_type) && asset.size >= MIN_COMPRESSIBLE_SIZE
}

pub fn compress(data: &[u8], mode: ContentMode) -> io::Result<Compressed> {
    let params = BrotliEncoderParams {
        quality: BROTLI_MAX_QUALITY,
        mode: match mode {
            ContentMode::Text => BrotliEncoderMode::BROTLI_MODE_TEXT,
            ContentMode::Generic => BrotliEncoderMode::BROTLI_MODE_GENERIC,
        },
        ..Default::default()
    };

    let mut brotli = Vec::new();
    brotli::BrotliCompress(&mut &data[..], &mut brotli, &params)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    let gzip = encoder.finish()?;

    Ok(Compressed {
        brotli: Bytes::from(brotli),
        gzip: Bytes::from(gzip),
    })
}

pub fn compress_text(text: &str) -> io::Result<Compressed> {
    compress(text.as_bytes(), ContentMode::Text)
}

/// Runs [`compress`] on the blocking thread pool so the runtime keeps
/// serving other tasks, such as cancellation, meanwhile.
pub async fn compress_bytes(data: Bytes, mode: ContentMode) -> io::Result<Compressed> {
    tokio::task::spawn_blocking(move || compress(&data, mode))
        .await
        .map_err(io::Error::other)?
}

pub async fn compress_file(path: &Path) -> io::Result<Compressed> {
    let data = tokio::fs::read(path).await?;
    compress_bytes(Bytes::from(data), ContentMode::Generic).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use stratus_core::asset::{AssetKind, AssetSource};

    fn asset(size: u64) -> Asset {
        Asset {
            name: "app.js".to_string(),
            source: Some(AssetSource::Inline(Bytes::from(vec![b'a'; size as usize]))),
            size,
            content_hash: String::new(),
            integrity: String::new(),
            kind: AssetKind::Script,
            version: None,
        }
    }

    fn unbrotli(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        brotli::Decompressor::new(data, 4096)
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn size_threshold_is_inclusive() {
        assert!(!is_compressible(&asset(999), "text/css"));
        assert!(is_compressible(&asset(1000), "text/css"));
        assert!(is_compressible(&asset(1001), "application/javascript"));
    }

    #[test]
    fn small_assets_never_compress() {
        for content_type in COMPRESSIBLE_CONTENT_TYPES {
            assert!(!is_compressible(&asset(0), content_type));
            assert!(!is_compressible(&asset(999), content_type));
            assert!(is_compressible(&asset(5000), content_type));
        }
    }

    #[test]
    fn binary_types_never_compress() {
        let big = asset(1_000_000);
        assert!(!is_compressible(&big, "application/jpeg"));
        assert!(!is_compressible(&big, "image/png"));
        assert!(!is_compressible(&big, "application/octet-stream"));
        assert!(!is_compressible(&big, ""));
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert!(is_compressible_type("text/html; charset=utf-8"));
        assert!(is_compressible_type("Application/JSON"));
    }

    #[test]
    fn produces_both_variants() {
        let text = "body { color: green; }\n".repeat(100);
        let compressed = compress_text(&text).unwrap();

        assert!(compressed.brotli.len() < text.len());
        assert!(compressed.gzip.len() < text.len());
        assert_eq!(unbrotli(&compressed.brotli), text.as_bytes());
        assert_eq!(gunzip(&compressed.gzip), text.as_bytes());
    }

    #[tokio::test]
    async fn compresses_files_as_generic_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("font.ttf");
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let compressed = compress_file(&path).await.unwrap();

        assert_eq!(unbrotli(&compressed.brotli), data);
        assert_eq!(gunzip(&compressed.gzip), data);
    }

    #[tokio::test]
    async fn pooled_compression_matches_inline_compression() {
        let text = Bytes::from("console.log('app');\n".repeat(200));

        let pooled = compress_bytes(text.clone(), ContentMode::Text).await.unwrap();

        assert_eq!(pooled, compress(&text, ContentMode::Text).unwrap());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = compress_file(Path::new("/no/such/file.js")).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
