use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use md5::Md5;
use sha2::{Digest, Sha384};

pub const INTEGRITY_ALGORITHM: &str = "sha384";

/// Hashes derived from an asset's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// MD5, hex. Used for cache-busting file names.
    pub content_hash: String,
    /// `sha384-` followed by the base64 SHA-384 digest.
    pub integrity: String,
}

impl Fingerprint {
    pub fn of(data: &[u8]) -> Self {
        Self {
            content_hash: hex::encode(Md5::digest(data)),
            integrity: format!(
                "{INTEGRITY_ALGORITHM}-{}",
                STANDARD.encode(Sha384::digest(data))
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content() {
        let fp = Fingerprint::of(b"");
        assert_eq!(fp.content_hash, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            fp.integrity,
            "sha384-OLBgp1GsljhM2TJ+sbHjaiH9txEUvgdDTAzHv2P24donTt6/529l+9Ua0vFImLlb"
        );
    }

    #[test]
    fn text_content() {
        let fp = Fingerprint::of(b"hello");
        assert_eq!(fp.content_hash, "5d41402abc4b2a76b9719d911017c592");
        assert!(fp.integrity.starts_with("sha384-"));
        assert_eq!(fp.integrity.len(), "sha384-".len() + 64);
        assert_ne!(fp, Fingerprint::of(b"hello!"));
    }
}
