use semver::Version;

/// Returns the major component of `version` when it is a valid, non-prerelease
/// semantic version. A single leading `v` or `=` is tolerated.
///
/// ```
/// use stratus_core::version::valid_major_version;
///
/// assert_eq!(valid_major_version("2.4.0").as_deref(), Some("2"));
/// assert_eq!(valid_major_version("1.0.0-beta.1"), None);
/// assert_eq!(valid_major_version("latest"), None);
/// ```
pub fn valid_major_version(version: &str) -> Option<String> {
    let trimmed = version.trim();
    let cleaned = trimmed.strip_prefix(['v', '=']).unwrap_or(trimmed);

    Version::parse(cleaned)
        .ok()
        .filter(|v| v.pre.is_empty())
        .map(|v| v.major.to_string())
}

/// Row key of the alias consumed by cross-application lookups, e.g. "2-latest".
pub fn latest_alias(major: &str) -> String {
    format!("{major}-latest")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_versions_have_a_major() {
        assert_eq!(valid_major_version("3.2.1").as_deref(), Some("3"));
        assert_eq!(valid_major_version("v10.0.4").as_deref(), Some("10"));
        assert_eq!(valid_major_version("0.1.0+build.7").as_deref(), Some("0"));
    }

    #[test]
    fn prereleases_and_garbage_do_not() {
        assert_eq!(valid_major_version("1.2.3-rc.0"), None);
        assert_eq!(valid_major_version("INVALID_VERSION"), None);
        assert_eq!(valid_major_version("3"), None);
        assert_eq!(valid_major_version("3-latest"), None);
        assert_eq!(valid_major_version(""), None);
    }

    #[test]
    fn only_one_prefix_is_stripped() {
        assert_eq!(valid_major_version("=1.2.3").as_deref(), Some("1"));
        assert_eq!(valid_major_version("vv=1.2.3"), None);
        assert_eq!(valid_major_version("v=1.2.3"), None);
    }

    #[test]
    fn latest_alias_suffix() {
        assert_eq!(latest_alias("2"), "2-latest");
    }
}
