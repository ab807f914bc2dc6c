use crate::error::BuildError;
use crate::fingerprint::Fingerprint;
use crate::provider::{ArtifactProvider, MetadataEntry};
use glob::{MatchOptions, Pattern};
use std::path::Path;
use stratus_core::prelude::*;
use tracing::debug;

/// Compiled bundles of a statically hosted client.
pub const BUNDLES_PATTERN: &str = "bundles/*.js";

/// Kind given to images, fonts and other emitted files.
pub const EMITTED_KIND: &str = "asset";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub mode: DeployMode,
    pub version: String,
    pub hash_file_names: bool,
    /// Attach the bytes to each asset so it can be uploaded.
    pub include_content: bool,
}

impl BuildOptions {
    pub fn from_settings(settings: &DeploySettings, include_content: bool) -> Self {
        Self {
            mode: settings.mode,
            version: settings.version.clone(),
            hash_file_names: settings.hash_file_names,
            include_content,
        }
    }
}

/// Builds the bundle assets of a deployment.
///
/// In SPA mode the assets come from `metadata.json` (none when it is absent).
/// In static mode every `bundles/*.js` file is namespaced under the version and,
/// for release versions, a second time under the major version.
pub fn build_manifest<P>(provider: &P, options: &BuildOptions) -> Result<Vec<Asset>, BuildError>
where
    P: ArtifactProvider + ?Sized,
{
    match options.mode {
        DeployMode::Spa => spa_assets(provider, options),
        DeployMode::Static => {
            let mut assets = bundle_assets(provider, &options.version, options.include_content)?;
            if let Some(major) = valid_major_version(&options.version) {
                assets.extend(bundle_assets(provider, &major, options.include_content)?);
            }
            Ok(assets)
        }
    }
}

/// The static bundles of one version namespace, e.g. "2.4.0/app.js".
pub fn bundle_assets<P>(
    provider: &P,
    namespace: &str,
    include_content: bool,
) -> Result<Vec<Asset>, BuildError>
where
    P: ArtifactProvider + ?Sized,
{
    files_matching(provider, BUNDLES_PATTERN)?
        .iter()
        .map(|path| {
            let name = format!("{namespace}/{}", basename(path));
            let mut asset = describe(provider, path, name, AssetKind::Script, include_content)?;
            asset.version = Some(namespace.to_string());
            Ok(asset)
        })
        .collect()
}

/// Images, fonts and other files the build emitted next to the bundles.
///
/// They keep their physical path as name; static deployments prefix it with
/// the version and duplicate the set under the major version.
pub fn emitted_assets<P>(
    provider: &P,
    pattern: &str,
    mode: DeployMode,
    version: &str,
) -> Result<Vec<Asset>, BuildError>
where
    P: ArtifactProvider + ?Sized,
{
    let paths = files_matching(provider, pattern)?;

    let namespaces = match mode {
        DeployMode::Spa => vec![None],
        DeployMode::Static => std::iter::once(Some(version.to_string()))
            .chain(valid_major_version(version).map(Some))
            .collect(),
    };

    let mut assets = Vec::with_capacity(paths.len() * namespaces.len());
    for namespace in &namespaces {
        for path in &paths {
            let name = match namespace {
                Some(ns) => format!("{ns}/{path}"),
                None => path.clone(),
            };
            let kind = AssetKind::Other(EMITTED_KIND.to_string());
            let mut asset = describe(provider, path, name, kind, false)?;
            asset.source = Some(provider.source(path));
            assets.push(asset);
        }
    }

    Ok(assets)
}

fn spa_assets<P>(provider: &P, options: &BuildOptions) -> Result<Vec<Asset>, BuildError>
where
    P: ArtifactProvider + ?Sized,
{
    let Some(entries) = provider.metadata()? else {
        debug!("No metadata.json in build output");
        return Ok(Vec::new());
    };

    entries
        .into_iter()
        .map(|MetadataEntry { name, kind }| {
            let data = provider.read(&name)?;
            let fingerprint = Fingerprint::of(&data);
            let published_name = if options.hash_file_names {
                hashed_name(&name, &fingerprint.content_hash)
            } else {
                name.clone()
            };

            Ok(Asset {
                name: published_name,
                source: options
                    .include_content
                    .then(|| AssetSource::Inline(data.clone())),
                size: provider.size(&name)?,
                content_hash: fingerprint.content_hash,
                integrity: fingerprint.integrity,
                kind: kind.unwrap_or_default(),
                version: None,
            })
        })
        .collect()
}

fn describe<P>(
    provider: &P,
    path: &str,
    name: String,
    kind: AssetKind,
    include_content: bool,
) -> Result<Asset, BuildError>
where
    P: ArtifactProvider + ?Sized,
{
    let data = provider.read(path)?;
    let Fingerprint {
        content_hash,
        integrity,
    } = Fingerprint::of(&data);

    debug!(%name, size = data.len(), "Fingerprinted asset");

    Ok(Asset {
        name,
        source: include_content.then(|| AssetSource::Inline(data)),
        size: provider.size(path)?,
        content_hash,
        integrity,
        kind,
        version: None,
    })
}

/// "main.bundle.js" with hash "abc" becomes "main.bundle.abc.js".
pub fn hashed_name(name: &str, hash: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    match path.extension() {
        Some(ext) => format!("{stem}.{hash}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{hash}"),
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn files_matching<P>(provider: &P, pattern: &str) -> Result<Vec<String>, BuildError>
where
    P: ArtifactProvider + ?Sized,
{
    let pattern = Pattern::new(pattern)?;
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    };

    Ok(provider
        .files()?
        .into_iter()
        .filter(|path| pattern.matches_with(path, options))
        .collect())
}
