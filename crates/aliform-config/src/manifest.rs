//! Desired-state manifest
//!
//! ```yaml
//! resources:
//!   - kind: aliyun_fc_version
//!     name: release
//!     config:
//!       service_name: api
//!       description: nightly
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const ENV_MANIFEST: &str = "ALIFORM_MANIFEST";

const CANDIDATES: [&str; 2] = ["aliform.yaml", "aliform.yml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<ManifestResource>,
}

/// One declared object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestResource {
    pub kind: String,
    pub name: String,
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl Manifest {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let manifest: Manifest =
            serde_yaml::from_str(content).map_err(|source| ConfigError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;
        manifest.check()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest = Self::parse(&content, path)?;
        tracing::debug!(
            "Loaded {} resources from {}",
            manifest.resources.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Locate and load the manifest for `dir`
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load(&find_manifest_in(dir)?)
    }

    fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for resource in &self.resources {
            if resource.kind.trim().is_empty() || resource.name.trim().is_empty() {
                return Err(ConfigError::InvalidManifest(
                    "kind と name は必須です".to_string(),
                ));
            }
            if !resource.config.is_object() {
                return Err(ConfigError::InvalidManifest(format!(
                    "{}.{} の config はマップである必要があります",
                    resource.kind, resource.name
                )));
            }
            if !seen.insert((resource.kind.as_str(), resource.name.as_str())) {
                return Err(ConfigError::InvalidManifest(format!(
                    "{}.{} が重複しています",
                    resource.kind, resource.name
                )));
            }
        }
        Ok(())
    }
}

/// マニフェストファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 ALIFORM_MANIFEST (直接パス指定)
/// 2. `dir` 内の aliform.yaml, aliform.yml
pub fn find_manifest_in(dir: &Path) -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_MANIFEST) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!("{} points to missing file {}", ENV_MANIFEST, path.display());
    }

    CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .ok_or(ConfigError::ManifestNotFound)
}

/// [`find_manifest_in`] for the current directory
pub fn find_manifest() -> Result<PathBuf> {
    find_manifest_in(&std::env::current_dir()?)
}
