pub mod error;
pub mod manifest;
pub mod provider;

pub use error::*;
pub use manifest::{Manifest, ManifestResource, find_manifest, find_manifest_in};
pub use provider::{
    ClientSettings, FC_API_VERSION, PartialProviderConfig, ProviderConfig, credentials_path,
};

use std::path::PathBuf;

/// aliform のユーザー設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("aliform");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}
