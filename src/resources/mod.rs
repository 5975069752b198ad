//! Loading textures and raw files from the asset directory.
//!
//! Relative names resolve against `./assets`; absolute paths are used as is.

use std::path::{Path, PathBuf};

pub mod texture;

pub const ASSET_DIR: &str = "assets";

pub fn asset_path(file_name: &str) -> PathBuf {
    Path::new("./").join(ASSET_DIR).join(file_name)
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    let path = asset_path(file_name);
    log::debug!("loading {}", path.display());
    Ok(std::fs::read_to_string(path)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    log::debug!("loading {}", path.display());
    std::fs::read(&path).map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))
}
