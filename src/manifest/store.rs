use std::path::{Path, PathBuf};

use crate::foundation::error::{SynthError, SynthResult};
use crate::manifest::model::Manifest;

/// Write `bytes` to a sibling temp file, then rename it over `path`.
///
/// Readers never observe a partially written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> SynthResult<()> {
    let tmp = temp_path(path);
    std::fs::write(&tmp, bytes)
        .map_err(|e| SynthError::persistence(format!("write '{}': {e}", tmp.display())))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        SynthError::persistence(format!("rename onto '{}': {e}", path.display()))
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Persist a manifest atomically.
pub fn store_manifest(path: &Path, manifest: &Manifest) -> SynthResult<()> {
    let mut bytes =
        serde_json::to_vec_pretty(manifest).map_err(|e| SynthError::serde(e.to_string()))?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Load a manifest.
pub fn load_manifest(path: &Path) -> SynthResult<Manifest> {
    let bytes = std::fs::read(path)
        .map_err(|e| SynthError::persistence(format!("read '{}': {e}", path.display())))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SynthError::serde(format!("manifest '{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/manifest/store.rs"]
mod tests;
