use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::CacheError;

/// Sidecar describing what a cached pack was built from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct PackManifest {
    pub pack_format_version: u8,
    pub compiler_version: String,
    pub entry: String,
    pub eval_bases: bool,
    pub input_hash_sha256_hex: String,
    pub pack_hash_sha256_hex: String,
}

#[derive(Debug, Clone)]
pub(crate) enum ManifestReadState {
    Missing,
    Unreadable,
    Present(PackManifest),
}

pub(crate) fn read_manifest(path: &Path) -> Result<ManifestReadState, CacheError> {
    if !path.exists() {
        return Ok(ManifestReadState::Missing);
    }

    let raw = fs::read_to_string(path).map_err(io_at(path))?;
    let parsed = match serde_json::from_str::<PackManifest>(&raw) {
        Ok(value) => value,
        Err(_) => return Ok(ManifestReadState::Unreadable),
    };
    Ok(ManifestReadState::Present(parsed))
}

/// Where the pack and manifest for one entry file live.
#[derive(Debug, Clone)]
pub(crate) struct CachePaths {
    pub pack: PathBuf,
    pub manifest: PathBuf,
}

impl CachePaths {
    pub(crate) fn for_entry(cache_dir: &Path, entry: &str) -> Self {
        let dir = cache_dir.join("fgd_packs");
        let stem = pack_stem(entry);
        Self {
            pack: dir.join(format!("{stem}.pack")),
            manifest: dir.join(format!("{stem}.manifest.json")),
        }
    }
}

/// Cache file stem for an entry path: `sub/game.fgd` -> `sub_game`.
pub(crate) fn pack_stem(entry: &str) -> String {
    let trimmed = entry
        .strip_suffix(".fgd")
        .unwrap_or(entry)
        .trim_matches('/');
    trimmed.replace('/', "_")
}

/// Lowercase hex SHA-256 of a pack, as recorded in its manifest.
pub(crate) fn pack_digest(bytes: &[u8]) -> String {
    to_hex(&Sha256::digest(bytes))
}

pub(crate) fn to_hex(digest: &[u8]) -> String {
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Stores a pack and its manifest.
///
/// Both are staged as `.tmp` siblings first. The manifest is renamed into
/// place last, so a reader that finds it also finds the pack it describes.
/// The old manifest goes first, which leaves a crash mid-write looking like
/// an empty cache.
pub(crate) fn write_pack_and_manifest(
    paths: &CachePaths,
    pack: &[u8],
    manifest: &PackManifest,
) -> Result<(), CacheError> {
    let text = serde_json::to_string_pretty(manifest).map_err(|error| CacheError::Manifest {
        path: paths.manifest.clone(),
        message: format!("failed to encode manifest json: {error}"),
    })?;
    if let Some(parent) = paths.pack.parent() {
        fs::create_dir_all(parent).map_err(io_at(parent))?;
    }

    let pack_tmp = staged(&paths.pack);
    let manifest_tmp = staged(&paths.manifest);
    let result = (|| {
        fs::write(&pack_tmp, pack).map_err(io_at(&pack_tmp))?;
        fs::write(&manifest_tmp, text).map_err(io_at(&manifest_tmp))?;
        remove_if_present(&paths.manifest)?;
        fs::rename(&pack_tmp, &paths.pack).map_err(io_at(&paths.pack))?;
        fs::rename(&manifest_tmp, &paths.manifest).map_err(io_at(&paths.manifest))
    })();
    if result.is_err() {
        let _ = fs::remove_file(&pack_tmp);
        let _ = fs::remove_file(&manifest_tmp);
    }
    result
}

fn staged(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn remove_if_present(path: &Path) -> Result<(), CacheError> {
    match fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => Err(io_at(path)(error)),
        _ => Ok(()),
    }
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}
