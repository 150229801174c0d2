use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::binary::{CodecError, BINARY_FORMAT_VERSION};
use crate::database::{with_fgd_suffix, Fgd, ResolveError};
use crate::error::ParseError;
use crate::filesystem::{normalize_path, DirFileSystem};
use crate::parser::ParseOptions;

use super::manifest::{
    pack_digest, read_manifest, to_hex, write_pack_and_manifest, CachePaths, ManifestReadState,
    PackManifest,
};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("invalid cache manifest at {path}: {message}")]
    Manifest { path: PathBuf, message: String },
    #[error("cache I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    /// Packs written by a different compiler version are rebuilt.
    pub compiler_version: String,
    pub eval_bases: bool,
}

impl Default for CacheRequest {
    fn default() -> Self {
        Self {
            compiler_version: "dev".to_string(),
            eval_bases: true,
        }
    }
}

struct CacheTarget {
    entry: String,
    paths: CachePaths,
    input_hash_sha256_hex: String,
}

enum CacheLookup {
    Hit(Fgd),
    Missing,
    Invalid(String),
}

/// Loads `entry` (relative to `source_dir`) from the pack cache, or parses it
/// and refreshes the cache when any `.fgd` under `source_dir` changed.
///
/// A freshly parsed database keeps its descriptions; one loaded from a pack
/// has them empty, as the binary form drops them.
pub fn build_or_load_fgd(
    source_dir: &Path,
    entry: &str,
    cache_dir: &Path,
    request: &CacheRequest,
) -> Result<Fgd, CacheError> {
    let entry = normalize_path(&with_fgd_suffix(entry));
    let inputs = SourceInputs::scan(source_dir)?;
    let target = CacheTarget {
        paths: CachePaths::for_entry(cache_dir, &entry),
        input_hash_sha256_hex: inputs.hash_hex()?,
        entry,
    };

    let reason = match try_load_cached(&target, request) {
        CacheLookup::Hit(fgd) => {
            info!(
                entry = %target.entry,
                entity_count = fgd.len(),
                fgd_file_count = inputs.files.len(),
                input_hash = %target.input_hash_sha256_hex,
                pack_path = %target.paths.pack.display(),
                "fgd_cache_hit"
            );
            return Ok(fgd);
        }
        CacheLookup::Missing => "manifest missing".to_string(),
        CacheLookup::Invalid(reason) => {
            warn!(
                entry = %target.entry,
                reason = %reason,
                pack_path = %target.paths.pack.display(),
                "fgd_cache_invalid_rebuilding"
            );
            reason
        }
    };

    build_and_write(source_dir, &target, request, &reason)
}

fn try_load_cached(target: &CacheTarget, request: &CacheRequest) -> CacheLookup {
    let manifest = match read_manifest(&target.paths.manifest) {
        Ok(ManifestReadState::Present(manifest)) => manifest,
        Ok(ManifestReadState::Missing) => return CacheLookup::Missing,
        Ok(ManifestReadState::Unreadable) => {
            return CacheLookup::Invalid("manifest unreadable".to_string())
        }
        Err(error) => return CacheLookup::Invalid(format!("failed to read manifest: {error}")),
    };

    let expected = expected_manifest(target, request, &manifest.pack_hash_sha256_hex);
    if let Err(reason) = validate_manifest_matches_expected(&manifest, &expected) {
        return CacheLookup::Invalid(reason);
    }

    let bytes = match fs::read(&target.paths.pack) {
        Ok(bytes) => bytes,
        Err(error) => return CacheLookup::Invalid(format!("failed to read pack: {error}")),
    };
    if pack_digest(&bytes) != manifest.pack_hash_sha256_hex {
        return CacheLookup::Invalid("pack hash mismatch vs manifest".to_string());
    }
    match Fgd::from_bytes(&bytes) {
        Ok(fgd) => CacheLookup::Hit(fgd),
        Err(error) => CacheLookup::Invalid(format!("failed to decode pack: {error}")),
    }
}

fn build_and_write(
    source_dir: &Path,
    target: &CacheTarget,
    request: &CacheRequest,
    reason: &str,
) -> Result<Fgd, CacheError> {
    let fs = DirFileSystem::new(source_dir);
    let options = ParseOptions {
        eval_bases: request.eval_bases,
        ..ParseOptions::default()
    };
    let mut fgd = Fgd::parse(&target.entry, &fs, &options)?;
    fgd.apply_bases()?;
    let bytes = fgd.to_bytes()?;

    let manifest = expected_manifest(target, request, &pack_digest(&bytes));
    write_pack_and_manifest(&target.paths, &bytes, &manifest)?;

    info!(
        entry = %target.entry,
        reason = %reason,
        entity_count = fgd.len(),
        byte_len = bytes.len(),
        pack_path = %target.paths.pack.display(),
        manifest_path = %target.paths.manifest.display(),
        "fgd_cache_written"
    );
    Ok(fgd)
}

/// Every `.fgd` file under the source root, keyed the way `@include` names
/// them: forward slashes, lowercase.
///
/// Any of them can be reached through an include, so the whole tree counts.
struct SourceInputs {
    files: Vec<(String, PathBuf)>,
}

impl SourceInputs {
    fn scan(source_dir: &Path) -> Result<Self, CacheError> {
        let mut files = Vec::new();
        let mut pending = vec![source_dir.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|source| CacheError::Io {
                path: dir.clone(),
                source,
            })?;
            for entry in entries {
                let path = entry
                    .map_err(|source| CacheError::Io {
                        path: dir.clone(),
                        source,
                    })?
                    .path();
                if path.is_dir() {
                    pending.push(path);
                } else if is_fgd_file(&path) {
                    if let Ok(rel) = path.strip_prefix(source_dir) {
                        files.push((normalize_path(&rel.to_string_lossy()), path));
                    }
                }
            }
        }
        files.sort();
        Ok(Self { files })
    }

    fn hash_hex(&self) -> Result<String, CacheError> {
        let mut hasher = Sha256::new();
        for (key, path) in &self.files {
            let bytes = fs::read(path).map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update((bytes.len() as u64).to_be_bytes());
            hasher.update(&bytes);
        }
        Ok(to_hex(&hasher.finalize()))
    }
}

fn is_fgd_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("fgd"))
}

fn expected_manifest(
    target: &CacheTarget,
    request: &CacheRequest,
    pack_hash_sha256_hex: &str,
) -> PackManifest {
    PackManifest {
        pack_format_version: BINARY_FORMAT_VERSION,
        compiler_version: request.compiler_version.clone(),
        entry: target.entry.clone(),
        eval_bases: request.eval_bases,
        input_hash_sha256_hex: target.input_hash_sha256_hex.clone(),
        pack_hash_sha256_hex: pack_hash_sha256_hex.to_string(),
    }
}

fn validate_manifest_matches_expected(
    manifest: &PackManifest,
    expected: &PackManifest,
) -> Result<(), String> {
    if manifest.pack_format_version != expected.pack_format_version {
        return Err("manifest pack_format_version mismatch".to_string());
    }
    if manifest.compiler_version != expected.compiler_version {
        return Err("manifest compiler_version mismatch".to_string());
    }
    if manifest.entry != expected.entry {
        return Err("manifest entry mismatch".to_string());
    }
    if manifest.eval_bases != expected.eval_bases {
        return Err("manifest eval_bases mismatch".to_string());
    }
    if manifest.input_hash_sha256_hex != expected.input_hash_sha256_hex {
        return Err("manifest input_hash mismatch".to_string());
    }
    Ok(())
}
