//! Where `@include` paths are looked up.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File contents plus a stable identity used to skip repeated includes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub identity: String,
    pub bytes: Vec<u8>,
}

pub trait FileSystem {
    /// Reads the whole file at `path`, relative to the filesystem root.
    fn open(&self, path: &str) -> io::Result<SourceFile>;
}

/// Include paths are matched case-insensitively with `/` separators.
pub(crate) fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
        .to_lowercase()
}

/// Files under a directory on disk.
#[derive(Debug, Clone)]
pub struct DirFileSystem {
    root: PathBuf,
}

impl DirFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileSystem for DirFileSystem {
    fn open(&self, path: &str) -> io::Result<SourceFile> {
        let relative = path.replace('\\', "/");
        let bytes = fs::read(self.root.join(&relative))?;
        Ok(SourceFile {
            identity: normalize_path(&relative),
            bytes,
        })
    }
}

/// In-memory files, keyed by normalized path.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, contents: impl Into<Vec<u8>>) {
        self.files.insert(normalize_path(path), contents.into());
    }

    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn open(&self, path: &str) -> io::Result<SourceFile> {
        let identity = normalize_path(path);
        match self.files.get(&identity) {
            Some(bytes) => Ok(SourceFile {
                identity,
                bytes: bytes.clone(),
            }),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no file named {path}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn memory_paths_are_normalized() {
        let fs = MemoryFileSystem::new().with_file("Sub\\Base.fgd", "x");
        let file = fs.open("./sub/base.FGD").expect("open");
        assert_eq!(file.identity, "sub/base.fgd");
        assert_eq!(file.bytes, b"x");
        let err = fs.open("missing.fgd").expect_err("missing");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn dir_reads_relative_to_root() {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("inc")).expect("mkdir");
        fs::write(temp.path().join("inc").join("a.fgd"), "@mapsize(0, 1)").expect("write");
        let dir = DirFileSystem::new(temp.path());
        let file = dir.open("inc/a.fgd").expect("open");
        assert_eq!(file.identity, "inc/a.fgd");
        assert_eq!(file.bytes, b"@mapsize(0, 1)");
        assert!(dir.open("inc/b.fgd").is_err());
    }
}
