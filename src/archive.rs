//! Archive entry access.
//!
//! The engine iterates an export archive twice: once to inventory every
//! entry, once to transform each document. Entry bytes are only read on
//! demand through [`ArchiveSource`], so cataloging an archive stays cheap.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use zip::ZipArchive;

use crate::error::{ConvertError, Result};

/// A source of export archive entries.
///
/// `paths` returns every entry path in archive order (directories included,
/// with a trailing `/`). Content access is deferred until `read_text` /
/// `read_bytes` is called for a specific entry.
pub trait ArchiveSource {
    fn paths(&mut self) -> Result<Vec<String>>;
    fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>>;

    fn read_text(&mut self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        Ok(String::from_utf8(bytes)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).to_string()))
    }
}

/// The file name portion of an entry path.
pub fn entry_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Lowercased extension of an entry path, without the dot.
pub fn entry_extension(path: &str) -> String {
    Path::new(entry_name(path))
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// ZIP-backed archive source.
pub struct ZipSource {
    archive: ZipArchive<File>,
}

impl ZipSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)?;
        Ok(Self { archive })
    }
}

impl ArchiveSource for ZipSource {
    fn paths(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            names.push(self.archive.by_index(i)?.name().to_string());
        }
        Ok(names)
    }

    fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|_| ConvertError::EntryNotFound(path.to_string()))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// In-memory archive source, used by tests and by callers that already hold
/// the export contents.
#[derive(Default)]
pub struct MemorySource {
    entries: Vec<(String, Vec<u8>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: &str, content: &str) -> &mut Self {
        self.entries.push((path.to_string(), content.as_bytes().to_vec()));
        self
    }

    pub fn add_bytes(&mut self, path: &str, content: Vec<u8>) -> &mut Self {
        self.entries.push((path.to_string(), content));
        self
    }
}

impl ArchiveSource for MemorySource {
    fn paths(&mut self) -> Result<Vec<String>> {
        Ok(self.entries.iter().map(|(p, _)| p.clone()).collect())
    }

    fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| ConvertError::EntryNotFound(path.to_string()))
    }
}
