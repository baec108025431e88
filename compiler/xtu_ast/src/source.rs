//! Source files, locations, and the source manager.
//!
//! A [`SourceLoc`] is a raw 32-bit offset into a single global offset
//! space per context. The [`SourceManager`] carves that space into
//! contiguous regions, one per file entry or macro expansion. Offset 0 is
//! reserved for the invalid location.
//!
//! Macro expansions are not reconstructed across contexts: a location
//! inside an expansion region collapses to its expansion site via
//! [`SourceManager::expansion_loc`], which always lands in a file region.

use rustc_hash::FxHashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Handle for a file entry in a [`SourceManager`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct FileId(u32);

impl FileId {
    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        FileId(raw)
    }
}

/// A location in the global offset space of one context.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct SourceLoc(u32);

impl SourceLoc {
    /// The invalid location (offset 0).
    pub const INVALID: SourceLoc = SourceLoc(0);

    /// Check if this location is valid.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Get the raw u32 offset.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from a raw u32 offset.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        SourceLoc(raw)
    }
}

impl fmt::Debug for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "SourceLoc({})", self.0)
        } else {
            write!(f, "SourceLoc::INVALID")
        }
    }
}

/// A half-open location pair.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct SourceRange {
    pub begin: SourceLoc,
    pub end: SourceLoc,
}

impl SourceRange {
    /// The invalid range.
    pub const INVALID: SourceRange = SourceRange {
        begin: SourceLoc::INVALID,
        end: SourceLoc::INVALID,
    };

    /// Create a new range.
    #[inline]
    pub const fn new(begin: SourceLoc, end: SourceLoc) -> Self {
        SourceRange { begin, end }
    }
}

/// Whether a file is user code or a system header.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum FileCharacteristic {
    #[default]
    User,
    System,
}

/// Error when registering a source file fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The file could not be read from disk.
    Io {
        path: PathBuf,
        kind: std::io::ErrorKind,
    },
    /// The global offset space is exhausted.
    Overflow,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io { path, kind } => {
                write!(f, "cannot read source file `{}`: {kind}", path.display())
            }
            SourceError::Overflow => write!(f, "source manager exceeded u32::MAX offsets"),
        }
    }
}

impl std::error::Error for SourceError {}

/// One file entry: either disk-backed (has a path) or buffer-backed.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    path: Option<PathBuf>,
    contents: String,
    characteristic: FileCharacteristic,
    start: u32,
}

impl SourceFile {
    /// Display name (the path for disk-backed entries).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// On-disk path, if this entry is backed by a real file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// File contents.
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// System vs user characteristic.
    pub fn characteristic(&self) -> FileCharacteristic {
        self.characteristic
    }

    /// Location of the first byte.
    pub fn start(&self) -> SourceLoc {
        SourceLoc(self.start)
    }
}

#[derive(Copy, Clone, Debug)]
enum RegionKind {
    File(FileId),
    /// Macro expansion region; locations inside it collapse to
    /// `expansion + (loc - start)`.
    Expansion(SourceLoc),
}

#[derive(Copy, Clone, Debug)]
struct Region {
    start: u32,
    len: u32,
    kind: RegionKind,
}

/// Owns all file entries and expansion regions of one context.
pub struct SourceManager {
    files: Vec<SourceFile>,
    by_path: FxHashMap<PathBuf, FileId>,
    /// Regions in increasing `start` order; looked up by binary search.
    regions: Vec<Region>,
    next_offset: u32,
}

impl SourceManager {
    /// Create an empty source manager. Offset 0 stays unused so that
    /// `SourceLoc::INVALID` never resolves to a region.
    pub fn new() -> Self {
        SourceManager {
            files: Vec::new(),
            by_path: FxHashMap::default(),
            regions: Vec::new(),
            next_offset: 1,
        }
    }

    fn allocate_region(&mut self, len: u32, kind: RegionKind) -> Result<u32, SourceError> {
        let start = self.next_offset;
        // +1 keeps an addressable end-of-region offset and separates
        // adjacent regions.
        let next = start
            .checked_add(len)
            .and_then(|n| n.checked_add(1))
            .ok_or(SourceError::Overflow)?;
        self.next_offset = next;
        self.regions.push(Region { start, len, kind });
        Ok(start)
    }

    /// Register a disk-backed file, reading its contents now.
    ///
    /// Repeated registration of the same path returns the existing entry.
    pub fn load_file(
        &mut self,
        path: &Path,
        characteristic: FileCharacteristic,
    ) -> Result<FileId, SourceError> {
        if let Some(&id) = self.by_path.get(path) {
            return Ok(id);
        }
        let contents = std::fs::read_to_string(path).map_err(|e| SourceError::Io {
            path: path.to_path_buf(),
            kind: e.kind(),
        })?;
        let id = self.add_entry(
            path.display().to_string(),
            Some(path.to_path_buf()),
            contents,
            characteristic,
        )?;
        self.by_path.insert(path.to_path_buf(), id);
        Ok(id)
    }

    /// Register a buffer-backed (synthetic) file.
    pub fn add_buffer(
        &mut self,
        name: impl Into<String>,
        contents: impl Into<String>,
        characteristic: FileCharacteristic,
    ) -> Result<FileId, SourceError> {
        self.add_entry(name.into(), None, contents.into(), characteristic)
    }

    fn add_entry(
        &mut self,
        name: String,
        path: Option<PathBuf>,
        contents: String,
        characteristic: FileCharacteristic,
    ) -> Result<FileId, SourceError> {
        let len = u32::try_from(contents.len()).map_err(|_| SourceError::Overflow)?;
        let id = FileId(u32::try_from(self.files.len()).map_err(|_| SourceError::Overflow)?);
        let start = self.allocate_region(len, RegionKind::File(id))?;
        self.files.push(SourceFile {
            name,
            path,
            contents,
            characteristic,
            start,
        });
        Ok(id)
    }

    /// Register a macro-expansion region of `len` bytes whose tokens
    /// expand at `expansion`.
    ///
    /// # Panics
    /// Panics if `expansion` does not resolve to an already-created region;
    /// this ordering is what makes `expansion_loc` terminate.
    pub fn create_expansion(
        &mut self,
        len: u32,
        expansion: SourceLoc,
    ) -> Result<SourceLoc, SourceError> {
        assert!(
            self.region_for(expansion).is_some(),
            "expansion target must be a valid existing location"
        );
        let start = self.allocate_region(len, RegionKind::Expansion(expansion))?;
        Ok(SourceLoc(start))
    }

    /// Get a file entry.
    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    /// Number of file entries.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Location of `offset` bytes into `file`.
    ///
    /// Returns `None` if the offset is past the end of the file.
    pub fn loc_for(&self, file: FileId, offset: u32) -> Option<SourceLoc> {
        let f = &self.files[file.0 as usize];
        if offset > u32::try_from(f.contents.len()).ok()? {
            return None;
        }
        Some(SourceLoc(f.start + offset))
    }

    fn region_for(&self, loc: SourceLoc) -> Option<&Region> {
        if !loc.is_valid() {
            return None;
        }
        let idx = self
            .regions
            .partition_point(|r| r.start <= loc.raw())
            .checked_sub(1)?;
        let region = &self.regions[idx];
        (loc.raw() <= region.start + region.len).then_some(region)
    }

    /// Collapse a location to its macro-expansion site, landing in a file
    /// region. Expansion history is discarded.
    pub fn expansion_loc(&self, loc: SourceLoc) -> SourceLoc {
        let mut loc = loc;
        loop {
            match self.region_for(loc) {
                Some(Region {
                    kind: RegionKind::Expansion(target),
                    ..
                }) => {
                    // Expansion regions always reference earlier regions,
                    // so this walk strictly decreases and terminates.
                    loc = *target;
                }
                _ => return loc,
            }
        }
    }

    /// Split a file location into (file, offset-in-file).
    ///
    /// Returns `None` for invalid locations or locations still inside an
    /// expansion region (collapse with [`expansion_loc`] first).
    ///
    /// [`expansion_loc`]: SourceManager::expansion_loc
    pub fn decompose(&self, loc: SourceLoc) -> Option<(FileId, u32)> {
        match self.region_for(loc)? {
            Region {
                start,
                kind: RegionKind::File(id),
                ..
            } => Some((*id, loc.raw() - start)),
            _ => None,
        }
    }
}

impl Default for SourceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buffer(sm: &mut SourceManager, name: &str, text: &str) -> FileId {
        sm.add_buffer(name, text, FileCharacteristic::User)
            .expect("buffer fits")
    }

    #[test]
    fn loc_roundtrip() {
        let mut sm = SourceManager::new();
        let a = buffer(&mut sm, "a.h", "int x;\n");
        let b = buffer(&mut sm, "b.c", "int y;\n");

        let loc = sm.loc_for(b, 4).expect("in range");
        assert_eq!(sm.decompose(loc), Some((b, 4)));
        let loc = sm.loc_for(a, 0).expect("in range");
        assert_eq!(sm.decompose(loc), Some((a, 0)));
    }

    #[test]
    fn offset_past_end_is_rejected() {
        let mut sm = SourceManager::new();
        let a = buffer(&mut sm, "a.h", "xy");
        assert!(sm.loc_for(a, 2).is_some()); // end-of-file is addressable
        assert!(sm.loc_for(a, 3).is_none());
    }

    #[test]
    fn invalid_loc_never_resolves() {
        let sm = SourceManager::new();
        assert_eq!(sm.decompose(SourceLoc::INVALID), None);
        assert_eq!(
            sm.expansion_loc(SourceLoc::INVALID),
            SourceLoc::INVALID
        );
    }

    #[test]
    fn expansion_collapses_to_file_loc() {
        let mut sm = SourceManager::new();
        let f = buffer(&mut sm, "m.c", "#define M 1\nint z = M;\n");
        let use_site = sm.loc_for(f, 20).expect("in range");
        let exp = sm.create_expansion(1, use_site).expect("fits");

        // A location inside the expansion region decomposes only after
        // collapsing.
        assert_eq!(sm.decompose(exp), None);
        assert_eq!(sm.expansion_loc(exp), use_site);
        assert_eq!(sm.decompose(sm.expansion_loc(exp)), Some((f, 20)));
    }

    #[test]
    fn nested_expansions_collapse_fully() {
        let mut sm = SourceManager::new();
        let f = buffer(&mut sm, "m.c", "some text here");
        let site = sm.loc_for(f, 5).expect("in range");
        let outer = sm.create_expansion(4, site).expect("fits");
        let inner = sm.create_expansion(2, outer).expect("fits");

        assert_eq!(sm.expansion_loc(inner), site);
    }

    #[test]
    fn duplicate_path_loads_once() {
        let mut sm = SourceManager::new();
        let dir = std::env::temp_dir();
        let path = dir.join("xtu_source_test.h");
        std::fs::write(&path, "int dup;\n").expect("temp file is writable");

        let a = sm
            .load_file(&path, FileCharacteristic::System)
            .expect("file exists");
        let b = sm
            .load_file(&path, FileCharacteristic::System)
            .expect("file exists");
        assert_eq!(a, b);
        assert_eq!(sm.file_count(), 1);
        assert_eq!(sm.file(a).characteristic(), FileCharacteristic::System);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut sm = SourceManager::new();
        let err = sm
            .load_file(
                Path::new("/nonexistent/xtu/definitely_missing.h"),
                FileCharacteristic::User,
            )
            .expect_err("must fail");
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
