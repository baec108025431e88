//! Location and file import.
//!
//! Locations only make sense relative to their context's source manager,
//! so importing one means re-anchoring: collapse to the expansion site,
//! split into (file, offset), import the file entry, and rebuild the
//! offset against the destination's copy of that file. Expansion history
//! is not reconstructed.

use crate::{ImportError, Importer, Result};
use xtu_ast::{FileId, SourceLoc, SourceRange};

impl Importer<'_> {
    /// Import a location. Invalid stays invalid.
    pub fn import_loc(&mut self, loc: SourceLoc) -> Result<SourceLoc> {
        if !loc.is_valid() {
            return Ok(SourceLoc::INVALID);
        }
        let from = self.from;
        let collapsed = from.source().expansion_loc(loc);
        let (file, offset) = from
            .source()
            .decompose(collapsed)
            .ok_or_else(|| ImportError::unknown("location does not resolve to a file"))?;
        let to_file = self.import_file(file)?;
        self.to
            .source()
            .loc_for(to_file, offset)
            .ok_or_else(|| ImportError::unknown("offset is out of range in the imported file"))
    }

    /// Import a source range endpoint-wise.
    pub fn import_range(&mut self, range: SourceRange) -> Result<SourceRange> {
        Ok(SourceRange::new(
            self.import_loc(range.begin)?,
            self.import_loc(range.end)?,
        ))
    }

    /// Import a file entry, memoized per session.
    ///
    /// Disk-backed entries are re-opened by path in the destination (the
    /// destination's source manager dedupes repeated paths); buffer-backed
    /// entries are copied.
    pub fn import_file(&mut self, file: FileId) -> Result<FileId> {
        if let Some(to_file) = self.map.lookup_file(file) {
            return Ok(to_file);
        }
        let from = self.from;
        let entry = from.source().file(file);
        let characteristic = entry.characteristic();
        let to_file = match entry.path() {
            Some(path) => self
                .to
                .source_mut()
                .load_file(path, characteristic)
                .map_err(|e| ImportError::unknown(e.to_string()))?,
            None => self
                .to
                .source_mut()
                .add_buffer(entry.name(), entry.contents(), characteristic)
                .map_err(|e| ImportError::unknown(e.to_string()))?,
        };
        self.map.record_file(file, to_file);
        Ok(to_file)
    }
}
