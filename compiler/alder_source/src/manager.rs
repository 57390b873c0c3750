//! The source manager: owner of all source text.
//!
//! All methods take `&self`; the buffer table lives behind a
//! `parking_lot::RwLock` so that lazily computed state (line-offset
//! tables, the file lookup cache) can be filled in on first use. The
//! compiler core is single-threaded, so the lock is uncontended; it
//! exists to make the write-once caches safe rather than to enable
//! parallelism.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{BufferId, SourceLocation, SourceRange};

/// Errors produced by source manager operations.
///
/// These are the only fallible-API errors in the core; everything that
/// concerns the user's source *content* is reported through the
/// diagnostic sink instead.
#[derive(Debug)]
pub enum SourceError {
    /// A path was assigned twice.
    DuplicatePath(PathBuf),
    /// An include could not be resolved on any search path.
    HeaderNotFound(PathBuf),
    /// The underlying file read failed.
    Io(PathBuf, io::Error),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::DuplicatePath(p) => {
                write!(f, "path '{}' is already loaded", p.display())
            }
            SourceError::HeaderNotFound(p) => {
                write!(f, "could not find include file '{}'", p.display())
            }
            SourceError::Io(p, e) => write!(f, "failed to read '{}': {}", p.display(), e),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Metadata for a buffer holding real file (or in-memory) text.
struct FileEntry {
    text: Arc<str>,
    /// Display name, as given at registration.
    name: String,
    /// Directory of the file, used to resolve relative includes.
    directory: Option<PathBuf>,
    /// Location of the `include` directive that loaded this buffer.
    included_from: Option<SourceLocation>,
    /// Byte offsets of line starts; built lazily on first line query.
    line_offsets: Option<Vec<u32>>,
}

/// Metadata for a synthetic macro-expansion buffer.
///
/// An expansion buffer owns no text: a location `(id, offset)` within
/// it denotes the byte at `expansion_start + offset` in the buffer the
/// macro body was written in.
struct ExpansionEntry {
    /// The macro use site.
    original_loc: SourceLocation,
    /// Range of the substituted tokens in their defining buffer.
    expansion_start: SourceLocation,
    expansion_end: SourceLocation,
}

/// File vs. expansion, with an explicit discriminant. The two cases
/// have different ownership: `File` owns heap text, `Expansion` holds
/// only locations.
enum BufferEntry {
    File(FileEntry),
    Expansion(ExpansionEntry),
}

struct Inner {
    working_dir: PathBuf,
    /// Indexed by `BufferId - 1`. Append-only.
    entries: Vec<BufferEntry>,
    /// Canonical path -> already-loaded buffer.
    lookup_cache: FxHashMap<PathBuf, BufferId>,
    user_directories: Vec<PathBuf>,
    system_directories: Vec<PathBuf>,
    unnamed_count: u32,
}

/// Owns all source buffers and maps opaque locations back to
/// file / line / column, including macro-expansion provenance.
///
/// # Path canonicalization
///
/// Paths of on-disk files are canonicalized with
/// [`std::fs::canonicalize`]: symlinks are resolved and case
/// sensitivity follows the host filesystem. Paths given for in-memory
/// buffers are used verbatim. No Unicode normalization is applied.
pub struct SourceManager {
    inner: RwLock<Inner>,
}

impl Default for SourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceManager {
    pub fn new() -> Self {
        SourceManager {
            inner: RwLock::new(Inner {
                working_dir: std::env::current_dir().unwrap_or_default(),
                entries: Vec::new(),
                lookup_cache: FxHashMap::default(),
                user_directories: Vec::new(),
                system_directories: Vec::new(),
                unnamed_count: 0,
            }),
        }
    }

    /// Resolve `path` against the working directory.
    pub fn make_absolute_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.inner.read().working_dir.join(path)
        }
    }

    /// Register a `-I`-style user include directory.
    pub fn add_user_directory(&self, path: &Path) {
        let abs = self.make_absolute_path(path);
        self.inner.write().user_directories.push(abs);
    }

    /// Register a system include directory.
    pub fn add_system_directory(&self, path: &Path) {
        let abs = self.make_absolute_path(path);
        self.inner.write().system_directories.push(abs);
    }

    /// Register in-memory text under a generated name.
    pub fn assign_text(&self, text: &str) -> BufferId {
        let name = {
            let mut inner = self.inner.write();
            inner.unnamed_count += 1;
            format!("<unnamed buffer {}>", inner.unnamed_count)
        };
        self.insert_file(text.into(), name, None, None)
    }

    /// Register in-memory text under the given path.
    ///
    /// Fails with [`SourceError::DuplicatePath`] if the path already
    /// resolves to a loaded buffer.
    pub fn assign_text_at(&self, path: &Path, text: &str) -> Result<BufferId, SourceError> {
        self.assign_entry(path, text.into())
    }

    /// Transfer ownership of an already-read byte vector.
    ///
    /// Content is expected to be UTF-8; invalid sequences are replaced
    /// rather than rejected, so that a best-effort tree can still be
    /// produced from damaged input.
    pub fn assign_buffer(&self, path: &Path, bytes: Vec<u8>) -> Result<BufferId, SourceError> {
        let text: Arc<str> = match String::from_utf8(bytes) {
            Ok(s) => s.into(),
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned().into(),
        };
        self.assign_entry(path, text)
    }

    /// Read a file from disk, resolving relative paths against the
    /// working directory. Repeated reads of the same canonical path
    /// return the cached buffer.
    pub fn read_source(&self, path: &Path) -> Result<BufferId, SourceError> {
        let abs = self.make_absolute_path(path);
        self.open_cached(&abs)
    }

    /// Resolve an `include` and read the header.
    ///
    /// Search order:
    /// 1. unless `is_system_path`, the directory of the including file;
    /// 2. the user directories, in registration order;
    /// 3. if `is_system_path`, the system directories.
    ///
    /// The first existing file wins. The location of the include
    /// directive is recorded in the buffer entry.
    pub fn read_header(
        &self,
        path: &Path,
        included_from: SourceLocation,
        is_system_path: bool,
    ) -> Result<BufferId, SourceError> {
        // Absolute paths skip the search entirely.
        if path.is_absolute() {
            let id = self.open_cached(path)?;
            self.note_included_from(id, included_from);
            return Ok(id);
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        {
            let inner = self.inner.read();
            if !is_system_path {
                if let Some(dir) = inner.including_directory(included_from) {
                    candidates.push(dir.join(path));
                }
            }
            for dir in &inner.user_directories {
                candidates.push(dir.join(path));
            }
            if is_system_path {
                for dir in &inner.system_directories {
                    candidates.push(dir.join(path));
                }
            }
        }

        for candidate in candidates {
            if candidate.is_file() {
                let id = self.open_cached(&candidate)?;
                self.note_included_from(id, included_from);
                return Ok(id);
            }
        }
        Err(SourceError::HeaderNotFound(path.to_owned()))
    }

    /// Register a synthetic buffer for a macro expansion.
    ///
    /// `original_loc` is the use site; `expansion_range` covers the
    /// substituted tokens in their defining buffer.
    pub fn create_expansion(
        &self,
        original_loc: SourceLocation,
        expansion_range: SourceRange,
    ) -> BufferId {
        let mut inner = self.inner.write();
        inner.entries.push(BufferEntry::Expansion(ExpansionEntry {
            original_loc,
            expansion_start: expansion_range.start,
            expansion_end: expansion_range.end,
        }));
        BufferId::new(inner.entries.len() as u32)
    }

    /// Whether the buffer is a macro expansion.
    pub fn is_expansion(&self, buffer: BufferId) -> bool {
        matches!(
            self.inner.read().entry(buffer),
            Some(BufferEntry::Expansion(_))
        )
    }

    /// Map a location in an expansion buffer one step towards its
    /// origin: the position of the corresponding byte in the buffer
    /// the macro body was written in. File locations map to themselves.
    pub fn expansion_source_location(&self, loc: SourceLocation) -> SourceLocation {
        match self.inner.read().entry(loc.buffer()) {
            Some(BufferEntry::Expansion(e)) => e.expansion_start.advanced(loc.offset()),
            _ => loc,
        }
    }

    /// The use site that produced the expansion containing `loc`, one
    /// level up. File locations map to themselves.
    pub fn original_location(&self, loc: SourceLocation) -> SourceLocation {
        match self.inner.read().entry(loc.buffer()) {
            Some(BufferEntry::Expansion(e)) => e.original_loc,
            _ => loc,
        }
    }

    /// Follow expansion entries all the way to a file location.
    pub fn fully_original_location(&self, mut loc: SourceLocation) -> SourceLocation {
        let inner = self.inner.read();
        while let Some(BufferEntry::Expansion(e)) = inner.entry(loc.buffer()) {
            loc = e.original_loc;
        }
        loc
    }

    /// The range of the macro body that produced an expansion buffer.
    pub fn expansion_range(&self, buffer: BufferId) -> Option<SourceRange> {
        match self.inner.read().entry(buffer) {
            Some(BufferEntry::Expansion(e)) => {
                Some(SourceRange::new(e.expansion_start, e.expansion_end))
            }
            _ => None,
        }
    }

    /// The location of the include directive that loaded this buffer.
    pub fn included_from(&self, buffer: BufferId) -> Option<SourceLocation> {
        match self.inner.read().entry(buffer) {
            Some(BufferEntry::File(f)) => f.included_from,
            _ => None,
        }
    }

    /// Full text of a file buffer. Expansion buffers have no text of
    /// their own.
    pub fn source_text(&self, buffer: BufferId) -> Option<Arc<str>> {
        match self.inner.read().entry(buffer) {
            Some(BufferEntry::File(f)) => Some(Arc::clone(&f.text)),
            _ => None,
        }
    }

    /// Display name of a file buffer, or the empty string.
    pub fn get_file_name(&self, buffer: BufferId) -> String {
        match self.inner.read().entry(buffer) {
            Some(BufferEntry::File(f)) => f.name.clone(),
            _ => String::new(),
        }
    }

    /// 1-based line number of a location. Expansion locations are
    /// first resolved to their fully original file location.
    ///
    /// Runs in `O(log L)` for `L` lines; the line table is built on
    /// the first query against a buffer and memoized.
    pub fn get_line_number(&self, loc: SourceLocation) -> u32 {
        let loc = self.fully_original_location(loc);
        self.with_line_offsets(loc.buffer(), |offsets| {
            line_index(offsets, loc.offset()) as u32 + 1
        })
        .unwrap_or(0)
    }

    /// 1-based column of a location, as a byte offset within its line.
    /// No tab-stop interpretation is applied.
    pub fn get_column_number(&self, loc: SourceLocation) -> u32 {
        let loc = self.fully_original_location(loc);
        self.with_line_offsets(loc.buffer(), |offsets| {
            let line = line_index(offsets, loc.offset());
            loc.offset() - offsets[line] + 1
        })
        .unwrap_or(0)
    }

    // --- internals ---

    fn assign_entry(&self, path: &Path, text: Arc<str>) -> Result<BufferId, SourceError> {
        let abs = self.make_absolute_path(path);
        {
            let inner = self.inner.read();
            if inner.lookup_cache.contains_key(&abs) {
                return Err(SourceError::DuplicatePath(abs));
            }
        }
        let name = path.to_string_lossy().into_owned();
        let directory = abs.parent().map(Path::to_owned);
        let id = self.insert_file(text, name, directory, None);
        self.inner.write().lookup_cache.insert(abs, id);
        Ok(id)
    }

    fn open_cached(&self, abs: &Path) -> Result<BufferId, SourceError> {
        let canonical = std::fs::canonicalize(abs).unwrap_or_else(|_| abs.to_owned());
        if let Some(&id) = self.inner.read().lookup_cache.get(&canonical) {
            return Ok(id);
        }

        let bytes = std::fs::read(&canonical)
            .map_err(|e| SourceError::Io(canonical.clone(), e))?;
        debug!(path = %canonical.display(), bytes = bytes.len(), "loaded source file");

        let text: Arc<str> = match String::from_utf8(bytes) {
            Ok(s) => s.into(),
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned().into(),
        };
        let name = abs
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| abs.to_string_lossy().into_owned());
        let directory = canonical.parent().map(Path::to_owned);
        let id = self.insert_file(text, name, directory, None);
        self.inner.write().lookup_cache.insert(canonical, id);
        Ok(id)
    }

    fn insert_file(
        &self,
        text: Arc<str>,
        name: String,
        directory: Option<PathBuf>,
        included_from: Option<SourceLocation>,
    ) -> BufferId {
        let mut inner = self.inner.write();
        inner.entries.push(BufferEntry::File(FileEntry {
            text,
            name,
            directory,
            included_from,
            line_offsets: None,
        }));
        BufferId::new(inner.entries.len() as u32)
    }

    fn note_included_from(&self, buffer: BufferId, from: SourceLocation) {
        if let Some(BufferEntry::File(f)) = self.inner.write().entry_mut(buffer) {
            if f.included_from.is_none() {
                f.included_from = Some(from);
            }
        }
    }

    fn with_line_offsets<R>(&self, buffer: BufferId, f: impl FnOnce(&[u32]) -> R) -> Option<R> {
        // Fast path: table already computed.
        {
            let inner = self.inner.read();
            if let Some(BufferEntry::File(entry)) = inner.entry(buffer) {
                if let Some(offsets) = &entry.line_offsets {
                    return Some(f(offsets));
                }
            } else {
                return None;
            }
        }

        let mut inner = self.inner.write();
        if let Some(BufferEntry::File(entry)) = inner.entry_mut(buffer) {
            if entry.line_offsets.is_none() {
                entry.line_offsets = Some(compute_line_offsets(&entry.text));
            }
            entry.line_offsets.as_deref().map(f)
        } else {
            None
        }
    }
}

impl Inner {
    fn entry(&self, buffer: BufferId) -> Option<&BufferEntry> {
        if !buffer.is_valid() {
            return None;
        }
        self.entries.get(buffer.raw() as usize - 1)
    }

    fn entry_mut(&mut self, buffer: BufferId) -> Option<&mut BufferEntry> {
        if !buffer.is_valid() {
            return None;
        }
        self.entries.get_mut(buffer.raw() as usize - 1)
    }

    /// Directory of the buffer containing `loc`, following expansions.
    fn including_directory(&self, mut loc: SourceLocation) -> Option<&Path> {
        loop {
            match self.entry(loc.buffer())? {
                BufferEntry::File(f) => return f.directory.as_deref(),
                BufferEntry::Expansion(e) => loc = e.original_loc,
            }
        }
    }
}

/// Byte offsets of every line start. The first line starts at 0;
/// `\n`, `\r\n`, and a lone `\r` all end a line.
fn compute_line_offsets(text: &str) -> Vec<u32> {
    let bytes = text.as_bytes();
    let mut offsets = vec![0u32];
    let mut pos = 0;
    while pos < bytes.len() {
        match memchr::memchr2(b'\n', b'\r', &bytes[pos..]) {
            Some(found) => {
                let mut next = pos + found + 1;
                if bytes[pos + found] == b'\r' && bytes.get(next) == Some(&b'\n') {
                    next += 1;
                }
                offsets.push(next as u32);
                pos = next;
            }
            None => break,
        }
    }
    offsets
}

/// Index of the line containing `offset`, by binary search.
fn line_index(offsets: &[u32], offset: u32) -> usize {
    offsets.partition_point(|&start| start <= offset) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Registration ===

    #[test]
    fn assign_text_generates_names() {
        let sm = SourceManager::new();
        let a = sm.assign_text("module m; endmodule");
        let b = sm.assign_text("module n; endmodule");
        assert_ne!(a, b);
        assert_eq!(sm.get_file_name(a), "<unnamed buffer 1>");
        assert_eq!(sm.get_file_name(b), "<unnamed buffer 2>");
    }

    #[test]
    fn buffer_ids_are_dense_and_monotonic() {
        let sm = SourceManager::new();
        let a = sm.assign_text("a");
        let b = sm.assign_text("b");
        let c = sm.assign_text("c");
        assert_eq!(a.raw() + 1, b.raw());
        assert_eq!(b.raw() + 1, c.raw());
    }

    #[test]
    fn duplicate_path_rejected() {
        let sm = SourceManager::new();
        let path = Path::new("dup_test.sv");
        sm.assign_text_at(path, "x").unwrap();
        match sm.assign_text_at(path, "y") {
            Err(SourceError::DuplicatePath(_)) => {}
            other => panic!("expected DuplicatePath, got {other:?}"),
        }
    }

    #[test]
    fn assign_buffer_takes_bytes() {
        let sm = SourceManager::new();
        let id = sm
            .assign_buffer(Path::new("bytes.sv"), b"wire w;".to_vec())
            .unwrap();
        assert_eq!(&*sm.source_text(id).unwrap(), "wire w;");
    }

    // === Line / column queries ===

    #[test]
    fn line_and_column_round_trip() {
        let sm = SourceManager::new();
        let text = "first line\nsecond\r\nthird\rfourth";
        let id = sm.assign_text(text);

        // Naive scan for comparison.
        let mut line = 1u32;
        let mut col = 1u32;
        for (off, b) in text.bytes().enumerate() {
            let loc = SourceLocation::new(id, off as u32);
            assert_eq!(sm.get_line_number(loc), line, "line at offset {off}");
            assert_eq!(sm.get_column_number(loc), col, "column at offset {off}");
            if b == b'\n' || (b == b'\r' && text.as_bytes().get(off + 1) != Some(&b'\n')) {
                line += 1;
                col = 1;
            } else if b == b'\r' {
                col += 1; // consumed as part of \r\n; next byte is \n
            } else {
                col += 1;
            }
        }
    }

    #[test]
    fn column_is_byte_offset_not_tab_aware() {
        let sm = SourceManager::new();
        let id = sm.assign_text("\ta");
        assert_eq!(sm.get_column_number(SourceLocation::new(id, 1)), 2);
    }

    #[test]
    fn empty_buffer_has_one_line() {
        let sm = SourceManager::new();
        let id = sm.assign_text("");
        assert_eq!(sm.get_line_number(SourceLocation::new(id, 0)), 1);
        assert_eq!(sm.get_column_number(SourceLocation::new(id, 0)), 1);
    }

    // === Expansions ===

    #[test]
    fn expansion_resolves_to_original() {
        let sm = SourceManager::new();
        let file = sm.assign_text("`define X 1\nX + X\n");
        let use_site = SourceLocation::new(file, 12);
        let body = SourceRange::new(
            SourceLocation::new(file, 10),
            SourceLocation::new(file, 11),
        );
        let exp = sm.create_expansion(use_site, body);

        assert!(sm.is_expansion(exp));
        let in_exp = SourceLocation::new(exp, 0);
        assert_eq!(sm.original_location(in_exp), use_site);
        assert_eq!(sm.fully_original_location(in_exp), use_site);
        assert_eq!(
            sm.expansion_source_location(in_exp),
            SourceLocation::new(file, 10)
        );
        // Line queries follow the chain to the use site.
        assert_eq!(sm.get_line_number(in_exp), 2);
    }

    #[test]
    fn nested_expansion_chain() {
        let sm = SourceManager::new();
        let file = sm.assign_text("abcdef");
        let outer_use = SourceLocation::new(file, 3);
        let outer = sm.create_expansion(
            outer_use,
            SourceRange::new(SourceLocation::new(file, 0), SourceLocation::new(file, 2)),
        );
        let inner_use = SourceLocation::new(outer, 1);
        let inner = sm.create_expansion(
            inner_use,
            SourceRange::new(SourceLocation::new(file, 4), SourceLocation::new(file, 6)),
        );

        let loc = SourceLocation::new(inner, 0);
        assert_eq!(sm.original_location(loc), inner_use);
        assert_eq!(sm.fully_original_location(loc), outer_use);
    }

    // === Include search ===

    #[test]
    fn read_header_prefers_including_directory() {
        let dir = std::env::temp_dir().join("alder_sm_inc_test");
        let sub = dir.join("a");
        let user = dir.join("c");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::create_dir_all(&user).unwrap();
        std::fs::write(sub.join("h.svh"), "near").unwrap();
        std::fs::write(user.join("h.svh"), "far").unwrap();

        let sm = SourceManager::new();
        sm.add_user_directory(&user);
        let top = sm
            .assign_text_at(&sub.join("top.sv"), "`include \"h.svh\"")
            .unwrap();
        let from = SourceLocation::new(top, 0);

        let id = sm.read_header(Path::new("h.svh"), from, false).unwrap();
        assert_eq!(&*sm.source_text(id).unwrap(), "near");
        assert_eq!(sm.included_from(id), Some(from));
    }

    #[test]
    fn read_header_falls_back_to_user_directory() {
        let dir = std::env::temp_dir().join("alder_sm_user_test");
        let user = dir.join("c");
        std::fs::create_dir_all(&user).unwrap();
        std::fs::write(user.join("only_here.svh"), "found").unwrap();

        let sm = SourceManager::new();
        sm.add_user_directory(&user);
        let top = sm.assign_text("`include \"only_here.svh\"");
        let from = SourceLocation::new(top, 0);

        let id = sm
            .read_header(Path::new("only_here.svh"), from, false)
            .unwrap();
        assert_eq!(&*sm.source_text(id).unwrap(), "found");
        assert_eq!(sm.included_from(id), Some(from));
    }

    #[test]
    fn read_header_missing_is_error() {
        let sm = SourceManager::new();
        let top = sm.assign_text("");
        let res = sm.read_header(
            Path::new("no_such_header.svh"),
            SourceLocation::new(top, 0),
            false,
        );
        assert!(matches!(res, Err(SourceError::HeaderNotFound(_))));
    }

    #[test]
    fn system_include_skips_including_directory() {
        let dir = std::env::temp_dir().join("alder_sm_sys_test");
        let sys = dir.join("sys");
        std::fs::create_dir_all(&sys).unwrap();
        std::fs::write(sys.join("sys_only.svh"), "system").unwrap();

        let sm = SourceManager::new();
        sm.add_system_directory(&sys);
        let top = sm.assign_text("`include <sys_only.svh>");
        let id = sm
            .read_header(
                Path::new("sys_only.svh"),
                SourceLocation::new(top, 0),
                true,
            )
            .unwrap();
        assert_eq!(&*sm.source_text(id).unwrap(), "system");
    }

    // === Line offset helper ===

    #[test]
    fn line_offsets_handle_mixed_endings() {
        let offsets = compute_line_offsets("a\nb\r\nc\rd");
        assert_eq!(offsets, vec![0, 2, 5, 7]);
    }
}
