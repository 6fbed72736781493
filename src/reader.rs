//! # Random-access reader
//!
//! Builds an in-memory index from a single linear scan of the archive at
//! open time (§4.9): a `folder_copies` map for `Copy` folders, and an
//! `entries` map from `(folder, filename)` to either a `Content` payload's
//! byte range or a `Reference`'s target key. The archive file itself is
//! memory-mapped once via `memmap2`, so `open()` calls are slices into
//! that mapping rather than repeated `seek`+`read` syscalls.

use crate::brotli_codec;
use crate::varint;
use crate::ArchiverError;
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read as StdRead;
use std::path::Path;

const FOLDER_NORMAL: u8 = 0x00;
const FOLDER_COPY: u8 = 0x01;
const FILE_CONTENT: u8 = 0x00;
const FILE_REFERENCE: u8 = 0x01;

/// Resolution chains longer than this indicate a cycle; the format itself
/// never produces chains deeper than one, so this is purely defensive.
const MAX_RESOLUTION_HOPS: usize = 16;

#[derive(Debug, Clone)]
enum Entry {
    Content { offset: usize, len: usize, precompressed: bool },
    Reference { source_folder: String, source_filename: String },
}

/// An open, indexed archive ready to serve random-access reads.
pub struct PackedArchive {
    mmap: Mmap,
    folder_copies: HashMap<String, String>,
    entries: HashMap<(String, String), Entry>,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn read_u8(&mut self) -> Result<u8, ArchiverError> {
        let b = *self.data.get(self.pos).ok_or_else(|| ArchiverError::Truncated("expected a tag byte".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_varint(&mut self) -> Result<u64, ArchiverError> {
        let (value, consumed) = varint::decode(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    fn read_name(&mut self) -> Result<String, ArchiverError> {
        let len = self.read_varint()? as usize;
        if self.pos + len > self.data.len() {
            return Err(ArchiverError::Truncated("name runs past end of archive".into()));
        }
        let s = String::from_utf8(self.data[self.pos..self.pos + len].to_vec())
            .map_err(|e| ArchiverError::Truncated(format!("name is not valid UTF-8: {e}")))?;
        self.pos += len;
        Ok(s)
    }

    fn skip(&mut self, n: usize) -> Result<usize, ArchiverError> {
        if self.pos + n > self.data.len() {
            return Err(ArchiverError::Truncated(format!("expected {} more bytes", n)));
        }
        let start = self.pos;
        self.pos += n;
        Ok(start)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }
}

impl PackedArchive {
    /// Memory-maps `path` and builds the folder/entry index with one
    /// linear pass.
    pub fn open_archive(path: &Path) -> Result<Self, ArchiverError> {
        let file = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
        let mmap = unsafe { Mmap::map(&file).map_err(|e| ArchiverError::io(e, path))? };

        let mut folder_copies = HashMap::new();
        let mut entries = HashMap::new();

        {
            let mut cursor = Cursor { data: &mmap[..], pos: 0 };
            while !cursor.at_end() {
                let tag = cursor.read_u8()?;
                match tag {
                    FOLDER_NORMAL => {
                        let folder = cursor.read_name()?;
                        let file_count = cursor.read_varint()?;
                        for _ in 0..file_count {
                            let filename = cursor.read_name()?;
                            let file_tag = cursor.read_u8()?;
                            match file_tag {
                                FILE_CONTENT => {
                                    let payload_len = cursor.read_varint()? as usize;
                                    let offset = cursor.skip(payload_len)?;
                                    let precompressed = filename.to_ascii_lowercase().ends_with(".br");
                                    entries.insert((folder.clone(), filename), Entry::Content { offset, len: payload_len, precompressed });
                                }
                                FILE_REFERENCE => {
                                    let source_folder = cursor.read_name()?;
                                    let source_filename = cursor.read_name()?;
                                    entries.insert((folder.clone(), filename), Entry::Reference { source_folder, source_filename });
                                }
                                other => return Err(ArchiverError::Truncated(format!("unknown file tag {other}"))),
                            }
                        }
                    }
                    FOLDER_COPY => {
                        let folder = cursor.read_name()?;
                        let source_folder = cursor.read_name()?;
                        folder_copies.insert(folder, source_folder);
                    }
                    other => return Err(ArchiverError::Truncated(format!("unknown folder tag {other}"))),
                }
            }
        }

        Ok(Self { mmap, folder_copies, entries })
    }

    fn resolve_folder<'b>(&'b self, folder: &'b str) -> Result<&'b str, ArchiverError> {
        let mut current = folder;
        for _ in 0..MAX_RESOLUTION_HOPS {
            match self.folder_copies.get(current) {
                Some(source) => current = source.as_str(),
                None => return Ok(current),
            }
        }
        Err(ArchiverError::BrokenReference(format!("folder copy chain from '{folder}' did not terminate")))
    }

    fn resolve_entry(&self, folder: &str, filename: &str) -> Result<&Entry, ArchiverError> {
        let resolved_folder = self.resolve_folder(folder)?;
        let mut key = (resolved_folder.to_string(), filename.to_string());
        for _ in 0..MAX_RESOLUTION_HOPS {
            match self.entries.get(&key) {
                Some(Entry::Reference { source_folder, source_filename }) => {
                    let resolved_source_folder = self.resolve_folder(source_folder)?;
                    key = (resolved_source_folder.to_string(), source_filename.clone());
                }
                Some(entry @ Entry::Content { .. }) => return Ok(entry),
                None => {
                    return Err(ArchiverError::BrokenReference(format!("no such entry '{folder}/{filename}'")));
                }
            }
        }
        Err(ArchiverError::BrokenReference(format!("reference chain from '{folder}/{filename}' did not terminate")))
    }

    /// Opens `folder/filename` for reading. When `keep_compressed` is
    /// true, or the entry is itself a `.br` file, the returned handle
    /// yields the raw (still Brotli-encoded) bytes; otherwise the payload
    /// is decompressed before being handed back.
    pub fn open(&self, folder: &str, filename: &str, keep_compressed: bool) -> Result<ArchiveHandle, ArchiverError> {
        let entry = self.resolve_entry(folder, filename)?;
        let Entry::Content { offset, len, precompressed } = entry else {
            unreachable!("resolve_entry never returns a Reference");
        };
        let payload = &self.mmap[*offset..*offset + *len];
        let data = if *precompressed || keep_compressed { payload.to_vec() } else { brotli_codec::decompress(payload)? };
        Ok(ArchiveHandle { data, pos: 0 })
    }

    pub fn contains(&self, folder: &str, filename: &str) -> bool {
        self.resolve_entry(folder, filename).is_ok()
    }
}

/// A materialized, file-like view over one opened entry's bytes.
pub struct ArchiveHandle {
    data: Vec<u8>,
    pos: usize,
}

impl ArchiveHandle {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn tell(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let available = &self.data[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        n
    }

    pub fn read_to_end(&mut self) -> Vec<u8> {
        let rest = self.data[self.pos..].to_vec();
        self.pos = self.data.len();
        rest
    }

    /// Reads up to and including the next `\n`, or the remaining bytes at
    /// end of data. Returns `None` once fully consumed.
    pub fn read_line(&mut self) -> Option<Vec<u8>> {
        if self.pos >= self.data.len() {
            return None;
        }
        let rest = &self.data[self.pos..];
        let line_end = rest.iter().position(|&b| b == b'\n').map(|i| i + 1).unwrap_or(rest.len());
        let line = rest[..line_end].to_vec();
        self.pos += line_end;
        Some(line)
    }
}

impl StdRead for ArchiveHandle {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(ArchiveHandle::read(self, buf))
    }
}
