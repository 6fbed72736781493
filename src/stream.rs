//! # Streaming decoder
//!
//! Turns an arbitrary byte source into a pull-based sequence of
//! [`StreamEvent`]s without requiring the whole archive to be buffered up
//! front (§4.8). Each event corresponds to one folder record; a `Normal`
//! folder's file bodies are fully read and Brotli-decoded before the event
//! is produced, since the format has no per-file streaming decompression
//! -- the only thing the decoder streams incrementally is *which bytes it
//! asks for next*, not the decoded output.
//!
//! The [`ByteSource`] trait decouples the decoder from its transport: a
//! [`Read`] adapter covers files, and a chunk-vector adapter exists for
//! tests that feed the decoder one byte at a time to prove chunking
//! boundaries don't matter.

use crate::brotli_codec;
use crate::varint;
use crate::ArchiverError;
use std::io::Read;

const FOLDER_NORMAL: u8 = 0x00;
const FOLDER_COPY: u8 = 0x01;
const FILE_CONTENT: u8 = 0x00;
const FILE_REFERENCE: u8 = 0x01;

/// Supplies raw bytes to the decoder in whatever chunks the transport
/// happens to deliver them.
pub trait ByteSource {
    /// Returns the next chunk of bytes, or `None` at end of stream.
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ArchiverError>;
}

/// Adapts any [`Read`] into a [`ByteSource`], reading fixed-size chunks.
pub struct ReadByteSource<R: Read> {
    reader: R,
    chunk_size: usize,
}

impl<R: Read> ReadByteSource<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self { reader, chunk_size: chunk_size.max(1) }
    }
}

impl<R: Read> ByteSource for ReadByteSource<R> {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ArchiverError> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = self.reader.read(&mut buf)?;
        if n == 0 {
            Ok(None)
        } else {
            buf.truncate(n);
            Ok(Some(buf))
        }
    }
}

/// A [`ByteSource`] backed by a pre-sliced list of chunks, for exercising
/// the decoder against arbitrary chunk boundaries (including 1-byte
/// chunks) without an async runtime or a real transport.
pub struct VecByteSource {
    chunks: std::collections::VecDeque<Vec<u8>>,
}

impl VecByteSource {
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self { chunks: chunks.into() }
    }
}

impl ByteSource for VecByteSource {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ArchiverError> {
        Ok(self.chunks.pop_front())
    }
}

/// One file within a `NormalFile` event's folder.
#[derive(Debug, Clone)]
pub enum StreamFile {
    Content { filename: String, data: Vec<u8> },
    Reference { filename: String, source_folder: String, source_filename: String },
}

/// One decoded folder record. A file-level `Reference` is carried inside
/// `NormalFile`'s file list rather than as its own event: the wire format
/// only ever emits a reference as one file entry within a folder, never on
/// its own.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    NormalFile { folder: String, files: Vec<StreamFile> },
    FolderCopy { folder: String, source_folder: String },
}

/// Buffers chunks from a [`ByteSource`] and serves fixed-size reads,
/// requesting more chunks as needed. Fails with `ArchiverError::Truncated`
/// if the source runs dry before a read can be satisfied.
struct ChunkBuffer<S: ByteSource> {
    source: S,
    buf: Vec<u8>,
    pos: usize,
    exhausted: bool,
}

impl<S: ByteSource> ChunkBuffer<S> {
    fn new(source: S) -> Self {
        Self { source, buf: Vec::new(), pos: 0, exhausted: false }
    }

    fn fill_to(&mut self, n: usize) -> Result<(), ArchiverError> {
        while self.buf.len() - self.pos < n {
            if self.exhausted {
                return Err(ArchiverError::Truncated("stream ended before a record could be fully read".into()));
            }
            match self.source.next_chunk()? {
                Some(chunk) => {
                    if self.pos > 0 {
                        self.buf.drain(..self.pos);
                        self.pos = 0;
                    }
                    self.buf.extend_from_slice(&chunk);
                }
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    fn has_more(&mut self) -> Result<bool, ArchiverError> {
        if self.pos < self.buf.len() {
            return Ok(true);
        }
        if self.exhausted {
            return Ok(false);
        }
        match self.source.next_chunk()? {
            Some(chunk) => {
                self.buf.extend_from_slice(&chunk);
                Ok(!self.buf[self.pos..].is_empty())
            }
            None => {
                self.exhausted = true;
                Ok(false)
            }
        }
    }

    fn read_u8(&mut self) -> Result<u8, ArchiverError> {
        self.fill_to(1)?;
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, ArchiverError> {
        self.fill_to(n)?;
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(out)
    }

    /// Decodes a varint, growing the buffer one byte at a time since the
    /// length isn't known up front.
    fn read_varint(&mut self) -> Result<u64, ArchiverError> {
        let mut probe_len = 1;
        loop {
            self.fill_to(probe_len)?;
            match varint::decode(&self.buf[self.pos..]) {
                Ok((value, consumed)) => {
                    self.pos += consumed;
                    return Ok(value);
                }
                Err(ArchiverError::Truncated(_)) => {
                    probe_len += 1;
                    if probe_len > 10 {
                        return Err(ArchiverError::Truncated("varint exceeds 10-byte maximum".into()));
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn read_name(&mut self) -> Result<String, ArchiverError> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|e| ArchiverError::Truncated(format!("name is not valid UTF-8: {e}")))
    }
}

/// A pull-based, stateful decoder: call [`StreamDecoder::next_event`]
/// repeatedly until it returns `None`.
pub struct StreamDecoder<S: ByteSource> {
    buf: ChunkBuffer<S>,
}

impl<S: ByteSource> StreamDecoder<S> {
    pub fn new(source: S) -> Self {
        Self { buf: ChunkBuffer::new(source) }
    }

    /// Decodes and returns the next folder record, or `None` at a clean
    /// end of stream (i.e. no bytes remain at a record boundary).
    pub fn next_event(&mut self) -> Result<Option<StreamEvent>, ArchiverError> {
        if !self.buf.has_more()? {
            return Ok(None);
        }

        let tag = self.buf.read_u8()?;
        match tag {
            FOLDER_NORMAL => {
                let folder = self.buf.read_name()?;
                let file_count = self.buf.read_varint()?;
                let mut files = Vec::with_capacity(file_count as usize);
                for _ in 0..file_count {
                    let filename = self.buf.read_name()?;
                    let file_tag = self.buf.read_u8()?;
                    match file_tag {
                        FILE_CONTENT => {
                            let payload_len = self.buf.read_varint()? as usize;
                            let payload = self.buf.read_bytes(payload_len)?;
                            let data = if filename.to_ascii_lowercase().ends_with(".br") {
                                payload
                            } else {
                                brotli_codec::decompress(&payload)?
                            };
                            files.push(StreamFile::Content { filename, data });
                        }
                        FILE_REFERENCE => {
                            let source_folder = self.buf.read_name()?;
                            let source_filename = self.buf.read_name()?;
                            files.push(StreamFile::Reference { filename, source_folder, source_filename });
                        }
                        other => return Err(ArchiverError::Truncated(format!("unknown file tag {other}"))),
                    }
                }
                Ok(Some(StreamEvent::NormalFile { folder, files }))
            }
            FOLDER_COPY => {
                let folder = self.buf.read_name()?;
                let source_folder = self.buf.read_name()?;
                Ok(Some(StreamEvent::FolderCopy { folder, source_folder }))
            }
            other => Err(ArchiverError::Truncated(format!("unknown folder tag {other}"))),
        }
    }
}
