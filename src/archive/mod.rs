//! # Archive writer
//!
//! Serializes `FolderRecord`/`FileRecord` values to the bit-exact wire
//! grammar (§6): every folder is a tag byte followed by its body, every
//! file inside a `Normal` folder is a length-prefixed name followed by its
//! own tag byte and body. No magic bytes, no version, no checksum, no
//! header, no trailer -- the stream of folder records *is* the archive.
//!
//! `pack_folder` ties the hash scanner, duplicate detector and parallel
//! compressor together into the initial, full-dedup pack. `add_folder`
//! reopens an existing archive in append mode and writes a new subtree as
//! plain `Normal` folders, intentionally skipping dedup against content
//! already on disk (§4.6).

use crate::common::{FileRecord, FolderRecord};
use crate::compress::{self, CompressionJob};
use crate::dedup::{self, DedupPlan};
use crate::hash::{self, HashedFolder};
use crate::progress::{top_folders_by_size, StatusLine};
use crate::varint;
use crate::ArchiverError;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

const FOLDER_NORMAL: u8 = 0x00;
const FOLDER_COPY: u8 = 0x01;
const FILE_CONTENT: u8 = 0x00;
const FILE_REFERENCE: u8 = 0x01;

/// Writes folder records to any buffered sink in wire order.
pub struct ArchiveWriter<W: Write> {
    writer: W,
}

impl ArchiveWriter<BufWriter<File>> {
    /// Creates (or truncates) `path` and opens it for a fresh pack.
    pub fn create(path: &Path) -> Result<Self, ArchiverError> {
        let file = File::create(path).map_err(|e| ArchiverError::io(e, path))?;
        Ok(Self { writer: BufWriter::new(file) })
    }

    /// Opens `path` in append mode so new folder records land after
    /// whatever is already there, without touching existing bytes.
    pub fn append(path: &Path) -> Result<Self, ArchiverError> {
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| ArchiverError::io(e, path))?;
        Ok(Self { writer: BufWriter::new(file) })
    }
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_name(&mut self, name: &str) -> Result<(), ArchiverError> {
        varint::write_varint(&mut self.writer, name.len() as u64)?;
        self.writer.write_all(name.as_bytes())?;
        Ok(())
    }

    fn write_file_record(&mut self, record: &FileRecord) -> Result<(), ArchiverError> {
        self.write_name(record.filename())?;
        match record {
            FileRecord::Content { payload, .. } => {
                self.writer.write_all(&[FILE_CONTENT])?;
                varint::write_varint(&mut self.writer, payload.len() as u64)?;
                self.writer.write_all(payload)?;
            }
            FileRecord::Reference { source_folder, source_filename, .. } => {
                self.writer.write_all(&[FILE_REFERENCE])?;
                self.write_name(source_folder)?;
                self.write_name(source_filename)?;
            }
        }
        Ok(())
    }

    /// Writes one folder record, in full, to the stream.
    pub fn write_folder(&mut self, record: &FolderRecord) -> Result<(), ArchiverError> {
        match record {
            FolderRecord::Normal { folder, files } => {
                self.writer.write_all(&[FOLDER_NORMAL])?;
                self.write_name(folder)?;
                varint::write_varint(&mut self.writer, files.len() as u64)?;
                for file in files {
                    self.write_file_record(file)?;
                }
            }
            FolderRecord::Copy { folder, source_folder } => {
                self.writer.write_all(&[FOLDER_COPY])?;
                self.write_name(folder)?;
                self.write_name(source_folder)?;
            }
        }
        Ok(())
    }

    /// Flushes and releases the underlying writer.
    pub fn finish(mut self) -> Result<(), ArchiverError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Tunables shared by `pack_folder` and `add_folder`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackOptions {
    /// Skip folder- and file-level dedup entirely; every file becomes a
    /// `Content` record.
    pub no_dedup: bool,
    /// Worker count for the compression pool (0 = `num_cpus::get()`).
    pub workers: usize,
}

/// Totals gathered while packing, for the CLI's end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct PackStats {
    pub folders_written: u64,
    pub folders_copied: u64,
    pub files_written: u64,
    pub files_referenced: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    /// The five largest folders by uncompressed size, descending, for the
    /// end-of-run summary (§7).
    pub top_folders: Vec<(String, u64)>,
}

fn jobs_for(folders: &[HashedFolder], plan: &DedupPlan) -> Vec<CompressionJob> {
    let mut jobs = Vec::new();
    for folder in folders {
        if plan.is_folder_copy(&folder.rel_path) {
            continue;
        }
        for file in &folder.files {
            if plan.reference_source(&folder.rel_path, &file.filename).is_some() {
                continue;
            }
            jobs.push(CompressionJob {
                folder: folder.rel_path.clone(),
                filename: file.filename.clone(),
                abs_path: file.abs_path.clone(),
            });
        }
    }
    jobs
}

/// Packs `root` into a brand-new archive at `output`, running full
/// folder- and file-level dedup (unless `options.no_dedup`) before
/// compressing and writing every record in scan order.
pub fn pack_folder(root: &Path, output: &Path, options: PackOptions) -> Result<PackStats, ArchiverError> {
    let folders = hash::scan_tree(root)?;
    let plan = if options.no_dedup { DedupPlan::default() } else { dedup::compute_dedup(&folders) };

    let jobs = jobs_for(&folders, &plan);
    let compressed = compress::compress_all(jobs, options.workers)?;
    let mut payload_map: HashMap<(String, String), compress::CompressedFile> =
        compressed.into_iter().map(|c| ((c.folder.clone(), c.filename.clone()), c)).collect();

    let mut writer = ArchiveWriter::create(output)?;
    let mut stats = PackStats::default();
    let mut folder_sizes: Vec<(String, u64)> = Vec::with_capacity(folders.len());
    let mut status = StatusLine::new();
    let total = folders.len();

    for (i, folder) in folders.iter().enumerate() {
        status.update(&format!("packing folder {}/{total}: {}", i + 1, folder.rel_path));
        let folder_bytes: u64 = folder.files.iter().map(|f| f.size).sum();
        folder_sizes.push((folder.rel_path.clone(), folder_bytes));

        if let Some(source) = plan.copy_source(&folder.rel_path) {
            writer.write_folder(&FolderRecord::Copy {
                folder: folder.rel_path.clone(),
                source_folder: source.to_string(),
            })?;
            stats.folders_copied += 1;
            continue;
        }

        let mut file_records = Vec::with_capacity(folder.files.len());
        for file in &folder.files {
            stats.bytes_in += file.size;
            if let Some((source_folder, source_filename)) = plan.reference_source(&folder.rel_path, &file.filename) {
                file_records.push(FileRecord::Reference {
                    filename: file.filename.clone(),
                    source_folder: source_folder.to_string(),
                    source_filename: source_filename.to_string(),
                });
                stats.files_referenced += 1;
            } else {
                let key = (folder.rel_path.clone(), file.filename.clone());
                let compressed = payload_map.remove(&key).ok_or_else(|| {
                    ArchiverError::Other(format!("missing compressed payload for {}/{}", folder.rel_path, file.filename).into())
                })?;
                stats.bytes_out += compressed.payload.len() as u64;
                stats.files_written += 1;
                file_records.push(FileRecord::Content {
                    filename: file.filename.clone(),
                    payload: compressed.payload,
                    precompressed: compressed.precompressed,
                });
            }
        }
        writer.write_folder(&FolderRecord::Normal { folder: folder.rel_path.clone(), files: file_records })?;
        stats.folders_written += 1;
    }
    status.finish();

    writer.finish()?;
    stats.top_folders = top_folders_by_size(&folder_sizes, 5);
    Ok(stats)
}

/// Appends `root` to an existing archive as new `Normal` folders. Never
/// references pre-existing content and never emits a `Copy` against it --
/// the only dedup an appended subtree gets is whatever the caller already
/// applied by packing it with `pack_folder` first.
pub fn add_folder(archive_path: &Path, root: &Path, options: PackOptions) -> Result<PackStats, ArchiverError> {
    let folders = hash::scan_tree(root)?;

    let mut jobs = Vec::new();
    for folder in &folders {
        for file in &folder.files {
            jobs.push(CompressionJob {
                folder: folder.rel_path.clone(),
                filename: file.filename.clone(),
                abs_path: file.abs_path.clone(),
            });
        }
    }
    let compressed = compress::compress_all(jobs, options.workers)?;
    let mut payload_map: HashMap<(String, String), compress::CompressedFile> =
        compressed.into_iter().map(|c| ((c.folder.clone(), c.filename.clone()), c)).collect();

    let mut writer = ArchiveWriter::append(archive_path)?;
    let mut stats = PackStats::default();
    let mut folder_sizes: Vec<(String, u64)> = Vec::with_capacity(folders.len());
    let mut status = StatusLine::new();
    let total = folders.len();

    for (i, folder) in folders.iter().enumerate() {
        status.update(&format!("appending folder {}/{total}: {}", i + 1, folder.rel_path));
        let folder_bytes: u64 = folder.files.iter().map(|f| f.size).sum();
        folder_sizes.push((folder.rel_path.clone(), folder_bytes));

        let mut file_records = Vec::with_capacity(folder.files.len());
        for file in &folder.files {
            stats.bytes_in += file.size;
            let key = (folder.rel_path.clone(), file.filename.clone());
            let compressed = payload_map.remove(&key).ok_or_else(|| {
                ArchiverError::Other(format!("missing compressed payload for {}/{}", folder.rel_path, file.filename).into())
            })?;
            stats.bytes_out += compressed.payload.len() as u64;
            stats.files_written += 1;
            file_records.push(FileRecord::Content {
                filename: file.filename.clone(),
                payload: compressed.payload,
                precompressed: compressed.precompressed,
            });
        }
        writer.write_folder(&FolderRecord::Normal { folder: folder.rel_path.clone(), files: file_records })?;
        stats.folders_written += 1;
    }
    status.finish();

    writer.finish()?;
    stats.top_folders = top_folders_by_size(&folder_sizes, 5);
    Ok(stats)
}
