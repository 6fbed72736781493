//! # Bulk unpacker
//!
//! Reads an entire archive into memory and materializes every folder to
//! disk under an output directory (§4.7). A single linear pass builds two
//! maps -- `folder_path -> output dir` and `(folder_path, filename) ->
//! output file` -- so that `Reference` and `Copy` records, which may point
//! at folders/files written earlier in the same pass, resolve without a
//! second scan. A broken reference (pointing at a folder or file that
//! never appeared) is a warning, not a hard failure: the entry is skipped
//! and extraction continues (§7).

use crate::brotli_codec;
use crate::progress::StatusLine;
use crate::varint;
use crate::ArchiverError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const FOLDER_NORMAL: u8 = 0x00;
const FOLDER_COPY: u8 = 0x01;
const FILE_CONTENT: u8 = 0x00;
const FILE_REFERENCE: u8 = 0x01;

/// Totals gathered while extracting, for the CLI's summary line.
#[derive(Debug, Clone, Default)]
pub struct ExtractStats {
    pub folders_written: u64,
    pub files_written: u64,
    pub warnings: Vec<String>,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

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

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ArchiverError> {
        if self.pos + n > self.data.len() {
            return Err(ArchiverError::Truncated(format!("expected {} more bytes", n)));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_name(&mut self) -> Result<String, ArchiverError> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ArchiverError::Truncated(format!("name is not valid UTF-8: {e}")))
    }
}

/// Unpacks every folder record in `archive_path` beneath `output_dir`,
/// creating directories as needed. Returns totals and any warnings issued
/// for broken references.
pub fn extract_archive(archive_path: &Path, output_dir: &Path) -> Result<ExtractStats, ArchiverError> {
    let data = fs::read(archive_path).map_err(|e| ArchiverError::io(e, archive_path))?;
    let mut cursor = Cursor::new(&data);

    let mut folder_dirs: HashMap<String, PathBuf> = HashMap::new();
    let mut file_paths: HashMap<(String, String), PathBuf> = HashMap::new();
    let mut folder_files: HashMap<String, Vec<String>> = HashMap::new();
    let mut stats = ExtractStats::default();
    let mut status = StatusLine::new();

    while !cursor.at_end() {
        let tag = cursor.read_u8()?;
        match tag {
            FOLDER_NORMAL => {
                let folder = cursor.read_name()?;
                status.update(&format!("unpacking folder {}: {folder}", stats.folders_written + 1));
                let dir = output_dir.join(&folder);
                fs::create_dir_all(&dir).map_err(|e| ArchiverError::io(e, &dir))?;

                let file_count = cursor.read_varint()?;
                let mut names = Vec::with_capacity(file_count as usize);
                for _ in 0..file_count {
                    let filename = cursor.read_name()?;
                    let file_tag = cursor.read_u8()?;
                    match file_tag {
                        FILE_CONTENT => {
                            let payload_len = cursor.read_varint()? as usize;
                            let payload = cursor.read_bytes(payload_len)?;
                            let path = dir.join(&filename);
                            let bytes = if filename.to_ascii_lowercase().ends_with(".br") {
                                payload.to_vec()
                            } else {
                                brotli_codec::decompress(payload)?
                            };
                            fs::write(&path, &bytes).map_err(|e| ArchiverError::io(e, &path))?;
                            file_paths.insert((folder.clone(), filename.clone()), path);
                            stats.files_written += 1;
                        }
                        FILE_REFERENCE => {
                            let source_folder = cursor.read_name()?;
                            let source_filename = cursor.read_name()?;
                            let path = dir.join(&filename);
                            match file_paths.get(&(source_folder.clone(), source_filename.clone())) {
                                Some(source_path) => {
                                    fs::copy(source_path, &path).map_err(|e| ArchiverError::io(e, &path))?;
                                    file_paths.insert((folder.clone(), filename.clone()), path);
                                    stats.files_written += 1;
                                }
                                None => {
                                    stats.warnings.push(format!(
                                        "broken reference: {}/{} -> {}/{} not found, skipped",
                                        folder, filename, source_folder, source_filename
                                    ));
                                }
                            }
                        }
                        other => return Err(ArchiverError::Truncated(format!("unknown file tag {other}"))),
                    }
                    names.push(filename);
                }
                folder_files.insert(folder.clone(), names);
                folder_dirs.insert(folder.clone(), dir);
                stats.folders_written += 1;
            }
            FOLDER_COPY => {
                let folder = cursor.read_name()?;
                let source_folder = cursor.read_name()?;
                status.update(&format!("unpacking folder {}: {folder} (copy of {source_folder})", stats.folders_written + 1));
                let dir = output_dir.join(&folder);
                fs::create_dir_all(&dir).map_err(|e| ArchiverError::io(e, &dir))?;

                match folder_dirs.get(&source_folder).cloned() {
                    Some(source_dir) => {
                        let filenames = folder_files.get(&source_folder).cloned().unwrap_or_default();
                        for filename in &filenames {
                            let source_path = source_dir.join(filename);
                            let dest_path = dir.join(filename);
                            fs::copy(&source_path, &dest_path).map_err(|e| ArchiverError::io(e, &dest_path))?;
                            file_paths.insert((folder.clone(), filename.clone()), dest_path);
                            stats.files_written += 1;
                        }
                        folder_files.insert(folder.clone(), filenames);
                        folder_dirs.insert(folder.clone(), dir);
                        stats.folders_written += 1;
                    }
                    None => {
                        stats.warnings.push(format!(
                            "broken reference: folder {} is a copy of {}, which was not found, skipped",
                            folder, source_folder
                        ));
                    }
                }
            }
            other => return Err(ArchiverError::Truncated(format!("unknown folder tag {other}"))),
        }
    }
    status.finish();

    Ok(stats)
}

/// One folder's worth of listed entries, without materializing any file
/// content -- the archive equivalent of the reference archiver's own
/// `list` subcommand.
#[derive(Debug, Clone)]
pub enum ListedFolder {
    Normal { folder: String, files: Vec<ListedFile> },
    Copy { folder: String, source_folder: String },
}

#[derive(Debug, Clone)]
pub struct ListedFile {
    pub filename: String,
    pub kind: ListedFileKind,
}

#[derive(Debug, Clone)]
pub enum ListedFileKind {
    Content { stored_len: u64 },
    Reference { source_folder: String, source_filename: String },
}

/// Walks `archive_path` once, reporting every folder and file record
/// without decompressing or writing anything to disk.
pub fn list_archive(archive_path: &Path) -> Result<Vec<ListedFolder>, ArchiverError> {
    let data = fs::read(archive_path).map_err(|e| ArchiverError::io(e, archive_path))?;
    let mut cursor = Cursor::new(&data);
    let mut folders = Vec::new();

    while !cursor.at_end() {
        let tag = cursor.read_u8()?;
        match tag {
            FOLDER_NORMAL => {
                let folder = cursor.read_name()?;
                let file_count = cursor.read_varint()?;
                let mut files = Vec::with_capacity(file_count as usize);
                for _ in 0..file_count {
                    let filename = cursor.read_name()?;
                    let file_tag = cursor.read_u8()?;
                    let kind = match file_tag {
                        FILE_CONTENT => {
                            let payload_len = cursor.read_varint()? as usize;
                            cursor.read_bytes(payload_len)?;
                            ListedFileKind::Content { stored_len: payload_len as u64 }
                        }
                        FILE_REFERENCE => {
                            let source_folder = cursor.read_name()?;
                            let source_filename = cursor.read_name()?;
                            ListedFileKind::Reference { source_folder, source_filename }
                        }
                        other => return Err(ArchiverError::Truncated(format!("unknown file tag {other}"))),
                    };
                    files.push(ListedFile { filename, kind });
                }
                folders.push(ListedFolder::Normal { folder, files });
            }
            FOLDER_COPY => {
                let folder = cursor.read_name()?;
                let source_folder = cursor.read_name()?;
                folders.push(ListedFolder::Copy { folder, source_folder });
            }
            other => return Err(ArchiverError::Truncated(format!("unknown folder tag {other}"))),
        }
    }

    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{pack_folder, PackOptions};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn round_trips_a_small_tree() {
        let src = tempdir().unwrap();
        fs::write(src.path().join("a.txt"), b"hello").unwrap();
        fs::create_dir(src.path().join("sub")).unwrap();
        fs::write(src.path().join("sub/b.txt"), b"world").unwrap();

        let archive = tempdir().unwrap().path().join("out.packarc");
        pack_folder(src.path(), &archive, PackOptions::default()).unwrap();

        let out = tempdir().unwrap();
        let stats = extract_archive(&archive, out.path()).unwrap();
        assert!(stats.warnings.is_empty());
        let root_name = src.path().file_name().unwrap().to_str().unwrap();
        assert_eq!(fs::read(out.path().join(format!("{root_name}/a.txt"))).unwrap(), b"hello");
    }

    #[test]
    fn folder_copy_materializes_duplicated_files() {
        let src = tempdir().unwrap();
        fs::create_dir(src.path().join("a")).unwrap();
        fs::create_dir(src.path().join("b")).unwrap();
        fs::write(src.path().join("a/x.txt"), b"same").unwrap();
        fs::write(src.path().join("b/x.txt"), b"same").unwrap();

        let archive = tempdir().unwrap().path().join("out.packarc");
        pack_folder(src.path(), &archive, PackOptions::default()).unwrap();

        let out = tempdir().unwrap();
        let stats = extract_archive(&archive, out.path()).unwrap();
        assert!(stats.warnings.is_empty());
        let root_name = src.path().file_name().unwrap().to_str().unwrap();
        assert_eq!(fs::read(out.path().join(format!("{root_name}/a/x.txt"))).unwrap(), b"same");
        assert_eq!(fs::read(out.path().join(format!("{root_name}/b/x.txt"))).unwrap(), b"same");
    }

    #[test]
    fn list_archive_reports_folders_without_writing_anything() {
        let src = tempdir().unwrap();
        fs::write(src.path().join("a.txt"), b"hello").unwrap();

        let archive = tempdir().unwrap().path().join("out.packarc");
        pack_folder(src.path(), &archive, PackOptions::default()).unwrap();

        let folders = list_archive(&archive).unwrap();
        assert_eq!(folders.len(), 1);
        match &folders[0] {
            ListedFolder::Normal { files, .. } => {
                assert_eq!(files.len(), 1);
                assert_eq!(files[0].filename, "a.txt");
            }
            ListedFolder::Copy { .. } => panic!("expected a Normal folder"),
        }
    }
}
