//! # Hash scanner
//!
//! Walks a directory tree depth-first and computes, for every folder
//! encountered: an MD5 digest per regular file (streamed in 64 KiB reads)
//! and an MD5 aggregate digest of the folder itself, built from the
//! concatenation -- in lexicographic filename order -- of each file's
//! UTF-8 name followed by its hex-encoded content hash. Subdirectories do
//! not participate in their parent's signature; the walker visits them as
//! their own folders.

use crate::ignore::should_ignore;
use crate::ArchiverError;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub type Md5Digest = [u8; 16];

#[derive(Debug, Clone)]
pub struct HashedFile {
    pub filename: String,
    pub abs_path: PathBuf,
    pub size: u64,
    pub hash: Md5Digest,
}

#[derive(Debug, Clone)]
pub struct HashedFolder {
    /// Path relative to the packed tree's parent directory; the archive's
    /// opaque folder key.
    pub rel_path: String,
    pub abs_path: PathBuf,
    /// Regular files directly in this folder, lexicographically sorted.
    pub files: Vec<HashedFile>,
    pub folder_hash: Md5Digest,
}

fn to_hex(bytes: &Md5Digest) -> String {
    let mut s = String::with_capacity(32);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

/// Streams a file through MD5 in 64 KiB chunks.
pub fn hash_file(path: &Path) -> Result<Md5Digest, ArchiverError> {
    let mut f = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
    let mut ctx = md5::Context::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf).map_err(|e| ArchiverError::io(e, path))?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(ctx.compute().0)
}

fn hash_folder_signature(files: &[HashedFile]) -> Md5Digest {
    let mut ctx = md5::Context::new();
    for f in files {
        ctx.consume(f.filename.as_bytes());
        ctx.consume(to_hex(&f.hash).as_bytes());
    }
    ctx.compute().0
}

fn path_key(abs_path: &Path, parent: &Path) -> String {
    let rel = abs_path.strip_prefix(parent).unwrap_or(abs_path);
    rel.to_string_lossy().replace('\\', "/")
}

/// Walks `root` depth-first, producing one `HashedFolder` per directory
/// (including `root` itself), each carrying its immediate regular files'
/// content hashes and its own aggregate signature.
pub fn scan_tree(root: &Path) -> Result<Vec<HashedFolder>, ArchiverError> {
    let parent = root.parent().unwrap_or_else(|| Path::new(""));
    let mut folders = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ArchiverError::io(
                e.into_io_error().unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk error")),
                root,
            )
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let abs_path = entry.path().to_path_buf();
        let rel_path = path_key(&abs_path, parent);

        let mut files = Vec::new();
        for child in fs::read_dir(&abs_path).map_err(|e| ArchiverError::io(e, &abs_path))? {
            let child = child.map_err(|e| ArchiverError::io(e, &abs_path))?;
            let file_type = child.file_type().map_err(|e| ArchiverError::io(e, child.path()))?;
            if !file_type.is_file() {
                continue;
            }
            let filename = child.file_name().to_string_lossy().into_owned();
            if should_ignore(&filename) {
                continue;
            }
            let child_path = child.path();
            let size = child.metadata().map_err(|e| ArchiverError::io(e, &child_path))?.len();
            let hash = hash_file(&child_path)?;
            files.push(HashedFile { filename, abs_path: child_path, size, hash });
        }
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        let folder_hash = hash_folder_signature(&files);
        folders.push(HashedFolder { rel_path, abs_path, files, folder_hash });
    }

    Ok(folders)
}
