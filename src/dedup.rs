//! # Duplicate detector
//!
//! Two-level dedup over a set of scanned, hashed folders (§4.4):
//!
//! 1. **Folder dedup** -- in the same order the writer will emit folders
//!    (`hash::scan_tree`'s depth-first walk), a folder whose aggregate hash
//!    and `(filename -> file hash)` mapping match an earlier folder becomes
//!    a `Copy` of it.
//! 2. **File dedup** -- for every content hash shared by two or more files,
//!    the first occurrence in that same walk order not under a `Copy`
//!    folder becomes the source; later occurrences are candidate
//!    `Reference`s, admitted only when strictly smaller on the wire than
//!    the equivalent `Content` record.
//!
//! "Earlier" here must agree with the order `archive::pack_folder` actually
//! writes folders in, or a `Reference`/`Copy` can point at a record the
//! writer hasn't emitted yet (a forward reference, which violates §3's
//! invariant 4 and makes the entry unresolvable on unpack). Lexicographic
//! path order is *not* always the same as depth-first walk order -- a
//! sibling name containing a byte below `/` (0x2F), such as `-`, sorts
//! before its parent's other children lexicographically while the walker
//! still visits it after them -- so dedup must key off scan order, not a
//! re-sort by path.

use crate::hash::{HashedFile, HashedFolder};
use crate::varint::encoded_len;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DedupPlan {
    /// folder path -> source folder path, for folders emitted as `Copy`.
    pub folder_copy_of: HashMap<String, String>,
    /// (folder, filename) -> (source folder, source filename), for files
    /// emitted as `Reference`.
    pub file_reference: HashMap<(String, String), (String, String)>,
}

impl DedupPlan {
    pub fn is_folder_copy(&self, folder: &str) -> bool {
        self.folder_copy_of.contains_key(folder)
    }

    pub fn copy_source(&self, folder: &str) -> Option<&str> {
        self.folder_copy_of.get(folder).map(String::as_str)
    }

    pub fn reference_source(&self, folder: &str, filename: &str) -> Option<(&str, &str)> {
        self.file_reference
            .get(&(folder.to_string(), filename.to_string()))
            .map(|(f, n)| (f.as_str(), n.as_str()))
    }
}

fn same_mapping(a: &[HashedFile], b: &[HashedFile]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.filename == y.filename && x.hash == y.hash)
}

/// Wire size of a `Reference` file body for the given source key lengths.
fn reference_size(src_folder: &str, src_filename: &str) -> u64 {
    1 + encoded_len(src_folder.len() as u64) as u64
        + src_folder.len() as u64
        + encoded_len(src_filename.len() as u64) as u64
        + src_filename.len() as u64
}

/// Wire size of a `Content` file body for an uncompressed payload of
/// `file_size` bytes. Admission intentionally compares against the
/// *uncompressed* size (§4.4, §9 open question) because it runs before
/// compression.
fn content_size(file_size: u64) -> u64 {
    1 + encoded_len(file_size) as u64 + file_size
}

pub fn compute_dedup(folders: &[HashedFolder]) -> DedupPlan {
    // `folders` already arrives in `hash::scan_tree`'s depth-first walk
    // order -- the same order `archive::pack_folder` writes them in -- so
    // "earlier" below is simply "earlier in this slice". Do not re-sort by
    // path: see the module doc comment for why that would admit forward
    // references.
    let mut plan = DedupPlan::default();

    // -- Folder dedup --
    let mut seen: Vec<&HashedFolder> = Vec::new();
    for folder in folders {
        let source = seen
            .iter()
            .find(|s| s.folder_hash == folder.folder_hash && same_mapping(&s.files, &folder.files));
        if let Some(source) = source {
            plan.folder_copy_of.insert(folder.rel_path.clone(), source.rel_path.clone());
        } else {
            seen.push(folder);
        }
    }

    // -- File dedup --
    // Each hash's occurrence list is built by walking `folders` in order and
    // each folder's own `files` in their already-lexicographic order (see
    // `hash::scan_tree`), which is exactly the order the writer visits them
    // in -- so the vector itself is already in "earlier first" order with no
    // further sorting needed.
    let mut occurrences_by_hash: HashMap<[u8; 16], Vec<(&str, &str, u64)>> = HashMap::new();
    for folder in folders {
        for file in &folder.files {
            occurrences_by_hash
                .entry(file.hash)
                .or_default()
                .push((folder.rel_path.as_str(), file.filename.as_str(), file.size));
        }
    }

    for occurrences in occurrences_by_hash.into_values() {
        if occurrences.len() < 2 {
            continue;
        }

        let source = occurrences
            .iter()
            .find(|(folder, _, _)| !plan.is_folder_copy(folder))
            .copied();
        let Some((src_folder, src_filename, _)) = source else { continue };

        for (folder, filename, size) in &occurrences {
            if (*folder, *filename) == (src_folder, src_filename) {
                continue;
            }
            if plan.is_folder_copy(folder) {
                continue;
            }
            if reference_size(src_folder, src_filename) < content_size(*size) {
                plan.file_reference.insert(
                    (folder.to_string(), filename.to_string()),
                    (src_folder.to_string(), src_filename.to_string()),
                );
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::scan_tree;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn large_duplicate_file_is_referenced() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        let big = vec![0xFFu8; 1024 * 1024];
        fs::write(dir.path().join("a/big.bin"), &big).unwrap();
        fs::write(dir.path().join("b/big.bin"), &big).unwrap();

        let folders = scan_tree(dir.path()).unwrap();
        let plan = compute_dedup(&folders);
        let a_rel = folders.iter().find(|f| f.rel_path.ends_with('a')).unwrap().rel_path.clone();
        let b_rel = folders.iter().find(|f| f.rel_path.ends_with('b')).unwrap().rel_path.clone();
        assert_eq!(plan.reference_source(&b_rel, "big.bin"), Some((a_rel.as_str(), "big.bin")));
    }

    #[test]
    fn tiny_duplicate_file_is_not_referenced() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a/q"), [0u8]).unwrap();
        fs::write(dir.path().join("b/q"), [0u8]).unwrap();

        let folders = scan_tree(dir.path()).unwrap();
        let plan = compute_dedup(&folders);
        let b_rel = folders.iter().find(|f| f.rel_path.ends_with("b")).unwrap().rel_path.clone();
        assert!(plan.reference_source(&b_rel, "q").is_none());
    }

    #[test]
    fn reference_source_agrees_with_depth_first_write_order_even_when_lexicographic_order_disagrees() {
        // "assets-backup" sorts *before* "assets/img" lexicographically by full
        // path (`-` < `/`), but the depth-first walk still writes `assets`'s
        // subtree (and so `assets/img`) before it reaches the sibling
        // `assets-backup`. The reference must point at whichever one the
        // writer emits first, or it becomes an unresolvable forward reference.
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("web/assets/img")).unwrap();
        fs::create_dir_all(dir.path().join("web/assets-backup")).unwrap();
        let big = vec![0x5Au8; 4096];
        fs::write(dir.path().join("web/assets/img/big.bin"), &big).unwrap();
        fs::write(dir.path().join("web/assets-backup/big.bin"), &big).unwrap();

        let folders = scan_tree(dir.path()).unwrap();
        let img_rel = folders.iter().find(|f| f.rel_path.ends_with("assets/img")).unwrap().rel_path.clone();
        let backup_rel = folders.iter().find(|f| f.rel_path.ends_with("assets-backup")).unwrap().rel_path.clone();
        let img_index = folders.iter().position(|f| f.rel_path == img_rel).unwrap();
        let backup_index = folders.iter().position(|f| f.rel_path == backup_rel).unwrap();
        assert!(img_index < backup_index, "the walk is expected to visit assets/img before assets-backup");

        let plan = compute_dedup(&folders);
        assert_eq!(
            plan.reference_source(&backup_rel, "big.bin"),
            Some((img_rel.as_str(), "big.bin")),
            "the later-written folder must reference the earlier-written one, never the reverse"
        );
        assert!(plan.reference_source(&img_rel, "big.bin").is_none(), "the earlier-written file must stay a Content record");
    }

    #[test]
    fn identical_folders_produce_a_copy() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a/x.txt"), b"same").unwrap();
        fs::write(dir.path().join("a/y.txt"), b"same2").unwrap();
        fs::write(dir.path().join("b/x.txt"), b"same").unwrap();
        fs::write(dir.path().join("b/y.txt"), b"same2").unwrap();

        let folders = scan_tree(dir.path()).unwrap();
        let plan = compute_dedup(&folders);
        let a_rel = folders.iter().find(|f| f.rel_path.ends_with('a') && !f.rel_path.ends_with("ba")).unwrap().rel_path.clone();
        let b_rel = folders.iter().find(|f| f.rel_path.ends_with('b')).unwrap().rel_path.clone();
        assert_eq!(plan.copy_source(&b_rel), Some(a_rel.as_str()));
    }
}
