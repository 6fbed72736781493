use packarc::archive::{pack_folder, PackOptions};
use packarc::reader::PackedArchive;
use packarc::ArchiverError;
use std::fs;
use tempfile::tempdir;

#[test]
fn opens_individual_entries_without_extracting_everything() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"alpha contents").unwrap();
    fs::create_dir(src.path().join("sub")).unwrap();
    fs::write(src.path().join("sub/b.txt"), b"beta contents").unwrap();

    let archive_path = tempdir().unwrap().path().join("out.packarc");
    pack_folder(src.path(), &archive_path, PackOptions::default()).unwrap();

    let archive = PackedArchive::open_archive(&archive_path).unwrap();
    let root = src.path().file_name().unwrap().to_str().unwrap();

    let mut a = archive.open(root, "a.txt", false).unwrap();
    assert_eq!(a.read_to_end(), b"alpha contents");

    let mut b = archive.open(&format!("{root}/sub"), "b.txt", false).unwrap();
    assert_eq!(b.read_to_end(), b"beta contents");
}

#[test]
fn seek_and_partial_reads_work_on_an_open_handle() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"0123456789").unwrap();
    let archive_path = tempdir().unwrap().path().join("out.packarc");
    pack_folder(src.path(), &archive_path, PackOptions::default()).unwrap();

    let archive = PackedArchive::open_archive(&archive_path).unwrap();
    let root = src.path().file_name().unwrap().to_str().unwrap();
    let mut handle = archive.open(root, "a.txt", false).unwrap();
    assert_eq!(handle.len(), 10);

    let mut buf = [0u8; 4];
    let n = handle.read(&mut buf);
    assert_eq!(&buf[..n], b"0123");
    assert_eq!(handle.tell(), 4);

    handle.seek(8);
    assert_eq!(handle.read_to_end(), b"89");
}

#[test]
fn open_on_a_nonexistent_entry_is_a_broken_reference() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"x").unwrap();
    let archive_path = tempdir().unwrap().path().join("out.packarc");
    pack_folder(src.path(), &archive_path, PackOptions::default()).unwrap();

    let archive = PackedArchive::open_archive(&archive_path).unwrap();
    let err = archive.open("root", "missing.bin", false).unwrap_err();
    assert!(matches!(err, ArchiverError::BrokenReference(_)));
}
