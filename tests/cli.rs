use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn pack_list_unpack_cycle() -> Result<(), Box<dyn std::error::Error>> {
    let source_dir = tempdir()?;
    let file1_path = source_dir.path().join("file1.txt");
    let file2_path = source_dir.path().join("file2.log");
    let nested_dir = source_dir.path().join("nested");
    fs::create_dir(&nested_dir)?;
    let nested_file_path = nested_dir.join("nested_file.dat");

    let mut file1 = fs::File::create(&file1_path)?;
    writeln!(file1, "Hello, this is the first file.")?;
    let mut file2 = fs::File::create(&file2_path)?;
    writeln!(file2, "Some log data here.")?;
    let mut nested_file = fs::File::create(&nested_file_path)?;
    nested_file.write_all(&[0, 1, 2, 3, 4, 5])?;

    let archive_dir = tempdir()?;
    let archive_path = archive_dir.path().join("test.packarc");

    Command::cargo_bin("packarc")?.arg("pack").arg(source_dir.path()).arg(&archive_path).assert().success();
    assert!(archive_path.exists());

    Command::cargo_bin("packarc")?.arg("list").arg(&archive_path).assert().success().stdout(
        predicate::str::contains("file1.txt")
            .and(predicate::str::contains("file2.log"))
            .and(predicate::str::contains("nested_file.dat")),
    );

    let extract_dir = tempdir()?;
    Command::cargo_bin("packarc")?.arg("unpack").arg(&archive_path).arg(extract_dir.path()).assert().success();

    let root_name = source_dir.path().file_name().unwrap().to_str().unwrap();
    let extracted_file1 = fs::read(extract_dir.path().join(format!("{root_name}/file1.txt")))?;
    assert_eq!(extracted_file1, fs::read(&file1_path)?);
    let extracted_nested = fs::read(extract_dir.path().join(format!("{root_name}/nested/nested_file.dat")))?;
    assert_eq!(extracted_nested, fs::read(&nested_file_path)?);

    Ok(())
}

#[test]
fn add_appends_a_second_folder() -> Result<(), Box<dyn std::error::Error>> {
    let src1 = tempdir()?;
    fs::write(src1.path().join("one.txt"), b"one")?;
    let archive_dir = tempdir()?;
    let archive_path = archive_dir.path().join("test.packarc");
    Command::cargo_bin("packarc")?.arg("pack").arg(src1.path()).arg(&archive_path).assert().success();

    let src2 = tempdir()?;
    fs::write(src2.path().join("two.txt"), b"two")?;
    Command::cargo_bin("packarc")?.arg("add").arg(&archive_path).arg(src2.path()).assert().success();

    let extract_dir = tempdir()?;
    Command::cargo_bin("packarc")?.arg("unpack").arg(&archive_path).arg(extract_dir.path()).assert().success();

    let root1 = src1.path().file_name().unwrap().to_str().unwrap();
    let root2 = src2.path().file_name().unwrap().to_str().unwrap();
    assert_eq!(fs::read(extract_dir.path().join(format!("{root1}/one.txt")))?, b"one");
    assert_eq!(fs::read(extract_dir.path().join(format!("{root2}/two.txt")))?, b"two");

    Ok(())
}

#[test]
fn usage_error_on_missing_archive_exits_nonzero() {
    Command::cargo_bin("packarc").unwrap().arg("unpack").arg("/no/such/archive.packarc").arg("/tmp/out").assert().failure();
}
