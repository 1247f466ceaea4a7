use homedir_archiver_core::archive::{archive_dir, ArchiveError};
use homedir_archiver_core::checksum::md5_base64;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn populate(dir: &Path) {
    fs::write(dir.join("kept.txt"), b"keep me").unwrap();
    fs::create_dir(dir.join("sub")).unwrap();
    fs::write(dir.join("sub").join("nested.txt"), b"nested").unwrap();
    fs::write(dir.join("SKIPPED.txt"), b"do not archive").unwrap();
}

fn list_members(archive: &Path) -> String {
    let output = Command::new("tar")
        .arg("--list")
        .arg(format!("--file={}", archive.display()))
        .output()
        .expect("tar --list should run");
    assert!(output.status.success(), "tar --list failed");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn staged_archive_contains_contents_and_honours_excludes() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let archive = archive_dir(dir.path(), "alice", &["SKIPPED.txt".to_string()]).unwrap();
    assert_eq!(archive.file_name(), "alice.tar.gz");
    assert!(archive.len().unwrap() > 0);

    let members = list_members(archive.path());
    assert!(members.contains("kept.txt"));
    assert!(members.contains("nested.txt"));
    assert!(!members.contains("SKIPPED.txt"));
}

#[test]
fn archiving_unchanged_content_is_reproducible() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let first = archive_dir(dir.path(), "alice", &[]).unwrap();
    let second = archive_dir(dir.path(), "alice", &[]).unwrap();

    assert_eq!(
        md5_base64(first.path()).unwrap(),
        md5_base64(second.path()).unwrap(),
        "re-archiving unchanged content must yield identical bytes"
    );
}

#[test]
fn missing_source_directory_fails() {
    let result = archive_dir(Path::new("/nonexistent/home/dir"), "ghost", &[]);
    assert!(matches!(result, Err(ArchiveError::Tar { .. })));
}
