use std::fs;
use std::path::PathBuf;

use super::*;
use crate::classify::FileKind;
use crate::signer::HashOnlyResolver;

fn write_pe_stub(path: &std::path::Path) {
    let mut content = Vec::from(*b"MZ");
    content.resize(128, 0);
    fs::write(path, content).unwrap();
}

fn walk_all(target: &ScanTarget) -> ScanReport {
    DirectoryWalker::new(target, &HashOnlyResolver).collect_report()
}

#[test]
fn discovers_scripts_and_binaries_only() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.bat"), b"@echo off").unwrap();
    write_pe_stub(&dir.path().join("b.exe"));
    // MZ prefix but too short for the binary probe.
    fs::write(dir.path().join("c.dat"), b"MZ12345678").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();

    let report = walk_all(&ScanTarget::new(dir.path(), SafetyMode::Safe));

    assert_eq!(report.files.len(), 2, "expected a.bat and b.exe only");
    let kinds: Vec<(String, FileKind)> = report
        .files
        .iter()
        .map(|f| {
            (
                f.path.file_name().unwrap().to_string_lossy().to_string(),
                f.kind,
            )
        })
        .collect();
    assert!(kinds.contains(&("a.bat".to_string(), FileKind::Script)));
    assert!(kinds.contains(&("b.exe".to_string(), FileKind::Binary)));
    assert!(report.skipped.is_empty());
}

#[test]
fn zero_length_files_are_never_discovered() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("empty.bat"), b"").unwrap();
    fs::write(dir.path().join("empty.msi"), b"").unwrap();

    let report = walk_all(&ScanTarget::new(dir.path(), SafetyMode::Safe));
    assert!(report.files.is_empty());
}

#[test]
fn explicit_safety_mode_labels_every_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("x.cmd"), b"rem").unwrap();

    let safe = walk_all(&ScanTarget::new(dir.path(), SafetyMode::Safe));
    assert_eq!(safe.files[0].safety, Safety::Safe);

    let unsafe_ = walk_all(&ScanTarget::new(dir.path(), SafetyMode::Unsafe));
    assert_eq!(unsafe_.files[0].safety, Safety::Unsafe);
}

#[test]
fn unknown_mode_resolves_safety_from_writable_set() {
    let dir = tempfile::tempdir().unwrap();
    let writable_dir = dir.path().join("dropbox");
    let locked_dir = dir.path().join("locked");
    fs::create_dir(&writable_dir).unwrap();
    fs::create_dir(&locked_dir).unwrap();
    fs::write(writable_dir.join("loose.vbs"), b"wscript").unwrap();
    fs::write(locked_dir.join("pinned.vbs"), b"wscript").unwrap();

    let writable = WritableDirectorySet::from_paths(vec![writable_dir.clone()]);
    let target = ScanTarget::new(dir.path(), SafetyMode::Unknown);
    let report = DirectoryWalker::new(&target, &HashOnlyResolver)
        .with_writable_set(&writable)
        .collect_report();

    let by_name = |name: &str| {
        report
            .files
            .iter()
            .find(|f| f.path.file_name().unwrap() == name)
            .unwrap()
    };
    assert_eq!(by_name("loose.vbs").safety, Safety::Unsafe);
    assert_eq!(by_name("pinned.vbs").safety, Safety::Safe);
}

#[cfg(unix)]
#[test]
fn reparse_points_are_never_entered() {
    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("A");
    fs::create_dir(&real).unwrap();
    write_pe_stub(&real.join("x.exe"));
    std::os::unix::fs::symlink(&real, dir.path().join("B")).unwrap();

    let report = walk_all(&ScanTarget::new(dir.path(), SafetyMode::Safe));

    assert_eq!(report.files.len(), 1);
    assert!(report.files[0].path.starts_with(&real));
}

#[test]
fn names_only_emits_one_hit_per_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.bat"), b"@echo off").unwrap();
    fs::write(dir.path().join("b.cmd"), b"@echo off").unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("c.ps1"), b"Write-Host hi").unwrap();
    let quiet = dir.path().join("quiet");
    fs::create_dir(&quiet).unwrap();
    fs::write(quiet.join("notes.txt"), b"nothing of interest").unwrap();

    let target = ScanTarget::new(dir.path(), SafetyMode::Unsafe);
    let report = DirectoryWalker::new(&target, &HashOnlyResolver)
        .names_only(true)
        .collect_report();

    assert!(report.files.is_empty());
    let mut hit_dirs: Vec<PathBuf> = report.directory_hits.iter().map(|h| h.dir.clone()).collect();
    hit_dirs.sort();
    assert_eq!(hit_dirs, vec![dir.path().to_path_buf(), sub]);
    assert!(report
        .directory_hits
        .iter()
        .all(|h| h.safety == Safety::Unsafe));
}

#[test]
fn cancelled_token_stops_before_any_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.bat"), b"@echo off").unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let target = ScanTarget::new(dir.path(), SafetyMode::Safe);
    let report = DirectoryWalker::new(&target, &HashOnlyResolver)
        .with_cancel_token(cancel)
        .collect_report();

    assert!(report.is_empty());
}

#[test]
fn files_yielded_before_subdirectory_contents() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("top.bat"), b"@echo off").unwrap();
    let sub = dir.path().join("aaa_sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("nested.bat"), b"@echo off").unwrap();

    let target = ScanTarget::new(dir.path(), SafetyMode::Safe);
    let names: Vec<String> = DirectoryWalker::new(&target, &HashOnlyResolver)
        .filter_map(|item| match item {
            WalkItem::File(f) => Some(f.path.file_name().unwrap().to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    assert_eq!(names, vec!["top.bat".to_string(), "nested.bat".to_string()]);
}

#[test]
fn deep_trees_do_not_exhaust_the_stack() {
    let dir = tempfile::tempdir().unwrap();
    let mut leaf = dir.path().to_path_buf();
    for depth in 0..256 {
        leaf = leaf.join(format!("d{}", depth));
    }
    fs::create_dir_all(&leaf).unwrap();
    fs::write(leaf.join("deep.bat"), b"@echo off").unwrap();

    let report = walk_all(&ScanTarget::new(dir.path(), SafetyMode::Safe));
    assert_eq!(report.files.len(), 1);
}

#[test]
fn discovered_file_carries_hash_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("tool.bat"), b"@echo off").unwrap();

    let report = walk_all(&ScanTarget::new(dir.path(), SafetyMode::Safe));
    let file = &report.files[0];

    assert_eq!(file.extension, "bat");
    assert_eq!(file.size, 9);
    assert_eq!(file.parent_dir, dir.path());
    assert!(file.sha256.is_some());
    assert!(file.modified_unix.is_some());
    assert_eq!(file.publisher, None);
}

struct FailingResolver;

impl SignatureResolver for FailingResolver {
    fn resolve(&self, _path: &std::path::Path) -> Result<SignerInfo, String> {
        Err("inspection backend unavailable".to_string())
    }
}

#[test]
fn signature_failure_degrades_to_hash_identity() {
    let dir = tempfile::tempdir().unwrap();
    write_pe_stub(&dir.path().join("tool.exe"));

    let target = ScanTarget::new(dir.path(), SafetyMode::Safe);
    let report = DirectoryWalker::new(&target, &FailingResolver).collect_report();

    assert_eq!(report.files.len(), 1);
    let file = &report.files[0];
    assert_eq!(file.publisher, None);
    assert!(file.sha256.is_some(), "hash identity must survive");
    assert!(report.skipped.is_empty(), "inspection failure is not a skip");
}
