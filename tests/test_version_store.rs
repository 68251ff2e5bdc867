//! Version store properties over the public API: monotonic contiguous
//! version numbers and the latest-only download policy.

use pdf_a11y::error::Error;
use pdf_a11y::versioning::FixVersionStore;
use std::path::Path;

fn write_payload(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"%PDF-1.7 payload").unwrap();
    path
}

#[test]
fn test_versions_contiguous_across_archives_and_prunes() {
    let root = tempfile::tempdir().unwrap();
    let src_dir = tempfile::tempdir().unwrap();
    let source = write_payload(src_dir.path(), "doc.pdf");
    let store = FixVersionStore::new(root.path());

    let mut returned = Vec::new();
    for _ in 0..4 {
        let entry = store
            .archive_fixed_pdf_version("vs-scan", Some("doc.pdf"), &source)
            .unwrap();
        returned.push(entry.version);
    }
    assert_eq!(returned, vec![1, 2, 3, 4]);

    // Pruning keeps the newest; the next archive continues from it.
    let outcome = store.prune_fixed_versions("vs-scan", true);
    assert_eq!(outcome.removed, 3);
    let next = store
        .archive_fixed_pdf_version("vs-scan", Some("doc.pdf"), &source)
        .unwrap();
    assert_eq!(next.version, 5);
}

#[test]
fn test_download_requires_latest_unless_overridden() {
    let root = tempfile::tempdir().unwrap();
    let src_dir = tempfile::tempdir().unwrap();
    let source = write_payload(src_dir.path(), "doc.pdf");
    let store = FixVersionStore::new(root.path());

    store
        .archive_fixed_pdf_version("dl-scan", Some("doc.pdf"), &source)
        .unwrap();
    store
        .archive_fixed_pdf_version("dl-scan", Some("doc.pdf"), &source)
        .unwrap();
    store
        .archive_fixed_pdf_version("dl-scan", Some("doc.pdf"), &source)
        .unwrap();

    for version in 1..=3u32 {
        let result = store.resolve_download("dl-scan", Some(version), false);
        if version == 3 {
            assert_eq!(result.unwrap().version, 3);
        } else {
            assert!(matches!(
                result,
                Err(Error::ForbiddenOlderVersion { requested, latest: 3 }) if requested == version
            ));
        }
        // With the override every stored version is reachable.
        assert_eq!(
            store
                .resolve_download("dl-scan", Some(version), true)
                .unwrap()
                .version,
            version
        );
    }
}

#[test]
fn test_scans_are_isolated() {
    let root = tempfile::tempdir().unwrap();
    let src_dir = tempfile::tempdir().unwrap();
    let source = write_payload(src_dir.path(), "doc.pdf");
    let store = FixVersionStore::new(root.path());

    store
        .archive_fixed_pdf_version("scan-one", Some("doc.pdf"), &source)
        .unwrap();
    let entry = store
        .archive_fixed_pdf_version("scan-two", Some("doc.pdf"), &source)
        .unwrap();

    assert_eq!(entry.version, 1, "version numbering is per scan");
    assert_eq!(store.get_versioned_files("scan-one").len(), 1);
    assert_eq!(store.get_versioned_files("scan-two").len(), 1);
    assert!(entry.relative_path.starts_with("scan-two/"));
}
