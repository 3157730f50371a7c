#[path = "../src/backup.rs"]
mod backup;

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("classroom-backup-src");
    let workspace2 = temp_dir("classroom-backup-dst");
    let out_dir = temp_dir("classroom-backup-out");

    let db_bytes = b"sqlite-test-payload";
    std::fs::write(workspace.join("classroom.sqlite3"), db_bytes).expect("write source db");
    let local_bytes = br#"{"siteSettings":"{}"}"#;
    std::fs::write(workspace.join("local.json"), local_bytes).expect("write local store");
    let object_dir = workspace.join("objects/prim1/curriculum/arabic");
    std::fs::create_dir_all(&object_dir).expect("create object dir");
    std::fs::write(object_dir.join("lesson.pdf"), b"%PDF-1.4").expect("write object");

    let bundle_path = out_dir.join("workspace.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 4);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    let manifest: serde_json::Value = serde_json::from_str(&manifest).expect("manifest json");
    assert_eq!(manifest["format"], backup::BUNDLE_FORMAT_V1);
    assert_eq!(
        manifest["sha256"]["db/classroom.sqlite3"],
        format!("{:x}", Sha256::digest(db_bytes))
    );
    archive
        .by_name("objects/prim1/curriculum/arabic/lesson.pdf")
        .expect("object entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);
    assert_eq!(import.entry_count, 3);

    let restored = std::fs::read(workspace2.join("classroom.sqlite3")).expect("read restored db");
    assert_eq!(restored, db_bytes);
    let restored = std::fs::read(workspace2.join("local.json")).expect("read restored local");
    assert_eq!(restored, local_bytes);
    let restored = std::fs::read(workspace2.join("objects/prim1/curriculum/arabic/lesson.pdf"))
        .expect("read restored object");
    assert_eq!(restored, b"%PDF-1.4");

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_entry_fails_checksum() {
    let out_dir = temp_dir("classroom-backup-tampered");
    let workspace = temp_dir("classroom-backup-tampered-dst");

    let bundle_path = out_dir.join("tampered.zip");
    {
        let f = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(f);
        let opts = zip::write::FileOptions::default();
        let manifest = serde_json::json!({
            "format": backup::BUNDLE_FORMAT_V1,
            "version": 1,
            "sha256": { "db/classroom.sqlite3": format!("{:x}", Sha256::digest(b"original")) },
        });
        zip.start_file("manifest.json", opts).expect("manifest entry");
        zip.write_all(manifest.to_string().as_bytes()).expect("write manifest");
        zip.start_file("db/classroom.sqlite3", opts).expect("db entry");
        zip.write_all(b"changed").expect("write db");
        zip.finish().expect("finish zip");
    }

    let e = backup::import_workspace_bundle(&bundle_path, &workspace).expect_err("checksum");
    assert!(e.to_string().contains("checksum mismatch"));
    assert!(!workspace.join("classroom.sqlite3").exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

fn write_bundle(path: &std::path::Path, manifest: serde_json::Value, entries: &[(&str, &[u8])]) {
    let f = File::create(path).expect("create bundle");
    let mut zip = zip::ZipWriter::new(f);
    let opts = zip::write::FileOptions::default();
    zip.start_file("manifest.json", opts).expect("manifest entry");
    zip.write_all(manifest.to_string().as_bytes()).expect("write manifest");
    for (name, bytes) in entries {
        zip.start_file(*name, opts).expect("entry");
        zip.write_all(bytes).expect("write entry");
    }
    zip.finish().expect("finish zip");
}

#[test]
fn entries_without_a_digest_are_rejected() {
    let out_dir = temp_dir("classroom-backup-undigested");
    let workspace = temp_dir("classroom-backup-undigested-dst");
    let db: &[u8] = b"db";
    let object: &[u8] = b"smuggled";

    let partial = out_dir.join("partial.zip");
    write_bundle(
        &partial,
        serde_json::json!({
            "format": backup::BUNDLE_FORMAT_V1,
            "version": 1,
            "sha256": { "db/classroom.sqlite3": format!("{:x}", Sha256::digest(db)) },
        }),
        &[("db/classroom.sqlite3", db), ("objects/prim1/x.pdf", object)],
    );
    let e = backup::import_workspace_bundle(&partial, &workspace).expect_err("undigested entry");
    assert!(e.to_string().contains("missing checksum for objects/prim1/x.pdf"));

    let bare = out_dir.join("bare.zip");
    write_bundle(
        &bare,
        serde_json::json!({ "format": backup::BUNDLE_FORMAT_V1, "version": 1 }),
        &[("db/classroom.sqlite3", db)],
    );
    let e = backup::import_workspace_bundle(&bare, &workspace).expect_err("no digest map");
    assert!(e.to_string().contains("no sha256 map"));

    assert!(!workspace.join("classroom.sqlite3").exists());
    assert!(!workspace.join("objects/prim1/x.pdf").exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn restore_replaces_local_store_and_objects() {
    let fresh = temp_dir("classroom-backup-fresh");
    let target = temp_dir("classroom-backup-modified");
    let out_dir = temp_dir("classroom-backup-replace-out");

    std::fs::write(fresh.join("classroom.sqlite3"), b"fresh-db").expect("write fresh db");
    let bundle_path = out_dir.join("fresh.zip");
    backup::export_workspace_bundle(&fresh, &bundle_path).expect("export fresh workspace");

    std::fs::write(target.join("classroom.sqlite3"), b"modified-db").expect("write db");
    std::fs::write(target.join("local.json"), br#"{"siteSettings":"{\"theme\":\"dark\"}"}"#)
        .expect("write local store");
    let stale = target.join("objects/prim2/curriculum/math/old.pdf");
    std::fs::create_dir_all(stale.parent().expect("parent")).expect("create object dir");
    std::fs::write(&stale, b"%PDF-1.4").expect("write stale object");

    let import = backup::import_workspace_bundle(&bundle_path, &target).expect("import bundle");
    assert_eq!(import.entry_count, 1);

    assert_eq!(std::fs::read(target.join("classroom.sqlite3")).expect("db"), b"fresh-db");
    assert!(!target.join("local.json").exists());
    assert!(!stale.exists());
    assert!(!target.join(".restore").exists());

    let _ = std::fs::remove_dir_all(fresh);
    let _ = std::fs::remove_dir_all(target);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn legacy_sqlite_import_is_supported() {
    let out_dir = temp_dir("classroom-backup-legacy");
    let workspace = temp_dir("classroom-backup-legacy-dst");

    let legacy_file = out_dir.join("legacy.sqlite3");
    let bytes = b"legacy-sqlite-copy";
    std::fs::write(&legacy_file, bytes).expect("write legacy sqlite file");

    let import =
        backup::import_workspace_bundle(&legacy_file, &workspace).expect("import legacy sqlite");
    assert_eq!(import.bundle_format_detected, "legacy-sqlite3");

    let restored = std::fs::read(workspace.join("classroom.sqlite3")).expect("read restored sqlite");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}
