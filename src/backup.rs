//! Whole-workspace backup bundles.
//!
//! A bundle is a zip holding `manifest.json`, the document database, the
//! local preference file and every stored object. The manifest records a
//! SHA-256 per entry, and import refuses any entry without a matching one.
//! A restore replaces the database, the preference file and the object
//! folder as a whole, so nothing from before the restore survives it.
//! A bare SQLite file is also accepted on import and restored as the
//! database alone.

use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DB_FILE: &str = "classroom.sqlite3";
const LOCAL_FILE: &str = "local.json";
const OBJECTS_DIR: &str = "objects";
const DB_ENTRY: &str = "db/classroom.sqlite3";
const LOCAL_ENTRY: &str = "local/local.json";
const OBJECTS_PREFIX: &str = "objects/";
const STAGING_DIR: &str = ".restore";
const DB_SIDECARS: [&str; 3] = ["-journal", "-wal", "-shm"];
pub const BUNDLE_FORMAT_V1: &str = "classroom-workspace-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub entry_count: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Files under `dir`, as slash-separated paths relative to it, sorted.
fn collect_files(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    let mut stack = vec![PathBuf::new()];
    while let Some(rel) = stack.pop() {
        let abs = dir.join(&rel);
        for ent in std::fs::read_dir(&abs)
            .with_context(|| format!("failed to list {}", abs.to_string_lossy()))?
        {
            let ent = ent?;
            let child = rel.join(ent.file_name());
            if ent.file_type()?.is_dir() {
                stack.push(child);
            } else {
                let parts: Vec<String> = child
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect();
                out.push(parts.join("/"));
            }
        }
    }
    out.sort();
    Ok(out)
}

pub fn export_workspace_bundle(
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let db_path = workspace_path.join(DB_FILE);
    if !db_path.is_file() {
        return Err(anyhow!(
            "workspace database not found: {}",
            db_path.to_string_lossy()
        ));
    }

    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
    let db_bytes = std::fs::read(&db_path)
        .with_context(|| format!("failed to read database {}", db_path.to_string_lossy()))?;
    entries.push((DB_ENTRY.to_string(), db_bytes));

    let local_path = workspace_path.join(LOCAL_FILE);
    if local_path.is_file() {
        let bytes = std::fs::read(&local_path).with_context(|| {
            format!("failed to read local store {}", local_path.to_string_lossy())
        })?;
        entries.push((LOCAL_ENTRY.to_string(), bytes));
    }

    let objects_root = workspace_path.join(OBJECTS_DIR);
    for rel in collect_files(&objects_root)? {
        let abs = objects_root.join(&rel);
        let bytes = std::fs::read(&abs)
            .with_context(|| format!("failed to read object {}", abs.to_string_lossy()))?;
        entries.push((format!("{}{}", OBJECTS_PREFIX, rel), bytes));
    }

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let checksums: BTreeMap<&str, String> = entries
        .iter()
        .map(|(name, bytes)| (name.as_str(), sha256_hex(bytes)))
        .collect();
    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "sourceWorkspace": workspace_path.to_string_lossy(),
        "sha256": checksums,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (name, bytes) in &entries {
        zip.start_file(name.as_str(), opts)
            .with_context(|| format!("failed to start entry {}", name))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write entry {}", name))?;
    }
    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: entries.len() + 1,
    })
}

/// Write through a temp file so a failed extraction never leaves a
/// half-written target behind.
fn replace_file(dst: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let mut tmp_name = dst.as_os_str().to_owned();
    tmp_name.push(".importing");
    let tmp = PathBuf::from(tmp_name);
    {
        let mut out = File::create(&tmp)
            .with_context(|| format!("failed to create temp file {}", tmp.to_string_lossy()))?;
        out.write_all(bytes)
            .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
        out.flush().context("failed to flush extracted file")?;
    }
    std::fs::rename(&tmp, dst)
        .with_context(|| format!("failed to move extracted file to {}", dst.to_string_lossy()))?;
    Ok(())
}

/// Object entries must stay inside the objects folder.
fn object_target(root: &Path, rel: &str) -> anyhow::Result<PathBuf> {
    let mut out = root.to_path_buf();
    for seg in rel.split('/') {
        if seg.is_empty() || seg == "." || seg == ".." || seg.contains('\\') {
            return Err(anyhow!("unsafe object path in bundle: {}", rel));
        }
        out.push(seg);
    }
    Ok(out)
}

fn remove_path(path: &Path) -> anyhow::Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove {}", path.to_string_lossy()))?;
    } else if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove {}", path.to_string_lossy()))?;
    }
    Ok(())
}

/// Read every entry and check it against the manifest digests.
fn read_verified_entries(
    archive: &mut ZipArchive<File>,
    checksums: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<Vec<(String, Vec<u8>)>> {
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
    for i in 0..archive.len() {
        let mut f = archive.by_index(i).context("failed to read bundle entry")?;
        if f.is_dir() || f.name() == MANIFEST_ENTRY {
            continue;
        }
        let name = f.name().to_string();
        let Some(expected) = checksums.get(&name).and_then(|v| v.as_str()) else {
            return Err(anyhow!("missing checksum for {}", name));
        };
        let mut bytes = Vec::new();
        f.read_to_end(&mut bytes)
            .with_context(|| format!("failed to extract {}", name))?;
        if sha256_hex(&bytes) != expected {
            return Err(anyhow!("checksum mismatch for {}", name));
        }
        entries.push((name, bytes));
    }
    for name in checksums.keys() {
        if !entries.iter().any(|(n, _)| n == name) {
            return Err(anyhow!("bundle missing {}", name));
        }
    }
    Ok(entries)
}

/// Lay the bundle out under `staging` with the workspace's own file names.
fn stage_entries(staging: &Path, entries: &[(String, Vec<u8>)]) -> anyhow::Result<()> {
    let objects_root = staging.join(OBJECTS_DIR);
    std::fs::create_dir_all(&objects_root)
        .with_context(|| format!("failed to create {}", objects_root.to_string_lossy()))?;
    for (name, bytes) in entries {
        let target = match name.as_str() {
            DB_ENTRY => staging.join(DB_FILE),
            LOCAL_ENTRY => staging.join(LOCAL_FILE),
            other => match other.strip_prefix(OBJECTS_PREFIX) {
                Some(rel) => object_target(&objects_root, rel)?,
                None => continue,
            },
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
        std::fs::write(&target, bytes)
            .with_context(|| format!("failed to stage {}", target.to_string_lossy()))?;
    }
    Ok(())
}

/// Replace the workspace's database, preference file and object folder
/// with the staged ones. A part the bundle lacks is removed.
fn swap_in_staged(staging: &Path, workspace_path: &Path) -> anyhow::Result<()> {
    for suffix in DB_SIDECARS {
        remove_path(&workspace_path.join(format!("{}{}", DB_FILE, suffix)))?;
    }
    for name in [DB_FILE, LOCAL_FILE, OBJECTS_DIR] {
        let target = workspace_path.join(name);
        remove_path(&target)?;
        let staged = staging.join(name);
        if staged.exists() {
            std::fs::rename(&staged, &target).with_context(|| {
                format!("failed to move restored {} into place", target.to_string_lossy())
            })?;
        }
    }
    remove_path(staging)
}

pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;

    if !is_zip_file(in_path)? {
        let bytes = std::fs::read(in_path).with_context(|| {
            format!(
                "failed to read legacy sqlite backup {}",
                in_path.to_string_lossy()
            )
        })?;
        replace_file(&workspace_path.join(DB_FILE), &bytes)?;
        return Ok(ImportSummary {
            bundle_format_detected: "legacy-sqlite3".to_string(),
            entry_count: 1,
        });
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }
    let checksums = manifest
        .get("sha256")
        .and_then(|v| v.as_object())
        .ok_or_else(|| anyhow!("manifest.json has no sha256 map"))?;

    // Nothing in the workspace is touched until every entry verifies.
    let entries = read_verified_entries(&mut archive, checksums)?;
    if !entries.iter().any(|(n, _)| n == DB_ENTRY) {
        return Err(anyhow!("bundle missing {}", DB_ENTRY));
    }

    let staging = workspace_path.join(STAGING_DIR);
    remove_path(&staging)?;
    if let Err(e) = stage_entries(&staging, &entries) {
        let _ = remove_path(&staging);
        return Err(e);
    }
    swap_in_staged(&staging, workspace_path)?;

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        entry_count: entries.len(),
    })
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
