//! Fix version store.
//!
//! Every remediated revision is archived under
//! `<fixed-root>/<scanId>/<baseName>_v<N>.pdf` with a JSON sidecar
//! recording the remote-storage key. Version numbers are strictly
//! monotonic per scan starting at 1. Only the latest version is
//! downloadable unless the caller explicitly overrides.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Remote object storage seam. Keys are idempotent, so re-uploading the
/// same key is safe.
pub trait RemoteStore: Send + Sync {
    /// Upload a local file under `key`; returns the stored remote path.
    fn upload(&self, key: &str, local_path: &Path) -> Result<String>;
}

/// Sidecar schema: `<file>.pdf.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VersionSidecar {
    /// Remote storage path, when mirrored
    pub remote_path: Option<String>,
}

/// One archived revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionEntry {
    /// Revision number, starting at 1
    pub version: u32,
    /// File name (`base_v3.pdf`)
    pub filename: String,
    /// Path relative to the fixed root
    pub relative_path: String,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
    /// Remote storage path, when mirrored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    /// File size in bytes
    pub size: u64,
    /// Modification time of the archived file
    pub created_at: DateTime<Utc>,
}

/// Outcome of a prune run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PruneOutcome {
    /// Number of files removed
    pub removed: usize,
    /// File names removed
    pub removed_files: Vec<String>,
    /// Entries still on disk
    pub remaining_versions: Vec<VersionEntry>,
}

/// On-disk store of remediated revisions.
pub struct FixVersionStore {
    fixed_root: PathBuf,
    remote: Option<Box<dyn RemoteStore>>,
}

lazy_static::lazy_static! {
    static ref VERSION_FILENAME: regex::Regex =
        regex::Regex::new(r"_v(\d+)\.pdf$").expect("version filename regex");
}

impl FixVersionStore {
    /// Store rooted at `fixed_root`, with no remote mirroring.
    pub fn new(fixed_root: impl Into<PathBuf>) -> Self {
        Self {
            fixed_root: fixed_root.into(),
            remote: None,
        }
    }

    /// Attach a remote store; archives then mirror every revision.
    pub fn with_remote(mut self, remote: Box<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    fn scan_dir(&self, scan_id: &str) -> PathBuf {
        self.fixed_root.join(scan_id)
    }

    fn sidecar_path(pdf_path: &Path) -> PathBuf {
        let mut s = pdf_path.as_os_str().to_os_string();
        s.push(".json");
        PathBuf::from(s)
    }

    fn read_sidecar(pdf_path: &Path) -> VersionSidecar {
        let path = Self::sidecar_path(pdf_path);
        match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_default(),
            Err(_) => VersionSidecar::default(),
        }
    }

    fn write_sidecar(pdf_path: &Path, sidecar: &VersionSidecar) -> Result<()> {
        let data = serde_json::to_vec(sidecar)
            .map_err(|e| Error::Internal(format!("sidecar serialization: {}", e)))?;
        std::fs::write(Self::sidecar_path(pdf_path), data)?;
        Ok(())
    }

    /// Sanitize a base name for version files: the filename stem with
    /// path separators and control characters dropped.
    fn version_base(original_filename: Option<&str>, fallback: &str) -> String {
        let candidate = original_filename
            .map(|name| {
                Path::new(name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default()
            })
            .unwrap_or_default();
        let sanitized: String = candidate
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '))
            .collect();
        let trimmed = sanitized.trim().to_string();
        if trimmed.is_empty() {
            fallback.to_string()
        } else {
            trimmed
        }
    }

    /// All archived versions for a scan, sorted ascending by version.
    pub fn get_versioned_files(&self, scan_id: &str) -> Vec<VersionEntry> {
        let dir = self.scan_dir(scan_id);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };

        let mut versions = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let name = path.file_name().map(|n| n.to_string_lossy().to_string());
            let Some(name) = name else { continue };
            let Some(caps) = VERSION_FILENAME.captures(&name) else {
                continue;
            };
            let Ok(version) = caps[1].parse::<u32>() else {
                continue;
            };
            let Ok(meta) = std::fs::metadata(&path) else {
                continue;
            };
            let created_at = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            let sidecar = Self::read_sidecar(&path);
            let relative = path
                .strip_prefix(&self.fixed_root)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| name.clone());
            versions.push(VersionEntry {
                version,
                filename: name,
                relative_path: relative,
                absolute_path: path,
                remote_path: sidecar.remote_path,
                size: meta.len(),
                created_at,
            });
        }
        versions.sort_by_key(|entry| entry.version);
        versions
    }

    /// Archive `source_path` as the next revision of a scan.
    ///
    /// The archive step is atomic with respect to remote mirroring: when
    /// the upload fails, the local copy is removed and the whole call
    /// fails, leaving no partial state.
    pub fn archive_fixed_pdf_version(
        &self,
        scan_id: &str,
        original_filename: Option<&str>,
        source_path: &Path,
    ) -> Result<VersionEntry> {
        if !source_path.exists() {
            return Err(Error::Internal("archive source does not exist".to_string()));
        }
        let dir = self.scan_dir(scan_id);
        std::fs::create_dir_all(&dir)?;

        let existing = self.get_versioned_files(scan_id);
        let next_version = existing.last().map(|e| e.version + 1).unwrap_or(1);
        let base = Self::version_base(original_filename, scan_id);
        let dest_name = format!("{}_v{}.pdf", base, next_version);
        let dest_path = dir.join(&dest_name);

        std::fs::copy(source_path, &dest_path)?;
        let meta = std::fs::metadata(&dest_path)?;

        let remote_path = match &self.remote {
            Some(remote) => {
                let key = format!("fixed/{}/{}", scan_id, dest_name);
                match remote.upload(&key, &dest_path) {
                    Ok(remote_path) => Some(remote_path),
                    Err(err) => {
                        // No partial state: drop the local copy too.
                        let _ = std::fs::remove_file(&dest_path);
                        return Err(Error::RemoteStorageUnavailable(err.to_string()));
                    },
                }
            },
            None => None,
        };

        let sidecar = VersionSidecar {
            remote_path: remote_path.clone(),
        };
        Self::write_sidecar(&dest_path, &sidecar)?;

        let created_at = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(VersionEntry {
            version: next_version,
            filename: dest_name.clone(),
            relative_path: format!("{}/{}", scan_id, dest_name),
            absolute_path: dest_path,
            remote_path,
            size: meta.len(),
            created_at,
        })
    }

    /// Latest entry, or a specific version when requested.
    pub fn get_fixed_version(&self, scan_id: &str, version: Option<u32>) -> Option<VersionEntry> {
        let entries = self.get_versioned_files(scan_id);
        match version {
            None => entries.into_iter().last(),
            Some(v) => entries.into_iter().find(|e| e.version == v),
        }
    }

    /// Resolve a download request, enforcing the latest-only policy.
    ///
    /// Requests for an older version fail with
    /// [`Error::ForbiddenOlderVersion`] unless `allow_download` is set.
    pub fn resolve_download(
        &self,
        scan_id: &str,
        version: Option<u32>,
        allow_download: bool,
    ) -> Result<VersionEntry> {
        let entries = self.get_versioned_files(scan_id);
        let latest = entries
            .last()
            .map(|e| e.version)
            .ok_or_else(|| Error::Internal("no fixed versions exist for scan".to_string()))?;

        let requested = version.unwrap_or(latest);
        if requested != latest && !allow_download {
            return Err(Error::ForbiddenOlderVersion {
                requested,
                latest,
            });
        }
        entries
            .into_iter()
            .find(|e| e.version == requested)
            .ok_or_else(|| Error::Internal(format!("version {} not found", requested)))
    }

    /// Remove all but the newest entry (or everything when
    /// `keep_latest` is false), including sidecars.
    pub fn prune_fixed_versions(&self, scan_id: &str, keep_latest: bool) -> PruneOutcome {
        let entries = self.get_versioned_files(scan_id);
        if entries.is_empty() {
            return PruneOutcome::default();
        }
        let keep = if keep_latest { 1 } else { 0 };
        if keep >= entries.len() {
            return PruneOutcome {
                removed: 0,
                removed_files: Vec::new(),
                remaining_versions: entries,
            };
        }

        let mut removed_files = Vec::new();
        let cutoff = entries.len() - keep;
        for entry in &entries[..cutoff] {
            match std::fs::remove_file(&entry.absolute_path) {
                Ok(()) => {
                    let sidecar = Self::sidecar_path(&entry.absolute_path);
                    let _ = std::fs::remove_file(sidecar);
                    removed_files.push(entry.filename.clone());
                },
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
                Err(err) => {
                    log::warn!("failed to remove fixed version {}: {}", entry.filename, err);
                },
            }
        }

        PruneOutcome {
            removed: removed_files.len(),
            removed_files,
            remaining_versions: self.get_versioned_files(scan_id),
        }
    }
}
