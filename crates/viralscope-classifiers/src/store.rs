//! On-disk model store with current/archive rotation
//!
//! Layout under the store root:
//!
//! ```text
//! current/{model.bin, metadata.json}
//! archive/<version>/{model.bin, metadata.json}
//! staging-<uuid>/            (transient)
//! ```
//!
//! New content is always written to a staging directory first and swapped
//! in with directory renames, so readers never see a half-written
//! `current/`. The old current artifact is renamed into the archive before
//! the new one takes its place; a crash between the two renames leaves the
//! old artifact archived and no current, never a lost artifact.

use parking_lot::Mutex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::artifact::{validate_version, ArtifactMetadata, ModelArtifact};
use viralscope_core::{Error, Result};

pub const CURRENT_DIR: &str = "current";
pub const ARCHIVE_DIR: &str = "archive";
pub const MODEL_FILE: &str = "model.bin";
pub const METADATA_FILE: &str = "metadata.json";

const STAGING_PREFIX: &str = "staging-";
const REPLACED_SUFFIX: &str = "-replaced";

/// Coarse lifecycle state of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    NoModel,
    CurrentOnly,
    CurrentAndArchive,
    /// Only reachable after an interrupted promotion; rollback recovers it
    ArchiveOnly,
}

/// What `load_current` found
#[derive(Debug, Clone)]
pub enum CurrentArtifact {
    Missing,
    Corrupt(String),
    Ready(ModelArtifact),
}

/// Outcome of a promotion or rollback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionReport {
    /// Version now current
    pub version: String,

    /// Archive entry the previous current artifact was moved to
    pub archived_as: Option<String>,
}

/// An archive entry
#[derive(Debug, Clone)]
pub struct ArchivedVersion {
    /// Archive key (directory name)
    pub key: String,

    /// Parsed metadata, when readable
    pub metadata: Option<ArtifactMetadata>,
}

/// Versioned classifier store rooted at a directory
pub struct ModelStore {
    root: PathBuf,
    min_accuracy: Option<f64>,
    lock: Mutex<()>,
}

impl ModelStore {
    /// Open a store, creating its directories and clearing stale staging areas
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(ARCHIVE_DIR))?;

        let store = Self {
            root,
            min_accuracy: None,
            lock: Mutex::new(()),
        };
        store.clean_staging()?;
        Ok(store)
    }

    /// Require `test_accuracy` of at least `min` for promotion
    pub fn with_min_accuracy(mut self, min: Option<f64>) -> Self {
        self.min_accuracy = min;
        self
    }

    /// Store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn current_dir(&self) -> PathBuf {
        self.root.join(CURRENT_DIR)
    }

    fn archive_dir(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }

    /// Current lifecycle state
    pub fn state(&self) -> Result<StoreState> {
        let has_current = self.current_dir().is_dir();
        let has_archive = !self.archive_keys()?.is_empty();
        Ok(match (has_current, has_archive) {
            (false, false) => StoreState::NoModel,
            (true, false) => StoreState::CurrentOnly,
            (true, true) => StoreState::CurrentAndArchive,
            (false, true) => StoreState::ArchiveOnly,
        })
    }

    /// Install a new artifact as current, archiving the previous one
    pub fn promote(&self, artifact: &ModelArtifact) -> Result<PromotionReport> {
        artifact.metadata.validate()?;
        artifact.verify_checksum()?;
        self.check_accuracy_gate(&artifact.metadata)?;

        let _guard = self.lock.lock();

        let staging = self.stage(|dir| write_artifact(dir, artifact))?;
        let archived_as = self.archive_current(None).map_err(|e| {
            remove_quietly(&staging);
            e
        })?;
        self.install(&staging)?;

        info!(
            "Promoted model {} (archived previous as {:?})",
            artifact.version(),
            archived_as
        );
        Ok(PromotionReport {
            version: artifact.version().to_string(),
            archived_as,
        })
    }

    /// Reinstate an archived version as current.
    ///
    /// The current artifact is archived with a `-replaced` suffix first. The
    /// archive entry being restored is copied, not moved. A key that could
    /// never have been archived is reported as not found.
    pub fn rollback(&self, version: &str) -> Result<PromotionReport> {
        if validate_version(version).is_err() {
            return Err(Error::artifact_not_found(version));
        }

        let _guard = self.lock.lock();

        let source = self.archive_dir().join(version);
        if !source.join(MODEL_FILE).is_file() || !source.join(METADATA_FILE).is_file() {
            return Err(Error::artifact_not_found(version));
        }

        let staging = self.stage(|dir| {
            fs::copy(source.join(MODEL_FILE), dir.join(MODEL_FILE))?;
            fs::copy(source.join(METADATA_FILE), dir.join(METADATA_FILE))?;
            Ok(())
        })?;
        let archived_as = self.archive_current(Some(REPLACED_SUFFIX)).map_err(|e| {
            remove_quietly(&staging);
            e
        })?;
        self.install(&staging)?;

        let restored = read_metadata(&self.current_dir())
            .map(|m| m.version)
            .unwrap_or_else(|_| version.to_string());
        info!("Rolled back to {} (archived previous as {:?})", restored, archived_as);
        Ok(PromotionReport {
            version: restored,
            archived_as,
        })
    }

    /// Read the current artifact
    pub fn load_current(&self) -> CurrentArtifact {
        let _guard = self.lock.lock();

        let dir = self.current_dir();
        if !dir.is_dir() {
            return CurrentArtifact::Missing;
        }

        let metadata = match read_metadata(&dir) {
            Ok(metadata) => metadata,
            Err(e) => return CurrentArtifact::Corrupt(format!("metadata: {}", e)),
        };
        let classifier = match fs::read(dir.join(MODEL_FILE)) {
            Ok(bytes) => bytes,
            Err(e) => return CurrentArtifact::Corrupt(format!("classifier binary: {}", e)),
        };

        let artifact = ModelArtifact {
            metadata,
            classifier,
        };
        if let Err(e) = artifact.verify_checksum() {
            return CurrentArtifact::Corrupt(e.to_string());
        }
        CurrentArtifact::Ready(artifact)
    }

    /// Version of the current artifact, if its metadata is readable
    pub fn current_version(&self) -> Option<String> {
        let raw = self.current_metadata_raw().ok().flatten()?;
        raw.get("version")?.as_str().map(str::to_string)
    }

    /// Current metadata as untyped JSON; `Ok(None)` when there is no current artifact
    pub fn current_metadata_raw(&self) -> Result<Option<serde_json::Value>> {
        let path = self.current_dir().join(METADATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Whether a current classifier binary exists
    pub fn has_current(&self) -> bool {
        self.current_dir().join(MODEL_FILE).is_file()
    }

    /// Archive entries sorted by key
    pub fn list_archive(&self) -> Result<Vec<ArchivedVersion>> {
        Ok(self
            .archive_keys()?
            .into_iter()
            .map(|key| {
                let metadata = read_metadata(&self.archive_dir().join(&key)).ok();
                ArchivedVersion { key, metadata }
            })
            .collect())
    }

    fn archive_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(self.archive_dir())? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn check_accuracy_gate(&self, metadata: &ArtifactMetadata) -> Result<()> {
        let Some(min) = self.min_accuracy else {
            return Ok(());
        };
        match metadata.accuracy() {
            Some(accuracy) if accuracy >= min => Ok(()),
            Some(accuracy) => Err(Error::store(format!(
                "model {} accuracy {:.4} is below the promotion minimum {:.4}",
                metadata.version, accuracy, min
            ))),
            None => Err(Error::store(format!(
                "model {} has no test_accuracy metric and a promotion minimum is set",
                metadata.version
            ))),
        }
    }

    /// Populate a fresh staging directory; removed again if `fill` fails
    fn stage(&self, fill: impl FnOnce(&Path) -> Result<()>) -> Result<PathBuf> {
        let staging = self
            .root
            .join(format!("{}{}", STAGING_PREFIX, Uuid::new_v4()));
        fs::create_dir(&staging)?;
        if let Err(e) = fill(&staging) {
            remove_quietly(&staging);
            return Err(e);
        }
        debug!("Staged artifact in {}", staging.display());
        Ok(staging)
    }

    /// Move `current/` into the archive; returns the archive key used
    fn archive_current(&self, suffix: Option<&str>) -> Result<Option<String>> {
        let current = self.current_dir();
        if !current.is_dir() {
            return Ok(None);
        }

        let base = match read_metadata(&current) {
            Ok(metadata) => metadata.version,
            Err(e) => {
                warn!("Archiving current artifact with unreadable metadata: {}", e);
                format!("unknown-{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
            }
        };
        let base = format!("{}{}", base, suffix.unwrap_or(""));
        let key = self.unique_archive_key(&base);

        fs::rename(&current, self.archive_dir().join(&key))?;
        Ok(Some(key))
    }

    fn unique_archive_key(&self, base: &str) -> String {
        let archive = self.archive_dir();
        if !archive.join(base).exists() {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}-{}", base, n))
            .find(|candidate| !archive.join(candidate).exists())
            .unwrap_or_else(|| format!("{}-{}", base, Uuid::new_v4()))
    }

    fn install(&self, staging: &Path) -> Result<()> {
        fs::rename(staging, self.current_dir()).map_err(|e| {
            warn!(
                "Failed to install staged artifact {}: {}",
                staging.display(),
                e
            );
            Error::from(e)
        })
    }

    fn clean_staging(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(STAGING_PREFIX) {
                warn!("Removing stale staging directory {:?}", name);
                remove_quietly(&entry.path());
            }
        }
        Ok(())
    }
}

fn write_artifact(dir: &Path, artifact: &ModelArtifact) -> Result<()> {
    write_synced(&dir.join(MODEL_FILE), &artifact.classifier)?;
    let metadata = serde_json::to_vec_pretty(&artifact.metadata)?;
    write_synced(&dir.join(METADATA_FILE), &metadata)?;
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn read_metadata(dir: &Path) -> Result<ArtifactMetadata> {
    let bytes = fs::read(dir.join(METADATA_FILE))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path) {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}
