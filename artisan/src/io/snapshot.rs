//! Snapshot persistence: decoded viewport captures written under a
//! per-session directory with stable, sortable file names.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::core::types::Snapshot;
use crate::session::SessionKey;

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open (creating if needed) the snapshot directory for one session.
    pub fn new(root: &Path, key: &SessionKey) -> Result<Self> {
        let dir = root.join(key.as_str());
        fs::create_dir_all(&dir)
            .with_context(|| format!("create snapshot directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the pre-plan capture of the scene as found.
    pub fn save_initial(&self, image_b64: &str) -> Result<PathBuf> {
        let path = self.dir.join("initial_scene.png");
        self.write_png(&path, image_b64)?;
        Ok(path)
    }

    /// Persist one per-step capture. Attempt 0 is the first pass; refinement
    /// captures count up from there, so names sort chronologically.
    pub fn save(&self, step_index: usize, attempt: u32, image_b64: &str) -> Result<Snapshot> {
        let path = self
            .dir
            .join(format!("step_{step_index:02}_attempt_{attempt}.png"));
        self.write_png(&path, image_b64)?;
        Ok(Snapshot {
            step_index,
            attempt,
            path,
        })
    }

    fn write_png(&self, path: &Path, image_b64: &str) -> Result<()> {
        let bytes = STANDARD
            .decode(image_b64.trim())
            .context("decode snapshot base64")?;
        fs::write(path, &bytes).with_context(|| format!("write snapshot {}", path.display()))?;
        debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_uses_stable_step_attempt_names() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store =
            SnapshotStore::new(temp.path(), &SessionKey::derive("lighthouse")).expect("store");

        let snapshot = store.save(3, 1, &STANDARD.encode(b"png-bytes")).expect("save");
        assert!(snapshot.path.ends_with("step_03_attempt_1.png"));
        assert_eq!(fs::read(&snapshot.path).expect("read"), b"png-bytes");
    }

    #[test]
    fn initial_capture_has_fixed_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store =
            SnapshotStore::new(temp.path(), &SessionKey::derive("lighthouse")).expect("store");

        let path = store.save_initial(&STANDARD.encode(b"first")).expect("save");
        assert!(path.ends_with("initial_scene.png"));
        assert_eq!(fs::read(&path).expect("read"), b"first");
    }

    #[test]
    fn invalid_base64_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SnapshotStore::new(temp.path(), &SessionKey::derive("x")).expect("store");
        let err = store.save(0, 0, "not base64!!!").unwrap_err();
        assert!(err.to_string().contains("decode snapshot base64"));
    }

    #[test]
    fn sessions_are_isolated_by_key() {
        let temp = tempfile::tempdir().expect("tempdir");
        let a = SnapshotStore::new(temp.path(), &SessionKey::derive("a")).expect("store");
        let b = SnapshotStore::new(temp.path(), &SessionKey::derive("b")).expect("store");
        assert_ne!(a.dir(), b.dir());
    }
}
