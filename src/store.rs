//! JSON roster persistence.
//!
//! The roster is one document, read and replaced whole. Writers go through
//! a temp file + rename so a crash mid-save never leaves a torn roster.
//! Single-writer discipline is the caller's job (the server serializes
//! ingestion runs).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::record::Roster;

pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the roster. A missing or unreadable file is an empty roster,
    /// not an error — first run has no data file yet.
    pub async fn load(&self) -> Roster {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => return Roster::default(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(roster) => roster,
            Err(error) => {
                warn!(path = %self.path.display(), %error, "Roster file unparsable, starting empty");
                Roster::default()
            }
        }
    }

    /// Replace the persisted roster atomically.
    pub async fn save(&self, roster: &Roster) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let json = serde_json::to_vec_pretty(roster).context("serializing roster")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
