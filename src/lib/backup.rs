// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{BfnetError, ErrorKind};

/// Which snapshot the live file was restored from after a failed apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryOutcome {
    /// Last known-good state before the failed change
    RestoredBackup,
    /// State captured before this host was ever modified by us
    RestoredOriginal,
}

/// Snapshots of one live file:
///  * `<live>.orig`: captured on first touch, never overwritten
///  * `<live>.bak`: captured before every change
///  * `<live>.bad`: the rejected change, captured on failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupChain {
    live: PathBuf,
    original: PathBuf,
    backup: PathBuf,
    bad: PathBuf,
}

impl BackupChain {
    pub const ORIGINAL_SUFFIX: &'static str = ".orig";
    pub const BACKUP_SUFFIX: &'static str = ".bak";
    pub const BAD_SUFFIX: &'static str = ".bad";

    pub fn new(live: &Path) -> Self {
        Self {
            live: live.to_path_buf(),
            original: with_suffix(live, Self::ORIGINAL_SUFFIX),
            backup: with_suffix(live, Self::BACKUP_SUFFIX),
            bad: with_suffix(live, Self::BAD_SUFFIX),
        }
    }

    pub fn original_path(&self) -> &Path {
        &self.original
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn bad_path(&self) -> &Path {
        &self.bad
    }

    /// Copy live file to `original` unless already captured. Return true
    /// when a copy was made.
    pub fn capture_original(&self) -> Result<bool, BfnetError> {
        self.ensure_live_exists()?;
        if self.original.exists() {
            return Ok(false);
        }
        log::info!(
            "Capturing original configuration {} to {}",
            self.live.display(),
            self.original.display()
        );
        copy_file(&self.live, &self.original)?;
        Ok(true)
    }

    /// Run before every change: first-touch capture of `original` and
    /// refresh of `backup`.
    pub fn prepare(&self) -> Result<(), BfnetError> {
        self.capture_original()?;
        log::debug!(
            "Backing up {} to {}",
            self.live.display(),
            self.backup.display()
        );
        copy_file(&self.live, &self.backup)
    }

    /// Tiered recovery after `apply` failed on the live file:
    ///  1. keep the rejected file as `bad`, restore `backup`, apply again
    ///  2. restore `original`, apply again
    ///
    /// When both fail, [ErrorKind::RecoveryFailure] is returned and the live
    /// file is left in the last attempted state.
    pub fn recover<F>(&self, mut apply: F) -> Result<RecoveryOutcome, BfnetError>
    where
        F: FnMut() -> Result<(), BfnetError>,
    {
        log::info!("Reverting configuration {}", self.live.display());
        if let Err(e) = copy_file(&self.live, &self.bad) {
            log::warn!("Failed to keep rejected configuration: {e}");
        }
        let tier1 = copy_file(&self.backup, &self.live).and_then(|_| apply());
        let tier1_err = match tier1 {
            Ok(()) => return Ok(RecoveryOutcome::RestoredBackup),
            Err(e) => e,
        };
        log::warn!("Failed to restore backup configuration: {tier1_err}");

        log::info!("Restoring factory default configuration");
        let tier2 =
            copy_file(&self.original, &self.live).and_then(|_| apply());
        match tier2 {
            Ok(()) => Ok(RecoveryOutcome::RestoredOriginal),
            Err(e) => {
                log::error!(
                    "Failed to restore factory default configuration: {e}"
                );
                Err(BfnetError::new(
                    ErrorKind::RecoveryFailure,
                    format!(
                        "Failed to restore {} from backup ({}) and from \
                         original ({})",
                        self.live.display(),
                        tier1_err.msg(),
                        e.msg()
                    ),
                ))
            }
        }
    }

    fn ensure_live_exists(&self) -> Result<(), BfnetError> {
        if self.live.exists() {
            Ok(())
        } else {
            Err(BfnetError::new(
                ErrorKind::ConfigLoadError,
                format!(
                    "Configuration file {} does not exist",
                    self.live.display()
                ),
            ))
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), BfnetError> {
    std::fs::copy(src, dst).map(|_| ()).map_err(|e| {
        BfnetError::new(
            ErrorKind::ConfigWriteError,
            format!(
                "Failed to copy {} to {}: {e}",
                src.display(),
                dst.display()
            ),
        )
    })
}
