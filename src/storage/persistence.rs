//! Deployment persistence
//!
//! The whole `CustodySystem` is stored as one pretty-printed JSON document.
//! Each save first shifts older generations down the backup chain
//! (`state.json.backup.0` is the newest), then writes through a temp file
//! and renames it into place. Every read re-checks conservation before
//! handing the state back.

use crate::system::CustodySystem;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("No saved deployment at {0:?}")]
    NotFound(PathBuf),
    #[error("Saved deployment is inconsistent: {0}")]
    Corrupt(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".custody_data"),
            state_file: "state.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// On-disk footprint of a deployment
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}

/// Saves and loads one deployment under a data directory
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    fn backup_path(&self, generation: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, generation))
    }

    fn keeps_backups(&self) -> bool {
        self.config.backup_enabled && self.config.max_backups > 0
    }

    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    /// Write the deployment, keeping the previous one as backup 0
    pub fn save(&self, system: &CustodySystem) -> Result<(), StorageError> {
        let path = self.state_path();

        if self.keeps_backups() && path.exists() {
            self.shift_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let temp_path = path.with_extension("tmp");
        write_state(&temp_path, system)?;
        fs::rename(&temp_path, &path)?;

        log::debug!("Saved deployment at position {} to {:?}", system.position(), path);
        Ok(())
    }

    pub fn load(&self) -> Result<CustodySystem, StorageError> {
        read_state(&self.state_path())
    }

    /// Make backup `generation` the current deployment again. The state it
    /// replaces becomes backup 0.
    pub fn restore_backup(&self, generation: usize) -> Result<CustodySystem, StorageError> {
        let system = read_state(&self.backup_path(generation))?;
        self.save(&system)?;

        log::info!(
            "Restored backup {} (position {})",
            generation,
            system.position()
        );
        Ok(system)
    }

    /// Generations present on disk, newest first
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|generation| self.backup_path(*generation).exists())
            .collect()
    }

    /// Remove the deployment and all of its backups, returning how many
    /// files were deleted
    pub fn reset(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        let backups = (0..self.config.max_backups).map(|g| self.backup_path(g));
        for path in std::iter::once(self.state_path()).chain(backups) {
            if path.exists() {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        log::info!("Removed {} file(s) from {:?}", removed, self.config.data_dir);
        Ok(removed)
    }

    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.state_path();
        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }

    /// Move every generation one step older, dropping the oldest
    fn shift_backups(&self) -> Result<(), StorageError> {
        let oldest = self.config.max_backups - 1;
        for generation in (0..=oldest).rev() {
            let path = self.backup_path(generation);
            if !path.exists() {
                continue;
            }
            if generation == oldest {
                fs::remove_file(&path)?;
            } else {
                fs::rename(&path, self.backup_path(generation + 1))?;
            }
        }
        Ok(())
    }
}

fn write_state(path: &Path, system: &CustodySystem) -> Result<(), StorageError> {
    let writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, system)?;
    Ok(())
}

fn read_state(path: &Path) -> Result<CustodySystem, StorageError> {
    if !path.exists() {
        return Err(StorageError::NotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(fs::File::open(path)?);
    let system: CustodySystem = serde_json::from_reader(reader)?;
    system
        .verify()
        .map_err(|e| StorageError::Corrupt(e.to_string()))?;

    Ok(system)
}
