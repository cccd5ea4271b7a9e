//! Key-value persistence for the best genome and the generation counter.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bevy::log::{info, warn};
use thiserror::Error;

use crate::network::{Genome, NetworkError, NeuralNetwork};

pub const BEST_BRAIN_KEY: &str = "bestBrain";
pub const GENERATION_KEY: &str = "generation";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Io(#[from] io::Error),
    #[error("stored genome is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("stored generation {0:?} is not a number")]
    InvalidGeneration(String),
    #[error("stored genome is incompatible with this network: {0}")]
    Incompatible(#[from] NetworkError),
}

impl StorageError {
    /// The stored data cannot ever be used by this build, as opposed to a transient failure
    pub fn is_incompatible(&self) -> bool {
        matches!(self, StorageError::Incompatible(_))
    }
}

/// String storage addressed by key
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory, created on first write
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// The best genome and generation counter kept in a store
#[derive(Debug, Clone)]
pub struct GenomeArchive<S> {
    store: S,
}

impl<S: KeyValueStore> GenomeArchive<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn save_best(&mut self, brain: &NeuralNetwork) -> Result<(), StorageError> {
        let json = serde_json::to_string(&brain.to_genome())?;
        self.store.set(BEST_BRAIN_KEY, &json)?;
        info!("best genome saved");
        Ok(())
    }

    /// `Ok(None)` when nothing is saved. A genome of another shape is
    /// `StorageError::Incompatible` and should be discarded.
    pub fn load_best(&self, shape: &[usize]) -> Result<Option<NeuralNetwork>, StorageError> {
        let Some(json) = self.store.get(BEST_BRAIN_KEY)? else {
            return Ok(None);
        };
        let genome: Genome = serde_json::from_str(&json)?;
        let brain = NeuralNetwork::from_genome(&genome, shape)?;
        info!("best genome loaded");
        Ok(Some(brain))
    }

    pub fn has_saved_best(&self) -> bool {
        matches!(self.store.get(BEST_BRAIN_KEY), Ok(Some(_)))
    }

    pub fn clear_best(&mut self) -> Result<(), StorageError> {
        self.store.remove(BEST_BRAIN_KEY)
    }

    pub fn save_generation(&mut self, generation: u32) -> Result<(), StorageError> {
        self.store.set(GENERATION_KEY, &generation.to_string())
    }

    /// Defaults to 1 when no counter is stored
    pub fn load_generation(&self) -> Result<u32, StorageError> {
        match self.store.get(GENERATION_KEY)? {
            None => Ok(1),
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(generation) => Ok(generation),
                Err(_) => Err(StorageError::InvalidGeneration(raw)),
            },
        }
    }

    pub fn clear_all(&mut self) -> Result<(), StorageError> {
        self.clear_best()?;
        self.store.remove(GENERATION_KEY)?;
        warn!("saved genome and generation cleared");
        Ok(())
    }
}
