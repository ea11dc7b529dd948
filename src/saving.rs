use chrono::Utc;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

use crate::dataset::{Dataset, StoredDataset};

const RECORD_EXTENSION: &str = "json.gz";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored record is malformed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("record store lock poisoned")]
    Poisoned,
}

/// Durable storage for parsed uploads
///
/// One record is created per successful upload. Records are never updated
/// or deleted.
pub trait DatasetStore: Send + Sync {
    /// Persist a dataset, assigning its identifier and creation time
    fn insert(&self, dataset: Dataset) -> Result<StoredDataset, StoreError>;

    /// Fetch a record by identifier. Unknown identifiers yield `Ok(None)`.
    fn get(&self, id: &str) -> Result<Option<StoredDataset>, StoreError>;
}

fn new_record(id: Uuid, dataset: Dataset) -> StoredDataset {
    StoredDataset {
        id: id.simple().to_string(),
        created_at: Utc::now(),
        dataset,
    }
}

/// Store that keeps each record as a gzip-compressed JSON document on disk
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().join("files");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}", id.simple(), RECORD_EXTENSION))
    }
}

impl DatasetStore for FileStore {
    fn insert(&self, dataset: Dataset) -> Result<StoredDataset, StoreError> {
        let id = Uuid::new_v4();
        let record = new_record(id, dataset);

        let file = File::create(self.record_path(&id))?;
        let mut writer = BufWriter::new(GzEncoder::new(file, Compression::default()));
        serde_json::to_writer(&mut writer, &record)?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())?
            .finish()?;

        Ok(record)
    }

    fn get(&self, id: &str) -> Result<Option<StoredDataset>, StoreError> {
        // Anything that is not a uuid cannot name a record, and must not reach the filesystem
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let path = self.record_path(&id);
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(GzDecoder::new(File::open(path)?));
        Ok(Some(serde_json::from_reader(reader)?))
    }
}

/// Process-local store, used when no durable directory is wanted
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredDataset>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatasetStore for MemoryStore {
    fn insert(&self, dataset: Dataset) -> Result<StoredDataset, StoreError> {
        let record = new_record(Uuid::new_v4(), dataset);
        self.records
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .push(record.clone());
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<Option<StoredDataset>, StoreError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let id = id.simple().to_string();

        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.iter().find(|record| record.id == id).cloned())
    }
}
