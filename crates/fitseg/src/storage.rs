//! Persistence of the three collections: segment definitions, activities and
//! attempts.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::StorageError;
use crate::models::{Activity, Attempt, SegmentDefinition};

pub const DEFINITIONS_FILE: &str = "segment_definitions.json";
pub const ACTIVITIES_FILE: &str = "activities.json";
pub const ATTEMPTS_FILE: &str = "segments.json";

pub trait Repository {
    fn load_segment_definitions(&self) -> Result<Vec<SegmentDefinition>, StorageError>;
    fn load_activities(&self) -> Result<Vec<Activity>, StorageError>;
    fn load_attempts(&self) -> Result<Vec<Attempt>, StorageError>;
    fn save_segment_definitions(
        &self,
        definitions: &[SegmentDefinition],
    ) -> Result<(), StorageError>;
    fn save_activities(&self, activities: &[Activity]) -> Result<(), StorageError>;
    fn save_attempts(&self, attempts: &[Attempt]) -> Result<(), StorageError>;
}

/// Pretty printed JSON arrays in one directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

impl Repository for JsonStore {
    fn load_segment_definitions(&self) -> Result<Vec<SegmentDefinition>, StorageError> {
        let path = self.path(DEFINITIONS_FILE);
        read_json(&path)?.ok_or(StorageError::MissingDefinitions(path))
    }

    fn load_activities(&self) -> Result<Vec<Activity>, StorageError> {
        Ok(read_json(&self.path(ACTIVITIES_FILE))?.unwrap_or_default())
    }

    fn load_attempts(&self) -> Result<Vec<Attempt>, StorageError> {
        Ok(read_json(&self.path(ATTEMPTS_FILE))?.unwrap_or_default())
    }

    fn save_segment_definitions(
        &self,
        definitions: &[SegmentDefinition],
    ) -> Result<(), StorageError> {
        write_json(&self.path(DEFINITIONS_FILE), definitions)
    }

    fn save_activities(&self, activities: &[Activity]) -> Result<(), StorageError> {
        write_json(&self.path(ACTIVITIES_FILE), activities)
    }

    fn save_attempts(&self, attempts: &[Attempt]) -> Result<(), StorageError> {
        write_json(&self.path(ATTEMPTS_FILE), attempts)
    }
}

/// `Ok(None)` when the file does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Write to a sibling temporary file, then rename over `path`.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut writer = BufWriter::new(File::create(&tmp).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)?;
    drop(writer);

    fs::rename(&tmp, path).map_err(io_err)
}
