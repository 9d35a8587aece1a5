use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DATA_DIR_NAME: &str = "habittracker";
pub const HABITS_FILE_NAME: &str = "habits.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to encode habits: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Unavailable(String),
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub trait HabitStorage {
    /// The raw document, or `None` when nothing has been written yet.
    fn read(&self) -> Result<Option<String>, StorageError>;

    fn write(&self, contents: &str) -> Result<(), StorageError>;

    fn describe(&self) -> String;
}

/// A single JSON file, normally `<user data dir>/habittracker/habits.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(HABITS_FILE_NAME))
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|base| base.join(DATA_DIR_NAME).join(HABITS_FILE_NAME))
    }

    pub fn at_default_location() -> Result<Self, StorageError> {
        Self::default_path()
            .map(Self::new)
            .ok_or_else(|| StorageError::Unavailable("no user data directory".into()))
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| HABITS_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl HabitStorage for JsonFileStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        if !self.path.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|err| StorageError::io(&self.path, err))
    }

    fn write(&self, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| StorageError::io(parent, err))?;
            }
        }
        // Readers never observe a half-written document.
        let staging = self.staging_path();
        fs::write(&staging, contents).map_err(|err| StorageError::io(&staging, err))?;
        fs::rename(&staging, &self.path).map_err(|err| StorageError::io(&self.path, err))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    contents: RefCell<Option<String>>,
    fail_writes: RefCell<bool>,
    writes: RefCell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        let storage = Self::default();
        storage.contents.replace(Some(contents.into()));
        storage
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }

    /// Makes every later write fail until switched back off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.replace(fail);
    }

    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl HabitStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents.borrow().clone())
    }

    fn write(&self, contents: &str) -> Result<(), StorageError> {
        if *self.fail_writes.borrow() {
            return Err(StorageError::Io {
                path: PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "writes disabled"),
            });
        }
        self.contents.replace(Some(contents.to_string()));
        *self.writes.borrow_mut() += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

impl<S: HabitStorage + ?Sized> HabitStorage for std::rc::Rc<S> {
    fn read(&self) -> Result<Option<String>, StorageError> {
        (**self).read()
    }

    fn write(&self, contents: &str) -> Result<(), StorageError> {
        (**self).write(contents)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
