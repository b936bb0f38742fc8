use std::path::{Path, PathBuf};

use tokio::fs;

use crate::config::{DEFAULT_IMG_NAME, RESULT_IMG_NAME_PREFIX, SRC_IMG_NAME_PREFIX};
use crate::error::StoreError;
use crate::naming::Namer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageCategory {
    Source,
    Result,
}

impl ImageCategory {
    pub fn prefix(self) -> &'static str {
        match self {
            ImageCategory::Source => SRC_IMG_NAME_PREFIX,
            ImageCategory::Result => RESULT_IMG_NAME_PREFIX,
        }
    }
}

/// Names of the images currently on display.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CurrentImages {
    pub source: Option<String>,
    pub result: Option<String>,
}

impl CurrentImages {
    fn slot(&mut self, category: ImageCategory) -> &mut Option<String> {
        match category {
            ImageCategory::Source => &mut self.source,
            ImageCategory::Result => &mut self.result,
        }
    }
}

/// The shared image directory. Holds at most one source and one result image.
#[derive(Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
    default_name: String,
    current: CurrentImages,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            default_name: DEFAULT_IMG_NAME.to_string(),
            current: CurrentImages::default(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn current(&self) -> &CurrentImages {
        &self.current
    }

    pub fn resolve_path(&self, name: &str) -> PathBuf {
        let normalized = name.trim_start_matches('/');
        self.base_dir.join(Path::new(normalized))
    }

    pub async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.resolve_path(name);
        match fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::io("stat", path, err)),
        }
    }

    /// Next name from `namer` for `category` that no file in the directory
    /// already uses.
    pub async fn fresh_name(
        &self,
        namer: &mut Namer,
        category: ImageCategory,
    ) -> Result<String, StoreError> {
        loop {
            let name = namer.next_name(category.prefix());
            if !self.exists(&name).await? {
                return Ok(name);
            }
            tracing::debug!(%name, "generated name already on disk");
        }
    }

    pub async fn save(&self, data: &[u8], name: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|err| StoreError::io("create", self.base_dir.clone(), err))?;
        let path = self.resolve_path(name);
        fs::write(&path, data)
            .await
            .map_err(|err| StoreError::io("write", path, err))
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve_path(name);
        fs::read(&path)
            .await
            .map_err(|err| StoreError::io("read", path, err))
    }

    pub fn set_current(&mut self, category: ImageCategory, name: &str) {
        *self.current.slot(category) = Some(name.to_string());
    }

    /// Deletes the current image of `category` along with any leftover file
    /// carrying its prefix. Nothing to delete is not an error.
    pub async fn clear(&mut self, category: ImageCategory) -> Result<(), StoreError> {
        let mut doomed = self.scan(category.prefix()).await?;
        if let Some(name) = self.current.slot(category).take() {
            if !doomed.contains(&name) {
                doomed.push(name);
            }
        }
        for name in doomed {
            let path = self.resolve_path(&name);
            match fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(%name, "removed previous image"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(StoreError::io("remove", path, err)),
            }
        }
        Ok(())
    }

    /// Name of the current image of `category`. Falls back to a directory scan
    /// when nothing is recorded (after a restart) and to the placeholder when
    /// the directory has nothing either.
    pub async fn find_current(&mut self, category: ImageCategory) -> Result<String, StoreError> {
        if let Some(name) = self.current.slot(category).clone() {
            return Ok(name);
        }
        match self.scan(category.prefix()).await?.into_iter().next() {
            Some(name) => {
                self.set_current(category, &name);
                Ok(name)
            }
            None => Ok(self.default_name.clone()),
        }
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut dir = match fs::read_dir(&self.base_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io("list", self.base_dir.clone(), err)),
        };
        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|err| StoreError::io("list", self.base_dir.clone(), err))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(prefix) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
