use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

use super::ServiceError;

/// Object storage for uploaded job photos.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
}

/// Builds `<workType>/<workName>/<file name>` with whitespace stripped from
/// the first two segments. Only the final component of `file_name` is kept.
pub fn photo_key(work_type: &str, work_name: &str, file_name: &str) -> Option<String> {
    let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();

    let work_type = strip(work_type);
    let work_name = strip(work_name);
    let file_name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if [work_type.as_str(), work_name.as_str(), file_name]
        .iter()
        .any(|segment| segment.is_empty() || *segment == "." || *segment == "..")
    {
        return None;
    }
    if work_type.contains(['/', '\\']) || work_name.contains(['/', '\\']) {
        return None;
    }

    Some(format!("{}/{}/{}", work_type, work_name, file_name))
}

/// Filesystem-backed store rooted at a directory.
pub struct LocalPhotoStore {
    base_path: PathBuf,
}

impl LocalPhotoStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        Ok(Self { base_path })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(ServiceError::Storage(format!("Invalid object key: {}", key)));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), ServiceError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        fs::write(&path, data)
            .await
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.resolve(key)?;
        if path.exists() {
            fs::remove_file(path)
                .await
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }
        Ok(())
    }
}

/// Keeps objects in memory. Used by tests.
#[derive(Default)]
pub struct InMemoryPhotoStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PhotoStore for InMemoryPhotoStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), ServiceError> {
        self.objects
            .lock()
            .map_err(|e| ServiceError::Storage(e.to_string()))?
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.objects
            .lock()
            .map_err(|e| ServiceError::Storage(e.to_string()))?
            .remove(key);
        Ok(())
    }
}
