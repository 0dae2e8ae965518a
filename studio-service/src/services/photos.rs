use std::sync::Arc;

use super::{Database, PhotoStore, ServiceError, photo_key};
use crate::models::JobPhoto;

/// One file taken from a multipart upload.
#[derive(Debug)]
pub struct PhotoUpload {
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct JobPhotoService {
    db: Database,
    store: Arc<dyn PhotoStore>,
    max_files: usize,
}

impl JobPhotoService {
    pub fn new(db: Database, store: Arc<dyn PhotoStore>, max_files: usize) -> Self {
        Self {
            db,
            store,
            max_files,
        }
    }

    pub async fn list(&self, job_id: i64) -> Result<Vec<JobPhoto>, ServiceError> {
        if !self.db.job_exists(job_id).await? {
            return Err(ServiceError::NotFound("Job not found".to_string()));
        }
        self.db.list_job_photos(job_id).await
    }

    /// Stores every file, then records the keys against the job.
    pub async fn upload(
        &self,
        job_id: i64,
        work_type: &str,
        work_name: &str,
        files: Vec<PhotoUpload>,
    ) -> Result<Vec<JobPhoto>, ServiceError> {
        let keyed = self.prepare(work_type, work_name, files)?;

        if !self.db.job_exists(job_id).await? {
            return Err(ServiceError::NotFound("Job not found".to_string()));
        }

        let mut stored: Vec<String> = Vec::with_capacity(keyed.len());
        for (key, data) in keyed {
            if let Err(e) = self.store.put(&key, data).await {
                tracing::error!(job_id, key = %key, error = %e, "Photo upload failed");
                self.discard(&stored).await;
                return Err(e);
            }
            stored.push(key);
        }

        match self.db.insert_job_photos(job_id, &stored).await {
            Ok(photos) => {
                tracing::info!(job_id, count = photos.len(), "Job photos uploaded");
                Ok(photos)
            }
            Err(e) => {
                self.discard(&stored).await;
                Err(e)
            }
        }
    }

    /// Checks the batch and derives object keys without touching storage.
    fn prepare(
        &self,
        work_type: &str,
        work_name: &str,
        files: Vec<PhotoUpload>,
    ) -> Result<Vec<(String, Vec<u8>)>, ServiceError> {
        if files.is_empty() {
            return Err(ServiceError::Validation(
                "No files provided for upload.".to_string(),
            ));
        }
        if files.len() > self.max_files {
            return Err(ServiceError::Validation(format!(
                "At most {} files can be uploaded at once",
                self.max_files
            )));
        }

        files
            .into_iter()
            .map(|file| {
                photo_key(work_type, work_name, &file.file_name)
                    .map(|key| (key, file.data))
                    .ok_or_else(|| {
                        ServiceError::Validation(format!(
                            "Invalid photo location for file '{}'",
                            file.file_name
                        ))
                    })
            })
            .collect()
    }

    async fn discard(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.store.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to remove orphaned photo");
            }
        }
    }
}
