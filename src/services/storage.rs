//! S3 storage service for screenshot artifacts.
//!
//! Handles all S3 operations: upload, download, and delete of baseline,
//! test, and diff images. Supports both AWS S3 and MinIO for development.
//! Everywhere else images are referenced by their opaque object keys.

use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use tracing::info;
use uuid::Uuid;

use crate::config::StorageSettings;
use crate::error::{AppError, AppResult};

/// Content type used for every stored artifact.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// S3 storage client wrapper.
#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    /// Create a new S3 storage client from configuration.
    pub async fn new(config: &StorageSettings) -> AppResult<Self> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "socialshot",
        );

        let region = Region::new(config.region.clone());

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials)
            .force_path_style(true); // Required for MinIO

        // Use custom endpoint for MinIO in development
        if let Some(ref endpoint) = config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let s3_config = s3_config_builder.build();
        let client = Client::from_conf(s3_config);

        let storage = Self {
            client,
            bucket: config.bucket.clone(),
        };

        // Verify bucket exists or create it
        storage.ensure_bucket_exists().await?;

        info!("S3 storage initialized: bucket={}", config.bucket);

        Ok(storage)
    }

    /// Ensure the bucket exists, creating it if necessary.
    async fn ensure_bucket_exists(&self) -> AppResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!("S3 bucket '{}' exists", self.bucket);
                Ok(())
            }
            Err(e) => {
                // Check if it's a "not found" error
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    info!("Creating S3 bucket '{}'", self.bucket);
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(|e| {
                            AppError::Storage(format!("Failed to create bucket: {}", e))
                        })?;
                    info!("S3 bucket '{}' created", self.bucket);
                    Ok(())
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to access bucket '{}': {}",
                        self.bucket, service_error
                    )))
                }
            }
        }
    }

    /// Upload an image to S3.
    ///
    /// # Arguments
    /// * `key` - The S3 object key where the image will be uploaded
    /// * `data` - The image contents as bytes
    /// * `content_type` - Optional content type for the upload
    pub async fn put(&self, key: &str, data: Vec<u8>, content_type: Option<&str>) -> AppResult<()> {
        let body = aws_sdk_s3::primitives::ByteStream::from(data);
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body);

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload image to S3: {}", e)))?;

        Ok(())
    }

    /// Get an image from S3.
    ///
    /// # Arguments
    /// * `key` - The S3 object key to retrieve
    ///
    /// # Returns
    /// The image contents as bytes and content type
    pub async fn get(&self, key: &str) -> AppResult<(Vec<u8>, Option<String>)> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    AppError::NotFound(format!("Image not found: {}", key))
                } else {
                    AppError::Storage(format!("Failed to get image from S3: {}", service_error))
                }
            })?;

        let content_type = response.content_type().map(String::from);
        let data = response
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read S3 response body: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok((data, content_type))
    }

    /// Delete an image from S3. Deleting a missing key is not an error.
    pub async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete image from S3: {}", e)))?;

        Ok(())
    }

    /// Build the S3 key for a link's baseline image.
    ///
    /// Format: references/{channel}/{link_id}.png
    pub fn reference_key(channel: &str, link_id: Uuid) -> String {
        format!("references/{}/{}.png", channel, link_id)
    }

    /// Build the S3 key for a link's latest test capture.
    ///
    /// The key is stable per link and overwritten on every run.
    /// Format: tests/{channel}/{link_id}.png
    pub fn test_key(channel: &str, link_id: Uuid) -> String {
        format!("tests/{}/{}.png", channel, link_id)
    }

    /// Build the S3 key for a comparison's diff artifact.
    ///
    /// Format: jobs/{job_id}/{channel}/{link_id}_diff.png
    pub fn diff_key(job_id: Uuid, channel: &str, link_id: Uuid) -> String {
        format!("jobs/{}/{}/{}_diff.png", job_id, channel, link_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_key() {
        let id = Uuid::nil();
        assert_eq!(
            Storage::reference_key("facebook", id),
            format!("references/facebook/{}.png", id)
        );
    }

    #[test]
    fn test_test_key() {
        let id = Uuid::nil();
        assert_eq!(
            Storage::test_key("twitter", id),
            format!("tests/twitter/{}.png", id)
        );
    }

    #[test]
    fn test_diff_key() {
        let job_id = Uuid::nil();
        let link_id = Uuid::max();
        assert_eq!(
            Storage::diff_key(job_id, "instagram", link_id),
            format!("jobs/{}/instagram/{}_diff.png", job_id, link_id)
        );
    }
}
