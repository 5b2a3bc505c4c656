//! MinIO/S3-compatible storage client for issue images.
//!
//! Images are stored under a public prefix and addressed by the SHA-256 of
//! their content, so uploading the same photo twice yields the same URL.
//!
//! Uses rust-s3 crate for lightweight S3 operations.

use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::config::MinIOConfig;
use crate::core::error::AppError;

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    image_prefix: String,
}

impl MinIOClient {
    /// Build the client. No request is made until the first storage call.
    pub fn new(config: MinIOConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        Ok(Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint,
            public_endpoint: config.public_endpoint.trim_end_matches('/').to_string(),
            image_prefix: config.image_prefix.trim_matches('/').to_string(),
        })
    }

    /// Ensure the bucket exists, create if not
    pub async fn ensure_bucket_exists(&self) -> Result<(), AppError> {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket.name());
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}' at {}: {}. Assuming it exists.",
                        self.bucket.name(),
                        self.endpoint,
                        e
                    );
                }
                Ok(())
            }
        }
    }

    /// Object key for an image: `<prefix>/<sha256>.<ext>`
    pub fn image_key(&self, data: &[u8], extension: &str) -> String {
        let digest = hex::encode(Sha256::digest(data));
        format!("{}/{}.{}", self.image_prefix, digest, extension)
    }

    /// Store an issue image and return its public URL
    pub async fn upload_image(
        &self,
        data: &[u8],
        content_type: &str,
        extension: &str,
    ) -> Result<String, AppError> {
        let key = self.image_key(data, extension);

        self.bucket
            .put_object_with_content_type(&key, data, content_type)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to upload image '{}': {}", key, e)))?;

        debug!("Uploaded image '{}' to bucket '{}'", key, self.bucket.name());
        Ok(self.public_url(&key))
    }

    /// Get the bucket name
    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.bucket.name(), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MinIOClient {
        MinIOClient::new(MinIOConfig {
            endpoint: "http://minio:9000".to_string(),
            public_endpoint: "https://cdn.civiclink.test/".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            bucket: "civiclink-uploads".to_string(),
            region: "us-east-1".to_string(),
            image_prefix: "public/issues/".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_image_key_is_content_addressed() {
        let client = client();
        let a = client.image_key(b"pothole", "jpg");
        let b = client.image_key(b"pothole", "jpg");
        let c = client.image_key(b"streetlight", "jpg");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("public/issues/"));
        assert!(a.ends_with(".jpg"));
        assert_eq!(a.len(), "public/issues/".len() + 64 + ".jpg".len());
    }

    #[test]
    fn test_public_url_uses_public_endpoint() {
        let client = client();
        let key = client.image_key(b"pothole", "png");

        assert_eq!(
            client.public_url(&key),
            format!("https://cdn.civiclink.test/civiclink-uploads/{}", key)
        );
    }
}
