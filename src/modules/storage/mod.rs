//! Storage module for issue images
//!
//! Provides the MinIO/S3-compatible client used to persist uploaded photos.

mod minio_client;

pub use minio_client::MinIOClient;
