use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Lifetime of a presigned thumbnail upload URL.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Contract for the object storage that holds post thumbnails. The service never receives
/// file bytes itself: clients upload straight to storage through a presigned URL and then
/// reference the object key on the post.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Used for the local MinIO setup.
    async fn ensure_bucket_exists(&self);

    /// A time-limited URL allowing one PUT of `content_type` to `key`.
    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> Result<String>;
}

/// S3StorageClient
///
/// `StorageService` over the AWS SDK. Path-style addressing keeps it compatible with MinIO
/// and other S3-compatible gateways.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket already exists.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!("create_bucket: {:?}", e);
        }
    }

    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> Result<String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| AppError::Internal(format!("presigning config: {e}")))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            // The upload must carry exactly this Content-Type.
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Internal(format!("presign put_object: {e}")))?;

        Ok(presigned_req.uri().to_string())
    }
}

/// Only image uploads are accepted as thumbnails.
pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

/// thumbnail_key
///
/// A fresh object key `thumbnails/<uuid>.<ext>`, keeping the extension of the client's file
/// name (`bin` when there is none).
pub fn thumbnail_key(filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    format!("thumbnails/{}.{}", Uuid::new_v4(), extension.to_ascii_lowercase())
}

/// Drops empty, `.` and `..` segments from a key to rule out path traversal.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// Network-free `StorageService` for tests. Returns deterministic local URLs.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(&self, key: &str, _content_type: &str) -> Result<String> {
        if self.should_fail {
            return Err(AppError::Internal(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// Shared handle to the storage service in the application state.
pub type StorageState = Arc<dyn StorageService>;
