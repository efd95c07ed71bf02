use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;

use crate::storage::{ContentStore, StoreError};

/// S3-compatible content store (MinIO locally, S3 or an S3 gateway in production).
pub struct S3ContentStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ContentStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Builds a client with static credentials against an explicit endpoint.
    pub async fn connect(
        bucket: &str,
        endpoint: &str,
        region: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "resume-analyzer-static",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .load()
            .await;

        // MinIO serves buckets on the path, not as subdomains.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self::new(aws_sdk_s3::Client::from_conf(s3_config), bucket.to_string())
    }
}

#[async_trait]
impl ContentStore for S3ContentStore {
    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(service) if service.is_no_such_key() => {
                    StoreError::NotFound(format!("s3://{}/{}", self.bucket, key))
                }
                _ => StoreError::Transfer(format!(
                    "S3 get_object failed: {}",
                    DisplayErrorContext(&e)
                )),
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Transfer(format!("S3 body read failed: {e}")))?;

        Ok(data.into_bytes())
    }

    async fn check(&self) -> Result<(), StoreError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                StoreError::Transfer(format!(
                    "bucket '{}' is not reachable: {}",
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
