//! S3-backed storage over `aws-sdk-s3`: SDK errors are mapped down to
//! three taxonomy buckets (`NotFound`, retryable `Transport`, everything
//! else `Internal`).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use kbr_core::{CoreError, CoreResult};

use crate::archive::{archive_name, tar_gzip_dir, untar_gzip_into};
use crate::backend::StorageBackend;

/// Wraps an `aws_sdk_s3::Client`. Cheap to clone; the underlying SDK client
/// is itself `Arc`-backed.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    /// Loads SDK configuration from the default provider chain (ambient
    /// credentials, pod service-account style), optionally pinned to a
    /// region.
    pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        loader.load().await
    }
}

fn map_sdk_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> CoreError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    let fallback = format!("{err:?}");

    match err {
        aws_sdk_s3::error::SdkError::ServiceError(service_err) => {
            let code = service_err.err().code().unwrap_or("Unknown");
            let message = service_err
                .err()
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.clone());
            match code {
                "NoSuchKey" | "NotFound" | "NoSuchBucket" => CoreError::NotFound(message),
                "SlowDown" | "Throttling" | "ThrottlingException" => {
                    CoreError::Transport(format!("throttled: {message}"))
                }
                "InvalidBucketName" | "InvalidArgument" => CoreError::Config(message),
                _ => CoreError::Internal(message),
            }
        }
        aws_sdk_s3::error::SdkError::TimeoutError(_)
        | aws_sdk_s3::error::SdkError::DispatchFailure(_) => CoreError::Transport(fallback),
        _ => CoreError::Internal(fallback),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> CoreResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> CoreResult<Vec<u8>> {
        let out = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(map_sdk_error)?;
        let bytes = out
            .body
            .collect()
            .await
            .map_err(|e| CoreError::Internal(format!("failed to collect object body: {e}")))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> CoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut req = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
            if let Some(token) = &continuation {
                req = req.continuation_token(token);
            }
            let out = req.send().await.map_err(map_sdk_error)?;

            for item in out.contents() {
                if let Some(key) = item.key() {
                    keys.push(key.to_string());
                }
            }

            continuation = out.next_continuation_token().map(str::to_string);
            if continuation.is_none() {
                break;
            }
        }

        Ok(keys)
    }

    async fn upload_tree(
        &self,
        bucket: &str,
        prefix: &str,
        local_dir: &std::path::Path,
        compress: bool,
    ) -> CoreResult<()> {
        if compress {
            let bytes = tar_gzip_dir(local_dir)?;
            return self.put(bucket, &archive_name(prefix), bytes).await;
        }

        walk_and_upload(self, bucket, prefix, local_dir, local_dir).await
    }

    async fn download_tree(
        &self,
        bucket: &str,
        prefix: &str,
        local_dir: &std::path::Path,
    ) -> CoreResult<()> {
        match self.get(bucket, &archive_name(prefix)).await {
            Ok(bytes) => return untar_gzip_into(&bytes, local_dir),
            Err(CoreError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        let tree_prefix = format!("{prefix}/");
        let keys = self.list(bucket, &tree_prefix).await?;
        if keys.is_empty() {
            return Err(CoreError::NotFound(format!("{bucket}/{prefix}")));
        }
        for key in keys {
            let bytes = self.get(bucket, &key).await?;
            let relative = key.strip_prefix(&tree_prefix).unwrap_or(&key);
            let dest = local_dir.join(relative);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&dest, bytes)?;
        }
        Ok(())
    }
}

async fn walk_and_upload(
    backend: &S3Backend,
    bucket: &str,
    prefix: &str,
    root: &std::path::Path,
    dir: &std::path::Path,
) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            Box::pin(walk_and_upload(backend, bucket, prefix, root, &path)).await?;
        } else {
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            let bytes = std::fs::read(&path)?;
            backend.put(bucket, &format!("{prefix}/{relative}"), bytes).await?;
        }
    }
    Ok(())
}
