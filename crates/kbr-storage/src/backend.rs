//! The `StorageBackend` trait: uniform object I/O over Local or S3.

use async_trait::async_trait;
use kbr_core::CoreResult;

/// A capability implemented by Local and S3 backends alike.
///
/// Implementations are stateless beyond their configuration and safe for
/// concurrent use (the AWS SDK client is internally `Clone` + `Arc`-backed;
/// the local backend holds only a base path).
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Writes `bytes` to `bucket/key`, atomically, overwriting any existing
    /// object.
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> CoreResult<()>;

    /// Reads `bucket/key`. Fails with `CoreError::NotFound` if absent.
    async fn get(&self, bucket: &str, key: &str) -> CoreResult<Vec<u8>>;

    /// Lists key names under `bucket/prefix`. Order is unspecified;
    /// pagination (if any) is handled internally.
    async fn list(&self, bucket: &str, prefix: &str) -> CoreResult<Vec<String>>;

    /// Uploads the contents of `local_dir`, mirroring its relative paths
    /// under `bucket/<prefix>/`. When `compress` is set, the directory is
    /// archived to a single `bucket/<prefix>.tar.gz` object instead.
    ///
    /// `prefix` is a key prefix within the bucket (typically a snapshot
    /// id), not a separate bucket: one configured bucket holds every
    /// snapshot, distinguished by this prefix, matching the persisted
    /// layout: one configured bucket, every snapshot under its own prefix.
    async fn upload_tree(
        &self,
        bucket: &str,
        prefix: &str,
        local_dir: &std::path::Path,
        compress: bool,
    ) -> CoreResult<()>;

    /// Materialises `bucket/<prefix>/...` (or `bucket/<prefix>.tar.gz`, if
    /// present) as a local tree rooted at `local_dir`, creating it if
    /// necessary.
    async fn download_tree(
        &self,
        bucket: &str,
        prefix: &str,
        local_dir: &std::path::Path,
    ) -> CoreResult<()>;
}
