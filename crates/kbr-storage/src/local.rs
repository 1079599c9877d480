//! Local-filesystem backend: a "bucket" is a subdirectory of `base_dir`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kbr_core::{CoreError, CoreResult};

use crate::archive::{archive_name, tar_gzip_dir, untar_gzip_into};
use crate::backend::StorageBackend;

/// Stores objects under `base_dir/<bucket>/<key>`. Writes go through a
/// temp-file-then-rename so a concurrent reader never observes a partial
/// write.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    base_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.base_dir.join(bucket).join(key)
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.base_dir.join(bucket)
    }
}

fn walk_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_files(root, &path, out)?;
        } else {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

#[async_trait]
impl StorageBackend for LocalBackend {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> CoreResult<()> {
        let dest = self.object_path(bucket, key);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = dest.with_file_name(format!("{file_name}.tmp-{}", std::process::id()));
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &dest)?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> CoreResult<Vec<u8>> {
        let path = self.object_path(bucket, key);
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound(format!("{bucket}/{key}")),
            _ => CoreError::from(e),
        })
    }

    async fn list(&self, bucket: &str, prefix: &str) -> CoreResult<Vec<String>> {
        let root = self.bucket_path(bucket);
        if !root.exists() {
            return Ok(Vec::new());
        }
        let mut all = Vec::new();
        walk_files(&root, &root, &mut all)?;
        all.retain(|key| key.starts_with(prefix));
        all.sort();
        Ok(all)
    }

    async fn upload_tree(
        &self,
        bucket: &str,
        prefix: &str,
        local_dir: &Path,
        compress: bool,
    ) -> CoreResult<()> {
        if compress {
            let bytes = tar_gzip_dir(local_dir)?;
            return self.put(bucket, &archive_name(prefix), bytes).await;
        }

        let mut files = Vec::new();
        walk_files(local_dir, local_dir, &mut files)?;
        for relative in files {
            let bytes = std::fs::read(local_dir.join(&relative))?;
            self.put(bucket, &format!("{prefix}/{relative}"), bytes).await?;
        }
        Ok(())
    }

    async fn download_tree(&self, bucket: &str, prefix: &str, local_dir: &Path) -> CoreResult<()> {
        let archive_key = archive_name(prefix);
        let archive_path = self.object_path(bucket, &archive_key);
        if archive_path.exists() {
            let bytes = std::fs::read(&archive_path)?;
            return untar_gzip_into(&bytes, local_dir);
        }

        let keys = self.list(bucket, &format!("{prefix}/")).await?;
        if keys.is_empty() {
            return Err(CoreError::NotFound(format!("{bucket}/{prefix}")));
        }
        for key in keys {
            let relative = key.strip_prefix(&format!("{prefix}/")).unwrap_or(&key);
            let src = self.object_path(bucket, &key);
            let dest = local_dir.join(relative);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&src, &dest)?;
        }
        Ok(())
    }
}
