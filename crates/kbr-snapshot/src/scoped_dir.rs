//! A scoped local staging directory, guaranteed to be removed on every exit
//! path including cancellation, via an RAII guard around a `tempfile::TempDir`.

use kbr_core::{CoreError, CoreResult};

/// An RAII guard around a `tempfile::TempDir`. Deletion happens on drop
/// regardless of how the scope was exited (success, error, or
/// cancellation).
#[derive(Debug)]
pub struct ScopedDir {
    inner: tempfile::TempDir,
}

impl ScopedDir {
    pub fn new() -> CoreResult<Self> {
        let inner = tempfile::tempdir()
            .map_err(|e| CoreError::Internal(format!("failed to create staging directory: {e}")))?;
        Ok(Self { inner })
    }

    pub fn path(&self) -> &std::path::Path {
        self.inner.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_is_removed_on_drop() {
        let path = {
            let scoped = ScopedDir::new().unwrap();
            let path = scoped.path().to_path_buf();
            assert!(path.exists());
            path
        };
        assert!(!path.exists());
    }
}
