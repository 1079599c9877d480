//! Object storage for backup snapshots, over either the local filesystem or
//! S3. One `StorageBackend` trait, two implementations, selected once at
//! startup by configuration.

pub mod archive;
pub mod backend;
pub mod local;

#[cfg(feature = "s3")]
pub mod s3;

pub use archive::{archive_name, tar_gzip_dir, untar_gzip_into};
pub use backend::StorageBackend;
pub use local::LocalBackend;

#[cfg(feature = "s3")]
pub use s3::S3Backend;
