pub mod assets;
pub mod storage;

pub use assets::{AssetError, AssetKind, AssetStore, CdnConfig, CloudinaryAssets};
pub use storage::{
    sanitize_filename, song_object_key, BlobStore, S3BlobStore, S3Config, StorageError,
};
