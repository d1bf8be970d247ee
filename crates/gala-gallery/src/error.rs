use thiserror::Error;

use crate::storage::StorageError;

/// User-facing failures of the gallery flows.
///
/// Recognition failures never appear here: they are handled inside the
/// grouping pass and only degrade clustering quality.
#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("sign-in required before uploading to a shared event")]
    AuthenticationRequired,
    #[error("gallery task exited")]
    ChannelClosed,
}
