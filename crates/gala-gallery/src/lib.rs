//! gala-gallery: the event gallery service layer.
//!
//! Owns everything around the grouping engine: the object-store capability
//! and its filesystem implementation, the participant upload flow, and the
//! gallery state store that publishes grouped photo collections to the
//! presentation layer.

pub mod config;
pub mod error;
pub mod fs_store;
pub mod state;
pub mod storage;
pub mod upload;

pub use config::GalleryConfig;
pub use error::GalleryError;
pub use fs_store::FsStore;
pub use state::{spawn_gallery, GalleryHandle, GallerySnapshot, GalleryStatus};
pub use storage::{list_event_images, ObjectMeta, ObjectStore, StorageError};
pub use upload::{upload_batch, Session, Upload};
