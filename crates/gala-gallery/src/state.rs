//! The gallery state store: an actor owning the authoritative view of one
//! event's images, their group partition, and in-flight deletions.
//!
//! Grouping passes run in spawned tasks and publish wholesale through a
//! completion message, so the store stays responsive while a pass is in
//! flight and keeps exposing the previous partition until the new one lands.
//! Completions apply in arrival order; a newer `load` supersedes an older
//! pass simply by finishing later. Deletions issued while passes are in
//! flight are remembered and re-applied to every late-landing result, so a
//! pass started before a delete cannot resurrect the deleted image.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use gala_core::{
    GroupPartition, GroupingEngine, Image, RecognitionGateway,
};

use crate::config::GalleryConfig;
use crate::error::GalleryError;
use crate::storage::{list_event_images, ObjectStore, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryStatus {
    /// A grouping pass is in flight; the exposed partition is the previous one.
    Loading,
    Ready,
}

/// Point-in-time view for the presentation layer.
#[derive(Debug, Clone)]
pub struct GallerySnapshot {
    pub status: GalleryStatus,
    pub images: Vec<Image>,
    pub groups: Vec<gala_core::Group>,
    pub ungrouped: Vec<Image>,
    /// Keys mid-deletion, for disabling actions on them.
    pub deleting: HashSet<String>,
}

enum Request {
    Load {
        images: Vec<Image>,
        reply: oneshot::Sender<Result<(), GalleryError>>,
    },
    Reload {
        reply: oneshot::Sender<Result<(), GalleryError>>,
    },
    AddAndRegroup {
        new_images: Vec<Image>,
        reply: oneshot::Sender<Result<(), GalleryError>>,
    },
    Delete {
        key: String,
        reply: oneshot::Sender<Result<(), GalleryError>>,
    },
    Snapshot {
        reply: oneshot::Sender<GallerySnapshot>,
    },
    PassComplete {
        images: Vec<Image>,
        partition: GroupPartition,
        reply: oneshot::Sender<Result<(), GalleryError>>,
    },
    PassAborted {
        error: GalleryError,
        reply: oneshot::Sender<Result<(), GalleryError>>,
    },
    DeleteSettled {
        key: String,
        result: Result<(), StorageError>,
        reply: oneshot::Sender<Result<(), GalleryError>>,
    },
}

/// Clone-safe handle to the gallery task.
#[derive(Clone)]
pub struct GalleryHandle {
    tx: mpsc::Sender<Request>,
}

impl GalleryHandle {
    /// Replace the image set and run a full grouping pass. Resolves once the
    /// new partition is published.
    pub async fn load(&self, images: Vec<Image>) -> Result<(), GalleryError> {
        self.request(|reply| Request::Load { images, reply }).await?
    }

    /// List the event's images from the object store, then behave as `load`.
    /// Fails only when no storage prefix produced any image.
    pub async fn reload(&self) -> Result<(), GalleryError> {
        self.request(|reply| Request::Reload { reply }).await?
    }

    /// Append freshly uploaded images and re-run the full pass over the
    /// entire set. Not incremental: every image is re-submitted.
    pub async fn add_and_regroup(&self, new_images: Vec<Image>) -> Result<(), GalleryError> {
        self.request(|reply| Request::AddAndRegroup { new_images, reply })
            .await?
    }

    /// Delete an image: removed from the local view immediately, then from
    /// remote storage. A remote failure is returned but the local removal is
    /// not rolled back.
    pub async fn delete(&self, key: impl Into<String>) -> Result<(), GalleryError> {
        let key = key.into();
        self.request(|reply| Request::Delete { key, reply }).await?
    }

    pub async fn snapshot(&self) -> Result<GallerySnapshot, GalleryError> {
        self.request(|reply| Request::Snapshot { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, GalleryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| GalleryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| GalleryError::ChannelClosed)
    }
}

struct Gallery {
    engine: Arc<GroupingEngine>,
    store: Arc<dyn ObjectStore>,
    event_id: String,
    status: GalleryStatus,
    images: Vec<Image>,
    partition: GroupPartition,
    deleting: HashSet<String>,
    /// Passes started but not yet completed or aborted.
    in_flight: usize,
    /// Keys deleted while a pass was in flight; re-applied to every pass
    /// result until no pass remains in flight.
    tombstones: HashSet<String>,
    tx: mpsc::Sender<Request>,
}

/// Spawn the gallery task for one event. The recognition collection id is
/// the event id.
pub fn spawn_gallery(
    gateway: Arc<dyn RecognitionGateway>,
    store: Arc<dyn ObjectStore>,
    event_id: impl Into<String>,
    config: &GalleryConfig,
) -> GalleryHandle {
    let (tx, mut rx) = mpsc::channel::<Request>(32);
    let mut gallery = Gallery {
        engine: Arc::new(GroupingEngine::new(gateway, config.grouping())),
        store,
        event_id: event_id.into(),
        status: GalleryStatus::Ready,
        images: Vec::new(),
        partition: GroupPartition::default(),
        deleting: HashSet::new(),
        in_flight: 0,
        tombstones: HashSet::new(),
        tx: tx.clone(),
    };

    tokio::spawn(async move {
        tracing::debug!(event = %gallery.event_id, "gallery task started");
        while let Some(req) = rx.recv().await {
            gallery.handle(req);
        }
        tracing::debug!(event = %gallery.event_id, "gallery task exiting");
    });

    GalleryHandle { tx }
}

impl Gallery {
    fn handle(&mut self, req: Request) {
        match req {
            Request::Load { images, reply } => {
                self.images = images.clone();
                self.start_pass(images, reply);
            }
            Request::Reload { reply } => {
                self.status = GalleryStatus::Loading;
                self.in_flight += 1;
                let store = self.store.clone();
                let engine = self.engine.clone();
                let event_id = self.event_id.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let images = match list_event_images(store.as_ref(), &event_id).await {
                        Ok(images) => images,
                        Err(err) => {
                            let _ = tx
                                .send(Request::PassAborted {
                                    error: err.into(),
                                    reply,
                                })
                                .await;
                            return;
                        }
                    };
                    let partition = engine.group(&event_id, &images).await;
                    let _ = tx
                        .send(Request::PassComplete {
                            images,
                            partition,
                            reply,
                        })
                        .await;
                });
            }
            Request::AddAndRegroup { new_images, reply } => {
                self.images.extend(new_images);
                self.start_pass(self.images.clone(), reply);
            }
            Request::PassComplete {
                images,
                partition,
                reply,
            } => {
                self.images = images;
                self.partition = partition;
                // A pass started before a delete knows nothing of it;
                // retract tombstoned keys from the fresh result.
                for key in &self.tombstones {
                    self.images.retain(|i| i.key != *key);
                    self.partition.remove_image(key);
                }
                self.settle_pass();
                let _ = reply.send(Ok(()));
            }
            Request::PassAborted { error, reply } => {
                // Failed before grouping (listing found nothing usable); the
                // previous partition stays in place.
                self.settle_pass();
                let _ = reply.send(Err(error));
            }
            Request::Delete { key, reply } => {
                // Optimistic: the image leaves the local view before the
                // remote delete settles.
                self.images.retain(|i| i.key != key);
                self.partition.remove_image(&key);
                self.deleting.insert(key.clone());
                if self.in_flight > 0 {
                    self.tombstones.insert(key.clone());
                }
                let store = self.store.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = store.delete(&key).await;
                    let _ = tx.send(Request::DeleteSettled { key, result, reply }).await;
                });
            }
            Request::DeleteSettled { key, result, reply } => {
                self.deleting.remove(&key);
                if let Err(err) = &result {
                    tracing::warn!(key, error = %err, "remote delete failed; local removal kept");
                }
                let _ = reply.send(result.map_err(Into::into));
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(GallerySnapshot {
                    status: self.status,
                    images: self.images.clone(),
                    groups: self.partition.groups.clone(),
                    ungrouped: self.partition.ungrouped.clone(),
                    deleting: self.deleting.clone(),
                });
            }
        }
    }

    /// One pass settled (completed or aborted). The store reports Ready only
    /// once no pass remains in flight; tombstones are no longer needed then.
    fn settle_pass(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 {
            self.tombstones.clear();
            self.status = GalleryStatus::Ready;
        }
    }

    /// Kick off a grouping pass over `images` in its own task. The result
    /// lands back here as `PassComplete` and replaces the partition
    /// wholesale; until then the previous partition stays visible.
    fn start_pass(
        &mut self,
        images: Vec<Image>,
        reply: oneshot::Sender<Result<(), GalleryError>>,
    ) {
        self.status = GalleryStatus::Loading;
        self.in_flight += 1;
        let engine = self.engine.clone();
        let event_id = self.event_id.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let partition = engine.group(&event_id, &images).await;
            let _ = tx
                .send(Request::PassComplete {
                    images,
                    partition,
                    reply,
                })
                .await;
        });
    }
}
