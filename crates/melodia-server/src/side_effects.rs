//! Side-effect queue: blob and asset work that must not hold up a response.
//!
//! Handlers submit typed jobs and move on. A single worker task drains the
//! channel, runs each job on its own task, and logs failures. Nothing is
//! retried and nothing is reported back to the caller.

use melodia_media::{AssetKind, AssetStore, BlobStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

#[derive(Debug)]
pub enum SideEffect {
    /// Remove a song's audio object from the blob store.
    DeleteBlob { key: String },
    UploadAsset {
        kind: AssetKind,
        id: Uuid,
        data: Vec<u8>,
        content_type: String,
    },
    DeleteAsset { kind: AssetKind, id: Uuid },
}

impl SideEffect {
    fn describe(&self) -> String {
        match self {
            SideEffect::DeleteBlob { key } => format!("delete blob {key}"),
            SideEffect::UploadAsset { kind, id, .. } => {
                format!("upload asset {}", kind.public_id(*id))
            }
            SideEffect::DeleteAsset { kind, id } => {
                format!("delete asset {}", kind.public_id(*id))
            }
        }
    }
}

/// Sending half of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SideEffects {
    tx: mpsc::UnboundedSender<SideEffect>,
}

impl SideEffects {
    /// Start the worker. It stops once every `SideEffects` handle is dropped
    /// and all in-flight jobs have finished.
    pub fn spawn(blobs: Arc<dyn BlobStore>, assets: Arc<dyn AssetStore>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(rx, blobs, assets));
        (Self { tx }, handle)
    }

    /// Queue a job without waiting for it.
    pub fn submit(&self, effect: SideEffect) {
        if let Err(e) = self.tx.send(effect) {
            tracing::warn!("side-effect worker is gone, dropping: {}", e.0.describe());
        }
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<SideEffect>,
    blobs: Arc<dyn BlobStore>,
    assets: Arc<dyn AssetStore>,
) {
    tracing::info!("side-effect worker started");
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(effect) => {
                    in_flight.spawn(perform(effect, blobs.clone(), assets.clone()));
                }
                None => break,
            },
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    while in_flight.join_next().await.is_some() {}
    tracing::info!("side-effect worker stopped");
}

async fn perform(effect: SideEffect, blobs: Arc<dyn BlobStore>, assets: Arc<dyn AssetStore>) {
    let label = effect.describe();
    let outcome = match effect {
        SideEffect::DeleteBlob { key } => blobs.delete_object(&key).await.map_err(|e| e.to_string()),
        SideEffect::UploadAsset {
            kind,
            id,
            data,
            content_type,
        } => assets
            .upload(kind, id, data, &content_type)
            .await
            .map_err(|e| e.to_string()),
        SideEffect::DeleteAsset { kind, id } => {
            assets.delete(kind, id).await.map_err(|e| e.to_string())
        }
    };

    match outcome {
        Ok(()) => tracing::debug!("side effect done: {label}"),
        Err(e) => tracing::warn!("side effect failed: {label}: {e}"),
    }
}
