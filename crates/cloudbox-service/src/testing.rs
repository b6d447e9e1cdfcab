//! Test doubles shared by the service unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::Notify;

use cloudbox_core::error::AppError;
use cloudbox_core::result::AppResult;
use cloudbox_core::traits::storage::ObjectStorage;

/// Pauses the next presign until released.
#[derive(Debug, Clone, Default)]
pub struct PresignGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Object storage that keeps blobs in memory and can be told to fail.
#[derive(Debug, Default)]
pub struct FakeStorage {
    pub objects: DashMap<String, Bytes>,
    pub fail_presign: AtomicBool,
    pub presigned: AtomicUsize,
    gate: Mutex<Option<PresignGate>>,
}

impl FakeStorage {
    pub fn set_fail_presign(&self, fail: bool) {
        self.fail_presign.store(fail, Ordering::SeqCst);
    }

    /// Hold the next `presign_get` until `release` is notified.
    pub fn gate_presign(&self) -> PresignGate {
        let gate = PresignGate::default();
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    fn provider_type(&self) -> &str {
        "fake"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn put_object(&self, key: &str, data: Bytes, _content_type: &str) -> AppResult<()> {
        self.objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> AppResult<String> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(AppError::storage("presign unavailable"));
        }
        self.presigned.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://blobs.test/{key}?ttl={}", ttl.as_secs()))
    }
}
