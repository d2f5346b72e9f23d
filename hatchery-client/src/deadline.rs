//! Per-call deadline decorator
//!
//! Races each collaborator call against a timer. On expiry the caller stops
//! waiting; the request already on the wire is not cancelled server-side, so a
//! timed-out write may still land.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::backend::FarmBackend;
use crate::error::{BackendError, Result};
use crate::types::*;

/// Wraps any [`FarmBackend`] with a fixed per-call deadline.
pub struct DeadlineBackend {
    inner: Arc<dyn FarmBackend>,
    limit: Duration,
}

impl DeadlineBackend {
    pub fn new(inner: Arc<dyn FarmBackend>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    async fn guard<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                let after_ms = self.limit.as_millis() as u64;
                warn!(backend = %self.inner.id(), operation, after_ms, "Abandoned collaborator call");
                Err(BackendError::Timeout { operation, after_ms })
            }
        }
    }
}

#[async_trait]
impl FarmBackend for DeadlineBackend {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn list_tanks(&self) -> Result<Vec<Tank>> {
        self.guard("list_tanks", self.inner.list_tanks()).await
    }

    async fn create_tank(&self, tank: &Tank) -> Result<Tank> {
        self.guard("create_tank", self.inner.create_tank(tank)).await
    }

    async fn update_tank(&self, id: &str, tank: &Tank) -> Result<Tank> {
        self.guard("update_tank", self.inner.update_tank(id, tank)).await
    }

    async fn list_breeding_records(&self) -> Result<Vec<BreedingRecord>> {
        self.guard("list_breeding_records", self.inner.list_breeding_records())
            .await
    }

    async fn create_breeding_record(&self, draft: &BreedingDraft) -> Result<BreedingRecord> {
        self.guard(
            "create_breeding_record",
            self.inner.create_breeding_record(draft),
        )
        .await
    }

    async fn update_breeding_record(
        &self,
        id: &str,
        draft: &BreedingDraft,
    ) -> Result<BreedingRecord> {
        self.guard(
            "update_breeding_record",
            self.inner.update_breeding_record(id, draft),
        )
        .await
    }

    async fn delete_breeding_record(&self, id: &str) -> Result<bool> {
        self.guard("delete_breeding_record", self.inner.delete_breeding_record(id))
            .await
    }

    async fn list_baby_records(&self) -> Result<Vec<BabyRecord>> {
        self.guard("list_baby_records", self.inner.list_baby_records())
            .await
    }

    async fn create_baby_record(&self, draft: &BabyDraft) -> Result<BabyRecord> {
        self.guard("create_baby_record", self.inner.create_baby_record(draft))
            .await
    }

    async fn update_baby_record(&self, id: &str, draft: &BabyDraft) -> Result<BabyRecord> {
        self.guard(
            "update_baby_record",
            self.inner.update_baby_record(id, draft),
        )
        .await
    }

    async fn delete_baby_record(&self, id: &str) -> Result<bool> {
        self.guard("delete_baby_record", self.inner.delete_baby_record(id))
            .await
    }
}
