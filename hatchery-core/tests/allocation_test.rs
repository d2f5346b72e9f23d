//! Tank allocation integration tests
//!
//! Runs the managers against the in-memory backend, including one configured
//! to reject double bookings the way a server with a uniqueness constraint
//! would.

mod common;

use async_trait::async_trait;
use common::*;
use hatchery_client::{
    BabyDraft, BabyRecord, BackendCall, BreedingDraft, BreedingRecord, FarmBackend, HealthStatus,
    MemoryBackend, Result as ClientResult, Tank, TankLocation,
};
use hatchery_core::{BabyForm, CascadePolicy, FixedClock, Hatchery, HatcheryError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Breeding tanks
// ============================================================================

#[tokio::test]
async fn test_breeding_allocation_b1_b2() {
    let backend = Arc::new(MemoryBackend::new().with_tanks(farm_tanks()));
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    let free = hatchery.breeding().list_available_tanks().await.unwrap();
    assert_eq!(free.available_ids(), vec!["b1", "b2"]);

    hatchery.breeding().create(&breeding_form("b1")).await.unwrap();
    let free = hatchery.breeding().list_available_tanks().await.unwrap();
    assert_eq!(free.available_ids(), vec!["b2"]);
    assert_eq!(free.in_use_ids(), vec!["b1"]);

    backend.reset_calls().await;
    let err = hatchery.breeding().create(&breeding_form("b1")).await.unwrap_err();
    match err {
        HatcheryError::TankUnavailable { tank_id, category, refreshed } => {
            assert_eq!(tank_id, "b1");
            assert_eq!(category, TankLocation::Breeding);
            assert_eq!(refreshed.available_ids(), vec!["b2"]);
        }
        other => panic!("expected TankUnavailable, got {:?}", other),
    }
    assert!(backend.writes().await.is_empty(), "rejected create must not write");

    hatchery.breeding().create(&breeding_form("b2")).await.unwrap();
    let free = hatchery.breeding().list_available_tanks().await.unwrap();
    assert!(free.available.is_empty());
    assert_eq!(free.utilization(), 1.0);
}

#[tokio::test]
async fn test_non_breeding_tank_is_a_validation_error() {
    let backend = Arc::new(MemoryBackend::new().with_tanks(farm_tanks()));
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    let err = hatchery.breeding().create(&breeding_form("y1")).await.unwrap_err();
    assert!(err.is_validation());

    let err = hatchery.breeding().create(&breeding_form("missing")).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_future_breeding_date_rejected_without_network() {
    let backend = Arc::new(MemoryBackend::new().with_tanks(farm_tanks()));
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    let mut form = breeding_form("b1");
    form.breeding_date = Some(today().succ_opt().unwrap());

    let err = hatchery.breeding().create(&form).await.unwrap_err();
    match err {
        HatcheryError::Validation(errors) => assert!(errors.has_field("breeding_date")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn test_claim_sees_records_written_by_other_clients() {
    let backend = Arc::new(MemoryBackend::new().with_tanks(farm_tanks()));
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    // Futures are lazy: the create below fetches after the other client wrote
    let form = breeding_form("b1");
    let ours = hatchery.breeding().create(&form);
    backend
        .insert_breeding_record(breeding_record("other", "b1", 1, 1, days_ago(1)))
        .await;

    let err = ours.await.unwrap_err();
    assert!(err.is_tank_unavailable(), "got {:?}", err);
    assert!(backend.writes().await.is_empty());
    assert_eq!(backend.breeding_records().await.len(), 1);
}

/// Serves one stale, empty baby listing, then passes everything through.
struct StaleOnce {
    inner: Arc<MemoryBackend>,
    stale: AtomicBool,
}

#[async_trait]
impl FarmBackend for StaleOnce {
    fn id(&self) -> &str {
        "stale-once"
    }

    async fn list_tanks(&self) -> ClientResult<Vec<Tank>> {
        self.inner.list_tanks().await
    }

    async fn create_tank(&self, tank: &Tank) -> ClientResult<Tank> {
        self.inner.create_tank(tank).await
    }

    async fn update_tank(&self, id: &str, tank: &Tank) -> ClientResult<Tank> {
        self.inner.update_tank(id, tank).await
    }

    async fn list_breeding_records(&self) -> ClientResult<Vec<BreedingRecord>> {
        self.inner.list_breeding_records().await
    }

    async fn create_breeding_record(&self, draft: &BreedingDraft) -> ClientResult<BreedingRecord> {
        self.inner.create_breeding_record(draft).await
    }

    async fn update_breeding_record(&self, id: &str, draft: &BreedingDraft) -> ClientResult<BreedingRecord> {
        self.inner.update_breeding_record(id, draft).await
    }

    async fn delete_breeding_record(&self, id: &str) -> ClientResult<bool> {
        self.inner.delete_breeding_record(id).await
    }

    async fn list_baby_records(&self) -> ClientResult<Vec<BabyRecord>> {
        if self.stale.swap(false, Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        self.inner.list_baby_records().await
    }

    async fn create_baby_record(&self, draft: &BabyDraft) -> ClientResult<BabyRecord> {
        self.inner.create_baby_record(draft).await
    }

    async fn update_baby_record(&self, id: &str, draft: &BabyDraft) -> ClientResult<BabyRecord> {
        self.inner.update_baby_record(id, draft).await
    }

    async fn delete_baby_record(&self, id: &str) -> ClientResult<bool> {
        self.inner.delete_baby_record(id).await
    }
}

#[tokio::test]
async fn test_server_conflict_carries_refreshed_pool() {
    let memory = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([breeding_record("br-1", "b1", 1, 1, days_ago(5))])
            .with_baby_records([baby_record("theirs", "br-1", "y1", 10, days_ago(1))])
            .with_unique_tank_claims(),
    );
    let backend = Arc::new(StaleOnce {
        inner: memory.clone(),
        stale: AtomicBool::new(true),
    });
    let hatchery = Hatchery::new(backend, Arc::new(FixedClock::on(today())), CascadePolicy::AbortAndReport);

    // Local check sees y1 free, the server refuses the write
    let err = hatchery
        .babies()
        .create(&baby_form("br-1", "y1", 10))
        .await
        .unwrap_err();

    match err {
        HatcheryError::TankUnavailable { tank_id, refreshed, .. } => {
            assert_eq!(tank_id, "y1");
            assert_eq!(refreshed.category, TankLocation::Baby);
            assert_eq!(refreshed.in_use_ids(), vec!["y1"]);
            assert_eq!(refreshed.available_ids(), vec!["y2"]);
        }
        other => panic!("expected TankUnavailable, got {:?}", other),
    }
    assert_eq!(memory.baby_records().await.len(), 1);
}

// ============================================================================
// Baby batches
// ============================================================================

#[tokio::test]
async fn test_baby_requires_existing_breeding_record() {
    let backend = Arc::new(MemoryBackend::new().with_tanks(farm_tanks()));
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    let err = hatchery
        .babies()
        .create(&baby_form("ghost", "y1", 10))
        .await
        .unwrap_err();
    match err {
        HatcheryError::Validation(errors) => assert!(errors.has_field("breeding_id")),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(backend.writes().await.is_empty());
}

#[tokio::test]
async fn test_baby_claims_refused_when_batches_cannot_be_listed() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([breeding_record("br-1", "b1", 2, 1, days_ago(10))])
            .with_baby_records([baby_record("a", "br-1", "y1", 20, days_ago(2))]),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);
    backend.fail_on(BackendCall::ListBabies).await;

    let err = hatchery
        .babies()
        .create(&baby_form("br-1", "y1", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, HatcheryError::Backend(_)), "got {:?}", err);

    let err = hatchery.babies().transfer_tank("a", "y2").await.unwrap_err();
    assert!(matches!(err, HatcheryError::Backend(_)), "got {:?}", err);

    assert!(backend.writes().await.is_empty());
    let on_y1 = backend
        .baby_records()
        .await
        .iter()
        .filter(|b| b.baby_tank_id == "y1")
        .count();
    assert_eq!(on_y1, 1);

    // Read-only views still degrade to an empty batch list
    let snapshot = hatchery.snapshot().await.unwrap();
    assert!(!snapshot.babies_fetched);
}

#[tokio::test]
async fn test_baby_claims_allowed_without_babies_endpoint() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([breeding_record("br-1", "b1", 2, 1, days_ago(10))])
            .without_babies_endpoint(),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    let err = hatchery
        .babies()
        .create(&baby_form("br-1", "y1", 10))
        .await
        .unwrap_err();
    // The claim gets past the availability check and fails on the write itself
    assert!(matches!(err, HatcheryError::Backend(ref e) if e.is_not_found()), "got {:?}", err);
    assert!(backend.baby_records().await.is_empty());
}

#[tokio::test]
async fn test_update_cannot_change_parent_breeding_record() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([
                breeding_record("br-1", "b1", 2, 1, days_ago(10)),
                breeding_record("br-2", "b2", 2, 1, days_ago(8)),
            ])
            .with_baby_records([baby_record("a", "br-1", "y1", 20, days_ago(2))]),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);
    let stored = hatchery.babies().get("a").await.unwrap();

    for parent in ["br-2", "ghost"] {
        let mut form = BabyForm::from_record(&stored);
        form.breeding_id = Some(parent.into());
        match hatchery.babies().update("a", &form).await.unwrap_err() {
            HatcheryError::Validation(errors) => assert!(errors.has_field("breeding_id")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
    assert!(backend.writes().await.is_empty());

    // Leaving the parent out keeps the stored one
    let mut form = BabyForm::from_record(&stored);
    form.breeding_id = None;
    form.description = Some("moved to shade".into());
    let updated = hatchery.babies().update("a", &form).await.unwrap();
    assert_eq!(updated.breeding_id, "br-1");
    assert_eq!(updated.description, "moved to shade");
}

#[tokio::test]
async fn test_mortality_scenario() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([breeding_record("br-1", "b1", 2, 1, days_ago(10))]),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    let batch = hatchery
        .babies()
        .create(&baby_form("br-1", "y1", 50))
        .await
        .unwrap();
    assert_eq!(batch.current_count(), 50);

    let batch = hatchery.babies().record_mortality(&batch.id, 12).await.unwrap();
    assert_eq!(batch.mortality_count, 12);
    assert_eq!(batch.current_count(), 38);

    backend.reset_calls().await;
    let err = hatchery.babies().set_mortality(&batch.id, 60).await.unwrap_err();
    assert!(err.is_validation());
    assert!(backend.writes().await.is_empty(), "rejected mortality must not write");

    let err = hatchery.babies().record_mortality(&batch.id, 0).await.unwrap_err();
    assert!(err.is_validation());
    let err = hatchery.babies().set_mortality(&batch.id, -1).await.unwrap_err();
    assert!(err.is_validation());

    let batch = hatchery.babies().set_mortality(&batch.id, 50).await.unwrap();
    assert_eq!(batch.current_count(), 0);
    assert_eq!(backend.baby_records().await[0].mortality_count, 50);
}

#[tokio::test]
async fn test_transfer_moves_batch_and_frees_old_tank() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([breeding_record("br-1", "b1", 2, 1, days_ago(10))])
            .with_baby_records([baby_record("a", "br-1", "y1", 20, days_ago(2))]),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    let moved = hatchery.babies().transfer_tank("a", "y2").await.unwrap();
    assert_eq!(moved.baby_tank_id, "y2");
    assert_eq!(moved.previous_tank_id.as_deref(), Some("y1"));
    assert_eq!(moved.transfer_date.map(|t| t.date_naive()), Some(today()));

    let free = hatchery.babies().list_available_tanks().await.unwrap();
    assert_eq!(free.available_ids(), vec!["y1"]);
    assert_eq!(free.in_use_ids(), vec!["y2"]);
}

#[tokio::test]
async fn test_transfer_rejects_own_and_occupied_tanks() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([breeding_record("br-1", "b1", 2, 1, days_ago(10))])
            .with_baby_records([
                baby_record("a", "br-1", "y1", 20, days_ago(2)),
                baby_record("b", "br-1", "y2", 15, days_ago(2)),
            ]),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    assert!(hatchery.babies().transfer_tank("a", "y1").await.unwrap_err().is_validation());
    assert!(hatchery.babies().transfer_tank("a", "y2").await.unwrap_err().is_tank_unavailable());
    assert!(hatchery.babies().transfer_tank("a", "b2").await.unwrap_err().is_validation());
    assert!(matches!(
        hatchery.babies().transfer_tank("zzz", "y2").await,
        Err(HatcheryError::NotFound { .. })
    ));
    assert!(backend.writes().await.is_empty());
}

#[tokio::test]
async fn test_transfer_checks_fresh_state() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([breeding_record("br-1", "b1", 2, 1, days_ago(10))])
            .with_baby_records([baby_record("a", "br-1", "y1", 20, days_ago(2))]),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    // Candidate list taken before another client fills y2
    let candidates = hatchery.babies().list_available_tanks().await.unwrap();
    assert!(candidates.is_available("y2"));
    backend
        .insert_baby_record(baby_record("other", "br-1", "y2", 5, days_ago(1)))
        .await;

    let err = hatchery.babies().transfer_tank("a", "y2").await.unwrap_err();
    assert!(err.is_tank_unavailable());
    assert!(!backend.writes().await.contains(&BackendCall::UpdateBaby("a".into())));
}

#[tokio::test]
async fn test_update_keeps_transfer_history() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([breeding_record("br-1", "b1", 2, 1, days_ago(10))])
            .with_baby_records([baby_record("a", "br-1", "y1", 20, days_ago(2))]),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);
    let moved = hatchery.babies().transfer_tank("a", "y2").await.unwrap();

    let mut form = BabyForm::from_record(&moved);
    form.health_status = Some(HealthStatus::Concern);
    let updated = hatchery.babies().update("a", &form).await.unwrap();

    assert_eq!(updated.health_status, HealthStatus::Concern);
    assert_eq!(updated.previous_tank_id.as_deref(), Some("y1"));
    assert!(updated.transfer_date.is_some());

    form.baby_tank_id = Some("y1".into());
    assert!(hatchery.babies().update("a", &form).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_single_batch_delete_frees_tank() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_breeding_records([breeding_record("br-1", "b1", 2, 1, days_ago(10))])
            .with_baby_records([baby_record("a", "br-1", "y1", 20, days_ago(2))]),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    assert!(hatchery.babies().delete("a").await.unwrap());
    assert!(!hatchery.babies().delete("a").await.unwrap());

    let free = hatchery.babies().list_available_tanks().await.unwrap();
    assert_eq!(free.available_ids(), vec!["y1", "y2"]);
    assert_eq!(backend.breeding_records().await.len(), 1);
}

#[tokio::test]
async fn test_baby_views_carry_age() {
    let backend = Arc::new(
        MemoryBackend::new()
            .with_tanks(farm_tanks())
            .with_baby_records([baby_record("a", "br-1", "y1", 20, days_ago(45))]),
    );
    let hatchery = hatchery(&backend, CascadePolicy::AbortAndReport);

    let views = hatchery.babies().list().await.unwrap();
    assert_eq!(views.len(), 1);
    // FixedClock sits at noon, so 45 days and half a day rounds up
    assert_eq!(views[0].age_days, 46);
    assert_eq!(views[0].age_category, hatchery_core::AgeCategory::Young);
}
