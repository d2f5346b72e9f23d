//! Breeding cycle management

use hatchery_client::{BackendError, BreedingRecord, FarmBackend};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cascade::{CascadePolicy, CascadeReport, LifecycleCascade};
use crate::clock::Clock;
use crate::error::{HatcheryError, Result, ValidationErrors};
use crate::occupancy::Occupancy;
use crate::snapshot::FarmSnapshot;
use crate::validation::BreedingForm;

/// Creates, edits and removes breeding cycles against the breeding-tank pool.
pub struct BreedingRecordManager {
    backend: Arc<dyn FarmBackend>,
    clock: Arc<dyn Clock>,
    cascade: LifecycleCascade,
}

impl BreedingRecordManager {
    pub fn new(backend: Arc<dyn FarmBackend>, clock: Arc<dyn Clock>, policy: CascadePolicy) -> Self {
        Self {
            cascade: LifecycleCascade::new(backend.clone(), policy),
            backend,
            clock,
        }
    }

    pub async fn list(&self) -> Result<Vec<BreedingRecord>> {
        Ok(self.backend.list_breeding_records().await?)
    }

    pub async fn get(&self, id: &str) -> Result<BreedingRecord> {
        self.list()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| HatcheryError::NotFound {
                kind: "breeding record",
                id: id.to_string(),
            })
    }

    /// Breeding tanks as of a fresh fetch.
    pub async fn list_available_tanks(&self) -> Result<Occupancy> {
        Ok(self.snapshot().await?.breeding_occupancy())
    }

    /// Start a breeding cycle in an available breeding tank.
    pub async fn create(&self, form: &BreedingForm) -> Result<BreedingRecord> {
        let draft = form.validate(self.clock.today())?;

        let occupancy = self.list_available_tanks().await?;
        occupancy.ensure_available(&draft.tank_id, "tank_id")?;

        match self.backend.create_breeding_record(&draft).await {
            Ok(record) => {
                info!(breeding_id = %record.id, tank_id = %record.tank_id, "Created breeding record");
                Ok(record)
            }
            Err(e) => Err(self.claim_failed(&draft.tank_id, e).await),
        }
    }

    /// Edit a breeding cycle in place. The tank cannot change here.
    pub async fn update(&self, id: &str, form: &BreedingForm) -> Result<BreedingRecord> {
        let stored = self.get(id).await?;

        let mut form = form.clone();
        let tank_id = form.tank_id.get_or_insert_with(|| stored.tank_id.clone());
        if tank_id.trim() != stored.tank_id {
            return Err(ValidationErrors::single(
                "tank_id",
                format!("cannot move a breeding cycle out of tank {}", stored.tank_id),
            )
            .into());
        }

        let draft = form.validate(self.clock.today())?;
        let record = self.backend.update_breeding_record(id, &draft).await?;
        info!(breeding_id = %id, "Updated breeding record");
        Ok(record)
    }

    /// Remove a breeding cycle and every batch born from it.
    pub async fn delete(&self, id: &str) -> Result<CascadeReport> {
        self.cascade.delete_breeding_record(id).await
    }

    async fn snapshot(&self) -> Result<FarmSnapshot> {
        FarmSnapshot::fetch(self.backend.as_ref(), self.clock.now()).await
    }

    /// A conflict from the collaborator means someone else won the tank.
    async fn claim_failed(&self, tank_id: &str, error: BackendError) -> HatcheryError {
        if !error.is_conflict() {
            return error.into();
        }
        warn!(tank_id = %tank_id, "Breeding tank claimed concurrently");
        match self.list_available_tanks().await {
            Ok(refreshed) => HatcheryError::TankUnavailable {
                tank_id: tank_id.to_string(),
                category: refreshed.category,
                refreshed: Box::new(refreshed),
            },
            Err(_) => error.into(),
        }
    }
}
