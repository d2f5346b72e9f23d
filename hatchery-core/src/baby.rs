//! Baby batch management: allocation, mortality, transfers and age

use chrono::{DateTime, NaiveDate, Utc};
use hatchery_client::{BabyDraft, BabyRecord, BackendError, FarmBackend, HealthStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{HatcheryError, Result, ValidationErrors};
use crate::occupancy::Occupancy;
use crate::snapshot::FarmSnapshot;
use crate::validation::{checked_mortality, BabyForm};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Whole days since birth, rounded up and never negative.
///
/// Birth dates are calendar days, taken as midnight UTC.
pub fn age_days(birth_date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let born = birth_date.and_time(chrono::NaiveTime::MIN).and_utc();
    let elapsed = (now - born).num_milliseconds();
    if elapsed <= 0 {
        return 0;
    }
    (elapsed + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Growth stage by age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AgeCategory {
    Newborn,
    Juvenile,
    Young,
    Mature,
}

impl AgeCategory {
    pub const ALL: [AgeCategory; 4] = [
        AgeCategory::Newborn,
        AgeCategory::Juvenile,
        AgeCategory::Young,
        AgeCategory::Mature,
    ];

    pub fn from_age(days: i64) -> Self {
        match days {
            d if d < 7 => AgeCategory::Newborn,
            d if d < 30 => AgeCategory::Juvenile,
            d if d < 90 => AgeCategory::Young,
            _ => AgeCategory::Mature,
        }
    }
}

/// A batch with its derived values filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BabyView {
    #[serde(flatten)]
    pub record: BabyRecord,
    pub current_count: u32,
    pub age_days: i64,
    pub age_category: AgeCategory,
}

impl BabyView {
    pub fn new(record: BabyRecord, now: DateTime<Utc>) -> Self {
        let age = age_days(record.birth_date, now);
        Self {
            current_count: record.current_count(),
            age_days: age,
            age_category: AgeCategory::from_age(age),
            record,
        }
    }
}

/// Creates and maintains baby batches against the baby-tank pool.
pub struct BabyRecordManager {
    backend: Arc<dyn FarmBackend>,
    clock: Arc<dyn Clock>,
}

impl BabyRecordManager {
    pub fn new(backend: Arc<dyn FarmBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub async fn list(&self) -> Result<Vec<BabyView>> {
        let now = self.clock.now();
        Ok(self
            .backend
            .list_baby_records()
            .await?
            .into_iter()
            .map(|b| BabyView::new(b, now))
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<BabyRecord> {
        self.backend
            .list_baby_records()
            .await?
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| HatcheryError::NotFound {
                kind: "baby record",
                id: id.to_string(),
            })
    }

    /// Baby tanks as of a fresh fetch.
    pub async fn list_available_tanks(&self) -> Result<Occupancy> {
        Ok(self.snapshot().await?.baby_occupancy())
    }

    /// Record a new batch from an existing breeding cycle.
    pub async fn create(&self, form: &BabyForm) -> Result<BabyRecord> {
        let draft = form.validate(self.clock.today())?;

        let snapshot = self.allocation_snapshot().await?;
        if snapshot.breeding_record(&draft.breeding_id).is_err() {
            return Err(ValidationErrors::single(
                "breeding_id",
                format!("{} is not an existing breeding record", draft.breeding_id),
            )
            .into());
        }
        snapshot
            .baby_occupancy()
            .ensure_available(&draft.baby_tank_id, "baby_tank_id")?;

        match self.backend.create_baby_record(&draft).await {
            Ok(record) => {
                info!(
                    baby_id = %record.id,
                    breeding_id = %record.breeding_id,
                    tank_id = %record.baby_tank_id,
                    "Created baby record"
                );
                Ok(record)
            }
            Err(e) => Err(self.claim_failed(&draft.baby_tank_id, e).await),
        }
    }

    /// Edit a batch in place. Moving it to another tank goes through
    /// [`transfer_tank`](Self::transfer_tank); the parent breeding cycle is
    /// fixed for the life of the batch.
    pub async fn update(&self, id: &str, form: &BabyForm) -> Result<BabyRecord> {
        let stored = self.get(id).await?;

        let mut form = form.clone();
        let breeding_id = form.breeding_id.get_or_insert_with(|| stored.breeding_id.clone());
        if breeding_id.trim() != stored.breeding_id {
            return Err(ValidationErrors::single(
                "breeding_id",
                "a batch cannot be moved to another breeding record",
            )
            .into());
        }
        let tank_id = form.baby_tank_id.get_or_insert_with(|| stored.baby_tank_id.clone());
        if tank_id.trim() != stored.baby_tank_id {
            return Err(ValidationErrors::single(
                "baby_tank_id",
                "use a transfer to move a batch to another tank",
            )
            .into());
        }

        let mut draft = form.validate(self.clock.today())?;
        draft.previous_tank_id = stored.previous_tank_id.clone();
        draft.transfer_date = stored.transfer_date;

        let record = self.backend.update_baby_record(id, &draft).await?;
        info!(baby_id = %id, "Updated baby record");
        Ok(record)
    }

    /// Remove one batch, freeing its tank. Returns `false` if it was already gone.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.backend.delete_baby_record(id).await?;
        if deleted {
            info!(baby_id = %id, "Deleted baby record");
        } else {
            warn!(baby_id = %id, "Baby record already deleted");
        }
        Ok(deleted)
    }

    /// Add `delta` deaths to a batch.
    pub async fn record_mortality(&self, id: &str, delta: i64) -> Result<BabyRecord> {
        if delta <= 0 {
            return Err(ValidationErrors::single("mortality_count", "deaths to record must be at least 1").into());
        }
        let stored = self.get(id).await?;
        let total = u32::try_from(delta)
            .ok()
            .and_then(|d| stored.mortality_count.checked_add(d))
            .ok_or_else(|| ValidationErrors::single("mortality_count", "is too large"))?;
        self.write_mortality(stored, total).await
    }

    /// Replace a batch's mortality total.
    pub async fn set_mortality(&self, id: &str, count: i64) -> Result<BabyRecord> {
        let count = u32::try_from(count)
            .map_err(|_| ValidationErrors::single("mortality_count", "must not be negative"))?;
        let stored = self.get(id).await?;
        self.write_mortality(stored, count).await
    }

    /// Move a batch to another free baby tank.
    ///
    /// Availability is checked against a fetch made right before the write,
    /// not against whatever list the caller picked the tank from.
    pub async fn transfer_tank(&self, id: &str, new_tank_id: &str) -> Result<BabyRecord> {
        let new_tank_id = new_tank_id.trim();
        if new_tank_id.is_empty() {
            return Err(ValidationErrors::single("baby_tank_id", "is required").into());
        }

        let snapshot = self.allocation_snapshot().await?;
        let stored = snapshot.baby_record(id)?.clone();
        if stored.baby_tank_id == new_tank_id {
            return Err(ValidationErrors::single(
                "baby_tank_id",
                format!("batch is already in tank {}", new_tank_id),
            )
            .into());
        }
        snapshot
            .baby_occupancy()
            .ensure_available(new_tank_id, "baby_tank_id")?;

        let draft = BabyDraft {
            previous_tank_id: Some(stored.baby_tank_id.clone()),
            transfer_date: Some(self.clock.now()),
            baby_tank_id: new_tank_id.to_string(),
            ..stored.to_draft()
        };

        match self.backend.update_baby_record(id, &draft).await {
            Ok(record) => {
                info!(
                    baby_id = %id,
                    from = %stored.baby_tank_id,
                    to = %new_tank_id,
                    "Transferred baby batch"
                );
                Ok(record)
            }
            Err(e) => Err(self.claim_failed(new_tank_id, e).await),
        }
    }

    async fn write_mortality(&self, stored: BabyRecord, mortality: u32) -> Result<BabyRecord> {
        let mortality = checked_mortality(stored.original_count, mortality)?;
        let draft = BabyDraft {
            mortality_count: mortality,
            current_count: stored.original_count - mortality,
            ..stored.to_draft()
        };
        let record = self.backend.update_baby_record(&stored.id, &draft).await?;
        info!(
            baby_id = %stored.id,
            mortality = mortality,
            current = record.current_count(),
            "Recorded mortality"
        );
        if record.health_status >= HealthStatus::Sick {
            warn!(baby_id = %stored.id, health = %record.health_status.as_str(), "Mortality in an unwell batch");
        }
        Ok(record)
    }

    async fn snapshot(&self) -> Result<FarmSnapshot> {
        FarmSnapshot::fetch(self.backend.as_ref(), self.clock.now()).await
    }

    async fn allocation_snapshot(&self) -> Result<FarmSnapshot> {
        FarmSnapshot::fetch_for_allocation(self.backend.as_ref(), self.clock.now()).await
    }

    async fn claim_failed(&self, tank_id: &str, error: BackendError) -> HatcheryError {
        if !error.is_conflict() {
            return error.into();
        }
        warn!(tank_id = %tank_id, "Baby tank claimed concurrently");
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
