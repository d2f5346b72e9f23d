//! Point-in-time view of the shared collections
//!
//! Every decision in this crate is made against a snapshot fetched for that
//! decision. Nothing is cached between operations.

use chrono::{DateTime, Utc};
use hatchery_client::{BabyRecord, BreedingRecord, FarmBackend, Tank};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{HatcheryError, Result};
use crate::occupancy::{Occupancy, OccupancyResolver, TankPool};

#[derive(Debug, Clone, Serialize)]
pub struct FarmSnapshot {
    pub tanks: Vec<Tank>,
    pub breeding_records: Vec<BreedingRecord>,
    pub baby_records: Vec<BabyRecord>,
    /// False when `/babies` failed and the batch list was taken as empty
    pub babies_fetched: bool,
    pub fetched_at: DateTime<Utc>,
}

impl FarmSnapshot {
    /// Fetch tanks, breeding records and baby records.
    ///
    /// Tanks and breeding records are required. Some deployments have no
    /// `/babies` endpoint at all, so a failed baby fetch yields an empty list.
    pub async fn fetch(backend: &dyn FarmBackend, now: DateTime<Utc>) -> Result<Self> {
        Self::fetch_with(backend, now, false).await
    }

    /// Fetch for a baby-tank claim.
    ///
    /// An absent `/babies` endpoint still reads as no batches, but any other
    /// baby fetch failure is returned: an empty list would show every baby
    /// tank as free.
    pub async fn fetch_for_allocation(backend: &dyn FarmBackend, now: DateTime<Utc>) -> Result<Self> {
        Self::fetch_with(backend, now, true).await
    }

    async fn fetch_with(backend: &dyn FarmBackend, now: DateTime<Utc>, strict_babies: bool) -> Result<Self> {
        let (tanks, breeding, babies) = tokio::join!(
            backend.list_tanks(),
            backend.list_breeding_records(),
            backend.list_baby_records(),
        );

        let tanks = tanks?;
        let breeding_records = breeding?;
        let (baby_records, babies_fetched) = match babies {
            Ok(babies) => (babies, true),
            Err(e) if strict_babies && !e.is_not_found() => {
                warn!(backend = %backend.id(), error = %e, "Baby records unavailable, refusing to allocate");
                return Err(e.into());
            }
            Err(e) => {
                warn!(backend = %backend.id(), error = %e, "Baby records unavailable, treating as empty");
                (Vec::new(), false)
            }
        };

        debug!(
            tanks = tanks.len(),
            breeding = breeding_records.len(),
            babies = baby_records.len(),
            "Fetched farm snapshot"
        );

        Ok(Self {
            tanks,
            breeding_records,
            baby_records,
            babies_fetched,
            fetched_at: now,
        })
    }

    pub fn pool(&self) -> TankPool<'_> {
        TankPool::new(&self.tanks)
    }

    pub fn breeding_occupancy(&self) -> Occupancy {
        OccupancyResolver::resolve(&self.tanks, &self.breeding_records)
    }

    pub fn baby_occupancy(&self) -> Occupancy {
        OccupancyResolver::resolve(&self.tanks, &self.baby_records)
    }

    pub fn breeding_record(&self, id: &str) -> Result<&BreedingRecord> {
        self.breeding_records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| HatcheryError::NotFound {
                kind: "breeding record",
                id: id.to_string(),
            })
    }

    pub fn baby_record(&self, id: &str) -> Result<&BabyRecord> {
        self.baby_records
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| HatcheryError::NotFound {
                kind: "baby record",
                id: id.to_string(),
            })
    }

    /// Batches that belong to one breeding cycle.
    pub fn babies_of<'a>(&'a self, breeding_id: &'a str) -> impl Iterator<Item = &'a BabyRecord> + 'a {
        self.baby_records
            .iter()
            .filter(move |b| b.breeding_id == breeding_id)
    }
}
