//! Tank allocation and breeding-lifecycle tracking
//!
//! Several clients share one pool of tanks through a REST collaborator that
//! has no locking. This crate decides which tanks are free, validates and
//! writes breeding cycles and baby batches, cascades deletes, and derives the
//! dashboard figures.
//!
//! ```text
//! FarmBackend ──► FarmSnapshot ──► OccupancyResolver ──► managers / dashboard
//! ```
//!
//! Every decision is made against a snapshot fetched for that decision.
//!
//! # Example
//!
//! ```rust,no_run
//! use hatchery_core::{BreedingForm, Hatchery, HatcheryConfig};
//!
//! # async fn example() -> hatchery_core::Result<()> {
//! let hatchery = Hatchery::from_config(&HatcheryConfig::load("hatchery.toml")?)?;
//!
//! let free = hatchery.breeding().list_available_tanks().await?;
//! if let Some(tank) = free.available.first() {
//!     let form = BreedingForm {
//!         fish_type: Some("Guppy".into()),
//!         mother_count: Some(3),
//!         father_count: Some(1),
//!         breeding_date: Some(chrono::Utc::now().date_naive()),
//!         tank_id: Some(tank.id.clone()),
//!         description: None,
//!     };
//!     hatchery.breeding().create(&form).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod baby;
pub mod breeding;
pub mod cascade;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod occupancy;
pub mod poller;
pub mod snapshot;
pub mod validation;

use hatchery_client::FarmBackend;
use std::sync::Arc;

pub use baby::{age_days, AgeCategory, BabyRecordManager, BabyView};
pub use breeding::BreedingRecordManager;
pub use cascade::{CascadeFailure, CascadePolicy, CascadeReport, LifecycleCascade, DEFAULT_CASCADE_POLICY};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::HatcheryConfig;
pub use dashboard::{DashboardAggregator, DashboardSummary, SuccessRate, SuccessStatus, TimeWindow};
pub use error::{FieldError, HatcheryError, Result, ValidationErrors};
pub use occupancy::{Occupancy, OccupancyResolver, TankPool};
pub use poller::{PollerConfig, PollerHandle, SnapshotPoller};
pub use snapshot::FarmSnapshot;
pub use validation::{BabyForm, BreedingForm};

/// Entry point wiring one backend, clock and cascade policy into the managers.
pub struct Hatchery {
    backend: Arc<dyn FarmBackend>,
    clock: Arc<dyn Clock>,
    breeding: BreedingRecordManager,
    babies: BabyRecordManager,
}

impl Hatchery {
    pub fn new(backend: Arc<dyn FarmBackend>, clock: Arc<dyn Clock>, policy: CascadePolicy) -> Self {
        Self {
            breeding: BreedingRecordManager::new(backend.clone(), clock.clone(), policy),
            babies: BabyRecordManager::new(backend.clone(), clock.clone()),
            backend,
            clock,
        }
    }

    /// HTTP backend and wall clock as configured.
    pub fn from_config(config: &HatcheryConfig) -> Result<Self> {
        Ok(Self::new(
            config.build_backend()?,
            Arc::new(SystemClock),
            config.allocation.cascade_policy,
        ))
    }

    pub fn backend(&self) -> &Arc<dyn FarmBackend> {
        &self.backend
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn breeding(&self) -> &BreedingRecordManager {
        &self.breeding
    }

    pub fn babies(&self) -> &BabyRecordManager {
        &self.babies
    }

    pub async fn snapshot(&self) -> Result<FarmSnapshot> {
        FarmSnapshot::fetch(self.backend.as_ref(), self.clock.now()).await
    }

    pub async fn dashboard(&self, window: TimeWindow) -> Result<DashboardSummary> {
        let snapshot = self.snapshot().await?;
        Ok(DashboardAggregator::summarize(&snapshot, window, self.clock.now()))
    }

    pub fn poll(&self, config: PollerConfig) -> PollerHandle {
        SnapshotPoller::spawn(self.backend.clone(), self.clock.clone(), config)
    }
}
