//! Cascade delete of a breeding cycle and its baby batches
//!
//! There is no transaction on the collaborator. Batches are deleted one by
//! one and the breeding record is deleted last, so a failure part way through
//! leaves some batches gone and the parent still present. The policy decides
//! what happens after the first failure; either way the caller gets a report.

use hatchery_client::{BabyRecord, FarmBackend};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{HatcheryError, Result};

/// What to do after a batch delete fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CascadePolicy {
    /// Stop at the first failure. Remaining batches and the parent are left
    /// untouched.
    #[serde(alias = "abort")]
    AbortAndReport,
    /// Attempt every batch, then the parent, whatever failed before.
    #[serde(alias = "best-effort")]
    BestEffortAndReport,
}

pub const DEFAULT_CASCADE_POLICY: CascadePolicy = CascadePolicy::AbortAndReport;

impl Default for CascadePolicy {
    fn default() -> Self {
        DEFAULT_CASCADE_POLICY
    }
}

impl CascadePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadePolicy::AbortAndReport => "abort-and-report",
            CascadePolicy::BestEffortAndReport => "best-effort-and-report",
        }
    }
}

impl fmt::Display for CascadePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CascadePolicy {
    type Err = HatcheryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "abort-and-report" => Ok(CascadePolicy::AbortAndReport),
            "best-effort" | "best-effort-and-report" => Ok(CascadePolicy::BestEffortAndReport),
            other => Err(HatcheryError::Config(format!(
                "unknown cascade policy '{}' (expected abort-and-report or best-effort-and-report)",
                other
            ))),
        }
    }
}

/// A batch that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeFailure {
    pub baby_id: String,
    pub message: String,
}

/// Outcome of one cascade delete.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub breeding_id: String,
    pub policy: CascadePolicy,
    pub deleted_babies: Vec<String>,
    pub failed_babies: Vec<CascadeFailure>,
    /// Batches never attempted because the cascade stopped
    pub skipped_babies: Vec<String>,
    /// Tank ids freed by the deletes that succeeded
    pub released_tanks: Vec<String>,
    pub breeding_deleted: bool,
    pub breeding_error: Option<String>,
}

impl CascadeReport {
    fn new(breeding_id: &str, policy: CascadePolicy) -> Self {
        Self {
            breeding_id: breeding_id.to_string(),
            policy,
            deleted_babies: Vec::new(),
            failed_babies: Vec::new(),
            skipped_babies: Vec::new(),
            released_tanks: Vec::new(),
            breeding_deleted: false,
            breeding_error: None,
        }
    }

    /// Every batch and the parent are gone.
    pub fn is_complete(&self) -> bool {
        self.breeding_deleted && self.failed_babies.is_empty() && self.skipped_babies.is_empty()
    }
}

impl fmt::Display for CascadeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "breeding record {}: {} batches deleted, {} failed, {} skipped, parent {}",
            self.breeding_id,
            self.deleted_babies.len(),
            self.failed_babies.len(),
            self.skipped_babies.len(),
            if self.breeding_deleted { "deleted" } else { "kept" }
        )?;
        if let Some(error) = &self.breeding_error {
            write!(f, " ({})", error)?;
        }
        Ok(())
    }
}

/// Deletes a breeding record together with its dependent batches.
pub struct LifecycleCascade {
    backend: Arc<dyn FarmBackend>,
    policy: CascadePolicy,
}

impl LifecycleCascade {
    pub fn new(backend: Arc<dyn FarmBackend>, policy: CascadePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> CascadePolicy {
        self.policy
    }

    /// Delete every batch of `breeding_id`, then the record itself.
    ///
    /// Returns the report when everything was deleted and
    /// [`HatcheryError::PartialCascade`] carrying it otherwise. Nothing is
    /// deleted if the record or its batches cannot be listed.
    pub async fn delete_breeding_record(&self, breeding_id: &str) -> Result<CascadeReport> {
        let (breeding, babies) = tokio::join!(
            self.backend.list_breeding_records(),
            self.backend.list_baby_records(),
        );

        let record = breeding?
            .into_iter()
            .find(|r| r.id == breeding_id)
            .ok_or_else(|| HatcheryError::NotFound {
                kind: "breeding record",
                id: breeding_id.to_string(),
            })?;

        let dependents: Vec<BabyRecord> = match babies {
            Ok(babies) => babies
                .into_iter()
                .filter(|b| b.breeding_id == breeding_id)
                .collect(),
            Err(e) if e.is_not_found() => {
                warn!(breeding_id = %breeding_id, "No baby endpoint, deleting breeding record alone");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let mut report = CascadeReport::new(breeding_id, self.policy);
        let mut pending = dependents.iter();

        for baby in pending.by_ref() {
            match self.backend.delete_baby_record(&baby.id).await {
                Ok(_) => {
                    report.deleted_babies.push(baby.id.clone());
                    report.released_tanks.push(baby.baby_tank_id.clone());
                }
                Err(e) => {
                    warn!(breeding_id = %breeding_id, baby_id = %baby.id, error = %e, "Batch delete failed");
                    report.failed_babies.push(CascadeFailure {
                        baby_id: baby.id.clone(),
                        message: e.to_string(),
                    });
                    if self.policy == CascadePolicy::AbortAndReport {
                        break;
                    }
                }
            }
        }

        report.skipped_babies = pending.map(|b| b.id.clone()).collect();

        let attempt_parent = report.failed_babies.is_empty()
            || self.policy == CascadePolicy::BestEffortAndReport;

        if attempt_parent {
            match self.backend.delete_breeding_record(breeding_id).await {
                Ok(_) => {
                    report.breeding_deleted = true;
                    report.released_tanks.push(record.tank_id.clone());
                }
                Err(e) => {
                    warn!(breeding_id = %breeding_id, error = %e, "Breeding record delete failed");
                    report.breeding_error = Some(e.to_string());
                }
            }
        }

        if report.is_complete() {
            info!(
                breeding_id = %breeding_id,
                batches = report.deleted_babies.len(),
                "Deleted breeding record and its batches"
            );
            Ok(report)
        } else {
            Err(HatcheryError::PartialCascade(Box::new(report)))
        }
    }
}
