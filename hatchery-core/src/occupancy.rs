//! Tank pool and occupancy resolution
//!
//! Occupancy is never stored. It is re-derived from a snapshot every time:
//!
//! ```text
//! pool       = tanks where location == category
//! in_use     = pool ∩ { tank id referenced by an active record }
//! available  = pool \ in_use
//! ```
//!
//! The result is advisory. Nothing stops another client from claiming an
//! "available" tank a moment later, and a record deleted elsewhere keeps its
//! tank "in use" here until the next fetch.

use hatchery_client::{BabyRecord, BreedingRecord, Tank, TankLocation};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::error::{HatcheryError, Result, ValidationErrors};

/// A record that holds a tank of one location category.
pub trait TankReference {
    /// Pool the referenced tank is drawn from.
    const CATEGORY: TankLocation;

    fn referenced_tank(&self) -> &str;
}

impl TankReference for BreedingRecord {
    const CATEGORY: TankLocation = TankLocation::Breeding;

    fn referenced_tank(&self) -> &str {
        &self.tank_id
    }
}

impl TankReference for BabyRecord {
    const CATEGORY: TankLocation = TankLocation::Baby;

    fn referenced_tank(&self) -> &str {
        &self.baby_tank_id
    }
}

/// Read-only view over the collaborator's tank collection.
#[derive(Debug, Clone, Copy)]
pub struct TankPool<'a> {
    tanks: &'a [Tank],
}

impl<'a> TankPool<'a> {
    pub fn new(tanks: &'a [Tank]) -> Self {
        Self { tanks }
    }

    pub fn all(&self) -> &'a [Tank] {
        self.tanks
    }

    pub fn find(&self, id: &str) -> Option<&'a Tank> {
        self.tanks.iter().find(|t| t.id == id)
    }

    pub fn in_category(&self, category: TankLocation) -> impl Iterator<Item = &'a Tank> + 'a {
        self.tanks.iter().filter(move |t| t.location == category)
    }

    /// Tank count per location category.
    pub fn counts_by_location(&self) -> HashMap<TankLocation, usize> {
        let mut counts = HashMap::new();
        for tank in self.tanks {
            *counts.entry(tank.location).or_insert(0) += 1;
        }
        counts
    }

    /// Tank codes that appear more than once. Codes are expected unique.
    pub fn duplicate_codes(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for tank in self.tanks {
            if !seen.insert(tank.code.as_str()) && !duplicates.contains(&tank.code) {
                duplicates.push(tank.code.clone());
            }
        }
        duplicates
    }
}

/// Available and in-use tanks of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupancy {
    pub category: TankLocation,
    pub available: Vec<Tank>,
    pub in_use: Vec<Tank>,
    /// Tank ids referenced by records that are not in this category's pool
    /// (deleted tanks, or tanks moved to another location).
    pub dangling_references: Vec<String>,
}

impl Occupancy {
    pub fn is_available(&self, tank_id: &str) -> bool {
        self.available.iter().any(|t| t.id == tank_id)
    }

    pub fn is_in_use(&self, tank_id: &str) -> bool {
        self.in_use.iter().any(|t| t.id == tank_id)
    }

    pub fn available_ids(&self) -> Vec<&str> {
        self.available.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn in_use_ids(&self) -> Vec<&str> {
        self.in_use.iter().map(|t| t.id.as_str()).collect()
    }

    /// Check that `tank_id` may be claimed from this pool.
    ///
    /// An in-use tank is an availability conflict carrying this occupancy; a
    /// tank outside the pool is a validation error on `field`.
    pub fn ensure_available(&self, tank_id: &str, field: &'static str) -> Result<()> {
        if self.is_available(tank_id) {
            return Ok(());
        }
        if self.is_in_use(tank_id) {
            return Err(HatcheryError::TankUnavailable {
                tank_id: tank_id.to_string(),
                category: self.category,
                refreshed: Box::new(self.clone()),
            });
        }
        Err(ValidationErrors::single(field, format!("{} is not a {} tank", tank_id, self.category)).into())
    }

    /// `used / (used + available)`, 0 for an empty pool.
    pub fn utilization(&self) -> f64 {
        let total = self.in_use.len() + self.available.len();
        if total == 0 {
            0.0
        } else {
            self.in_use.len() as f64 / total as f64
        }
    }
}

/// Derives occupancy from a tank list and the active records of one kind.
pub struct OccupancyResolver;

impl OccupancyResolver {
    /// Occupancy of `R::CATEGORY` given every active record of kind `R`.
    pub fn resolve<R: TankReference>(tanks: &[Tank], records: &[R]) -> Occupancy {
        Self::resolve_category(
            tanks,
            R::CATEGORY,
            records.iter().map(|r| r.referenced_tank()),
        )
    }

    pub fn resolve_category<'r>(
        tanks: &[Tank],
        category: TankLocation,
        referenced: impl IntoIterator<Item = &'r str>,
    ) -> Occupancy {
        let referenced: HashSet<&str> = referenced.into_iter().collect();
        let pool = TankPool::new(tanks);

        let (in_use, available): (Vec<Tank>, Vec<Tank>) = pool
            .in_category(category)
            .cloned()
            .partition(|t| referenced.contains(t.id.as_str()));

        let mut dangling_references: Vec<String> = referenced
            .iter()
            .filter(|id| !in_use.iter().any(|t| t.id == **id))
            .map(|id| id.to_string())
            .collect();
        dangling_references.sort();

        Occupancy {
            category,
            available,
            in_use,
            dangling_references,
        }
    }
}
