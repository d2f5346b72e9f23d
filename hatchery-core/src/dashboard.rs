//! Dashboard figures derived from a snapshot
//!
//! Pure functions over [`FarmSnapshot`]; nothing here talks to the backend.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use hatchery_client::{BabyRecord, BreedingRecord, HealthStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::baby::{age_days, AgeCategory};
use crate::error::HatcheryError;
use crate::occupancy::Occupancy;
use crate::snapshot::FarmSnapshot;

/// Date range a dashboard covers, ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Today,
    /// Today and the six days before it
    Week,
    /// Today and the 29 days before it
    Month,
    #[default]
    All,
}

impl TimeWindow {
    /// First day inside the window, `None` for no lower bound.
    pub fn start(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeWindow::Today => Some(today),
            TimeWindow::Week => Some(today - Duration::days(6)),
            TimeWindow::Month => Some(today - Duration::days(29)),
            TimeWindow::All => None,
        }
    }

    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self.start(today) {
            Some(start) => date >= start && date <= today,
            None => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Today => "today",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::All => "all",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = HatcheryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Ok(TimeWindow::Today),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "all" => Ok(TimeWindow::All),
            other => Err(HatcheryError::Config(format!("unknown time window '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SuccessStatus {
    #[serde(rename = "No Babies")]
    NoBabies,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SuccessStatus {
    pub fn from_rate(rate: f64) -> Self {
        if rate >= 80.0 {
            SuccessStatus::Excellent
        } else if rate >= 50.0 {
            SuccessStatus::Good
        } else if rate >= 20.0 {
            SuccessStatus::Fair
        } else {
            SuccessStatus::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuccessStatus::NoBabies => "No Babies",
            SuccessStatus::Excellent => "Excellent",
            SuccessStatus::Good => "Good",
            SuccessStatus::Fair => "Fair",
            SuccessStatus::Poor => "Poor",
        }
    }
}

impl fmt::Display for SuccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuccessRate {
    pub rate: f64,
    pub status: SuccessStatus,
}

/// Success of one breeding cycle, for listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingSuccess {
    pub breeding_id: String,
    pub fish_type: String,
    pub tank_id: String,
    pub breeding_date: NaiveDate,
    pub parents: u32,
    pub total_babies: u32,
    #[serde(flatten)]
    pub success: SuccessRate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolUtilization {
    pub total: usize,
    pub in_use: usize,
    pub available: usize,
    pub utilization: f64,
    pub dangling_references: Vec<String>,
}

impl From<&Occupancy> for PoolUtilization {
    fn from(occupancy: &Occupancy) -> Self {
        Self {
            total: occupancy.in_use.len() + occupancy.available.len(),
            in_use: occupancy.in_use.len(),
            available: occupancy.available.len(),
            utilization: occupancy.utilization(),
            dangling_references: occupancy.dangling_references.clone(),
        }
    }
}

/// Breedings started and batches born on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub breedings: usize,
    pub births: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub window: TimeWindow,
    pub generated_at: DateTime<Utc>,
    pub breeding_count: usize,
    pub batch_count: usize,
    pub total_parents: u32,
    pub total_babies: u32,
    pub total_mortality: u32,
    pub live_population: u32,
    pub breeding_tanks: PoolUtilization,
    pub baby_tanks: PoolUtilization,
    pub success: Vec<BreedingSuccess>,
    pub health: BTreeMap<HealthStatus, usize>,
    pub ages: BTreeMap<AgeCategory, usize>,
    pub trend: Vec<TrendPoint>,
    /// False when baby figures are missing because `/babies` failed
    pub babies_available: bool,
}

pub struct DashboardAggregator;

impl DashboardAggregator {
    /// Offspring per parent for one cycle, as a percentage.
    ///
    /// Only batches whose `breeding_id` matches `record` are counted. A cycle
    /// with no parent on record scores 0 rather than dividing by zero.
    pub fn success_rate(record: &BreedingRecord, babies: &[BabyRecord]) -> SuccessRate {
        let mut batches = babies.iter().filter(|b| b.breeding_id == record.id).peekable();
        if batches.peek().is_none() {
            return SuccessRate {
                rate: 0.0,
                status: SuccessStatus::NoBabies,
            };
        }

        let total: u64 = batches.map(|b| b.original_count as u64).sum();
        let parents = record.parent_count();
        let rate = if parents == 0 {
            0.0
        } else {
            total as f64 / parents as f64 * 100.0
        };

        SuccessRate {
            rate,
            status: SuccessStatus::from_rate(rate),
        }
    }

    pub fn breedings_in<'a>(
        records: &'a [BreedingRecord],
        window: TimeWindow,
        today: NaiveDate,
    ) -> impl Iterator<Item = &'a BreedingRecord> + 'a {
        records
            .iter()
            .filter(move |r| window.contains(r.breeding_date, today))
    }

    pub fn batches_in<'a>(
        babies: &'a [BabyRecord],
        window: TimeWindow,
        today: NaiveDate,
    ) -> impl Iterator<Item = &'a BabyRecord> + 'a {
        babies
            .iter()
            .filter(move |b| window.contains(b.birth_date, today))
    }

    /// Batch count per health status. Every status is present.
    pub fn health_distribution<'a>(
        babies: impl IntoIterator<Item = &'a BabyRecord>,
    ) -> BTreeMap<HealthStatus, usize> {
        let mut counts: BTreeMap<HealthStatus, usize> = [
            HealthStatus::Healthy,
            HealthStatus::Concern,
            HealthStatus::Sick,
            HealthStatus::Critical,
        ]
        .into_iter()
        .map(|s| (s, 0))
        .collect();
        for baby in babies {
            *counts.entry(baby.health_status).or_insert(0) += 1;
        }
        counts
    }

    /// Batch count per age category. Every category is present.
    pub fn age_distribution<'a>(
        babies: impl IntoIterator<Item = &'a BabyRecord>,
        now: DateTime<Utc>,
    ) -> BTreeMap<AgeCategory, usize> {
        let mut counts: BTreeMap<AgeCategory, usize> =
            AgeCategory::ALL.into_iter().map(|c| (c, 0)).collect();
        for baby in babies {
            let category = AgeCategory::from_age(age_days(baby.birth_date, now));
            *counts.entry(category).or_insert(0) += 1;
        }
        counts
    }

    /// One point per day of the window, oldest first.
    ///
    /// The unbounded window starts at the earliest record date.
    pub fn trend(snapshot: &FarmSnapshot, window: TimeWindow, today: NaiveDate) -> Vec<TrendPoint> {
        let earliest = snapshot
            .breeding_records
            .iter()
            .map(|r| r.breeding_date)
            .chain(snapshot.baby_records.iter().map(|b| b.birth_date))
            .filter(|d| *d <= today)
            .min();

        let start = match window.start(today).or(earliest) {
            Some(start) => start,
            None => return Vec::new(),
        };

        let mut points: BTreeMap<NaiveDate, TrendPoint> = start
            .iter_days()
            .take_while(|d| *d <= today)
            .map(|date| {
                (
                    date,
                    TrendPoint {
                        date,
                        breedings: 0,
                        births: 0,
                    },
                )
            })
            .collect();

        for record in &snapshot.breeding_records {
            if let Some(point) = points.get_mut(&record.breeding_date) {
                point.breedings += 1;
            }
        }
        for baby in &snapshot.baby_records {
            if let Some(point) = points.get_mut(&baby.birth_date) {
                point.births += 1;
            }
        }

        points.into_values().collect()
    }

    pub fn summarize(snapshot: &FarmSnapshot, window: TimeWindow, now: DateTime<Utc>) -> DashboardSummary {
        let today = now.date_naive();
        let breedings: Vec<&BreedingRecord> =
            Self::breedings_in(&snapshot.breeding_records, window, today).collect();
        let batches: Vec<&BabyRecord> =
            Self::batches_in(&snapshot.baby_records, window, today).collect();

        let success = breedings
            .iter()
            .map(|r| {
                let total_babies = snapshot.babies_of(&r.id).map(|b| b.original_count).sum();
                BreedingSuccess {
                    breeding_id: r.id.clone(),
                    fish_type: r.fish_type.clone(),
                    tank_id: r.tank_id.clone(),
                    breeding_date: r.breeding_date,
                    parents: r.parent_count(),
                    total_babies,
                    success: Self::success_rate(r, &snapshot.baby_records),
                }
            })
            .collect();

        DashboardSummary {
            window,
            generated_at: now,
            breeding_count: breedings.len(),
            batch_count: batches.len(),
            total_parents: breedings.iter().map(|r| r.parent_count()).sum(),
            total_babies: batches.iter().map(|b| b.original_count).sum(),
            total_mortality: batches.iter().map(|b| b.mortality_count).sum(),
            live_population: batches.iter().map(|b| b.current_count()).sum(),
            breeding_tanks: PoolUtilization::from(&snapshot.breeding_occupancy()),
            baby_tanks: PoolUtilization::from(&snapshot.baby_occupancy()),
            success,
            health: Self::health_distribution(batches.iter().copied()),
            ages: Self::age_distribution(batches.iter().copied(), now),
            trend: Self::trend(snapshot, window, today),
            babies_available: snapshot.babies_fetched,
        }
    }
}
