//! Shared fixtures for hatchery-core integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use hatchery_client::{BabyRecord, BreedingRecord, HealthStatus, MemoryBackend, Tank, TankLocation};
use hatchery_core::{BabyForm, BreedingForm, CascadePolicy, FixedClock, Hatchery};
use std::sync::Arc;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn days_ago(n: i64) -> NaiveDate {
    today() - chrono::Duration::days(n)
}

/// Two breeding tanks, two baby tanks and one display tank.
pub fn farm_tanks() -> Vec<Tank> {
    vec![
        Tank::new("b1", "B1", TankLocation::Breeding),
        Tank::new("b2", "B2", TankLocation::Breeding),
        Tank::new("y1", "Y1", TankLocation::Baby),
        Tank::new("y2", "Y2", TankLocation::Baby),
        Tank::new("n1", "N1", TankLocation::Normal),
    ]
}

pub fn hatchery(backend: &Arc<MemoryBackend>, policy: CascadePolicy) -> Hatchery {
    Hatchery::new(backend.clone(), Arc::new(FixedClock::on(today())), policy)
}

pub fn breeding_form(tank_id: &str) -> BreedingForm {
    BreedingForm {
        fish_type: Some("Guppy".into()),
        mother_count: Some(2),
        father_count: Some(2),
        breeding_date: Some(days_ago(10)),
        tank_id: Some(tank_id.into()),
        description: None,
    }
}

pub fn baby_form(breeding_id: &str, tank_id: &str, original: i64) -> BabyForm {
    BabyForm {
        breeding_id: Some(breeding_id.into()),
        baby_tank_id: Some(tank_id.into()),
        original_count: Some(original),
        birth_date: Some(days_ago(3)),
        ..Default::default()
    }
}

pub fn breeding_record(id: &str, tank_id: &str, mothers: u32, fathers: u32, date: NaiveDate) -> BreedingRecord {
    BreedingRecord {
        id: id.into(),
        fish_type: "Guppy".into(),
        mother_count: mothers,
        father_count: fathers,
        breeding_date: date,
        tank_id: tank_id.into(),
        description: String::new(),
    }
}

pub fn baby_record(id: &str, breeding_id: &str, tank_id: &str, original: u32, born: NaiveDate) -> BabyRecord {
    BabyRecord {
        id: id.into(),
        breeding_id: breeding_id.into(),
        baby_tank_id: tank_id.into(),
        original_count: original,
        mortality_count: 0,
        birth_date: born,
        health_status: HealthStatus::Healthy,
        previous_tank_id: None,
        transfer_date: None,
        description: String::new(),
    }
}
