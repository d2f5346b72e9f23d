//! Canonical record types for the farm backend
//!
//! Every collaborator response is converted into these shapes by the
//! [`normalize`](crate::normalize) boundary. Field names on the wire are
//! camelCase; ids may arrive as `id` or `_id`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::normalize::lenient;

/// Backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the farm REST API
    pub base_url: String,
    /// Optional API key sent as a bearer token
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Construction material of a tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TankType {
    MudPuddle,
    Glass,
    Cement,
    Special,
    /// Any value the backend sends that is not one of the above
    #[default]
    Unknown,
}

impl TankType {
    /// Parse leniently: case, spaces, hyphens and underscores are ignored.
    pub fn parse(raw: &str) -> Self {
        match squash(raw).as_str() {
            "mudpuddle" => Self::MudPuddle,
            "glass" => Self::Glass,
            "cement" => Self::Cement,
            "special" => Self::Special,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MudPuddle => "mud-puddle",
            Self::Glass => "glass",
            Self::Cement => "cement",
            Self::Special => "special",
            Self::Unknown => "unknown",
        }
    }
}

/// Where a tank sits in the farm, which decides the pool it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TankLocation {
    Breeding,
    Baby,
    Normal,
    SpecialCare,
    #[default]
    Unknown,
}

impl TankLocation {
    /// Parse leniently: "Special Care", "special-care" and "specialCare" are the same.
    pub fn parse(raw: &str) -> Self {
        match squash(raw).as_str() {
            "breeding" => Self::Breeding,
            "baby" => Self::Baby,
            "normal" => Self::Normal,
            "specialcare" => Self::SpecialCare,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breeding => "breeding",
            Self::Baby => "baby",
            Self::Normal => "normal",
            Self::SpecialCare => "special-care",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TankLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Health status of a baby batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum HealthStatus {
    #[default]
    Healthy,
    Concern,
    Sick,
    Critical,
}

impl HealthStatus {
    /// Unknown values fall back to healthy, which is what the forms default to.
    pub fn parse(raw: &str) -> Self {
        Self::try_parse(raw).unwrap_or_default()
    }

    /// Strict variant for user input: `None` unless the value names a status.
    pub fn try_parse(raw: &str) -> Option<Self> {
        match squash(raw).as_str() {
            "healthy" => Some(Self::Healthy),
            "concern" => Some(Self::Concern),
            "sick" => Some(Self::Sick),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Concern => "concern",
            Self::Sick => "sick",
            Self::Critical => "critical",
        }
    }
}

fn squash(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

macro_rules! string_enum_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = Option::<String>::deserialize(deserializer)?;
                Ok(raw.map(|s| <$ty>::parse(&s)).unwrap_or_default())
            }
        }
    };
}

string_enum_serde!(TankType);
string_enum_serde!(TankLocation);
string_enum_serde!(HealthStatus);

/// A physical tank from the `/tanksNew` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tank {
    #[serde(
        alias = "_id",
        default,
        deserialize_with = "lenient::id",
        skip_serializing_if = "String::is_empty"
    )]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub code: String,
    #[serde(rename = "type", default)]
    pub tank_type: TankType,
    #[serde(default)]
    pub location: TankLocation,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_count", skip_serializing_if = "Option::is_none")]
    pub inlet_valves: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_count", skip_serializing_if = "Option::is_none")]
    pub outlet_valves: Option<u32>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
}

impl Tank {
    /// Minimal tank, mostly useful for seeding pools.
    pub fn new(id: impl Into<String>, code: impl Into<String>, location: TankLocation) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            tank_type: TankType::Glass,
            location,
            length: None,
            width: None,
            height: None,
            inlet_valves: None,
            outlet_valves: None,
            description: String::new(),
        }
    }
}

/// A breeding cycle stored in `/breeding`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingRecord {
    #[serde(alias = "_id", deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub fish_type: String,
    #[serde(deserialize_with = "lenient::count")]
    pub mother_count: u32,
    #[serde(deserialize_with = "lenient::count")]
    pub father_count: u32,
    #[serde(deserialize_with = "lenient::date")]
    pub breeding_date: NaiveDate,
    #[serde(deserialize_with = "lenient::id")]
    pub tank_id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
}

impl BreedingRecord {
    /// Combine a stored id with the submitted fields.
    pub fn from_draft(id: impl Into<String>, draft: &BreedingDraft) -> Self {
        Self {
            id: id.into(),
            fish_type: draft.fish_type.clone(),
            mother_count: draft.mother_count,
            father_count: draft.father_count,
            breeding_date: draft.breeding_date,
            tank_id: draft.tank_id.clone(),
            description: draft.description.clone(),
        }
    }

    pub fn parent_count(&self) -> u32 {
        self.mother_count.saturating_add(self.father_count)
    }

    pub fn to_draft(&self) -> BreedingDraft {
        BreedingDraft {
            fish_type: self.fish_type.clone(),
            mother_count: self.mother_count,
            father_count: self.father_count,
            breeding_date: self.breeding_date,
            tank_id: self.tank_id.clone(),
            description: self.description.clone(),
        }
    }
}

/// Validated body for `POST /breeding` and `PUT /breeding/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingDraft {
    pub fish_type: String,
    pub mother_count: u32,
    pub father_count: u32,
    pub breeding_date: NaiveDate,
    pub tank_id: String,
    pub description: String,
}

/// A batch of babies stored in `/babies`.
///
/// The live count is not stored; [`BabyRecord::current_count`] derives it
/// from the original and mortality counts so it can never drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BabyRecord {
    #[serde(alias = "_id", deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(deserialize_with = "lenient::id")]
    pub breeding_id: String,
    #[serde(deserialize_with = "lenient::id")]
    pub baby_tank_id: String,
    #[serde(alias = "babyCount", deserialize_with = "lenient::count")]
    pub original_count: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub mortality_count: u32,
    #[serde(deserialize_with = "lenient::date")]
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub health_status: HealthStatus,
    #[serde(default, deserialize_with = "lenient::opt_id", skip_serializing_if = "Option::is_none")]
    pub previous_tank_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_datetime", skip_serializing_if = "Option::is_none")]
    pub transfer_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
}

impl BabyRecord {
    pub fn from_draft(id: impl Into<String>, draft: &BabyDraft) -> Self {
        Self {
            id: id.into(),
            breeding_id: draft.breeding_id.clone(),
            baby_tank_id: draft.baby_tank_id.clone(),
            original_count: draft.original_count,
            mortality_count: draft.mortality_count,
            birth_date: draft.birth_date,
            health_status: draft.health_status,
            previous_tank_id: draft.previous_tank_id.clone(),
            transfer_date: draft.transfer_date,
            description: draft.description.clone(),
        }
    }

    /// Live population: `max(0, original - mortality)`.
    pub fn current_count(&self) -> u32 {
        self.original_count.saturating_sub(self.mortality_count)
    }

    pub fn to_draft(&self) -> BabyDraft {
        BabyDraft {
            breeding_id: self.breeding_id.clone(),
            baby_tank_id: self.baby_tank_id.clone(),
            original_count: self.original_count,
            mortality_count: self.mortality_count,
            current_count: self.current_count(),
            birth_date: self.birth_date,
            health_status: self.health_status,
            previous_tank_id: self.previous_tank_id.clone(),
            transfer_date: self.transfer_date,
            description: self.description.clone(),
        }
    }
}

/// Validated body for `POST /babies` and `PUT /babies/{id}`.
///
/// `current_count` is sent for the benefit of other readers of the collection;
/// this client never trusts it on the way back in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BabyDraft {
    pub breeding_id: String,
    pub baby_tank_id: String,
    pub original_count: u32,
    pub mortality_count: u32,
    pub current_count: u32,
    pub birth_date: NaiveDate,
    pub health_status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_tank_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_date: Option<DateTime<Utc>>,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parsing_is_lenient() {
        assert_eq!(TankLocation::parse("Breeding"), TankLocation::Breeding);
        assert_eq!(TankLocation::parse("special care"), TankLocation::SpecialCare);
        assert_eq!(TankLocation::parse("specialCare"), TankLocation::SpecialCare);
        assert_eq!(TankLocation::parse("pond"), TankLocation::Unknown);
        assert_eq!(TankType::parse("Mud Puddle"), TankType::MudPuddle);
    }

    #[test]
    fn test_health_parsing() {
        assert_eq!(HealthStatus::parse("Sick"), HealthStatus::Sick);
        assert_eq!(HealthStatus::parse("sickly"), HealthStatus::Healthy);
        assert_eq!(HealthStatus::try_parse("critical"), Some(HealthStatus::Critical));
        assert_eq!(HealthStatus::try_parse("sickly"), None);
    }

    #[test]
    fn test_tank_from_mongo_shape() {
        let tank: Tank = serde_json::from_value(serde_json::json!({
            "_id": "64f0c2",
            "code": "B-01",
            "type": "mud-puddle",
            "location": "breeding",
            "length": "2.5",
            "inletValves": 2,
            "description": null
        }))
        .unwrap();

        assert_eq!(tank.id, "64f0c2");
        assert_eq!(tank.tank_type, TankType::MudPuddle);
        assert_eq!(tank.location, TankLocation::Breeding);
        assert_eq!(tank.length, Some(2.5));
        assert_eq!(tank.inlet_valves, Some(2));
        assert_eq!(tank.description, "");
    }

    #[test]
    fn test_baby_current_count_ignores_wire_value() {
        let baby: BabyRecord = serde_json::from_value(serde_json::json!({
            "id": 7,
            "breedingId": "br-1",
            "babyTankId": {"_id": "y-1", "code": "Y1"},
            "originalCount": "50",
            "mortalityCount": 12,
            "currentCount": 999,
            "birthDate": "2026-10-01T00:00:00.000Z",
            "healthStatus": "Concern"
        }))
        .unwrap();

        assert_eq!(baby.id, "7");
        assert_eq!(baby.baby_tank_id, "y-1");
        assert_eq!(baby.current_count(), 38);
        assert_eq!(baby.health_status, HealthStatus::Concern);
        assert_eq!(baby.birth_date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
    }

    #[test]
    fn test_current_count_floors_at_zero() {
        let mut baby: BabyRecord = serde_json::from_value(serde_json::json!({
            "id": "b",
            "breedingId": "br",
            "babyTankId": "y",
            "originalCount": 10,
            "mortalityCount": 14,
            "birthDate": "2026-10-01"
        }))
        .unwrap();
        assert_eq!(baby.current_count(), 0);

        baby.mortality_count = 3;
        assert_eq!(baby.to_draft().current_count, 7);
    }

    #[test]
    fn test_draft_serializes_camel_case() {
        let draft = BreedingDraft {
            fish_type: "Guppy".into(),
            mother_count: 3,
            father_count: 1,
            breeding_date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            tank_id: "b1".into(),
            description: String::new(),
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["fishType"], "Guppy");
        assert_eq!(json["motherCount"], 3);
        assert_eq!(json["breedingDate"], "2026-10-18");
        assert_eq!(json["tankId"], "b1");
    }
}
