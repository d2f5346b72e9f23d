//! Form input and local validation
//!
//! Forms carry what a user typed, so every field is optional and counts are
//! signed. Validation turns a form into the wire draft or reports every bad
//! field at once. No network call is made for a form that fails here.

use chrono::NaiveDate;
use hatchery_client::{BabyDraft, BabyRecord, BreedingDraft, BreedingRecord, HealthStatus};
use serde::Deserialize;

use crate::error::ValidationErrors;

/// Input for creating or editing a breeding cycle.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreedingForm {
    pub fish_type: Option<String>,
    pub mother_count: Option<i64>,
    pub father_count: Option<i64>,
    pub breeding_date: Option<NaiveDate>,
    pub tank_id: Option<String>,
    pub description: Option<String>,
}

impl BreedingForm {
    /// Prefill from a stored record, as the inline editor does.
    pub fn from_record(record: &BreedingRecord) -> Self {
        Self {
            fish_type: Some(record.fish_type.clone()),
            mother_count: Some(record.mother_count as i64),
            father_count: Some(record.father_count as i64),
            breeding_date: Some(record.breeding_date),
            tank_id: Some(record.tank_id.clone()),
            description: Some(record.description.clone()),
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<BreedingDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let fish_type = required_text(&mut errors, "fish_type", &self.fish_type);
        let mother_count = positive_count(&mut errors, "mother_count", self.mother_count);
        let father_count = positive_count(&mut errors, "father_count", self.father_count);
        let breeding_date = past_or_today(&mut errors, "breeding_date", self.breeding_date, today);
        let tank_id = required_text(&mut errors, "tank_id", &self.tank_id);

        match (fish_type, mother_count, father_count, breeding_date, tank_id) {
            (Some(fish_type), Some(mother_count), Some(father_count), Some(breeding_date), Some(tank_id))
                if errors.is_empty() =>
            {
                Ok(BreedingDraft {
                    fish_type,
                    mother_count,
                    father_count,
                    breeding_date,
                    tank_id,
                    description: trimmed(&self.description),
                })
            }
            _ => Err(errors),
        }
    }
}

/// Input for creating or editing a baby batch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BabyForm {
    pub breeding_id: Option<String>,
    pub baby_tank_id: Option<String>,
    pub original_count: Option<i64>,
    /// Defaults to 0 when absent
    pub mortality_count: Option<i64>,
    pub birth_date: Option<NaiveDate>,
    /// Defaults to healthy when absent
    pub health_status: Option<HealthStatus>,
    pub description: Option<String>,
}

impl BabyForm {
    pub fn from_record(record: &BabyRecord) -> Self {
        Self {
            breeding_id: Some(record.breeding_id.clone()),
            baby_tank_id: Some(record.baby_tank_id.clone()),
            original_count: Some(record.original_count as i64),
            mortality_count: Some(record.mortality_count as i64),
            birth_date: Some(record.birth_date),
            health_status: Some(record.health_status),
            description: Some(record.description.clone()),
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<BabyDraft, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let breeding_id = required_text(&mut errors, "breeding_id", &self.breeding_id);
        let baby_tank_id = required_text(&mut errors, "baby_tank_id", &self.baby_tank_id);
        let original_count = positive_count(&mut errors, "original_count", self.original_count);
        let birth_date = past_or_today(&mut errors, "birth_date", self.birth_date, today);

        let mortality_count = match self.mortality_count.unwrap_or(0) {
            n if n < 0 => {
                errors.push("mortality_count", "must not be negative");
                None
            }
            n => u32::try_from(n).ok(),
        };
        if let (Some(original), Some(mortality)) = (original_count, mortality_count) {
            if mortality > original {
                errors.push(
                    "mortality_count",
                    format!("{} exceeds the original count of {}", mortality, original),
                );
            }
        }

        match (breeding_id, baby_tank_id, original_count, mortality_count, birth_date) {
            (Some(breeding_id), Some(baby_tank_id), Some(original_count), Some(mortality_count), Some(birth_date))
                if errors.is_empty() =>
            {
                Ok(BabyDraft {
                    breeding_id,
                    baby_tank_id,
                    original_count,
                    mortality_count,
                    current_count: original_count - mortality_count,
                    birth_date,
                    health_status: self.health_status.unwrap_or_default(),
                    previous_tank_id: None,
                    transfer_date: None,
                    description: trimmed(&self.description),
                })
            }
            _ => Err(errors),
        }
    }
}

/// New mortality total for a batch, or the reason it is rejected.
///
/// Rejects rather than clamps: a total above the original count is an input
/// error, not something to paper over.
pub fn checked_mortality(original: u32, mortality: u32) -> Result<u32, ValidationErrors> {
    if mortality > original {
        return Err(ValidationErrors::single(
            "mortality_count",
            format!("{} exceeds the original count of {}", mortality, original),
        ));
    }
    Ok(mortality)
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &Option<String>,
) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => {
            errors.push(field, "is required");
            None
        }
    }
}

fn positive_count(errors: &mut ValidationErrors, field: &'static str, value: Option<i64>) -> Option<u32> {
    match value {
        None => {
            errors.push(field, "is required");
            None
        }
        Some(n) if n < 1 => {
            errors.push(field, "must be at least 1");
            None
        }
        Some(n) => match u32::try_from(n) {
            Ok(n) => Some(n),
            Err(_) => {
                errors.push(field, "is too large");
                None
            }
        },
    }
}

fn past_or_today(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    match value {
        None => {
            errors.push(field, "is required");
            None
        }
        Some(date) if date > today => {
            errors.push(field, "must not be in the future");
            None
        }
        Some(date) => Some(date),
    }
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn breeding_form() -> BreedingForm {
        BreedingForm {
            fish_type: Some(" Guppy ".into()),
            mother_count: Some(2),
            father_count: Some(1),
            breeding_date: Some(today()),
            tank_id: Some("b1".into()),
            description: None,
        }
    }

    #[test]
    fn test_valid_breeding_form() {
        let draft = breeding_form().validate(today()).unwrap();
        assert_eq!(draft.fish_type, "Guppy");
        assert_eq!(draft.mother_count, 2);
        assert_eq!(draft.description, "");
    }

    #[test]
    fn test_breeding_form_reports_every_field() {
        let form = BreedingForm {
            fish_type: Some("  ".into()),
            mother_count: Some(0),
            father_count: None,
            breeding_date: Some(today().succ_opt().unwrap()),
            tank_id: None,
            description: None,
        };

        let errors = form.validate(today()).unwrap_err();
        for field in ["fish_type", "mother_count", "father_count", "breeding_date", "tank_id"] {
            assert!(errors.has_field(field), "missing error for {}", field);
        }
    }

    #[test]
    fn test_baby_form_defaults() {
        let form = BabyForm {
            breeding_id: Some("br-1".into()),
            baby_tank_id: Some("y1".into()),
            original_count: Some(50),
            birth_date: Some(today()),
            ..Default::default()
        };

        let draft = form.validate(today()).unwrap();
        assert_eq!(draft.mortality_count, 0);
        assert_eq!(draft.current_count, 50);
        assert_eq!(draft.health_status, HealthStatus::Healthy);
    }

    #[test]
    fn test_baby_form_mortality_bounds() {
        let mut form = BabyForm {
            breeding_id: Some("br-1".into()),
            baby_tank_id: Some("y1".into()),
            original_count: Some(50),
            mortality_count: Some(12),
            birth_date: Some(today()),
            ..Default::default()
        };
        assert_eq!(form.validate(today()).unwrap().current_count, 38);

        form.mortality_count = Some(60);
        assert!(form.validate(today()).unwrap_err().has_field("mortality_count"));

        form.mortality_count = Some(-1);
        assert!(form.validate(today()).unwrap_err().has_field("mortality_count"));
    }

    #[test]
    fn test_checked_mortality() {
        assert_eq!(checked_mortality(50, 50).unwrap(), 50);
        assert!(checked_mortality(50, 51).is_err());
    }
}
