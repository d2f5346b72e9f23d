//! Collaborator abstraction
//!
//! `FarmBackend` is the seam between the allocation logic and whatever holds
//! the tank, breeding and baby collections: the REST API in production, an
//! in-memory store in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{BabyDraft, BabyRecord, BreedingDraft, BreedingRecord, Tank};

/// Core trait for farm backends.
///
/// Implementations return canonical types only; response-shape quirks are
/// the implementation's problem, never the caller's.
#[async_trait]
pub trait FarmBackend: Send + Sync {
    /// Short identifier for logs (e.g. the base URL).
    fn id(&self) -> &str;

    /// `GET /tanksNew`
    async fn list_tanks(&self) -> Result<Vec<Tank>>;

    /// `POST /tanksNew`
    async fn create_tank(&self, tank: &Tank) -> Result<Tank>;

    /// `PUT /tanksNew/{id}`
    async fn update_tank(&self, id: &str, tank: &Tank) -> Result<Tank>;

    /// `GET /breeding`
    async fn list_breeding_records(&self) -> Result<Vec<BreedingRecord>>;

    /// `POST /breeding`
    async fn create_breeding_record(&self, draft: &BreedingDraft) -> Result<BreedingRecord>;

    /// `PUT /breeding/{id}`
    async fn update_breeding_record(&self, id: &str, draft: &BreedingDraft)
        -> Result<BreedingRecord>;

    /// `DELETE /breeding/{id}`. Returns `false` if the record was already gone.
    async fn delete_breeding_record(&self, id: &str) -> Result<bool>;

    /// `GET /babies`
    async fn list_baby_records(&self) -> Result<Vec<BabyRecord>>;

    /// `POST /babies`
    async fn create_baby_record(&self, draft: &BabyDraft) -> Result<BabyRecord>;

    /// `PUT /babies/{id}`
    async fn update_baby_record(&self, id: &str, draft: &BabyDraft) -> Result<BabyRecord>;

    /// `DELETE /babies/{id}`. Returns `false` if the record was already gone.
    async fn delete_baby_record(&self, id: &str) -> Result<bool>;
}
