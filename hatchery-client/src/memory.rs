//! In-memory farm backend for tests and local runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::backend::FarmBackend;
use crate::error::{BackendError, Result};
use crate::types::*;

/// One call observed by [`MemoryBackend`], in the order it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BackendCall {
    ListTanks,
    CreateTank { code: String },
    UpdateTank(String),
    ListBreeding,
    CreateBreeding { tank_id: String },
    UpdateBreeding(String),
    DeleteBreeding(String),
    ListBabies,
    CreateBaby { baby_tank_id: String },
    UpdateBaby(String),
    DeleteBaby(String),
}

impl BackendCall {
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            BackendCall::ListTanks | BackendCall::ListBreeding | BackendCall::ListBabies
        )
    }
}

#[derive(Default)]
struct MemoryState {
    tanks: Vec<Tank>,
    breeding: Vec<BreedingRecord>,
    babies: Vec<BabyRecord>,
    calls: Vec<BackendCall>,
    failures: Vec<BackendCall>,
}

/// In-memory backend.
///
/// Behaves like the REST API without any exclusivity checks, unless
/// [`with_unique_tank_claims`](Self::with_unique_tank_claims) is set, in which
/// case it answers double-booking writes with a conflict the way a server
/// with a uniqueness constraint would.
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    babies_endpoint: AtomicBool,
    unique_tank_claims: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            babies_endpoint: AtomicBool::new(true),
            unique_tank_claims: AtomicBool::new(false),
        }
    }

    /// Seed the tank pool.
    pub fn with_tanks(mut self, tanks: impl IntoIterator<Item = Tank>) -> Self {
        self.state.get_mut().tanks.extend(tanks);
        self
    }

    /// Seed breeding records.
    pub fn with_breeding_records(mut self, records: impl IntoIterator<Item = BreedingRecord>) -> Self {
        self.state.get_mut().breeding.extend(records);
        self
    }

    /// Seed baby records.
    pub fn with_baby_records(mut self, records: impl IntoIterator<Item = BabyRecord>) -> Self {
        self.state.get_mut().babies.extend(records);
        self
    }

    /// Deployment without the `/babies` endpoint: every baby call is a 404.
    pub fn without_babies_endpoint(self) -> Self {
        self.babies_endpoint.store(false, Ordering::SeqCst);
        self
    }

    /// Reject writes that would double-book a tank.
    pub fn with_unique_tank_claims(self) -> Self {
        self.unique_tank_claims.store(true, Ordering::SeqCst);
        self
    }

    /// Make every future occurrence of `call` fail with a 500.
    pub async fn fail_on(&self, call: BackendCall) {
        self.state.lock().await.failures.push(call);
    }

    /// Clear injected failures.
    pub async fn heal(&self) {
        self.state.lock().await.failures.clear();
    }

    /// Calls received so far.
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().await.calls.clone()
    }

    /// Write calls received so far.
    pub async fn writes(&self) -> Vec<BackendCall> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    pub async fn reset_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn tanks(&self) -> Vec<Tank> {
        self.state.lock().await.tanks.clone()
    }

    pub async fn breeding_records(&self) -> Vec<BreedingRecord> {
        self.state.lock().await.breeding.clone()
    }

    pub async fn baby_records(&self) -> Vec<BabyRecord> {
        self.state.lock().await.babies.clone()
    }

    /// Simulate another client writing a breeding record directly.
    pub async fn insert_breeding_record(&self, record: BreedingRecord) {
        self.state.lock().await.breeding.push(record);
    }

    /// Simulate another client writing a baby record directly.
    pub async fn insert_baby_record(&self, record: BabyRecord) {
        self.state.lock().await.babies.push(record);
    }

    fn babies_available(&self) -> Result<()> {
        if self.babies_endpoint.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::NotFound("/babies".to_string()))
        }
    }

    fn claims_enforced(&self) -> bool {
        self.unique_tank_claims.load(Ordering::SeqCst)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryState {
    fn record(&mut self, call: BackendCall) -> Result<()> {
        let injected = self.failures.contains(&call);
        self.calls.push(call);
        if injected {
            return Err(BackendError::Server {
                status: 500,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl FarmBackend for MemoryBackend {
    fn id(&self) -> &str {
        "memory"
    }

    async fn list_tanks(&self) -> Result<Vec<Tank>> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::ListTanks)?;
        Ok(state.tanks.clone())
    }

    async fn create_tank(&self, tank: &Tank) -> Result<Tank> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::CreateTank {
            code: tank.code.clone(),
        })?;
        let stored = Tank {
            id: if tank.id.is_empty() { new_id() } else { tank.id.clone() },
            ..tank.clone()
        };
        state.tanks.push(stored.clone());
        Ok(stored)
    }

    async fn update_tank(&self, id: &str, tank: &Tank) -> Result<Tank> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::UpdateTank(id.to_string()))?;
        let slot = state
            .tanks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("/tanksNew/{}", id)))?;
        *slot = Tank {
            id: id.to_string(),
            ..tank.clone()
        };
        Ok(slot.clone())
    }

    async fn list_breeding_records(&self) -> Result<Vec<BreedingRecord>> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::ListBreeding)?;
        Ok(state.breeding.clone())
    }

    async fn create_breeding_record(&self, draft: &BreedingDraft) -> Result<BreedingRecord> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::CreateBreeding {
            tank_id: draft.tank_id.clone(),
        })?;
        if self.claims_enforced() && state.breeding.iter().any(|r| r.tank_id == draft.tank_id) {
            return Err(BackendError::Conflict(format!(
                "tank {} already holds a breeding cycle",
                draft.tank_id
            )));
        }
        let stored = BreedingRecord::from_draft(new_id(), draft);
        state.breeding.push(stored.clone());
        Ok(stored)
    }

    async fn update_breeding_record(
        &self,
        id: &str,
        draft: &BreedingDraft,
    ) -> Result<BreedingRecord> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::UpdateBreeding(id.to_string()))?;
        let slot = state
            .breeding
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("/breeding/{}", id)))?;
        *slot = BreedingRecord::from_draft(id, draft);
        Ok(slot.clone())
    }

    async fn delete_breeding_record(&self, id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.record(BackendCall::DeleteBreeding(id.to_string()))?;
        let before = state.breeding.len();
        state.breeding.retain(|r| r.id != id);
        Ok(state.breeding.len() != before)
    }

    async fn list_baby_records(&self) -> Result<Vec<BabyRecord>> {
        self.babies_available()?;
        let mut state = self.state.lock().await;
        state.record(BackendCall::ListBabies)?;
        Ok(state.babies.clone())
    }

    async fn create_baby_record(&self, draft: &BabyDraft) -> Result<BabyRecord> {
        self.babies_available()?;
        let mut state = self.state.lock().await;
        state.record(BackendCall::CreateBaby {
            baby_tank_id: draft.baby_tank_id.clone(),
        })?;
        if self.claims_enforced()
            && state.babies.iter().any(|b| b.baby_tank_id == draft.baby_tank_id)
        {
            return Err(BackendError::Conflict(format!(
                "tank {} already holds a baby batch",
                draft.baby_tank_id
            )));
        }
        let stored = BabyRecord::from_draft(new_id(), draft);
        state.babies.push(stored.clone());
        Ok(stored)
    }

    async fn update_baby_record(&self, id: &str, draft: &BabyDraft) -> Result<BabyRecord> {
        self.babies_available()?;
        let mut state = self.state.lock().await;
        state.record(BackendCall::UpdateBaby(id.to_string()))?;
        if self.claims_enforced()
            && state
                .babies
                .iter()
                .any(|b| b.id != id && b.baby_tank_id == draft.baby_tank_id)
        {
            return Err(BackendError::Conflict(format!(
                "tank {} already holds a baby batch",
                draft.baby_tank_id
            )));
        }
        let slot = state
            .babies
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("/babies/{}", id)))?;
        *slot = BabyRecord::from_draft(id, draft);
        Ok(slot.clone())
    }

    async fn delete_baby_record(&self, id: &str) -> Result<bool> {
        self.babies_available()?;
        let mut state = self.state.lock().await;
        state.record(BackendCall::DeleteBaby(id.to_string()))?;
        let before = state.babies.len();
        state.babies.retain(|b| b.id != id);
        Ok(state.babies.len() != before)
    }
}
