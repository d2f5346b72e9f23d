//! HTTP client for the farm REST API

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::backend::FarmBackend;
use crate::error::{BackendError, Result};
use crate::normalize::{self, BABIES_KEY, BREEDING_KEY, TANKS_KEY};
use crate::types::*;

const TANKS_PATH: &str = "tanksNew";
const BREEDING_PATH: &str = "breeding";
const BABIES_PATH: &str = "babies";

/// HTTP client for the farm REST API
///
/// # Example
///
/// ```rust,no_run
/// use hatchery_client::{BackendConfig, FarmBackend, HttpBackend};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = HttpBackend::new(BackendConfig {
///     base_url: "http://localhost:5000/api".into(),
///     ..Default::default()
/// })?;
///
/// let tanks = backend.list_tanks().await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpBackend {
    config: BackendConfig,
    client: Client,
}

impl HttpBackend {
    /// Create a new HTTP backend
    pub fn new(config: BackendConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(ref api_key) = config.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| BackendError::Config("API key is not a valid header value".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn collection_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn item_url(&self, path: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(path), urlencoding::encode(id))
    }

    // ==================== Request helpers ====================

    async fn get_list<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Vec<T>> {
        let url = self.collection_url(path);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        let value = self.read_json(&url, response).await?;
        normalize::list_from_value(value, key)
    }

    /// POST a new record. `None` means the server acknowledged the write
    /// without echoing the stored record.
    async fn post_record<B, T>(&self, path: &str, body: &B, key: &str) -> Result<Option<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.collection_url(path);
        debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        let value = self.read_json(&url, response).await?;
        normalize::record_from_value(value, key)
    }

    /// Look up a record the server stored but did not return.
    ///
    /// The newest listed record matching the draft wins.
    async fn find_created<T, F>(&self, path: &str, key: &str, matches: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let url = self.collection_url(path);
        debug!(%url, "POST acknowledged without a record, re-listing");
        let listed: Vec<T> = self.get_list(path, key).await?;
        listed.into_iter().rev().find(|r| matches(r)).ok_or_else(|| {
            BackendError::InvalidResponse(format!(
                "POST {} was acknowledged but the stored record is not listed",
                url
            ))
        })
    }

    async fn put_record<B, T>(&self, path: &str, id: &str, body: &B, key: &str) -> Result<Option<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.item_url(path, id);
        debug!(%url, "PUT");
        let response = self.client.put(&url).json(body).send().await?;
        let value = self.read_json(&url, response).await?;
        normalize::record_from_value(value, key)
    }

    async fn delete(&self, path: &str, id: &str) -> Result<bool> {
        let url = self.item_url(path, id);
        debug!(%url, "DELETE");
        let response = self.client.delete(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Server {
                status,
                message: normalize::error_message(status, &body),
            });
        }
        Ok(true)
    }

    async fn read_json(&self, url: &str, response: Response) -> Result<Value> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(url.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = normalize::error_message(status.as_u16(), &body);
            if status == StatusCode::CONFLICT {
                return Err(BackendError::Conflict(message));
            }
            return Err(BackendError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl FarmBackend for HttpBackend {
    fn id(&self) -> &str {
        &self.config.base_url
    }

    async fn list_tanks(&self) -> Result<Vec<Tank>> {
        self.get_list(TANKS_PATH, TANKS_KEY).await
    }

    async fn create_tank(&self, tank: &Tank) -> Result<Tank> {
        match self.post_record(TANKS_PATH, tank, "tank").await? {
            Some(stored) => Ok(stored),
            None => {
                self.find_created(TANKS_PATH, TANKS_KEY, |t: &Tank| t.code == tank.code)
                    .await
            }
        }
    }

    async fn update_tank(&self, id: &str, tank: &Tank) -> Result<Tank> {
        let stored: Option<Tank> = self.put_record(TANKS_PATH, id, tank, "tank").await?;
        Ok(stored.unwrap_or_else(|| Tank {
            id: id.to_string(),
            ..tank.clone()
        }))
    }

    async fn list_breeding_records(&self) -> Result<Vec<BreedingRecord>> {
        self.get_list(BREEDING_PATH, BREEDING_KEY).await
    }

    async fn create_breeding_record(&self, draft: &BreedingDraft) -> Result<BreedingRecord> {
        match self.post_record(BREEDING_PATH, draft, "breedingRecord").await? {
            Some(stored) => Ok(stored),
            None => {
                self.find_created(BREEDING_PATH, BREEDING_KEY, |r: &BreedingRecord| {
                    r.tank_id == draft.tank_id
                        && r.fish_type == draft.fish_type
                        && r.breeding_date == draft.breeding_date
                })
                .await
            }
        }
    }

    async fn update_breeding_record(
        &self,
        id: &str,
        draft: &BreedingDraft,
    ) -> Result<BreedingRecord> {
        let stored = self
            .put_record(BREEDING_PATH, id, draft, "breedingRecord")
            .await?;
        Ok(stored.unwrap_or_else(|| BreedingRecord::from_draft(id, draft)))
    }

    async fn delete_breeding_record(&self, id: &str) -> Result<bool> {
        self.delete(BREEDING_PATH, id).await
    }

    async fn list_baby_records(&self) -> Result<Vec<BabyRecord>> {
        self.get_list(BABIES_PATH, BABIES_KEY).await
    }

    async fn create_baby_record(&self, draft: &BabyDraft) -> Result<BabyRecord> {
        match self.post_record(BABIES_PATH, draft, "babyRecord").await? {
            Some(stored) => Ok(stored),
            None => {
                self.find_created(BABIES_PATH, BABIES_KEY, |b: &BabyRecord| {
                    b.baby_tank_id == draft.baby_tank_id && b.breeding_id == draft.breeding_id
                })
                .await
            }
        }
    }

    async fn update_baby_record(&self, id: &str, draft: &BabyDraft) -> Result<BabyRecord> {
        let stored = self.put_record(BABIES_PATH, id, draft, "babyRecord").await?;
        Ok(stored.unwrap_or_else(|| BabyRecord::from_draft(id, draft)))
    }

    async fn delete_baby_record(&self, id: &str) -> Result<bool> {
        self.delete(BABIES_PATH, id).await
    }
}
