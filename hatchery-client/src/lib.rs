//! Rust client for the farm backend's tank, breeding and baby collections
//!
//! Provides one canonical view of a REST API whose responses vary in shape
//! from endpoint to endpoint and deployment to deployment.
//!
//! # Example
//!
//! ```rust,no_run
//! use hatchery_client::{BackendConfig, FarmBackend, HttpBackend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = HttpBackend::new(BackendConfig {
//!     base_url: "http://localhost:5000/api".into(),
//!     ..Default::default()
//! })?;
//!
//! // Either `[...]` or `{"tanks": [...]}` on the wire, always `Vec<Tank>` here
//! let tanks = backend.list_tanks().await?;
//! let breeding = backend.list_breeding_records().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod deadline;
pub mod error;
pub mod http;
pub mod memory;
pub mod normalize;
pub mod types;

// Re-export main types
pub use backend::FarmBackend;
pub use deadline::DeadlineBackend;
pub use error::{BackendError, Result};
pub use http::HttpBackend;
pub use memory::{BackendCall, MemoryBackend};
pub use types::*;
