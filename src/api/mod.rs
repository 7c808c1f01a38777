//! Detection API
//!
//! Client for the remote detection service. The service does all inference,
//! sampling and monitoring; this layer only shapes requests, attaches bearer
//! tokens and normalizes errors.
//!
//! # Endpoints
//!
//! ## Auth
//! - `POST /auth/login` - Form login, returns an access token
//! - `POST /auth/register` - Create an account
//!
//! ## Detection
//! - `POST /detect/batch` - Classify a batch of dataset samples
//!
//! ## Monitoring
//! - `POST /monitor/start` - Run a timed live-monitoring simulation
//! - `GET /monitor/stream` - Classify one freshly captured packet
//!
//! ## Dataset
//! - `GET /samples/info` - Dataset metadata
//! - `GET /samples/random` - Raw sample rows
//!
//! # Example
//!
//! ```rust,no_run
//! use botwatch::api::{ApiClient, BatchRequest, ModelType};
//! use botwatch::config::ApiConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(&ApiConfig::default())?;
//!     let login = client.login("analyst@lab.example", "secret1").await?;
//!
//!     let request = BatchRequest::new(10, ModelType::Ensemble);
//!     let result = client
//!         .run_batch_detection(Some(&login.access_token), &request)
//!         .await?;
//!
//!     println!("{} predictions", result.predictions.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod dto;
pub mod error;
pub mod forms;

pub use client::ApiClient;
pub use dto::{
    BatchRequest, DatasetInfo, DetectionResult, DetectionSummary, LoginResponse, ModelType,
    MonitorDetection, MonitorReport, MonitorSummary, Prediction, RegisterRequest, SampleBatch,
    StreamPacket,
};
pub use error::{ApiError, ApiResult, ErrorKind};
