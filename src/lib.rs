//! # Botwatch
//!
//! Client toolkit for a remote botnet-detection service. The service does the
//! sampling and inference; botwatch signs in, asks for detections, keeps the
//! last result, and turns it into metrics, reports and notices.
//!
//! ## Features
//!
//! - **Batch detection**: classify dataset samples with the LSTM, GCN or ensemble model
//! - **Live monitoring**: timed server-side runs and a client-side packet stream
//! - **Metrics**: confusion matrix, accuracy, precision, recall and F1 from labeled results
//! - **Reports**: JSON and CSV export of the last result
//! - **Session**: token, theme and preferences persisted between runs
//!
//! ## Modules
//!
//! - [`api`]: HTTP client and wire types for the detection service
//! - [`session`]: Persisted session state and preferences
//! - [`monitor`]: Monitoring parameters and the stream poller
//! - [`metrics`]: Metric aggregation over detection results
//! - [`export`]: Report rendering and writing
//! - [`notify`]: Detection notices
//! - [`config`]: TOML configuration with environment overrides
//! - [`logging`]: Tracing subscriber setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use botwatch::api::{ApiClient, BatchRequest, ModelType};
//! use botwatch::{Config, LocalStore, Metrics, SessionContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let client = ApiClient::new(&config.api)?;
//!     let mut ctx = SessionContext::load(LocalStore::open(&config.session.state_file)?);
//!
//!     let login = client.login("analyst@lab.example", "secret1").await?;
//!     ctx.sign_in("analyst@lab.example", &login.access_token)?;
//!
//!     let request = BatchRequest::new(20, ModelType::Ensemble);
//!     let result = client.run_batch_detection(ctx.token(), &request).await?;
//!     ctx.record_detection(&result)?;
//!
//!     let metrics = Metrics::from_result(&result);
//!     println!("accuracy: {:?}", metrics.accuracy);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod export;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod session;

// Re-export top-level types for convenience
pub use api::{ApiClient, ApiError, ApiResult, DetectionResult, ErrorKind, ModelType};

pub use config::{Config, ConfigError, LoggingConfig};

pub use export::{write_report, ExportError, ReportFormat};

pub use logging::{init_logging, LoggingError};

pub use metrics::{ConfusionCounts, DisplayAdjust, Metrics, RunSummary};

pub use monitor::{Feed, FeedEntry, MonitorParams, PacketSource, StreamEvent, StreamPoller};

pub use notify::{Notice, Notifier, PreferenceGate, Severity, TerminalNotifier};

pub use session::{LocalStore, Preferences, SessionContext, StoreError, Theme};
