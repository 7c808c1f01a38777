//! Data Transfer Objects
//!
//! Request and response bodies exchanged with the detection API.
//! Response types keep unknown server fields in `extra` so a stored result
//! serializes back with everything the server sent.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::error::ApiError;

/// Parse a server timestamp. Naive ISO-8601 values are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Smallest batch a detection run accepts
pub const MIN_BATCH_SAMPLES: u32 = 1;
/// Largest batch a detection run accepts
pub const MAX_BATCH_SAMPLES: u32 = 50;
/// Largest page of raw samples the dataset endpoint serves
pub const MAX_RANDOM_SAMPLES: u32 = 100;

// ============================================
// AUTH DTOs
// ============================================

/// Successful login payload
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Account creation request
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

// ============================================
// DETECTION DTOs
// ============================================

/// Detection model selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Lstm,
    Gcn,
    #[default]
    Ensemble,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Lstm => "lstm",
            ModelType::Gcn => "gcn",
            ModelType::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lstm" => Ok(ModelType::Lstm),
            "gcn" | "gnn" => Ok(ModelType::Gcn),
            "ensemble" => Ok(ModelType::Ensemble),
            other => Err(ApiError::Validation(format!(
                "Unknown model type: {} (expected lstm, gcn or ensemble)",
                other
            ))),
        }
    }
}

/// Batch detection request
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest {
    /// Number of dataset samples to classify
    pub n: u32,
    /// Ask for an even normal/botnet mix
    pub balanced: bool,
    pub model_type: ModelType,
}

impl BatchRequest {
    pub fn new(n: u32, model_type: ModelType) -> Self {
        Self {
            n,
            balanced: true,
            model_type,
        }
    }

    /// Reject sample counts outside `1..=50`
    pub fn validate(&self) -> Result<(), ApiError> {
        if !(MIN_BATCH_SAMPLES..=MAX_BATCH_SAMPLES).contains(&self.n) {
            return Err(ApiError::Validation(
                "Please enter a number between 1 and 50".to_string(),
            ));
        }
        Ok(())
    }
}

/// One classified sample
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Prediction {
    /// 0 = normal, 1 = botnet
    pub prediction: u8,
    #[serde(default)]
    pub prediction_label: Option<String>,
    pub probability: f64,
    pub confidence: f64,
    /// Ground truth, when the sample carried one
    #[serde(default)]
    pub actual_label: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Prediction {
    pub fn is_botnet(&self) -> bool {
        self.prediction == 1
    }

    /// Label to show, falling back to the numeric class
    pub fn label(&self) -> &str {
        match &self.prediction_label {
            Some(label) => label,
            None if self.is_botnet() => "Botnet",
            None => "Normal",
        }
    }
}

/// Aggregate counts reported with a batch result
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DetectionSummary {
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub total_samples: Option<u64>,
    #[serde(default)]
    pub botnet_detected: Option<u64>,
    #[serde(default)]
    pub normal_detected: Option<u64>,
    /// Server-side accuracy in percent, absent when no labels were available
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub botnet_percentage: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of one batch detection run
///
/// A result decoded with [`DetectionResult::from_value`] keeps the body as the
/// server sent it and serializes back to exactly that body. Results built in
/// code serialize from their typed fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub total_samples: Option<u64>,
    #[serde(default)]
    pub summary: DetectionSummary,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Response body as received
    #[serde(skip)]
    pub raw: Option<Value>,
}

/// Typed serialization used when no received body is held
#[derive(Serialize)]
struct TypedResult<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    total_samples: Option<u64>,
    summary: &'a DetectionSummary,
    predictions: &'a [Prediction],
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl Serialize for DetectionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.raw {
            Some(raw) => raw.serialize(serializer),
            None => TypedResult {
                total_samples: self.total_samples,
                summary: &self.summary,
                predictions: &self.predictions,
                extra: &self.extra,
            }
            .serialize(serializer),
        }
    }
}

impl DetectionResult {
    /// Decode a response body, keeping it for verbatim storage and export
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        let mut result: Self = serde_json::from_value(value.clone())?;
        result.raw = Some(value);
        Ok(result)
    }

    /// Whether any prediction carries a ground-truth label
    pub fn has_labels(&self) -> bool {
        self.predictions.iter().any(|p| p.actual_label.is_some())
    }

    /// Sample count used for display calibration
    pub fn sample_count(&self) -> Option<u64> {
        self.summary.total_samples.or(self.total_samples)
    }
}

// ============================================
// MONITORING DTOs
// ============================================

/// Single packet served by the streaming endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StreamPacket {
    #[serde(default)]
    pub timestamp: Option<String>,
    pub prediction: u8,
    #[serde(default)]
    pub prediction_label: Option<String>,
    pub probability: f64,
    pub confidence: f64,
    #[serde(default)]
    pub actual_label: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StreamPacket {
    pub fn is_botnet(&self) -> bool {
        self.prediction == 1
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    pub fn label(&self) -> &str {
        match &self.prediction_label {
            Some(label) => label,
            None if self.is_botnet() => "Botnet",
            None => "Normal",
        }
    }
}

/// Totals for a finished live-monitoring run
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MonitorSummary {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub total_samples: u64,
    #[serde(default)]
    pub botnet_detected: u64,
    #[serde(default)]
    pub normal_traffic: u64,
    #[serde(default)]
    pub alerts_sent: u64,
    /// Botnet share in percent
    #[serde(default)]
    pub detection_rate: f64,
}

/// One sample observed during a live-monitoring run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitorDetection {
    pub sample_id: u64,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub prediction: u8,
    #[serde(default)]
    pub prediction_label: Option<String>,
    pub probability: f64,
    pub confidence: f64,
    #[serde(default)]
    pub actual_label: Option<u8>,
    #[serde(default)]
    pub alert_sent: bool,
}

/// Live-monitoring run response
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MonitorReport {
    pub summary: MonitorSummary,
    #[serde(default)]
    pub detections: Vec<MonitorDetection>,
}

// ============================================
// DATASET DTOs
// ============================================

/// Dataset metadata
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DatasetInfo {
    #[serde(default)]
    pub total_samples: Option<u64>,
    #[serde(default)]
    pub num_features: Option<u64>,
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub has_labels: Option<bool>,
    #[serde(default)]
    pub normal_samples: Option<u64>,
    #[serde(default)]
    pub botnet_samples: Option<u64>,
    #[serde(default)]
    pub botnet_percentage: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Page of raw dataset rows
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SampleBatch {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub balanced: Option<bool>,
    #[serde(default)]
    pub samples: Vec<Map<String, Value>>,
}

impl SampleBatch {
    /// Rows with any field whose text contains `term` (case-insensitive)
    pub fn search(&self, term: &str) -> Vec<&Map<String, Value>> {
        if term.is_empty() {
            return self.samples.iter().collect();
        }
        let needle = term.to_lowercase();
        self.samples
            .iter()
            .filter(|row| {
                row.values().any(|v| {
                    let text = match v {
                        Value::String(s) => s.to_lowercase(),
                        other => other.to_string().to_lowercase(),
                    };
                    text.contains(&needle)
                })
            })
            .collect()
    }
}
