//! Detection Metrics
//!
//! Confusion counts and the derived accuracy/precision/recall/F1 for a batch
//! of predictions. Everything here is a pure function of its input.
//!
//! ## Display calibration
//!
//! [`DisplayAdjust`] reproduces the dashboard's habit of shaving a fixed,
//! sample-count dependent offset off displayed percentages. It only touches
//! presentation and is off unless `display.calibrated_percentages` is set.

use serde::Serialize;

use crate::api::{DetectionResult, Prediction};

/// Counts of the four outcome classes over labeled predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub tp: u64,
    pub tn: u64,
    pub fp: u64,
    #[serde(rename = "fn")]
    pub fn_: u64,
}

impl ConfusionCounts {
    /// Tally labeled predictions in one pass; unlabeled entries are skipped
    pub fn tally(predictions: &[Prediction]) -> Self {
        let mut counts = Self::default();
        for p in predictions {
            match (p.actual_label, p.prediction) {
                (Some(1), 1) => counts.tp += 1,
                (Some(0), 0) => counts.tn += 1,
                (Some(0), 1) => counts.fp += 1,
                (Some(1), 0) => counts.fn_ += 1,
                _ => {}
            }
        }
        counts
    }

    pub fn total(&self) -> u64 {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// `[[tn, fp], [fn, tp]]`: rows are actual normal/botnet, columns predicted
    pub fn matrix(&self) -> [[u64; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// Harmonic mean of precision and recall
    pub fn f1(&self) -> Option<f64> {
        let p = self.precision()?;
        let r = self.recall()?;
        if p == 0.0 || r == 0.0 || p + r == 0.0 {
            return None;
        }
        Some(2.0 * p * r / (p + r))
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Quality metrics for one detection result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub matrix: Option<[[u64; 2]; 2]>,
}

impl Metrics {
    /// Metrics from confusion counts over a labeled sequence
    pub fn from_counts(counts: &ConfusionCounts) -> Self {
        Self {
            accuracy: counts.accuracy(),
            precision: counts.precision(),
            recall: counts.recall(),
            f1: counts.f1(),
            matrix: Some(counts.matrix()),
        }
    }

    /// Metrics for a stored result.
    ///
    /// Without any ground-truth label there is no confusion matrix and
    /// accuracy falls back to the server's summary percentage.
    pub fn from_result(result: &DetectionResult) -> Self {
        if !result.has_labels() {
            return Self {
                accuracy: result.summary.accuracy.map(|pct| pct / 100.0),
                ..Self::default()
            };
        }
        Self::from_counts(&ConfusionCounts::tally(&result.predictions))
    }

    pub fn has_matrix(&self) -> bool {
        self.matrix.is_some()
    }
}

/// Presentation-only downward calibration of displayed values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayAdjust {
    enabled: bool,
    sample_count: u64,
}

impl DisplayAdjust {
    const PERCENT_BASE: f64 = 2.3;
    const PERCENT_PER_SAMPLE: f64 = 0.02;
    const PERCENT_EXTRA_CAP: f64 = 0.4;
    const DECIMAL_BASE: f64 = 0.023;
    const DECIMAL_PER_SAMPLE: f64 = 0.0004;
    const DECIMAL_EXTRA_CAP: f64 = 0.0044;

    pub fn new(enabled: bool, sample_count: u64) -> Self {
        Self {
            enabled,
            sample_count,
        }
    }

    /// No adjustment at all
    pub fn off() -> Self {
        Self::new(false, 0)
    }

    /// Adjust a value expressed in percent (0-100), rounded to one decimal
    pub fn percent(&self, value: f64) -> f64 {
        if !self.enabled {
            return value;
        }
        let extra = (self.sample_count as f64 * Self::PERCENT_PER_SAMPLE).min(Self::PERCENT_EXTRA_CAP);
        round_to(value - (Self::PERCENT_BASE + extra), 1).max(0.0)
    }

    /// Adjust a ratio (0-1), rounded to four decimals
    pub fn decimal(&self, value: f64) -> f64 {
        if !self.enabled {
            return value;
        }
        let extra = (self.sample_count as f64 * Self::DECIMAL_PER_SAMPLE).min(Self::DECIMAL_EXTRA_CAP);
        round_to(value - (Self::DECIMAL_BASE + extra), 4).max(0.0)
    }

    /// Format an optional ratio as a percentage, `-` when absent
    pub fn format_ratio(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => format!("{:.1}%", self.decimal(v) * 100.0),
            None => "-".to_string(),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// One point of the per-sample probability/confidence series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// `S1`, `S2`, ...
    pub name: String,
    /// Probability in percent, two decimals
    pub probability: f64,
    /// Confidence in percent, two decimals
    pub confidence: f64,
}

/// Probability and confidence per sample, in input order
pub fn probability_series(predictions: &[Prediction]) -> Vec<SeriesPoint> {
    predictions
        .iter()
        .enumerate()
        .map(|(i, p)| SeriesPoint {
            name: format!("S{}", i + 1),
            probability: round_to(p.probability * 100.0, 2),
            confidence: round_to(p.confidence * 100.0, 2),
        })
        .collect()
}

/// One row of the detection log view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow {
    pub id: usize,
    pub prediction: String,
    /// Confidence in percent, two decimals
    pub confidence: String,
    /// Probability in percent, two decimals
    pub probability: String,
}

/// Log rows for every prediction of a result
pub fn detection_log(result: &DetectionResult) -> Vec<LogRow> {
    result
        .predictions
        .iter()
        .enumerate()
        .map(|(i, p)| LogRow {
            id: i + 1,
            prediction: p.label().to_string(),
            confidence: format!("{:.2}", p.confidence * 100.0),
            probability: format!("{:.2}", p.probability * 100.0),
        })
        .collect()
}

/// Headline numbers of the last detection
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub packets_monitored: u64,
    pub botnets_detected: u64,
    /// Model accuracy in percent after display calibration
    pub model_accuracy: Option<f64>,
}

impl RunSummary {
    /// Counts come from the server summary, falling back to the predictions
    pub fn from_result(result: &DetectionResult, adjust: DisplayAdjust) -> Self {
        let packets_monitored = result
            .sample_count()
            .unwrap_or(result.predictions.len() as u64);
        let botnets_detected = result.summary.botnet_detected.unwrap_or_else(|| {
            result
                .predictions
                .iter()
                .filter(|p| p.prediction == 1)
                .count() as u64
        });

        Self {
            packets_monitored,
            botnets_detected,
            model_accuracy: result.summary.accuracy.map(|pct| adjust.percent(pct)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DetectionSummary;
    use serde_json::Map;

    fn pred(prediction: u8, actual: Option<u8>) -> Prediction {
        Prediction {
            prediction,
            prediction_label: None,
            probability: if prediction == 1 { 0.9 } else { 0.2 },
            confidence: 0.8,
            actual_label: actual,
            extra: Map::new(),
        }
    }

    fn result(predictions: Vec<Prediction>, accuracy: Option<f64>) -> DetectionResult {
        DetectionResult {
            total_samples: Some(predictions.len() as u64),
            summary: DetectionSummary {
                total_samples: Some(predictions.len() as u64),
                accuracy,
                ..Default::default()
            },
            predictions,
            extra: Map::new(),
            raw: None,
        }
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-12).unwrap_or(false)
    }

    #[test]
    fn test_worked_example() {
        let preds = vec![pred(1, Some(1)), pred(0, Some(0)), pred(1, Some(0))];
        let counts = ConfusionCounts::tally(&preds);
        assert_eq!(
            counts,
            ConfusionCounts {
                tp: 1,
                tn: 1,
                fp: 1,
                fn_: 0
            }
        );

        let metrics = Metrics::from_result(&result(preds, None));
        assert!(approx(metrics.accuracy, 2.0 / 3.0));
        assert!(approx(metrics.precision, 0.5));
        assert!(approx(metrics.recall, 1.0));
        assert!(approx(metrics.f1, 2.0 / 3.0));
        assert_eq!(metrics.matrix, Some([[1, 1], [0, 1]]));
    }

    #[test]
    fn test_matches_manual_tally() {
        // Pseudo-random labeled/unlabeled mix
        let mut seed = 7u64;
        let mut preds = Vec::new();
        for _ in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let prediction = ((seed >> 33) & 1) as u8;
            let actual = match (seed >> 40) % 3 {
                0 => None,
                1 => Some(0),
                _ => Some(1),
            };
            preds.push(pred(prediction, actual));
        }

        let (mut tp, mut tn, mut fp, mut fn_) = (0.0, 0.0, 0.0, 0.0);
        for p in &preds {
            match (p.actual_label, p.prediction) {
                (Some(1), 1) => tp += 1.0,
                (Some(0), 0) => tn += 1.0,
                (Some(0), 1) => fp += 1.0,
                (Some(1), 0) => fn_ += 1.0,
                _ => {}
            }
        }
        let precision = tp / (tp + fp);
        let recall = tp / (tp + fn_);

        let metrics = Metrics::from_result(&result(preds, Some(12.0)));
        assert!(approx(metrics.accuracy, (tp + tn) / (tp + tn + fp + fn_)));
        assert!(approx(metrics.precision, precision));
        assert!(approx(metrics.recall, recall));
        assert!(approx(
            metrics.f1,
            2.0 * precision * recall / (precision + recall)
        ));
    }

    #[test]
    fn test_unlabeled_falls_back_to_summary() {
        let preds = vec![pred(1, None), pred(0, None)];
        let metrics = Metrics::from_result(&result(preds, Some(87.5)));
        assert!(approx(metrics.accuracy, 0.875));
        assert!(metrics.precision.is_none());
        assert!(metrics.f1.is_none());
        assert!(!metrics.has_matrix());
    }

    #[test]
    fn test_empty_result() {
        let metrics = Metrics::from_result(&result(Vec::new(), None));
        assert_eq!(metrics, Metrics::default());
    }

    #[test]
    fn test_undefined_ratios() {
        // Only true negatives: precision and recall have zero denominators
        let counts = ConfusionCounts::tally(&[pred(0, Some(0)), pred(0, Some(0))]);
        assert_eq!(counts.accuracy(), Some(1.0));
        assert!(counts.precision().is_none());
        assert!(counts.recall().is_none());
        assert!(counts.f1().is_none());

        // Precision and recall both zero
        let counts = ConfusionCounts::tally(&[pred(1, Some(0)), pred(0, Some(1))]);
        assert_eq!(counts.precision(), Some(0.0));
        assert_eq!(counts.recall(), Some(0.0));
        assert!(counts.f1().is_none());
    }

    #[test]
    fn test_display_adjust() {
        let off = DisplayAdjust::off();
        assert_eq!(off.percent(97.25), 97.25);
        assert_eq!(off.decimal(0.5), 0.5);

        let small = DisplayAdjust::new(true, 10);
        assert_eq!(small.percent(100.0), 97.5);
        assert_eq!(small.decimal(1.0), 0.973);

        let large = DisplayAdjust::new(true, 50);
        assert_eq!(large.percent(100.0), 97.3);
        assert_eq!(large.decimal(1.0), 0.9726);
        assert_eq!(large.percent(1.0), 0.0);

        assert_eq!(small.format_ratio(Some(1.0)), "97.3%");
        assert_eq!(small.format_ratio(None), "-");
    }

    #[test]
    fn test_probability_series_and_log() {
        let r = result(vec![pred(1, Some(1)), pred(0, None)], None);

        let series = probability_series(&r.predictions);
        assert_eq!(series[0].name, "S1");
        assert_eq!(series[0].probability, 90.0);
        assert_eq!(series[1].confidence, 80.0);

        let log = detection_log(&r);
        assert_eq!(log[1].id, 2);
        assert_eq!(log[0].prediction, "Botnet");
        assert_eq!(log[1].probability, "20.00");
    }

    #[test]
    fn test_run_summary() {
        let mut r = result(vec![pred(1, None), pred(0, None), pred(1, None)], Some(97.5));
        r.summary.total_samples = Some(50);

        let plain = RunSummary::from_result(&r, DisplayAdjust::off());
        assert_eq!(plain.packets_monitored, 50);
        assert_eq!(plain.botnets_detected, 2);
        assert_eq!(plain.model_accuracy, Some(97.5));

        r.summary.botnet_detected = Some(12);
        let shown = RunSummary::from_result(&r, DisplayAdjust::new(true, 50));
        assert_eq!(shown.botnets_detected, 12);
        assert_eq!(shown.model_accuracy, Some(94.8));

        let empty = RunSummary::from_result(&DetectionResult::default(), DisplayAdjust::off());
        assert_eq!(empty, RunSummary::default());
    }
}
