//! Gaussian naive-Bayes fatigue classifier over (blink rate, mean blink duration)

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::FatigueError;

/// Exemplar label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatigueLabel {
    Alert,
    Fatigued,
}

/// Classifier input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlinkFeatures {
    /// Blinks per minute
    pub blink_rate: f64,
    /// Mean blink duration (milliseconds)
    pub avg_blink_duration_ms: f64,
}

impl BlinkFeatures {
    fn as_array(&self) -> [f64; 2] {
        [self.blink_rate, self.avg_blink_duration_ms]
    }
}

/// One labelled exemplar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub blink_rate: f64,
    pub avg_blink_duration_ms: f64,
    pub label: FatigueLabel,
}

impl CalibrationSample {
    pub fn new(blink_rate: f64, avg_blink_duration_ms: f64, label: FatigueLabel) -> Self {
        Self {
            blink_rate,
            avg_blink_duration_ms,
            label,
        }
    }
}

/// Exemplars the classifier is fitted on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSet {
    pub samples: Vec<CalibrationSample>,
}

impl Default for CalibrationSet {
    fn default() -> Self {
        use FatigueLabel::*;
        Self {
            samples: vec![
                CalibrationSample::new(15.0, 100.0, Alert),
                CalibrationSample::new(16.0, 110.0, Alert),
                CalibrationSample::new(14.0, 90.0, Alert),
                CalibrationSample::new(6.0, 200.0, Fatigued),
                CalibrationSample::new(7.0, 180.0, Fatigued),
                CalibrationSample::new(5.0, 220.0, Fatigued),
            ],
        }
    }
}

/// Per-class Gaussian parameters
#[derive(Debug, Clone, Copy)]
struct ClassModel {
    log_prior: f64,
    mean: [f64; 2],
    var: [f64; 2],
}

impl ClassModel {
    fn joint_log_likelihood(&self, x: &[f64; 2]) -> f64 {
        let mut ll = self.log_prior;
        for i in 0..2 {
            ll -= 0.5 * (2.0 * std::f64::consts::PI * self.var[i]).ln();
            ll -= (x[i] - self.mean[i]).powi(2) / (2.0 * self.var[i]);
        }
        ll
    }
}

/// Relative variance floor added to every class variance
const VAR_SMOOTHING: f64 = 1e-9;

/// Absolute floor so identical exemplars never give a zero variance
const MIN_VARIANCE: f64 = 1e-9;

/// Fitted fatigue classifier. Immutable once fitted.
#[derive(Debug, Clone)]
pub struct FatigueClassifier {
    alert: ClassModel,
    fatigued: ClassModel,
}

impl FatigueClassifier {
    /// Fit on a calibration set. Both labels must be present.
    pub fn fit(calibration: &CalibrationSet) -> Result<Self, FatigueError> {
        let rows: Vec<[f64; 2]> = calibration
            .samples
            .iter()
            .map(|s| [s.blink_rate, s.avg_blink_duration_ms])
            .collect();

        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(FatigueError::Config("calibration set contains non-finite values".into()));
        }

        let overall = mean_var(&rows);
        let epsilon = (VAR_SMOOTHING * overall.1[0].max(overall.1[1])).max(MIN_VARIANCE);

        let total = rows.len() as f64;
        let class = |label: FatigueLabel| -> Result<ClassModel, FatigueError> {
            let members: Vec<[f64; 2]> = calibration
                .samples
                .iter()
                .filter(|s| s.label == label)
                .map(|s| [s.blink_rate, s.avg_blink_duration_ms])
                .collect();
            if members.is_empty() {
                return Err(FatigueError::Config(format!(
                    "calibration set has no {:?} exemplars",
                    label
                )));
            }
            let (mean, var) = mean_var(&members);
            Ok(ClassModel {
                log_prior: (members.len() as f64 / total).ln(),
                mean,
                var: [var[0] + epsilon, var[1] + epsilon],
            })
        };

        let alert = class(FatigueLabel::Alert)?;
        let fatigued = class(FatigueLabel::Fatigued)?;
        debug!(
            "Fitted fatigue classifier: alert mean {:?}, fatigued mean {:?}",
            alert.mean, fatigued.mean
        );

        Ok(Self { alert, fatigued })
    }

    /// P(fatigued | features)
    pub fn fatigue_probability(&self, features: &BlinkFeatures) -> f64 {
        let x = features.as_array();
        let a = self.alert.joint_log_likelihood(&x);
        let f = self.fatigued.joint_log_likelihood(&x);

        // log-sum-exp normalisation
        let max = a.max(f);
        let denom = max + ((a - max).exp() + (f - max).exp()).ln();
        (f - denom).exp()
    }
}

/// Column means and population variances
fn mean_var(rows: &[[f64; 2]]) -> ([f64; 2], [f64; 2]) {
    let n = rows.len().max(1) as f64;
    let mut mean = [0.0; 2];
    for row in rows {
        mean[0] += row[0];
        mean[1] += row[1];
    }
    mean[0] /= n;
    mean[1] /= n;

    let mut var = [0.0; 2];
    for row in rows {
        var[0] += (row[0] - mean[0]).powi(2);
        var[1] += (row[1] - mean[1]).powi(2);
    }
    var[0] /= n;
    var[1] /= n;

    (mean, var)
}
