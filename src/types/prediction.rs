//! Prediction results and the `/analyze` response

use crate::models::scoring::{argmax, top_k};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Result value returned when the top-1 confidence is below the threshold.
pub const REJECTION_SENTINEL: &str = "wrong";

/// Outcome of a single forward pass
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    /// Index of the predicted class
    pub class_index: usize,
    /// Predicted class label
    pub label: String,
    /// Probability of the predicted class
    pub confidence: f32,
    /// Probability for every class, in label order
    pub probabilities: Vec<f32>,
    /// Highest scoring classes as (label, probability), best first
    pub top_k: Vec<(String, f32)>,
}

impl Classification {
    /// Build a classification from a probability vector and the label list.
    ///
    /// The vector is matched to `labels` by position; a length mismatch means
    /// the artifact and the label list disagree and is reported as an error.
    pub fn from_probabilities(probabilities: Vec<f32>, labels: &[String], k: usize) -> Result<Self> {
        if probabilities.len() != labels.len() {
            bail!(
                "model produced {} scores for {} labels",
                probabilities.len(),
                labels.len()
            );
        }

        let Some((class_index, confidence)) = argmax(&probabilities) else {
            bail!("model produced no usable scores");
        };

        let top_k = top_k(&probabilities, k)
            .into_iter()
            .map(|(i, p)| (labels[i].clone(), p))
            .collect();

        Ok(Self {
            class_index,
            label: labels[class_index].clone(),
            confidence,
            probabilities,
            top_k,
        })
    }
}

/// Decision taken on a classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Confident prediction of the given label
    Recognized(String),
    /// Top-1 confidence fell below the threshold
    Rejected,
}

impl Verdict {
    /// Apply an optional confidence threshold to a classification.
    ///
    /// A confidence equal to the threshold is accepted.
    pub fn from_classification(classification: &Classification, threshold: Option<f32>) -> Self {
        match threshold {
            Some(t) if classification.confidence < t => Verdict::Rejected,
            _ => Verdict::Recognized(classification.label.clone()),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Verdict::Rejected)
    }
}

/// JSON body returned by `POST /analyze`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub result: String,
}

impl From<Verdict> for AnalyzeResponse {
    fn from(verdict: Verdict) -> Self {
        let result = match verdict {
            Verdict::Recognized(label) => label,
            Verdict::Rejected => REJECTION_SENTINEL.to_string(),
        };
        Self { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["Stop".to_string(), "Yield".to_string(), "Keep left".to_string()]
    }

    #[test]
    fn test_from_probabilities() {
        let c = Classification::from_probabilities(vec![0.1, 0.85, 0.05], &labels(), 2).unwrap();

        assert_eq!(c.class_index, 1);
        assert_eq!(c.label, "Yield");
        assert_eq!(c.confidence, 0.85);
        assert_eq!(c.top_k.len(), 2);
        assert_eq!(c.top_k[0].0, "Yield");
        assert_eq!(c.top_k[1].0, "Stop");
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = Classification::from_probabilities(vec![0.5, 0.5], &labels(), 5).unwrap_err();
        assert!(err.to_string().contains("2 scores for 3 labels"));
    }

    #[test]
    fn test_threshold_rejects_low_confidence() {
        let c = Classification::from_probabilities(vec![0.5, 0.3, 0.2], &labels(), 5).unwrap();

        assert_eq!(Verdict::from_classification(&c, Some(0.85)), Verdict::Rejected);
        assert_eq!(
            Verdict::from_classification(&c, None),
            Verdict::Recognized("Stop".to_string())
        );
    }

    #[test]
    fn test_threshold_boundary_is_accepted() {
        let c = Classification::from_probabilities(vec![0.85, 0.1, 0.05], &labels(), 5).unwrap();
        assert_eq!(
            Verdict::from_classification(&c, Some(0.85)),
            Verdict::Recognized("Stop".to_string())
        );
    }

    #[test]
    fn test_response_serialization() {
        let rejected = AnalyzeResponse::from(Verdict::Rejected);
        assert_eq!(serde_json::to_string(&rejected).unwrap(), r#"{"result":"wrong"}"#);

        let recognized = AnalyzeResponse::from(Verdict::Recognized("Stop".to_string()));
        assert_eq!(serde_json::to_string(&recognized).unwrap(), r#"{"result":"Stop"}"#);
    }
}
