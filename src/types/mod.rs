//! Data types shared across the server

pub mod labels;
pub mod prediction;

pub use labels::{default_labels, GTSRB_LABELS, NUM_CLASSES};
pub use prediction::{AnalyzeResponse, Classification, Verdict, REJECTION_SENTINEL};
