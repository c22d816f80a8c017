//! Presentation analysis.
//!
//! The lifecycle driver only sees the [`Analyzer`] trait, so a real
//! media-inference backend can replace [`SimulatedAnalyzer`] without touching
//! the driver or the store.

mod feedback;
mod simulated;

pub use feedback::{body_language_notes, generate_feedback, CategoryScores};
pub use simulated::{
    expression_distribution, overall_score, timeline, weighted_score, SimulatedAnalyzer,
};

use async_trait::async_trait;

use crate::db::{AnalysisDetails, EvaluationStatus, EvaluationUpdate, FeedbackItem};

/// The five performance metrics plus the feedback and chart payload that
/// accompany them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBundle {
    pub overall: i32,
    pub scores: CategoryScores,
    pub feedback: Vec<FeedbackItem>,
    pub details: AnalysisDetails,
}

impl From<ScoreBundle> for EvaluationUpdate {
    fn from(bundle: ScoreBundle) -> Self {
        EvaluationUpdate {
            status: Some(EvaluationStatus::Completed),
            overall_score: Some(bundle.overall),
            confidence_score: Some(bundle.scores.confidence),
            facial_expressions_score: Some(bundle.scores.facial_expressions),
            eye_contact_score: Some(bundle.scores.eye_contact),
            body_language_score: Some(bundle.scores.body_language),
            feedback: Some(bundle.feedback),
            analysis_details: Some(bundle.details),
        }
    }
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Short identifier used in logs (e.g. "simulated").
    fn name(&self) -> &str;

    /// Score the video behind `video_ref` (a URL path or storage key).
    async fn evaluate(&self, video_ref: &str) -> anyhow::Result<ScoreBundle>;
}
