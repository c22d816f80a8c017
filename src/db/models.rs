use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub type DbId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: DbId,
    pub username: String,
    /// Argon2id PHC string, never the plaintext.
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Processing,
    Completed,
    Failed,
}

impl EvaluationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, EvaluationStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationStatus::Processing => "processing",
            EvaluationStatus::Completed => "completed",
            EvaluationStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackItem {
    #[serde(rename = "type")]
    pub kind: FeedbackKind,
    pub message: String,
    /// Seconds into the video the remark refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionDistribution {
    pub neutral: u32,
    pub happy: u32,
    pub sad: u32,
    pub angry: u32,
    pub fearful: u32,
    pub disgusted: u32,
    pub surprised: u32,
}

impl ExpressionDistribution {
    pub fn total(&self) -> u32 {
        self.neutral
            + self.happy
            + self.sad
            + self.angry
            + self.fearful
            + self.disgusted
            + self.surprised
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// `m:ss` label for chart axes.
    pub time: String,
    pub confidence: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisDetails {
    pub expression_distribution: ExpressionDistribution,
    pub timeline: Vec<TimelinePoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_contact_percentage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posture_feedback: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gesture_feedback: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
    pub status: EvaluationStatus,
    pub overall_score: Option<i32>,
    pub confidence_score: Option<i32>,
    pub facial_expressions_score: Option<i32>,
    pub eye_contact_score: Option<i32>,
    pub body_language_score: Option<i32>,
    pub feedback: Option<Vec<FeedbackItem>>,
    pub analysis_details: Option<AnalysisDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvaluation {
    pub user_id: DbId,
    pub title: String,
    pub video_url: String,
}

/// Partial update; every `Some` field overwrites the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationUpdate {
    pub status: Option<EvaluationStatus>,
    pub overall_score: Option<i32>,
    pub confidence_score: Option<i32>,
    pub facial_expressions_score: Option<i32>,
    pub eye_contact_score: Option<i32>,
    pub body_language_score: Option<i32>,
    pub feedback: Option<Vec<FeedbackItem>>,
    pub analysis_details: Option<AnalysisDetails>,
}

impl EvaluationUpdate {
    pub fn failed() -> Self {
        Self {
            status: Some(EvaluationStatus::Failed),
            ..Default::default()
        }
    }

    pub fn apply_to(self, evaluation: &mut Evaluation) {
        if let Some(status) = self.status {
            evaluation.status = status;
        }
        if let Some(v) = self.overall_score {
            evaluation.overall_score = Some(v);
        }
        if let Some(v) = self.confidence_score {
            evaluation.confidence_score = Some(v);
        }
        if let Some(v) = self.facial_expressions_score {
            evaluation.facial_expressions_score = Some(v);
        }
        if let Some(v) = self.eye_contact_score {
            evaluation.eye_contact_score = Some(v);
        }
        if let Some(v) = self.body_language_score {
            evaluation.body_language_score = Some(v);
        }
        if let Some(v) = self.feedback {
            evaluation.feedback = Some(v);
        }
        if let Some(v) = self.analysis_details {
            evaluation.analysis_details = Some(v);
        }
    }
}
