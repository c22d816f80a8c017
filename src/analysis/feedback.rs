use rand::Rng;

use crate::db::{FeedbackItem, FeedbackKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryScores {
    pub confidence: i32,
    pub facial_expressions: i32,
    pub eye_contact: i32,
    pub body_language: i32,
}

fn item(kind: FeedbackKind, message: &str, timestamp: u32) -> FeedbackItem {
    FeedbackItem {
        kind,
        message: message.to_string(),
        timestamp: Some(timestamp),
    }
}

/// Build playback feedback from the category scores.
///
/// Strong categories earn a positive remark, weak ones a constructive one,
/// and two neutral observations are always included. The list is ordered by
/// timestamp so it can be replayed alongside the video.
pub fn generate_feedback<R: Rng + ?Sized>(
    rng: &mut R,
    scores: &CategoryScores,
) -> Vec<FeedbackItem> {
    let mut feedback = Vec::new();

    if scores.facial_expressions > 80 {
        feedback.push(item(
            FeedbackKind::Positive,
            "Excellent use of facial expressions to engage audience.",
            rng.gen_range(0..30),
        ));
    }
    if scores.eye_contact > 75 {
        feedback.push(item(
            FeedbackKind::Positive,
            "Good eye contact maintained throughout most of the presentation.",
            rng.gen_range(0..30) + 30,
        ));
    }
    if scores.body_language > 75 {
        feedback.push(item(
            FeedbackKind::Positive,
            "Effective use of hand gestures to emphasize key points.",
            rng.gen_range(0..30) + 60,
        ));
    }
    if scores.confidence > 80 {
        feedback.push(item(
            FeedbackKind::Positive,
            "You appeared confident and well-prepared.",
            rng.gen_range(0..30) + 90,
        ));
    }

    if scores.facial_expressions < 75 {
        feedback.push(item(
            FeedbackKind::Negative,
            "Try to vary your facial expressions more to show enthusiasm.",
            rng.gen_range(0..30) + 45,
        ));
    }
    if scores.eye_contact < 70 {
        feedback.push(item(
            FeedbackKind::Negative,
            "Maintain eye contact with the audience more consistently.",
            rng.gen_range(0..30) + 75,
        ));
    }
    if scores.body_language < 70 {
        feedback.push(item(
            FeedbackKind::Negative,
            "Reduce fidgeting to appear more confident.",
            rng.gen_range(0..30) + 15,
        ));
    }
    if scores.confidence < 75 {
        feedback.push(item(
            FeedbackKind::Negative,
            "Practice more to build confidence in your delivery.",
            rng.gen_range(0..30) + 60,
        ));
    }

    feedback.push(item(
        FeedbackKind::Neutral,
        "Your pace was appropriate for the content.",
        rng.gen_range(0..120),
    ));
    feedback.push(item(
        FeedbackKind::Neutral,
        "Good vocal projection throughout the presentation.",
        rng.gen_range(0..120),
    ));

    feedback.sort_by_key(|f| f.timestamp.unwrap_or(0));
    feedback
}

/// Posture and gesture remarks derived from the body-language score.
pub fn body_language_notes(body_language: i32) -> (Vec<String>, Vec<String>) {
    let posture = vec![
        if body_language > 75 {
            "Excellent upright posture throughout presentation"
        } else {
            "Good posture during most of the presentation"
        }
        .to_string(),
        if body_language < 70 {
            "Tendency to fidget or make distracting movements"
        } else {
            "Occasional unnecessary movements"
        }
        .to_string(),
    ];

    let gestures = vec![
        if body_language > 70 {
            "Effective use of hand gestures to emphasize points"
        } else {
            "Some effective use of gestures"
        }
        .to_string(),
        if body_language < 65 {
            "Could improve the purposefulness of gestures"
        } else {
            "Try to make gestures more deliberate and meaningful"
        }
        .to_string(),
    ];

    (posture, gestures)
}
