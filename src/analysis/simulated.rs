use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::Mutex;

use super::feedback::{body_language_notes, generate_feedback, CategoryScores};
use super::{Analyzer, ScoreBundle};
use crate::db::{AnalysisDetails, ExpressionDistribution, TimelinePoint};

const NOMINAL_DURATION_SECS: f64 = 60.0;

/// Stand-in analyzer that fabricates plausible results without looking at
/// the video. Scores follow a clamped normal distribution so repeated runs
/// cluster the way real sessions do.
#[derive(Debug)]
pub struct SimulatedAnalyzer {
    rng: Mutex<StdRng>,
}

impl SimulatedAnalyzer {
    /// A fixed seed makes the sequence of results reproducible across runs;
    /// `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> ScoreBundle {
        let scores = CategoryScores {
            confidence: weighted_score(rng, 65, 95),
            facial_expressions: weighted_score(rng, 70, 90),
            eye_contact: weighted_score(rng, 60, 85),
            body_language: weighted_score(rng, 55, 90),
        };

        let expression_distribution = expression_distribution(rng);
        let timeline = timeline(rng, NOMINAL_DURATION_SECS);
        let feedback = generate_feedback(rng, &scores);

        let eye_contact_percentage =
            (scores.eye_contact as f64 + rng.gen_range(-5.0..5.0)).round() as i32;
        let (posture, gestures) = body_language_notes(scores.body_language);

        ScoreBundle {
            overall: overall_score(&scores),
            scores,
            feedback,
            details: AnalysisDetails {
                expression_distribution,
                timeline,
                eye_contact_percentage: Some(eye_contact_percentage.clamp(0, 100)),
                posture_feedback: Some(posture),
                gesture_feedback: Some(gestures),
            },
        }
    }
}

#[async_trait]
impl Analyzer for SimulatedAnalyzer {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn evaluate(&self, video_ref: &str) -> anyhow::Result<ScoreBundle> {
        anyhow::ensure!(!video_ref.trim().is_empty(), "empty video reference");
        let bundle = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| anyhow::anyhow!("analyzer rng lock poisoned"))?;
            Self::generate(&mut *rng)
        };
        Ok(bundle)
    }
}

/// Normally distributed score centred on the middle of `[min, max]`, with a
/// standard deviation of a sixth of the range, clamped to the range.
pub fn weighted_score<R: Rng + ?Sized>(rng: &mut R, min: i32, max: i32) -> i32 {
    let mean = f64::from(min + max) / 2.0;
    let std_dev = f64::from(max - min) / 6.0;

    // Box-Muller; u1 is taken from (0, 1] so ln() stays finite.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();

    let score = (mean + z0 * std_dev).round() as i32;
    score.clamp(min, max)
}

/// Weighted mean: facial expressions 30%, confidence and eye contact 25%
/// each, body language 20%.
pub fn overall_score(scores: &CategoryScores) -> i32 {
    (f64::from(scores.confidence) * 0.25
        + f64::from(scores.facial_expressions) * 0.3
        + f64::from(scores.eye_contact) * 0.25
        + f64::from(scores.body_language) * 0.2)
        .round() as i32
}

/// Seven-bucket expression split that always sums to exactly 100.
pub fn expression_distribution<R: Rng + ?Sized>(rng: &mut R) -> ExpressionDistribution {
    let neutral = 40 + rng.gen_range(0..20u32);
    let happy = 20 + rng.gen_range(0..20u32);
    let remaining = 100 - neutral - happy;

    let share = |ratio: f64| (f64::from(remaining) * ratio).floor() as u32;
    let sad = share(rng.gen::<f64>() * 0.3);
    let angry = share(rng.gen::<f64>() * 0.1);
    let fearful = share(rng.gen::<f64>() * 0.15);
    let disgusted = share(rng.gen::<f64>() * 0.05);
    let surprised = remaining - sad - angry - fearful - disgusted;

    ExpressionDistribution {
        neutral,
        happy,
        sad,
        angry,
        fearful,
        disgusted,
        surprised,
    }
}

/// Confidence samples over `duration_secs`: a nervous start, a build-up, a
/// dip in the middle, recovery and a strong finish, with ±5 jitter.
pub fn timeline<R: Rng + ?Sized>(rng: &mut R, duration_secs: f64) -> Vec<TimelinePoint> {
    let points = ((duration_secs / 15.0).floor() as usize).max(8);

    (0..points)
        .map(|i| {
            let progress = i as f64 / (points - 1) as f64;
            let base = if progress < 0.2 {
                60.0 + progress * 50.0
            } else if progress < 0.4 {
                70.0 + (progress - 0.2) * 75.0
            } else if progress < 0.6 {
                85.0 - (progress - 0.4) * 100.0
            } else if progress < 0.8 {
                65.0 + (progress - 0.6) * 75.0
            } else {
                80.0 + (progress - 0.8) * 50.0
            };

            let confidence = (base + rng.gen_range(-5.0..5.0)).round() as i32;
            let at = duration_secs * progress;
            let minutes = (at / 60.0).floor() as u32;
            let seconds = (at % 60.0).floor() as u32;

            TimelinePoint {
                time: format!("{minutes}:{seconds:02}"),
                confidence: confidence.clamp(0, 100),
            }
        })
        .collect()
}
