//! Evaluation lifecycle: `processing` → `completed` | `failed`.
//!
//! Submission stores a `processing` record and queues one deferred job for
//! it. A single dispatcher task owns the queue, waits for each job to fall
//! due and runs it on a [`JoinSet`] so every outcome is logged in one place.
//! Jobs run once; there is no retry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::analysis::{Analyzer, ScoreBundle};
use crate::db::{DbId, DbPool, Evaluation, EvaluationUpdate, NewEvaluation, StoreResult};

#[derive(Debug, Clone, Copy)]
struct Job {
    evaluation_id: DbId,
    due: Instant,
}

/// Settles evaluations. Holds no queue handle, so the dispatcher can own one
/// without keeping its own channel open.
struct JobRunner {
    store: DbPool,
    analyzer: Arc<dyn Analyzer>,
}

impl JobRunner {
    async fn complete_evaluation(&self, evaluation_id: DbId) -> anyhow::Result<Evaluation> {
        let evaluation = self
            .store
            .get_evaluation(evaluation_id)
            .await?
            .ok_or_else(|| anyhow!("evaluation {evaluation_id} not found"))?;
        if evaluation.status.is_terminal() {
            tracing::warn!(
                evaluation_id,
                status = %evaluation.status,
                "Evaluation already settled, skipping analysis"
            );
            return Ok(evaluation);
        }

        let outcome = self.analyzer.evaluate(&evaluation.video_url).await;
        if let Err(e) = &outcome {
            tracing::error!(
                evaluation_id,
                analyzer = self.analyzer.name(),
                error = %e,
                "Video analysis failed"
            );
        }

        self.store
            .update_evaluation(evaluation_id, terminal_update(outcome))
            .await?
            .ok_or_else(|| anyhow!("evaluation {evaluation_id} disappeared before it was settled"))
    }
}

/// The update that moves a `processing` record to its terminal state.
pub fn terminal_update(outcome: anyhow::Result<ScoreBundle>) -> EvaluationUpdate {
    match outcome {
        Ok(bundle) => bundle.into(),
        Err(_) => EvaluationUpdate::failed(),
    }
}

pub fn default_title() -> String {
    format!("Evaluation {}", Utc::now().format("%Y-%m-%d %H:%M:%S"))
}

#[derive(Clone)]
pub struct EvaluationDriver {
    store: DbPool,
    runner: Arc<JobRunner>,
    delay: Duration,
    jobs: mpsc::UnboundedSender<Job>,
}

impl EvaluationDriver {
    /// Spawn the dispatcher. It runs until `cancel` fires or every driver
    /// handle is dropped and the queued jobs have finished.
    pub fn start(
        store: DbPool,
        analyzer: Arc<dyn Analyzer>,
        delay: Duration,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (jobs, queue) = mpsc::unbounded_channel();
        let runner = Arc::new(JobRunner {
            store: store.clone(),
            analyzer,
        });

        let handle = tokio::spawn(dispatch(runner.clone(), queue, cancel));
        let driver = Self {
            store,
            runner,
            delay,
            jobs,
        };
        (driver, handle)
    }

    pub fn store(&self) -> &DbPool {
        &self.store
    }

    /// Create a `processing` evaluation and queue its analysis. Returns as
    /// soon as the record is stored.
    pub async fn submit_evaluation(
        &self,
        user_id: DbId,
        title: Option<&str>,
        video_ref: &str,
    ) -> StoreResult<Evaluation> {
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => default_title(),
        };

        let evaluation = self
            .store
            .create_evaluation(NewEvaluation {
                user_id,
                title,
                video_url: video_ref.to_string(),
            })
            .await?;

        let job = Job {
            evaluation_id: evaluation.id,
            due: Instant::now() + self.delay,
        };
        if self.jobs.send(job).is_err() {
            tracing::warn!(
                evaluation_id = evaluation.id,
                "Job dispatcher is not running; evaluation will stay in processing"
            );
        } else {
            tracing::info!(
                evaluation_id = evaluation.id,
                user_id,
                delay_ms = self.delay.as_millis() as u64,
                "Evaluation queued for analysis"
            );
        }

        Ok(evaluation)
    }

    /// Run the deferred job body now.
    pub async fn complete_evaluation(&self, evaluation_id: DbId) -> anyhow::Result<Evaluation> {
        self.runner.complete_evaluation(evaluation_id).await
    }
}

async fn dispatch(
    runner: Arc<JobRunner>,
    mut queue: mpsc::UnboundedReceiver<Job>,
    cancel: CancellationToken,
) {
    let mut running: JoinSet<(DbId, anyhow::Result<Evaluation>)> = JoinSet::new();
    let mut closed = false;

    tracing::info!(analyzer = runner.analyzer.name(), "Evaluation dispatcher started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(pending = running.len(), "Evaluation dispatcher stopping");
                break;
            }
            job = queue.recv(), if !closed => match job {
                Some(job) => {
                    let runner = runner.clone();
                    running.spawn(async move {
                        tokio::time::sleep_until(job.due).await;
                        let result = runner.complete_evaluation(job.evaluation_id).await;
                        (job.evaluation_id, result)
                    });
                }
                None => closed = true,
            },
            Some(joined) = running.join_next(), if !running.is_empty() => match joined {
                Ok((evaluation_id, Ok(evaluation))) => {
                    tracing::info!(
                        evaluation_id,
                        status = %evaluation.status,
                        overall_score = ?evaluation.overall_score,
                        "Evaluation settled"
                    );
                }
                Ok((evaluation_id, Err(e))) => {
                    tracing::error!(evaluation_id, error = %e, "Evaluation job failed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Evaluation job panicked");
                }
            },
        }

        if closed && running.is_empty() {
            break;
        }
    }

    running.abort_all();
}
