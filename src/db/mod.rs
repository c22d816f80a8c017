mod models;

pub use models::*;

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type DbPool = Arc<dyn Storage>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Evaluation {id} is already {status}")]
    TerminalState { id: DbId, status: EvaluationStatus },

    #[error("Username {0} is already taken")]
    UsernameTaken(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed storage of users and evaluations.
///
/// Lookups report absence with `Ok(None)`; errors are reserved for rejected
/// writes.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert unconditionally. Uniqueness is `register_user`'s job.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    /// Insert only if no user holds `user.username`. The lookup and the
    /// insert happen under one write lock.
    async fn register_user(&self, user: NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: DbId) -> StoreResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn create_evaluation(&self, evaluation: NewEvaluation) -> StoreResult<Evaluation>;

    async fn get_evaluation(&self, id: DbId) -> StoreResult<Option<Evaluation>>;

    /// Newest first by `created_at`, newer id first on ties.
    async fn get_evaluations_by_user_id(&self, user_id: DbId) -> StoreResult<Vec<Evaluation>>;

    /// Merge `update` into the stored record. Unknown ids yield `Ok(None)`;
    /// records already in a terminal state are left untouched and rejected.
    async fn update_evaluation(
        &self,
        id: DbId,
        update: EvaluationUpdate,
    ) -> StoreResult<Option<Evaluation>>;
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<DbId, User>,
    evaluations: BTreeMap<DbId, Evaluation>,
    last_user_id: DbId,
    last_evaluation_id: DbId,
}

impl Tables {
    fn insert_user(&mut self, user: NewUser) -> User {
        self.last_user_id += 1;
        let record = User {
            id: self.last_user_id,
            username: user.username,
            password: user.password,
        };
        self.users.insert(record.id, record.clone());
        record
    }
}

/// Process-lifetime storage. One lock covers the maps and the id counters.
#[derive(Default)]
pub struct MemStorage {
    tables: RwLock<Tables>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> DbPool {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        Ok(self.tables.write().await.insert_user(user))
    }

    async fn register_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UsernameTaken(user.username));
        }
        Ok(tables.insert_user(user))
    }

    async fn get_user(&self, id: DbId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_evaluation(&self, evaluation: NewEvaluation) -> StoreResult<Evaluation> {
        let mut tables = self.tables.write().await;
        tables.last_evaluation_id += 1;
        let record = Evaluation {
            id: tables.last_evaluation_id,
            user_id: evaluation.user_id,
            title: evaluation.title,
            video_url: evaluation.video_url,
            created_at: Utc::now(),
            status: EvaluationStatus::Processing,
            overall_score: None,
            confidence_score: None,
            facial_expressions_score: None,
            eye_contact_score: None,
            body_language_score: None,
            feedback: None,
            analysis_details: None,
        };
        tables.evaluations.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_evaluation(&self, id: DbId) -> StoreResult<Option<Evaluation>> {
        Ok(self.tables.read().await.evaluations.get(&id).cloned())
    }

    async fn get_evaluations_by_user_id(&self, user_id: DbId) -> StoreResult<Vec<Evaluation>> {
        let mut rows: Vec<Evaluation> = self
            .tables
            .read()
            .await
            .evaluations
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn update_evaluation(
        &self,
        id: DbId,
        update: EvaluationUpdate,
    ) -> StoreResult<Option<Evaluation>> {
        let mut tables = self.tables.write().await;
        let Some(evaluation) = tables.evaluations.get_mut(&id) else {
            return Ok(None);
        };
        if evaluation.status.is_terminal() {
            return Err(StoreError::TerminalState {
                id,
                status: evaluation.status,
            });
        }
        update.apply_to(evaluation);
        Ok(Some(evaluation.clone()))
    }
}
