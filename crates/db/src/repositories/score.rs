//! Score repository.

use std::sync::Arc;

use crate::entities::{Score, score};
use chrono::Utc;
use livepoll_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

/// Score repository for database operations.
#[derive(Clone)]
pub struct ScoreRepository {
    db: Arc<DatabaseConnection>,
}

impl ScoreRepository {
    /// Create a new score repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user's score row.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Option<score::Model>> {
        Score::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment a user's score, creating the row on first correct vote.
    pub async fn increment(&self, user_id: &str, username: &str) -> AppResult<score::Model> {
        match self.find_by_user(user_id).await? {
            Some(existing) => {
                let next = existing.score + 1;
                let mut active: score::ActiveModel = existing.into();
                active.score = Set(next);
                active.updated_at = Set(Utc::now().into());
                active
                    .update(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
            None => {
                let model = score::ActiveModel {
                    user_id: Set(user_id.to_string()),
                    username: Set(username.to_string()),
                    score: Set(1),
                    updated_at: Set(Utc::now().into()),
                };
                model
                    .insert(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
        }
    }
}
