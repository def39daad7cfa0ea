//! Vote record repository: the duplicate-vote store contract.

use std::sync::Arc;

use crate::entities::{VoteRecord, vote_record};
use livepoll_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

/// Vote record repository for database operations.
#[derive(Clone)]
pub struct VoteRecordRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteRecordRepository {
    /// Create a new vote record repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check whether a user has already voted on a poll.
    pub async fn exists(&self, user_id: &str, question_id: i64) -> AppResult<bool> {
        let count = VoteRecord::find()
            .filter(vote_record::Column::UserId.eq(user_id))
            .filter(vote_record::Column::QuestionId.eq(question_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Find a user's vote record for a poll, if any.
    pub async fn find_by_user_and_poll(
        &self,
        user_id: &str,
        question_id: i64,
    ) -> AppResult<Option<vote_record::Model>> {
        VoteRecord::find()
            .filter(vote_record::Column::UserId.eq(user_id))
            .filter(vote_record::Column::QuestionId.eq(question_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All vote records for a poll in submission order.
    pub async fn find_by_poll(&self, question_id: i64) -> AppResult<Vec<vote_record::Model>> {
        VoteRecord::find()
            .filter(vote_record::Column::QuestionId.eq(question_id))
            .order_by_asc(vote_record::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count vote records for a poll.
    pub async fn count_for_poll(&self, question_id: i64) -> AppResult<u64> {
        VoteRecord::find()
            .filter(vote_record::Column::QuestionId.eq(question_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
