//! Poll repository.

use std::sync::Arc;

use crate::entities::{Poll, VoteRecord, poll, vote_record};
use livepoll_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    SqlErr, TransactionTrait,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by id.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by id, returning an error if not found.
    pub async fn get_by_id(&self, id: i64) -> AppResult<poll::Model> {
        self.find_by_id(id)
            .await?
            .ok_or(AppError::PollNotFound(id))
    }

    /// List all polls, newest first.
    pub async fn list(&self) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .order_by_desc(poll::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new poll.
    pub async fn create(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Commit a ballot: insert the vote record and write the updated
    /// tally in a single transaction.
    ///
    /// The UNIQUE (user_id, question_id) constraint is the final
    /// duplicate-vote backstop; a violation surfaces as
    /// [`AppError::DuplicateVote`] and rolls back the tally write.
    pub async fn commit_vote(
        &self,
        poll_id: i64,
        vote: vote_record::ActiveModel,
        tally_update: poll::ActiveModel,
    ) -> AppResult<(poll::Model, vote_record::Model)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let vote = vote.insert(&txn).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::DuplicateVote { poll_id }
            } else {
                AppError::Database(e.to_string())
            }
        })?;

        let poll = tally_update
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((poll, vote))
    }

    /// Delete a poll together with all its vote records, child rows
    /// first, in a single transaction.
    ///
    /// Returns the number of vote records removed. A missing poll row
    /// rolls the whole operation back.
    pub async fn delete_with_votes(&self, poll_id: i64) -> AppResult<u64> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let votes = VoteRecord::delete_many()
            .filter(vote_record::Column::QuestionId.eq(poll_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let poll = Poll::delete_by_id(poll_id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if poll.rows_affected == 0 {
            // Dropping the transaction rolls back the child deletes.
            return Err(AppError::PollNotFound(poll_id));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(votes.rows_affected)
    }
}
