//! Poll service: vote submission coordination and poll lifecycle.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use livepoll_common::{AppError, AppResult, IdGenerator};
use livepoll_db::{
    entities::{poll, vote_record},
    repositories::{PollRepository, ScoreRepository, UserRepository, VoteRecordRepository},
};
use sea_orm::Set;
use serde_json::json;
use tracing::{info, warn};

use super::event_publisher::EventPublisherService;
use super::notification::NotificationService;
use super::tally::{AnswerKey, VoteMap, Voter};
use super::user::SessionContext;

/// Maximum length of a single option label.
const MAX_OPTION_LEN: usize = 200;

/// Input for creating a poll.
pub struct CreatePollInput {
    /// The question text.
    pub question: String,
    /// 2-4 option labels; index is the option's stable identity.
    pub options: Vec<String>,
    /// Whether voters may select more than one option.
    pub multiple_choice: bool,
    /// Answer key for single-choice polls.
    pub correct_option: Option<i32>,
    /// Answer key for multiple-choice polls.
    pub correct_options: Option<Vec<i32>>,
}

/// A poll together with the caller's voting state.
pub struct PollView {
    /// The poll row.
    pub poll: poll::Model,
    /// Whether the caller has a vote record for this poll.
    pub has_voted: bool,
    /// The caller's previous selection, empty if none.
    pub my_selection: Vec<i32>,
}

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    vote_repo: VoteRecordRepository,
    score_repo: ScoreRepository,
    user_repo: UserRepository,
    notifier: NotificationService,
    events: EventPublisherService,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        vote_repo: VoteRecordRepository,
        score_repo: ScoreRepository,
        user_repo: UserRepository,
        notifier: NotificationService,
        events: EventPublisherService,
    ) -> Self {
        Self {
            poll_repo,
            vote_repo,
            score_repo,
            user_repo,
            notifier,
            events,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new poll with an empty tally.
    pub async fn create_poll(
        &self,
        ctx: &SessionContext,
        input: CreatePollInput,
    ) -> AppResult<poll::Model> {
        validate_create(&input)?;

        let question = input.question.trim().to_string();
        let options = input.options;

        let model = poll::ActiveModel {
            question: Set(question.clone()),
            options: Set(json!(options)),
            multiple_choice: Set(input.multiple_choice),
            correct_option: Set(input.correct_option),
            correct_options: Set(input.correct_options.map(|indices| json!(indices))),
            creator_id: Set(Some(ctx.user_id.clone())),
            votes: Set(json!({})),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let created = self.poll_repo.create(model).await?;
        info!(poll_id = created.id, creator = %ctx.user_id, "Poll created");

        if let Err(e) = self.events.publish_poll_created(created.id).await {
            warn!(poll_id = created.id, error = %e, "Failed to publish poll created event");
        }

        // Best-effort announcement; delivery failures never fail creation
        match self.user_repo.list_emails().await {
            Ok(recipients) => {
                if let Err(e) = self
                    .notifier
                    .send_poll_announcement(&recipients, &question, &options)
                    .await
                {
                    warn!(poll_id = created.id, error = %e, "Poll announcement failed");
                }
            }
            Err(e) => warn!(error = %e, "Could not load announcement recipients"),
        }

        Ok(created)
    }

    /// List all polls, newest first.
    pub async fn list_polls(&self) -> AppResult<Vec<poll::Model>> {
        self.poll_repo.list().await
    }

    /// Get a poll together with the caller's voting state.
    ///
    /// The previous selection is re-checked against the vote record
    /// store, never trusted from the client.
    pub async fn get_poll_view(
        &self,
        ctx: Option<&SessionContext>,
        poll_id: i64,
    ) -> AppResult<PollView> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;

        let (has_voted, my_selection) = if let Some(ctx) = ctx {
            match self
                .vote_repo
                .find_by_user_and_poll(&ctx.user_id, poll_id)
                .await?
            {
                Some(record) => {
                    let selected: Vec<i32> = serde_json::from_value(record.selected_options)
                        .map_err(|e| {
                            AppError::Internal(format!("Invalid vote record selection: {e}"))
                        })?;
                    (true, selected)
                }
                None => (false, Vec::new()),
            }
        } else {
            (false, Vec::new())
        };

        Ok(PollView {
            poll,
            has_voted,
            my_selection,
        })
    }

    /// Submit a ballot: validate, commit the vote record and tally
    /// update atomically, then apply the scoring side effect.
    ///
    /// The tally write is a read-modify-write of the whole votes map;
    /// two near-simultaneous ballots from different users can race on
    /// it. Per-user duplicate safety is guaranteed by the store's
    /// uniqueness constraint; tally exactness is best-effort and
    /// repairable via [`Self::reconcile_tally`].
    pub async fn submit_vote(
        &self,
        ctx: &SessionContext,
        poll_id: i64,
        selected: &[i32],
    ) -> AppResult<VoteMap> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;

        let options: Vec<String> = serde_json::from_value(poll.options.clone())
            .map_err(|e| AppError::Internal(format!("Invalid poll options: {e}")))?;
        validate_selection(options.len(), poll.multiple_choice, selected)?;

        // Advisory pre-check; the UNIQUE constraint is the backstop
        if self.vote_repo.exists(&ctx.user_id, poll_id).await? {
            return Err(AppError::DuplicateVote { poll_id });
        }

        let mut votes = VoteMap::from_json(&poll.votes)?;
        let voter = Voter {
            id: ctx.user_id.clone(),
            email: ctx.email.clone(),
        };
        for &index in selected {
            votes.record(index, voter.clone());
        }

        let vote_model = vote_record::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(ctx.user_id.clone()),
            question_id: Set(poll_id),
            selected_options: Set(json!(selected)),
            created_at: Set(Utc::now().into()),
        };

        let mut tally_update: poll::ActiveModel = poll.clone().into();
        tally_update.votes = Set(votes.to_json()?);

        let (updated, _) = self
            .poll_repo
            .commit_vote(poll_id, vote_model, tally_update)
            .await?;

        info!(poll_id, voter = %ctx.user_id, "Vote committed");

        self.award_score_if_correct(ctx, &poll, selected).await;

        if let Err(e) = self.events.publish_poll_updated(poll_id).await {
            warn!(poll_id, error = %e, "Failed to publish poll updated event");
        }

        VoteMap::from_json(&updated.votes)
    }

    /// Delete a poll and all its vote records. Creator only.
    ///
    /// Returns the number of vote records removed.
    pub async fn delete_poll(&self, ctx: &SessionContext, poll_id: i64) -> AppResult<u64> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        if poll.creator_id.as_deref() != Some(ctx.user_id.as_str()) {
            return Err(AppError::Forbidden(
                "Only the poll creator may delete it".to_string(),
            ));
        }

        let vote_count = self.vote_repo.count_for_poll(poll_id).await?;

        match self.poll_repo.delete_with_votes(poll_id).await {
            Ok(votes_deleted) => {
                info!(poll_id, votes_deleted, "Poll deleted");
                if let Err(e) = self.events.publish_poll_deleted(poll_id).await {
                    warn!(poll_id, error = %e, "Failed to publish poll deleted event");
                }
                Ok(votes_deleted)
            }
            Err(err @ AppError::PollNotFound(_)) => Err(err),
            Err(err) => {
                // Classify before surfacing: if the children are
                // verifiably gone but the parent row remains, a retry
                // must target only the parent step.
                let votes_left = self.vote_repo.count_for_poll(poll_id).await;
                let parent_left = self.poll_repo.find_by_id(poll_id).await;
                if vote_count > 0
                    && matches!(votes_left, Ok(0))
                    && matches!(parent_left, Ok(Some(_)))
                {
                    Err(AppError::PartialDeletion {
                        poll_id,
                        votes_deleted: vote_count,
                    })
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Recompute the tally from the vote record table and repair the
    /// poll row when they diverge.
    ///
    /// The vote record table is the source of truth; the embedded tally
    /// is a best-effort projection that can lose increments under
    /// concurrent read-modify-writes.
    pub async fn reconcile_tally(&self, poll_id: i64) -> AppResult<bool> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        let records = self.vote_repo.find_by_poll(poll_id).await?;

        let mut voters: HashMap<String, Voter> = HashMap::new();
        let mut rebuilt = VoteMap::default();

        for record in records {
            let voter = if let Some(known) = voters.get(&record.user_id) {
                known.clone()
            } else {
                match self.user_repo.find_by_id(&record.user_id).await? {
                    Some(user) => {
                        let voter = Voter {
                            id: user.id,
                            email: user.email,
                        };
                        voters.insert(record.user_id.clone(), voter.clone());
                        voter
                    }
                    None => {
                        warn!(
                            user_id = %record.user_id,
                            "Vote record without user row, skipping attribution"
                        );
                        continue;
                    }
                }
            };

            let selected: Vec<i32> = serde_json::from_value(record.selected_options)
                .map_err(|e| AppError::Internal(format!("Invalid vote record selection: {e}")))?;
            for index in selected {
                rebuilt.record(index, voter.clone());
            }
        }

        let current = VoteMap::from_json(&poll.votes)?;
        if current == rebuilt {
            return Ok(false);
        }

        info!(poll_id, "Tally diverged from vote records, repairing");
        let mut active: poll::ActiveModel = poll.into();
        active.votes = Set(rebuilt.to_json()?);
        self.poll_repo.update(active).await?;

        if let Err(e) = self.events.publish_poll_updated(poll_id).await {
            warn!(poll_id, error = %e, "Failed to publish poll updated event");
        }

        Ok(true)
    }

    /// Scoring side effect: increment the voter's score when the
    /// submission exactly matches the answer key. Every failure here is
    /// logged and swallowed; voting success never depends on scoring.
    async fn award_score_if_correct(
        &self,
        ctx: &SessionContext,
        poll: &poll::Model,
        selected: &[i32],
    ) {
        let key = match AnswerKey::from_poll_fields(
            poll.multiple_choice,
            poll.correct_option,
            poll.correct_options.as_ref(),
        ) {
            Ok(Some(key)) => key,
            Ok(None) => return,
            Err(e) => {
                warn!(poll_id = poll.id, error = %e, "Unreadable answer key, skipping scoring");
                return;
            }
        };

        if !key.matches_exactly(selected) {
            return;
        }

        match self.score_repo.increment(&ctx.user_id, &ctx.username).await {
            Ok(score) => {
                info!(user_id = %ctx.user_id, score = score.score, "Score incremented");
                if let Err(e) = self.events.publish_score_updated(&ctx.user_id).await {
                    warn!(user_id = %ctx.user_id, error = %e, "Failed to publish score event");
                }
            }
            Err(e) => {
                warn!(user_id = %ctx.user_id, error = %e, "Failed to update score");
            }
        }
    }
}

/// Validate a ballot against the poll's option count and choice mode.
fn validate_selection(
    option_count: usize,
    multiple_choice: bool,
    selected: &[i32],
) -> AppResult<()> {
    if selected.is_empty() {
        return Err(AppError::Validation(
            "Select at least one option".to_string(),
        ));
    }
    if !multiple_choice && selected.len() != 1 {
        return Err(AppError::Validation(
            "This poll allows exactly one choice".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for &index in selected {
        if index < 0 || index as usize >= option_count {
            return Err(AppError::Validation(format!("Invalid option: {index}")));
        }
        if !seen.insert(index) {
            return Err(AppError::Validation(format!(
                "Option selected twice: {index}"
            )));
        }
    }

    Ok(())
}

/// Validate poll creation input.
fn validate_create(input: &CreatePollInput) -> AppResult<()> {
    if input.question.trim().is_empty() {
        return Err(AppError::Validation("Question cannot be empty".to_string()));
    }
    if input.options.len() < 2 {
        return Err(AppError::Validation(
            "Poll must have at least 2 options".to_string(),
        ));
    }
    if input.options.len() > 4 {
        return Err(AppError::Validation(
            "Poll cannot have more than 4 options".to_string(),
        ));
    }
    for option in &input.options {
        if option.trim().is_empty() {
            return Err(AppError::Validation(
                "Poll options cannot be empty".to_string(),
            ));
        }
        if option.len() > MAX_OPTION_LEN {
            return Err(AppError::Validation(format!(
                "Poll option is too long (max {MAX_OPTION_LEN} chars)"
            )));
        }
    }

    let option_count = input.options.len() as i32;

    if input.multiple_choice {
        if input.correct_option.is_some() {
            return Err(AppError::Validation(
                "Multiple-choice polls use correct_options".to_string(),
            ));
        }
        if let Some(indices) = &input.correct_options {
            let mut seen = HashSet::new();
            for &index in indices {
                if index < 0 || index >= option_count {
                    return Err(AppError::Validation(format!(
                        "Answer key index out of range: {index}"
                    )));
                }
                if !seen.insert(index) {
                    return Err(AppError::Validation(format!(
                        "Answer key index repeated: {index}"
                    )));
                }
            }
        }
    } else {
        if input.correct_options.is_some() {
            return Err(AppError::Validation(
                "Single-choice polls use correct_option".to_string(),
            ));
        }
        if let Some(index) = input.correct_option {
            if index < 0 || index >= option_count {
                return Err(AppError::Validation(format!(
                    "Answer key index out of range: {index}"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::event_publisher::NoOpEventPublisher;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

    fn base_input() -> CreatePollInput {
        CreatePollInput {
            question: "Favorite color?".to_string(),
            options: vec!["Red".to_string(), "Blue".to_string()],
            multiple_choice: false,
            correct_option: Some(0),
            correct_options: None,
        }
    }

    #[test]
    fn test_selection_must_not_be_empty() {
        let err = validate_selection(2, false, &[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_single_choice_accepts_exactly_one() {
        assert!(validate_selection(2, false, &[1]).is_ok());
        assert!(validate_selection(2, false, &[0, 1]).is_err());
    }

    #[test]
    fn test_selection_indices_must_be_in_range() {
        assert!(validate_selection(2, false, &[2]).is_err());
        assert!(validate_selection(2, false, &[-1]).is_err());
        assert!(validate_selection(3, true, &[0, 2]).is_ok());
    }

    #[test]
    fn test_selection_rejects_repeats() {
        let err = validate_selection(3, true, &[1, 1]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_create_accepts_two_to_four_options() {
        assert!(validate_create(&base_input()).is_ok());

        let mut too_few = base_input();
        too_few.options.truncate(1);
        assert!(validate_create(&too_few).is_err());

        let mut too_many = base_input();
        too_many.options = (0..5).map(|i| format!("Option {i}")).collect();
        assert!(validate_create(&too_many).is_err());
    }

    #[test]
    fn test_create_rejects_blank_question_and_options() {
        let mut blank_question = base_input();
        blank_question.question = "   ".to_string();
        assert!(validate_create(&blank_question).is_err());

        let mut blank_option = base_input();
        blank_option.options[1] = String::new();
        assert!(validate_create(&blank_option).is_err());
    }

    #[test]
    fn test_create_answer_key_shape_follows_choice_mode() {
        let mut mixed = base_input();
        mixed.multiple_choice = true;
        // correct_option set on a multiple-choice poll
        assert!(validate_create(&mixed).is_err());

        let mut multi = base_input();
        multi.multiple_choice = true;
        multi.correct_option = None;
        multi.correct_options = Some(vec![0, 1]);
        assert!(validate_create(&multi).is_ok());

        let mut out_of_range = multi;
        out_of_range.correct_options = Some(vec![0, 7]);
        assert!(validate_create(&out_of_range).is_err());

        let mut single_with_set = base_input();
        single_with_set.correct_options = Some(vec![0]);
        assert!(validate_create(&single_with_set).is_err());
    }

    #[test]
    fn test_create_answer_key_out_of_range_single() {
        let mut input = base_input();
        input.correct_option = Some(5);
        assert!(validate_create(&input).is_err());
    }

    fn service_with(db: DatabaseConnection) -> PollService {
        let db = Arc::new(db);
        PollService::new(
            PollRepository::new(db.clone()),
            VoteRecordRepository::new(db.clone()),
            ScoreRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            NotificationService::disabled(),
            Arc::new(NoOpEventPublisher),
        )
    }

    fn session(name: &str) -> SessionContext {
        SessionContext {
            user_id: name.to_string(),
            email: format!("{name}@example.com"),
            username: name.to_string(),
        }
    }

    fn stored_poll() -> poll::Model {
        poll::Model {
            id: 1,
            question: "Favorite color?".to_string(),
            options: json!(["Red", "Blue"]),
            multiple_choice: false,
            correct_option: Some(0),
            correct_options: None,
            creator_id: Some("creator".to_string()),
            votes: json!({}),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_submit_vote_rejects_empty_selection() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored_poll()]])
            .into_connection();
        let service = service_with(db);

        let err = service
            .submit_vote(&session("alice"), 1, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_vote_rejects_out_of_range_index() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored_poll()]])
            .into_connection();
        let service = service_with(db);

        let err = service
            .submit_vote(&session("alice"), 1, &[2])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_vote_rejects_known_duplicate() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored_poll()]])
            .append_query_results([vec![
                btreemap! { "num_items" => Into::<sea_orm::Value>::into(1i64) },
            ]])
            .into_connection();
        let service = service_with(db);

        let err = service
            .submit_vote(&session("alice"), 1, &[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateVote { poll_id: 1 }));
    }

    #[tokio::test]
    async fn test_delete_poll_requires_creator() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored_poll()]])
            .into_connection();
        let service = service_with(db);

        let err = service
            .delete_poll(&session("stranger"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
