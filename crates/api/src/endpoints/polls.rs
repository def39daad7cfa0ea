//! Poll endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use livepoll_common::{AppError, AppResult};
use livepoll_core::services::{AnswerKey, CreatePollInput, VoteMap};
use livepoll_db::entities::poll;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AuthSession, MaybeAuthSession},
    middleware::AppState,
    response::ApiResponse,
};

/// Poll response with derived tallies.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: i64,
    pub question: String,
    pub options: Vec<PollOptionResponse>,
    pub multiple_choice: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_options: Option<Vec<i32>>,
    pub total_votes: u64,
    pub has_voted: bool,
    pub my_selection: Vec<i32>,
    pub created_at: String,
}

/// Per-option response with derived share.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionResponse {
    pub text: String,
    pub votes: u64,
    pub percentage: f64,
    /// Whether this option is part of the answer key, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
    /// Attribution detail, present only for the poll's creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voters: Option<Vec<VoterResponse>>,
}

/// Voter identity in the creator-facing detail view.
#[derive(Debug, Serialize)]
pub struct VoterResponse {
    pub id: String,
    pub email: String,
}

/// Build the response projection for a poll snapshot.
///
/// Totals and percentages are re-derived here on every call; nothing is
/// cached beyond the snapshot itself.
fn poll_response(
    poll: &poll::Model,
    has_voted: bool,
    my_selection: Vec<i32>,
    include_voters: bool,
) -> AppResult<PollResponse> {
    let options: Vec<String> = serde_json::from_value(poll.options.clone())
        .map_err(|e| AppError::Internal(format!("Invalid poll options: {e}")))?;
    let votes = VoteMap::from_json(&poll.votes)?;

    let correct_options: Option<Vec<i32>> = match &poll.correct_options {
        Some(raw) => Some(
            serde_json::from_value(raw.clone())
                .map_err(|e| AppError::Internal(format!("Invalid answer key: {e}")))?,
        ),
        None => None,
    };

    let answer_key = AnswerKey::from_poll_fields(
        poll.multiple_choice,
        poll.correct_option,
        poll.correct_options.as_ref(),
    )?;

    let option_responses = options
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let index = i as i32;
            PollOptionResponse {
                text,
                votes: votes.entry(index).map_or(0, |entry| entry.count),
                percentage: votes.percentage(index),
                correct: answer_key.as_ref().map(|key| key.contains(index)),
                voters: include_voters.then(|| {
                    votes.entry(index).map_or_else(Vec::new, |entry| {
                        entry
                            .users
                            .iter()
                            .map(|voter| VoterResponse {
                                id: voter.id.clone(),
                                email: voter.email.clone(),
                            })
                            .collect()
                    })
                }),
            }
        })
        .collect();

    Ok(PollResponse {
        id: poll.id,
        question: poll.question.clone(),
        options: option_responses,
        multiple_choice: poll.multiple_choice,
        correct_option: poll.correct_option,
        correct_options,
        total_votes: votes.total_votes(),
        has_voted,
        my_selection,
        created_at: poll.created_at.to_rfc3339(),
    })
}

fn is_creator(poll: &poll::Model, ctx: Option<&livepoll_core::services::SessionContext>) -> bool {
    match (poll.creator_id.as_deref(), ctx) {
        (Some(creator), Some(ctx)) => creator == ctx.user_id,
        _ => false,
    }
}

/// List all polls, newest first.
async fn list_polls(
    MaybeAuthSession(maybe): MaybeAuthSession,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<PollResponse>>> {
    let polls = state.poll_service.list_polls().await?;

    let responses = polls
        .iter()
        .map(|poll| poll_response(poll, false, Vec::new(), is_creator(poll, maybe.as_ref())))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::ok(responses))
}

/// Create poll request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePollRequest {
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 2, max = 4))]
    pub options: Vec<String>,
    #[serde(default)]
    pub multiple_choice: bool,
    #[serde(default)]
    pub correct_option: Option<i32>,
    #[serde(default)]
    pub correct_options: Option<Vec<i32>>,
}

/// Create a new poll.
async fn create_poll(
    AuthSession(ctx): AuthSession,
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    req.validate()?;

    let poll = state
        .poll_service
        .create_poll(
            &ctx,
            CreatePollInput {
                question: req.question,
                options: req.options,
                multiple_choice: req.multiple_choice,
                correct_option: req.correct_option,
                correct_options: req.correct_options,
            },
        )
        .await?;

    Ok(ApiResponse::ok(poll_response(&poll, false, Vec::new(), true)?))
}

/// Get one poll with the caller's voting state.
async fn show_poll(
    MaybeAuthSession(maybe): MaybeAuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<PollResponse>> {
    let view = state.poll_service.get_poll_view(maybe.as_ref(), id).await?;

    Ok(ApiResponse::ok(poll_response(
        &view.poll,
        view.has_voted,
        view.my_selection,
        is_creator(&view.poll, maybe.as_ref()),
    )?))
}

/// Vote request.
#[derive(Debug, Deserialize, Validate)]
pub struct VoteRequest {
    #[validate(length(min = 1))]
    pub selected_options: Vec<i32>,
}

/// Submit a ballot.
async fn vote(
    AuthSession(ctx): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<VoteRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    req.validate()?;

    state
        .poll_service
        .submit_vote(&ctx, id, &req.selected_options)
        .await?;

    // Re-read through the view path so the response reflects the
    // committed state, including has_voted and the stored selection
    let view = state.poll_service.get_poll_view(Some(&ctx), id).await?;

    Ok(ApiResponse::ok(poll_response(
        &view.poll,
        view.has_voted,
        view.my_selection,
        is_creator(&view.poll, Some(&ctx)),
    )?))
}

/// Delete response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePollResponse {
    pub votes_deleted: u64,
}

/// Delete a poll (creator only).
async fn delete_poll(
    AuthSession(ctx): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<DeletePollResponse>> {
    let votes_deleted = state.poll_service.delete_poll(&ctx, id).await?;
    Ok(ApiResponse::ok(DeletePollResponse { votes_deleted }))
}

/// Reconcile response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub repaired: bool,
}

/// Recompute the tally from vote records and repair divergence.
async fn reconcile(
    AuthSession(_ctx): AuthSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<ApiResponse<ReconcileResponse>> {
    let repaired = state.poll_service.reconcile_tally(id).await?;
    Ok(ApiResponse::ok(ReconcileResponse { repaired }))
}

/// Router for poll endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_polls).post(create_poll))
        .route("/{id}", get(show_poll).delete(delete_poll))
        .route("/{id}/vote", post(vote))
        .route("/{id}/reconcile", post(reconcile))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn sample_poll() -> poll::Model {
        poll::Model {
            id: 1,
            question: "Favorite color?".to_string(),
            options: json!(["Red", "Blue"]),
            multiple_choice: false,
            correct_option: Some(0),
            correct_options: None,
            creator_id: Some("creator".to_string()),
            votes: json!({
                "0": { "count": 3, "users": [
                    { "id": "u1", "email": "u1@example.com" },
                    { "id": "u2", "email": "u2@example.com" },
                    { "id": "u3", "email": "u3@example.com" },
                ]},
                "1": { "count": 1, "users": [{ "id": "u4", "email": "u4@example.com" }] },
            }),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_response_derives_totals_and_percentages() {
        let response = poll_response(&sample_poll(), true, vec![0], false).unwrap();

        assert_eq!(response.total_votes, 4);
        assert_eq!(response.options.len(), 2);
        assert_eq!(response.options[0].votes, 3);
        assert_eq!(response.options[0].percentage, 75.0);
        assert_eq!(response.options[1].percentage, 25.0);
        assert_eq!(response.options[0].correct, Some(true));
        assert_eq!(response.options[1].correct, Some(false));
        assert!(response.has_voted);
        assert_eq!(response.my_selection, vec![0]);
    }

    #[test]
    fn test_no_answer_key_leaves_correct_unset() {
        let mut poll = sample_poll();
        poll.correct_option = None;

        let response = poll_response(&poll, false, Vec::new(), false).unwrap();
        assert!(response.options[0].correct.is_none());
    }

    #[test]
    fn test_attribution_only_for_creator() {
        let hidden = poll_response(&sample_poll(), false, Vec::new(), false).unwrap();
        assert!(hidden.options[0].voters.is_none());

        let revealed = poll_response(&sample_poll(), false, Vec::new(), true).unwrap();
        let voters = revealed.options[0].voters.as_ref().unwrap();
        assert_eq!(voters.len(), 3);
        assert_eq!(voters[0].email, "u1@example.com");
    }

    #[test]
    fn test_empty_tally_serializes_zeroes() {
        let mut poll = sample_poll();
        poll.votes = json!({});

        let response = poll_response(&poll, false, Vec::new(), false).unwrap();
        assert_eq!(response.total_votes, 0);
        assert_eq!(response.options[0].votes, 0);
        assert_eq!(response.options[0].percentage, 0.0);
    }

    #[test]
    fn test_creator_check() {
        use livepoll_core::services::SessionContext;

        let poll = sample_poll();
        let creator = SessionContext {
            user_id: "creator".to_string(),
            email: "creator@example.com".to_string(),
            username: "creator".to_string(),
        };
        let other = SessionContext {
            user_id: "other".to_string(),
            email: "other@example.com".to_string(),
            username: "other".to_string(),
        };

        assert!(is_creator(&poll, Some(&creator)));
        assert!(!is_creator(&poll, Some(&other)));
        assert!(!is_creator(&poll, None));
    }
}
