//! User and session service.
//!
//! Identity itself is delegated to an external provider; this service
//! keeps the mirrored user rows and resolves bearer tokens into an
//! explicit [`SessionContext`] that is threaded through every
//! coordinator call. There is no ambient current-user state.

use chrono::Utc;
use livepoll_common::{AppError, AppResult, IdGenerator};
use livepoll_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;

/// The authenticated caller, passed explicitly into service methods.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// User id.
    pub user_id: String,
    /// Display email (used for vote attribution).
    pub email: String,
    /// Username (used for the score row).
    pub username: String,
}

impl SessionContext {
    /// Build a session context from a resolved user row.
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
        }
    }
}

/// Input for registering a user.
pub struct RegisterInput {
    /// Username.
    pub username: String,
    /// Email address.
    pub email: String,
}

/// User service for session resolution and registration.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a user, issuing a bearer token.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        let username = input.username.trim();
        let email = input.email.trim().to_lowercase();

        if username.is_empty() {
            return Err(AppError::Validation("Username cannot be empty".to_string()));
        }
        if !email.contains('@') {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Validation(
                "Email address is already registered".to_string(),
            ));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username.to_string()),
            email: Set(email),
            token: Set(self.id_gen.generate_token()),
            created_at: Set(Utc::now().into()),
        };

        self.user_repo.create(model).await
    }

    /// Resolve a bearer token to a user row.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Sign out: rotate the bearer token so the presented one no
    /// longer resolves.
    pub async fn sign_out(&self, ctx: &SessionContext) -> AppResult<()> {
        self.user_repo
            .rotate_token(&ctx.user_id, self.id_gen.generate_token())
            .await
    }
}
