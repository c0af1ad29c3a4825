//! Account service
//!
//! Signup, login, logout, and public profile reads. Issues the session
//! rows and signed tokens that the auth middleware verifies, and
//! records every authentication attempt for audit.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::security::record_auth_attempt;
use crate::auth::{Session, create_session_token};
use crate::config::AppConfig;
use crate::data::{AuthEventType, Database, EntityId, SessionRecord, User};
use crate::error::{AppError, ValidationErrors};

const MIN_NAME_CHARS: usize = 2;
const MIN_USERNAME_CHARS: usize = 3;
const MIN_PASSWORD_CHARS: usize = 8;

/// Fields accepted at signup.
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A signed-in user: the persisted row, the session backing the token,
/// and the token itself.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub session: Session,
    pub token: String,
}

/// Request metadata recorded with auth attempts.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn push_error(errors: &mut ValidationErrors, field: &str, message: String) {
    errors.entry(field.to_string()).or_default().push(message);
}

fn validate_signup(input: &SignupInput) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    if input.name.chars().count() < MIN_NAME_CHARS {
        push_error(
            &mut errors,
            "name",
            format!("Name must be at least {MIN_NAME_CHARS} characters"),
        );
    }
    if input.username.chars().count() < MIN_USERNAME_CHARS {
        push_error(
            &mut errors,
            "username",
            format!("Username must be at least {MIN_USERNAME_CHARS} characters"),
        );
    }
    if !is_valid_email(&input.email) {
        push_error(
            &mut errors,
            "email",
            "Please enter a valid email address".to_string(),
        );
    }
    if input.password.chars().count() < MIN_PASSWORD_CHARS {
        push_error(
            &mut errors,
            "password",
            format!("Password must be at least {MIN_PASSWORD_CHARS} characters"),
        );
    }

    errors
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    config: Arc<AppConfig>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, config: Arc<AppConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new user and sign them in.
    ///
    /// Email and username uniqueness is case-insensitive. The checks
    /// run before the insert to produce field errors; a racing insert
    /// that slips between check and write still fails on the unique
    /// index and is remapped.
    pub async fn signup(
        &self,
        input: SignupInput,
        client: &ClientInfo,
    ) -> Result<AuthenticatedUser, AppError> {
        let errors = validate_signup(&input);
        if !errors.is_empty() {
            return Err(AppError::Invalid(errors));
        }

        if self.db.get_user_by_email(&input.email).await?.is_some() {
            self.record_attempt(&input.email, client, false, AuthEventType::Signup)
                .await;
            return Err(AppError::invalid_field(
                "email",
                "This email is already in use. Please use a different email.",
            ));
        }

        if self.db.get_user_by_username(&input.username).await?.is_some() {
            self.record_attempt(&input.email, client, false, AuthEventType::Signup)
                .await;
            return Err(AppError::invalid_field(
                "username",
                "This username is already taken. Please choose a different username.",
            ));
        }

        let password_hash = hash_password(&input.password)?;
        let user = User {
            id: EntityId::new().0,
            email: input.email,
            username: input.username,
            display_name: input.name,
            password_hash,
            profile_image_url: None,
            bio: None,
            created_at: Utc::now(),
        };

        match self.db.insert_user(&user).await {
            Ok(()) => {}
            Err(error) if error.is_unique_violation() => {
                // Lost a race with a concurrent signup for the same
                // email or username.
                self.record_attempt(&user.email, client, false, AuthEventType::Signup)
                    .await;
                return Err(AppError::Validation(
                    "Email or username already exists.".to_string(),
                ));
            }
            Err(error) => return Err(error),
        }

        self.record_attempt(&user.email, client, true, AuthEventType::Signup)
            .await;

        let (session, token) = self.create_session(&user).await?;
        Ok(AuthenticatedUser {
            user,
            session,
            token,
        })
    }

    /// Sign in with an email or username.
    ///
    /// The failure message never says whether the identifier or the
    /// password was wrong.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        client: &ClientInfo,
    ) -> Result<AuthenticatedUser, AppError> {
        let user = match self.db.get_user_by_identifier(identifier).await? {
            Some(user) => user,
            None => {
                self.record_attempt(identifier, client, false, AuthEventType::Login)
                    .await;
                return Err(AppError::LoginFailed);
            }
        };

        if !verify_password(password, &user.password_hash)? {
            self.record_attempt(identifier, client, false, AuthEventType::Login)
                .await;
            return Err(AppError::LoginFailed);
        }

        self.record_attempt(identifier, client, true, AuthEventType::Login)
            .await;

        let (session, token) = self.create_session(&user).await?;
        Ok(AuthenticatedUser {
            user,
            session,
            token,
        })
    }

    /// Invalidate a session row.
    ///
    /// A missing row is fine; the token holder is logged out either
    /// way once the cookie is cleared.
    pub async fn logout(&self, session_id: &str) -> Result<(), AppError> {
        let removed = self.db.delete_session(session_id).await?;
        if !removed {
            tracing::debug!(%session_id, "logout for a session that was already gone");
        }
        Ok(())
    }

    /// Public profile by user ID.
    pub async fn get_profile(&self, user_id: &str) -> Result<User, AppError> {
        self.db.get_user(user_id).await?.ok_or(AppError::NotFound)
    }

    /// Insert a session row and sign a token that references it.
    async fn create_session(&self, user: &User) -> Result<(Session, String), AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(self.config.auth.session_max_age);

        let record = SessionRecord {
            id: EntityId::new().0,
            user_id: user.id.clone(),
            created_at: now,
            expires_at,
        };
        self.db.insert_session(&record).await?;

        let session = Session {
            session_id: record.id,
            user_id: user.id.clone(),
            username: user.username.clone(),
            created_at: now,
            expires_at,
        };
        let token = create_session_token(&session, &self.config.auth.session_secret)?;

        Ok((session, token))
    }

    async fn record_attempt(
        &self,
        identifier: &str,
        client: &ClientInfo,
        success: bool,
        event_type: AuthEventType,
    ) {
        record_auth_attempt(
            &self.db,
            identifier,
            client.ip_address.clone(),
            client.user_agent.clone(),
            success,
            event_type,
        )
        .await;
    }
}
