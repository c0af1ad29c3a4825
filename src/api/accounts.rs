//! Account and auth endpoints
//!
//! Signup, login, logout, the current-identity check, and public
//! profiles. Successful signup and login set the `session` cookie as
//! well as returning the token in the body, so both browser and API
//! clients can authenticate.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{AppendHeaders, IntoResponse, Json},
};
use serde::Deserialize;

use crate::AppState;
use crate::api::converters::{current_user_to_response, profile_to_response};
use crate::api::dto::{AuthPayload, CurrentUserResponse, MutationResponse, ProfileResponse};
use crate::auth::CurrentUser;
use crate::auth::security::{client_ip, user_agent};
use crate::error::AppError;
use crate::metrics::{
    DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS, HTTP_REQUEST_DURATION_SECONDS,
    HTTP_REQUESTS_TOTAL, USERS_TOTAL,
};
use crate::service::{AccountService, ClientInfo, SignupInput};

const SESSION_COOKIE: &str = "session";

/// Signup request
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login request
///
/// `identifier` accepts an email or a username.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

fn build_account_service(state: &AppState) -> AccountService {
    AccountService::new(state.db.clone(), state.config.clone())
}

fn client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        ip_address: client_ip(headers),
        user_agent: user_agent(headers),
    }
}

fn session_cookie_header(token: &str, max_age: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_session_cookie_header(secure: bool) -> String {
    session_cookie_header("", 0, secure)
}

/// POST /api/v1/accounts
pub async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/accounts"])
        .start_timer();

    let account_service = build_account_service(&state);
    let client = client_info(&headers);
    let input = SignupInput {
        name: req.name,
        username: req.username,
        email: req.email,
        password: req.password,
    };

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["INSERT", "users"])
        .start_timer();
    let authenticated = account_service.signup(input, &client).await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["INSERT", "users"])
        .inc();
    db_timer.observe_duration();

    USERS_TOTAL.inc();

    let cookie = session_cookie_header(
        &authenticated.token,
        state.config.auth.session_max_age,
        state.config.should_use_secure_cookies(),
    );
    let body = MutationResponse::new(AuthPayload {
        user: current_user_to_response(&authenticated.user),
        token: authenticated.token,
    });

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/accounts", "200"])
        .inc();

    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body)))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/auth/login"])
        .start_timer();

    let account_service = build_account_service(&state);
    let client = client_info(&headers);

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["SELECT", "users"])
        .start_timer();
    let authenticated = account_service
        .login(&req.identifier, &req.password, &client)
        .await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["SELECT", "users"])
        .inc();
    db_timer.observe_duration();

    let cookie = session_cookie_header(
        &authenticated.token,
        state.config.auth.session_max_age,
        state.config.should_use_secure_cookies(),
    );
    let body = MutationResponse::new(AuthPayload {
        user: current_user_to_response(&authenticated.user),
        token: authenticated.token,
    });

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/auth/login", "200"])
        .inc();

    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body)))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/v1/auth/logout"])
        .start_timer();

    let account_service = build_account_service(&state);

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["DELETE", "sessions"])
        .start_timer();
    account_service.logout(&session.session_id).await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["DELETE", "sessions"])
        .inc();
    db_timer.observe_duration();

    let cookie = clear_session_cookie_header(state.config.should_use_secure_cookies());

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/v1/auth/logout", "200"])
        .inc();

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(serde_json::json!({ "success": true })),
    ))
}

/// GET /api/v1/accounts/verify_credentials
pub async fn verify_credentials(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<CurrentUserResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/accounts/verify_credentials"])
        .start_timer();

    let account_service = build_account_service(&state);

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["SELECT", "users"])
        .start_timer();
    // A token whose user row has vanished is stale, not a 404.
    let user = account_service
        .get_profile(&session.user_id)
        .await
        .map_err(|error| match error {
            AppError::NotFound => AppError::Unauthorized,
            other => other,
        })?;
    DB_QUERIES_TOTAL
        .with_label_values(&["SELECT", "users"])
        .inc();
    db_timer.observe_duration();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/accounts/verify_credentials", "200"])
        .inc();

    Ok(Json(current_user_to_response(&user)))
}

/// GET /api/v1/accounts/:id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/v1/accounts/:id"])
        .start_timer();

    let account_service = build_account_service(&state);

    let db_timer = DB_QUERY_DURATION_SECONDS
        .with_label_values(&["SELECT", "users"])
        .start_timer();
    let user = account_service.get_profile(&id).await?;
    DB_QUERIES_TOTAL
        .with_label_values(&["SELECT", "users"])
        .inc();
    db_timer.observe_duration();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/v1/accounts/:id", "200"])
        .inc();

    Ok(Json(profile_to_response(&user)))
}
