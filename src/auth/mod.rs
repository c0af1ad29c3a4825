//! Authentication
//!
//! Handles:
//! - Password hashing
//! - Session management
//! - Authentication middleware
//! - Auth attempt audit

mod middleware;
pub mod password;
pub mod security;
pub mod session;

pub use middleware::{CurrentUser, MaybeUser};
pub use session::{Session, create_session_token, verify_session_token};
