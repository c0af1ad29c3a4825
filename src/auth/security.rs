//! Authentication audit helpers
//!
//! Records login and signup attempts for security monitoring.
//! Recording failures never fail the authentication flow itself.

use axum::http::HeaderMap;
use chrono::Utc;

use crate::data::{AuthAttempt, AuthEventType, Database, EntityId};

/// Mask an identifier for storage and logging
///
/// Email-like identifiers keep the first character and the domain:
/// "jane@example.com" becomes "j***@example.com". Plain usernames
/// keep the first character: "janedoe" becomes "j***". Anything
/// unmaskable becomes "***@***".
pub fn mask_identifier(identifier: &str) -> String {
    match identifier.split_once('@') {
        Some((local, domain)) => {
            let mut chars = local.chars();
            match chars.next() {
                Some(first) if !domain.is_empty() => {
                    format!("{}{}@{}", first, "*".repeat(3), domain)
                }
                _ => "***@***".to_string(),
            }
        }
        None => {
            let mut chars = identifier.chars();
            match chars.next() {
                Some(first) => format!("{}***", first),
                None => "***@***".to_string(),
            }
        }
    }
}

/// Extract the client IP from proxy headers
///
/// Takes the first `X-Forwarded-For` hop, falling back to `X-Real-IP`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(ToOwned::to_owned)
        })
}

/// Extract the client user agent
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(ToOwned::to_owned)
}

/// Record an authentication attempt, swallowing storage failures
pub async fn record_auth_attempt(
    db: &Database,
    identifier: &str,
    ip_address: Option<String>,
    user_agent: Option<String>,
    success: bool,
    event_type: AuthEventType,
) {
    let attempt = AuthAttempt {
        id: EntityId::new().0,
        identifier: mask_identifier(identifier),
        ip_address,
        user_agent,
        success,
        event_type: event_type.as_str().to_string(),
        created_at: Utc::now(),
    };

    if let Err(error) = db.insert_auth_attempt(&attempt).await {
        tracing::warn!(
            identifier = %attempt.identifier,
            event_type = %attempt.event_type,
            "Failed to record auth attempt: {}",
            error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn masks_email_identifiers() {
        assert_eq!(mask_identifier("jane@example.com"), "j***@example.com");
        assert_eq!(mask_identifier("a@b.org"), "a***@b.org");
    }

    #[test]
    fn masks_plain_usernames() {
        assert_eq!(mask_identifier("janedoe"), "j***");
    }

    #[test]
    fn masks_unmaskable_identifiers_completely() {
        assert_eq!(mask_identifier(""), "***@***");
        assert_eq!(mask_identifier("@example.com"), "***@***");
        assert_eq!(mask_identifier("jane@"), "***@***");
    }

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&headers), Some("198.51.100.2".to_string()));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
