use chrono::{DateTime, Utc};
use moka::sync::Cache;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::models::User;

const TOKEN_LENGTH: usize = 48;
const MAX_SESSIONS: u64 = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Hex SHA-256 of the password with the configured salt appended.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, hash: &str) -> bool {
    hash_password(password, salt) == hash
}

fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Bearer-token sessions. Entries expire on their own after the TTL.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Cache<String, Session>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_live(ttl)
            .build();
        Self { sessions, ttl }
    }

    pub fn issue(&self, user: &User) -> Session {
        let issued_at = Utc::now();
        let expires_at = chrono::Duration::from_std(self.ttl)
            .map(|ttl| issued_at + ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let session = Session {
            token: generate_token(),
            user_id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            issued_at,
            expires_at,
        };
        self.sessions.insert(session.token.clone(), session.clone());
        tracing::debug!("Issued session for user {}", user.id);
        session
    }

    pub fn validate(&self, token: &str) -> Option<Session> {
        self.sessions
            .get(token)
            .filter(|session| session.expires_at > Utc::now())
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.invalidate(token);
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn token_from_header(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}
