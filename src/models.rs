use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Paste {
    pub id: i64,
    pub identifier: String,
    pub title: String,
    /// Ciphertext token when `is_encrypted`, plaintext otherwise.
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_encrypted: bool,
    pub password_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub origin_ip: Option<String>,
}

/// A validated paste, ready to be inserted.
#[derive(Debug)]
pub struct NewPaste {
    pub identifier: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub password_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub origin_ip: Option<String>,
}

impl NewPaste {
    pub fn is_encrypted(&self) -> bool {
        self.password_hash.is_some()
    }
}
