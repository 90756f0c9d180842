use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Paste;

/// Fields of the paste submission form.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePasteForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub encrypt: Option<String>,
    pub password: Option<String>,
    pub expiration_hours: Option<String>,
}

impl CreatePasteForm {
    /// Whether the encrypt checkbox was ticked.
    pub fn wants_encryption(&self) -> bool {
        matches!(
            self.encrypt.as_deref().map(str::trim),
            Some("on" | "true" | "1" | "yes")
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct DecryptForm {
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct UploadPaste {
    pub identifier: String,
    pub url: String,
    pub is_encrypted: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct PasteSummary {
    pub identifier: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub is_encrypted: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Paste> for PasteSummary {
    fn from(paste: Paste) -> Self {
        PasteSummary {
            identifier: paste.identifier,
            title: paste.title,
            created_at: paste.created_at,
            is_encrypted: paste.is_encrypted,
            expires_at: paste.expires_at,
        }
    }
}

#[derive(Serialize)]
pub struct PasteView {
    pub identifier: String,
    pub title: String,
    /// Withheld for encrypted pastes until they are decrypted.
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_encrypted: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Paste> for PasteView {
    fn from(paste: Paste) -> Self {
        PasteView {
            content: (!paste.is_encrypted).then_some(paste.content),
            identifier: paste.identifier,
            title: paste.title,
            created_at: paste.created_at,
            is_encrypted: paste.is_encrypted,
            expires_at: paste.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DecryptedPaste {
    pub identifier: String,
    pub title: String,
    pub content: String,
}
