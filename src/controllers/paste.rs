use chrono::{Duration, Utc};
use tokio::task;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::crypto::{self, CryptoError, DecryptionFailed};
use crate::error::{AppError, InvalidInput};
use crate::models::{NewPaste, Paste};
use crate::types::api::{CreatePasteForm, DecryptedPaste};
use crate::App;

/// Upper bound on `expiration_hours` regardless of configuration, about a
/// century. Keeps stored timestamps within four-digit years.
const MAX_EXPIRATION_HOURS: u32 = 100 * 366 * 24;

pub async fn fetch(app: &mut App, identifier: &str) -> crate::AppResult<Paste> {
    app.database.get_live_paste(identifier, Utc::now()).await
}

pub async fn list(app: &mut App) -> crate::AppResult<Vec<Paste>> {
    app.database.get_live_pastes(Utc::now()).await
}

pub async fn create(
    app: &mut App,
    form: CreatePasteForm,
    origin_ip: Option<String>,
) -> crate::AppResult<Paste> {
    let limits = &app.config.limits;
    let created_at = Utc::now();

    let title = form.title.trim().to_owned();
    if title.is_empty() {
        return Err(InvalidInput::MissingTitle.into());
    }
    if title.chars().count() > limits.max_title_length {
        return Err(InvalidInput::TitleTooLong {
            max: limits.max_title_length,
        }
        .into());
    }
    if form.content.trim().is_empty() {
        return Err(InvalidInput::MissingContent.into());
    }

    let hours =
        parse_expiration_hours(form.expiration_hours.as_deref(), limits.max_expiration_hours)?;
    let expires_at = hours
        .map(|hours| {
            created_at
                .checked_add_signed(Duration::hours(i64::from(hours)))
                .ok_or(InvalidInput::InvalidExpiration)
        })
        .transpose()?;

    let (content, password_hash) = if form.wants_encryption() {
        let password = form.password.unwrap_or_default();
        if password.is_empty() {
            return Err(InvalidInput::MissingPassword.into());
        }

        let salt_mode = app.config.crypto.salt_mode;
        let plaintext = form.content;
        let (content, password_hash) = task::spawn_blocking(move || {
            let content = crypto::encrypt(&plaintext, &password, salt_mode)?;
            let password_hash = crypto::hash_password(&password)?;
            Ok::<_, CryptoError>((content, password_hash))
        })
        .await??;
        (content, Some(password_hash))
    } else {
        (form.content, None)
    };

    let paste = NewPaste {
        identifier: Uuid::new_v4().to_string(),
        title,
        content,
        created_at,
        password_hash,
        expires_at,
        origin_ip,
    };

    let paste = app.database.insert_paste(&paste).await?;

    info!(
        id = paste.id,
        identifier = %paste.identifier,
        title_len = paste.title.len(),
        encrypted = paste.is_encrypted,
        expires_at = ?paste.expires_at,
        origin_ip = ?paste.origin_ip,
        "new paste"
    );

    Ok(paste)
}

/// Decrypt an encrypted paste's content. Plaintext pastes are returned as is.
pub async fn decrypt(
    app: &mut App,
    identifier: &str,
    password: &str,
) -> crate::AppResult<DecryptedPaste> {
    let paste = fetch(app, identifier).await?;

    if !paste.is_encrypted {
        return Ok(DecryptedPaste {
            identifier: paste.identifier,
            title: paste.title,
            content: paste.content,
        });
    }

    if password.is_empty() {
        return Err(InvalidInput::MissingPassword.into());
    }

    let Some(password_hash) = paste.password_hash else {
        warn!(identifier = %paste.identifier, "encrypted paste has no password hash");
        return Err(AppError::DecryptionFailed);
    };

    let token = paste.content;
    let password = password.to_owned();
    let span_identifier = paste.identifier.clone();
    let content = task::spawn_blocking(move || {
        if !crypto::verify_password(&password, &password_hash) {
            debug!(identifier = %span_identifier, "password pre-check rejected");
            return Err(DecryptionFailed);
        }
        crypto::decrypt(&token, &password).map_err(|err| {
            warn!(identifier = %span_identifier, "password matched but content did not decrypt");
            err
        })
    })
    .await??;

    Ok(DecryptedPaste {
        identifier: paste.identifier,
        title: paste.title,
        content,
    })
}

/// Parse the optional expiration form field into whole hours.
fn parse_expiration_hours(raw: Option<&str>, max: Option<u32>) -> crate::AppResult<Option<u32>> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    let hours: u32 = raw.parse().map_err(|_| InvalidInput::InvalidExpiration)?;
    if hours == 0 {
        return Err(InvalidInput::InvalidExpiration.into());
    }
    let max = max.map_or(MAX_EXPIRATION_HOURS, |max| max.min(MAX_EXPIRATION_HOURS));
    if hours > max {
        return Err(InvalidInput::ExpirationTooLong { max }.into());
    }

    Ok(Some(hours))
}
