//! Users, partners, nudges and the credentials used to authenticate.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

/// The authenticated user's profile as returned by `GET /user/me`.
///
/// The client only ever holds a read-only copy; it is refreshed on every
/// dashboard poll so the gamification counters stay current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub partner_id: Option<EntityId>,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub streak: i64,
    #[serde(default)]
    pub last_nudge: Option<NudgeRecord>,
}

impl User {
    /// Whether this user is linked to a partner.
    pub fn has_partner(&self) -> bool {
        self.partner_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// The most recent nudge, if it has not been marked as seen yet.
    pub fn unseen_nudge(&self) -> Option<&NudgeRecord> {
        self.last_nudge.as_ref().filter(|n| !n.seen)
    }
}

/// The last nudge a user received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NudgeRecord {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub from: String,
    #[serde(default = "default_seen")]
    pub seen: bool,
}

fn default_seen() -> bool {
    true
}

/// The partner summary embedded in the dashboard payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Body of `POST /user/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: impl Into<String>) -> Self {
        Self {
            email: normalize_email(email),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(CoreError::Validation("Password must not be empty".into()));
        }
        Ok(())
    }
}

/// Body of `POST /user/register`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn new(name: &str, email: &str, password: impl Into<String>) -> Self {
        Self {
            name: name.trim().to_string(),
            email: normalize_email(email),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.is_empty() {
            return Err(CoreError::Validation("Name must not be empty".into()));
        }
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(CoreError::Validation("Password must not be empty".into()));
        }
        Ok(())
    }
}

/// Trim and lowercase an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: `local@domain.tld`.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    let invalid = || CoreError::Validation(format!("Invalid email address: '{email}'"));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}
