//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Firebase UID (also used as document ID)
    pub uid: String,
    /// Email address (unique)
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    /// Display name from the identity provider
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    /// Profile picture URL
    pub photo_url: Option<String>,
    /// Soft-delete flag; deactivated users are rejected at the gate
    pub is_active: bool,
    pub is_admin: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    /// When user first authenticated
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Best available human-readable name.
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.display_name) {
            (Some(first), Some(last), _) => format!("{first} {last}"),
            (_, _, Some(name)) => name.clone(),
            _ => self.email.clone(),
        }
    }
}

/// Claims extracted from a verified identity provider token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub phone_number: Option<String>,
    pub photo_url: Option<String>,
}
