use std::collections::HashMap;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Account email address, used as the login identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct Email(pub String);

impl From<&str> for Email {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Dashboard role of the authenticated user.
///
/// Roles the dashboard knows about get their own variant; anything else the
/// server sends is kept verbatim in [`Role::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Editor,
    Support,
    User,
    Other(String),
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Support => "support",
            Self::User => "user",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "admin" => Self::Admin,
            "editor" => Self::Editor,
            "support" => Self::Support,
            "user" => Self::User,
            _ => Self::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

/// Authenticated user as returned by the account service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Profile {
    pub email: Email,
    #[serde(default, alias = "given_name")]
    pub first_name: Option<String>,
    #[serde(default, alias = "family_name")]
    pub last_name: Option<String>,
    pub role: Role,
    /// Any other attributes the server attaches to the user.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    #[must_use]
    pub fn new(email: impl Into<Email>, role: Role) -> Self {
        Self {
            email: email.into(),
            first_name: None,
            last_name: None,
            role,
            extra: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    /// "First Last", falling back to the email when no name is on file.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => self.email.to_string(),
        }
    }
}

/// Capability map attached to the current profile.
///
/// Lookups fail closed: a name that is absent counts as denied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, From, Into)]
#[serde(transparent)]
pub struct Permissions(HashMap<String, bool>);

impl Permissions {
    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        self.0.get(name).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of all granted permissions.
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, allowed)| **allowed)
            .map(|(name, _)| name.as_str())
    }
}

impl<const N: usize> From<[(&str, bool); N]> for Permissions {
    fn from(entries: [(&str, bool); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(name, allowed)| (name.to_owned(), allowed))
                .collect(),
        )
    }
}

/// Cached session: profile and permissions always travel together.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Session {
    pub profile: Profile,
    pub permissions: Permissions,
    /// Last time the server confirmed this session.
    pub verified_at: OffsetDateTime,
}

impl Session {
    pub(crate) fn new(profile: Profile, permissions: Permissions) -> Self {
        Self {
            profile,
            permissions,
            verified_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Sign-up request for a new dashboard account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: Email,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}
