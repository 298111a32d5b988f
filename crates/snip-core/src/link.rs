use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Access level of a [`User`].
///
/// Stored as an integer in the durable backend (0 = user, 1 = admin) and
/// as a lowercase string in the flat-file document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Decodes a stored role integer. Unknown values read as [`Role::User`].
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => Role::Admin,
            _ => Role::User,
        }
    }

    /// Encodes the role for the durable backend.
    pub fn as_i64(self) -> i64 {
        match self {
            Role::User => 0,
            Role::Admin => 1,
        }
    }
}

/// An account that can own short links.
///
/// Users are created and updated only through upsert; this layer never
/// deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl User {
    /// Creates a user with the default [`Role::User`] and no email.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: String::new(),
            role: Role::User,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this user may remove `link`.
    ///
    /// Admins may remove anything; everyone else only links whose owner
    /// username matches their own. An unowned link therefore can only be
    /// removed by an admin.
    pub fn can_remove(&self, link: &ShortLink) -> bool {
        self.is_admin()
            || link
                .owner
                .as_ref()
                .is_some_and(|owner| owner.username == self.username)
    }
}

/// A stored mapping from a short code to a destination URL.
///
/// `short` is the primary key and globally unique; `original` carries no
/// uniqueness constraint. The owner is a weak by-username reference — the
/// user record stays the source of truth for email and role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortLink {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub short: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub original: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<User>,
    #[serde(default)]
    pub date_created: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_expired: Option<Timestamp>,
}

impl ShortLink {
    /// Creates a link to `original` with the creation time stamped now.
    ///
    /// The short code is left empty; a store assigns a generated one on
    /// `put` unless [`ShortLink::with_short`] supplies it first.
    /// `date_expired` is reserved for future expiry enforcement and is
    /// never populated by write paths.
    pub fn new(original: impl Into<String>) -> Self {
        Self {
            short: String::new(),
            original: original.into(),
            owner: None,
            date_created: Some(Timestamp::now()),
            date_expired: None,
        }
    }

    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = short.into();
        self
    }

    pub fn with_owner(mut self, owner: User) -> Self {
        self.owner = Some(owner);
        self
    }
}
