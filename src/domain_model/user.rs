use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_USER_ID_LEN: usize = 64;
pub const MAX_DISPLAY_NAME_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("user id must not be empty")]
    EmptyUserId,
    #[error("user id exceeds {} characters", MAX_USER_ID_LEN)]
    UserIdTooLong,
    #[error("user id contains invalid character {0:?}")]
    UserIdCharacter(char),
    #[error("display name must not be blank")]
    BlankDisplayName,
    #[error("display name exceeds {} characters", MAX_DISPLAY_NAME_LEN)]
    DisplayNameTooLong,
}

/// Opaque user identifier issued by the identity provider.
///
/// Doubles as the record store key, so it is restricted to characters that
/// are safe in file names and key-value keys.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(IdentifierError::EmptyUserId);
        }
        if s.chars().count() > MAX_USER_ID_LEN {
            return Err(IdentifierError::UserIdTooLong);
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(IdentifierError::UserIdCharacter(c));
        }
        Ok(UserId(s))
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserId::try_from(s.to_owned())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = IdentifierError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::BlankDisplayName);
        }
        if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(IdentifierError::DisplayNameTooLong);
        }
        Ok(DisplayName(trimmed.to_owned()))
    }
}

impl From<DisplayName> for String {
    fn from(name: DisplayName) -> Self {
        name.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DisplayName {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisplayName::try_from(s.to_owned())
    }
}

/// Verified identity of whoever invoked an operation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CallerContext {
    pub user_id: UserId,
    pub display_name: DisplayName,
}

impl CallerContext {
    pub fn new(user_id: UserId, display_name: DisplayName) -> Self {
        Self {
            user_id,
            display_name,
        }
    }
}
