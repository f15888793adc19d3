use crate::domain_model::{DisplayName, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendEntry {
    pub id: UserId,
    pub display_name: DisplayName,
    pub added_at: DateTime<Utc>,
}

/// A user returned by the external player directory.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: UserId,
    pub display_name: DisplayName,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    pub id: UserId,
    pub display_name: DisplayName,
    pub is_friend: bool,
    pub request_sent: bool,
}
