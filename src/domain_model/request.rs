use crate::domain_model::{DisplayName, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shared by the outgoing half and the incoming half of one logical request.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub uuid::Uuid);

impl RequestId {
    pub fn generate() -> Self {
        RequestId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(RequestId)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingRequest {
    pub id: RequestId,
    pub target_id: UserId,
    pub target_display_name: DisplayName,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    pub requester_display_name: DisplayName,
    pub created_at: DateTime<Utc>,
}

/// How a responder names the incoming request it answers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RequestSelector {
    Id(RequestId),
    Requester(UserId),
}

impl RequestSelector {
    pub fn matches(&self, request: &IncomingRequest) -> bool {
        match self {
            RequestSelector::Id(id) => request.id == *id,
            RequestSelector::Requester(user_id) => request.requester_id == *user_id,
        }
    }
}

impl fmt::Display for RequestSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestSelector::Id(id) => write!(f, "request {id}"),
            RequestSelector::Requester(user_id) => write!(f, "request from {user_id}"),
        }
    }
}
