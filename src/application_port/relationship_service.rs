use crate::domain_model::*;
use crate::domain_port::StoreError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    InvalidArgument,
    AlreadyFriends,
    DuplicateRequest,
    NotFriends,
    RequestNotFound,
    StoreReadFailure,
    StoreWriteFailure,
    PartialWriteInconsistency,
}

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The two records of the pair disagree in a way no operation produces;
    /// the operation is refused instead of papering over it.
    #[error("relationship state conflicts with this operation: {0}")]
    ConflictingState(String),
    #[error("already friends")]
    AlreadyFriends,
    #[error("friend request already sent")]
    DuplicateRequest,
    #[error("not friends")]
    NotFriends,
    #[error("friend request not found")]
    RequestNotFound,
    #[error("store read failed for {key}: {source}")]
    StoreRead {
        key: UserId,
        #[source]
        source: StoreError,
    },
    #[error("store write failed for {key} (rolled back: {rolled_back}): {source}")]
    StoreWrite {
        key: UserId,
        rolled_back: bool,
        #[source]
        source: StoreError,
    },
    #[error(
        "record of {written} was written but {failed} was not, and the rollback failed: {source}; rollback: {rollback}"
    )]
    PartialWriteInconsistency {
        written: UserId,
        failed: UserId,
        #[source]
        source: StoreError,
        rollback: StoreError,
    },
}

impl RelationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelationError::InvalidArgument(_) | RelationError::ConflictingState(_) => {
                ErrorKind::InvalidArgument
            }
            RelationError::AlreadyFriends => ErrorKind::AlreadyFriends,
            RelationError::DuplicateRequest => ErrorKind::DuplicateRequest,
            RelationError::NotFriends => ErrorKind::NotFriends,
            RelationError::RequestNotFound => ErrorKind::RequestNotFound,
            RelationError::StoreRead { .. } => ErrorKind::StoreReadFailure,
            RelationError::StoreWrite { .. } => ErrorKind::StoreWriteFailure,
            RelationError::PartialWriteInconsistency { .. } => {
                ErrorKind::PartialWriteInconsistency
            }
        }
    }
}

impl From<IdentifierError> for RelationError {
    fn from(e: IdentifierError) -> Self {
        RelationError::InvalidArgument(e.to_string())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SendOutcome {
    Requested { request: OutgoingRequest },
    /// The target had already asked the caller; the crossed requests
    /// collapsed into a friendship.
    AutoAccepted { friend: FriendEntry },
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RespondOutcome {
    Accepted { friend: FriendEntry },
    #[serde(rename_all = "camelCase")]
    Declined { request_id: RequestId },
}

#[async_trait::async_trait]
pub trait RelationshipService: Send + Sync {
    async fn list_relationships(
        &self,
        caller: &CallerContext,
    ) -> Result<RelationshipRecord, RelationError>;
    async fn send_request(
        &self,
        caller: &CallerContext,
        target_id: UserId,
        target_name: DisplayName,
    ) -> Result<SendOutcome, RelationError>;
    async fn respond_to_request(
        &self,
        caller: &CallerContext,
        selector: RequestSelector,
        accept: bool,
    ) -> Result<RespondOutcome, RelationError>;
    async fn remove_friend(
        &self,
        caller: &CallerContext,
        target_id: UserId,
    ) -> Result<FriendEntry, RelationError>;
    async fn lookup_candidates(
        &self,
        caller: &CallerContext,
        exclude_self: bool,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<CandidateView>, RelationError>;
}
