use crate::domain_model::{RelationshipRecord, UserId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Keyed storage of one [`RelationshipRecord`] per user.
///
/// Writes to different keys are independent; there is no atomicity across
/// two `save` calls.
#[async_trait::async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Absence is not an error: an unknown user yields an empty record.
    async fn load(&self, user_id: &UserId) -> Result<RelationshipRecord, StoreError>;

    /// Last writer wins.
    async fn save(&self, user_id: &UserId, record: &RelationshipRecord) -> Result<(), StoreError>;
}
