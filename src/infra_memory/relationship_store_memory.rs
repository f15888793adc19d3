use crate::domain_model::{RelationshipRecord, UserId};
use crate::domain_port::*;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct MemoryRelationshipStore {
    records: DashMap<UserId, RelationshipRecord>,
}

impl MemoryRelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users whose record has been written at least once.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl RelationshipStore for MemoryRelationshipStore {
    async fn load(&self, user_id: &UserId) -> Result<RelationshipRecord, StoreError> {
        Ok(self
            .records
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    async fn save(&self, user_id: &UserId, record: &RelationshipRecord) -> Result<(), StoreError> {
        self.records.insert(user_id.clone(), record.clone());
        Ok(())
    }
}
