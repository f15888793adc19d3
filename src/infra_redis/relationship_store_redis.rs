use crate::domain_model::{RelationshipRecord, UserId};
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

pub struct RedisRelationshipStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisRelationshipStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRelationshipStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, user_id: &UserId) -> String {
        format!("{}:{}", self.prefix, user_id)
    }
}

#[async_trait::async_trait]
impl RelationshipStore for RedisRelationshipStore {
    async fn load(&self, user_id: &UserId) -> Result<RelationshipRecord, StoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(RelationshipRecord::default()),
        }
    }

    async fn save(&self, user_id: &UserId, record: &RelationshipRecord) -> Result<(), StoreError> {
        let key = self.key(user_id);
        let json = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(&key, json)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
