use crate::domain_model::{RelationshipRecord, UserId};
use crate::domain_port::*;
use sqlx::types::Json;
use sqlx::{MySqlPool, Row};

/// One row per user in `relationship_record`; see
/// `schema/relationship_record.sql`.
pub struct MySqlRelationshipStore {
    pool: MySqlPool,
}

impl MySqlRelationshipStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RelationshipStore for MySqlRelationshipStore {
    async fn load(&self, user_id: &UserId) -> Result<RelationshipRecord, StoreError> {
        let row = sqlx::query("SELECT record FROM relationship_record WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("select relationship record: {e}")))?;

        let Some(row) = row else {
            return Ok(RelationshipRecord::default());
        };

        let Json(record) = row
            .try_get::<Json<RelationshipRecord>, _>("record")
            .map_err(|e| StoreError::Backend(format!("decode relationship record: {e}")))?;

        Ok(record)
    }

    async fn save(&self, user_id: &UserId, record: &RelationshipRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
INSERT INTO relationship_record (user_id, record)
VALUES (?, ?)
ON DUPLICATE KEY UPDATE record = VALUES(record), updated_at = CURRENT_TIMESTAMP(6)
"#,
        )
        .bind(user_id.as_str())
        .bind(Json(record))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(format!("upsert relationship record: {e}")))?;

        Ok(())
    }
}
