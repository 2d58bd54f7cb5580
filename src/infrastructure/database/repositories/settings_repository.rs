//! SeaORM implementation of SettingsRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::domain::settings::SettingsRepository;
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::setting;

use super::db_err;

pub struct SeaOrmSettingsRepository {
    db: DatabaseConnection,
}

impl SeaOrmSettingsRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SettingsRepository for SeaOrmSettingsRepository {
    async fn get(&self, key: &str) -> DomainResult<Option<serde_json::Value>> {
        let model = setting::Entity::find_by_id(key)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(|m| m.value))
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> DomainResult<()> {
        let existing = setting::Entity::find_by_id(key)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let model = setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(Utc::now()),
        };

        if existing.is_some() {
            model.update(&self.db).await.map_err(db_err)?;
        } else {
            model.insert(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }
}
