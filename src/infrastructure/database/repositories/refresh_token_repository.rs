//! SeaORM implementation of RefreshTokenRepository
//!
//! The rotation path is the concurrency-sensitive part of the whole store:
//! a conditional `UPDATE ... WHERE revoked_at IS NULL` inside a transaction
//! makes refresh strictly single-use. Two racing refreshes of the same
//! token contend on that predicate; the loser sees zero affected rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::domain::refresh_token::{RefreshTokenRecord, RefreshTokenRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::refresh_token;

use super::db_err;

pub struct SeaOrmRefreshTokenRepository {
    db: DatabaseConnection,
}

impl SeaOrmRefreshTokenRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: refresh_token::Model) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: m.id,
        user_id: m.user_id,
        token_hash: m.token_hash,
        device_id: m.device_id,
        device_info: m.device_info,
        issued_at: m.issued_at,
        expires_at: m.expires_at,
        revoked_at: m.revoked_at,
    }
}

fn domain_to_active(r: RefreshTokenRecord) -> refresh_token::ActiveModel {
    refresh_token::ActiveModel {
        id: Set(r.id),
        user_id: Set(r.user_id),
        token_hash: Set(r.token_hash),
        device_id: Set(r.device_id),
        device_info: Set(r.device_info),
        issued_at: Set(r.issued_at),
        expires_at: Set(r.expires_at),
        revoked_at: Set(r.revoked_at),
    }
}

#[async_trait]
impl RefreshTokenRepository for SeaOrmRefreshTokenRepository {
    async fn create_for_device(&self, record: RefreshTokenRecord) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Keep the (user, device, revoked_at IS NULL) invariant: the new
        // session replaces whatever was live on this device.
        refresh_token::Entity::update_many()
            .filter(refresh_token::Column::UserId.eq(&record.user_id))
            .filter(refresh_token::Column::DeviceId.eq(&record.device_id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .col_expr(
                refresh_token::Column::RevokedAt,
                Expr::value(Some(Utc::now())),
            )
            .exec(&txn)
            .await
            .map_err(db_err)?;

        domain_to_active(record).insert(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn rotate(
        &self,
        user_id: &str,
        token_hash: &str,
        now: DateTime<Utc>,
        mut replacement: RefreshTokenRecord,
    ) -> DomainResult<Option<RefreshTokenRecord>> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Find-and-revoke in one conditional statement. Exactly one of any
        // set of concurrent refreshes presenting the same token wins here.
        let revoked = refresh_token::Entity::update_many()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .filter(refresh_token::Column::ExpiresAt.gt(now))
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(Some(now)))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if revoked.rows_affected == 0 {
            txn.commit().await.map_err(db_err)?;
            return Ok(None);
        }

        let consumed = refresh_token::Entity::find()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .one(&txn)
            .await
            .map_err(db_err)?;

        let Some(consumed) = consumed else {
            txn.commit().await.map_err(db_err)?;
            return Ok(None);
        };

        // The new session inherits the device binding of the consumed one.
        replacement.device_id = consumed.device_id.clone();
        replacement.device_info = consumed.device_info.clone();
        domain_to_active(replacement)
            .insert(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(Some(model_to_domain(consumed)))
    }

    async fn revoke_by_hash(
        &self,
        user_id: &str,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let result = refresh_token::Entity::update_many()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(Some(now)))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn revoke_all_for_user(&self, user_id: &str, now: DateTime<Utc>) -> DomainResult<u64> {
        let result = refresh_token::Entity::update_many()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(Some(now)))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn find_live_by_hash(
        &self,
        user_id: &str,
        token_hash: &str,
    ) -> DomainResult<Option<RefreshTokenRecord>> {
        let model = refresh_token::Entity::find()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::entities::user;
    use crate::infrastructure::database::migrator::Migrator;
    use chrono::Duration;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use uuid::Uuid;

    async fn setup() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        user::ActiveModel {
            id: Set("u1".to_string()),
            email: Set("driver@example.com".to_string()),
            password_hash: Set("x".to_string()),
            name: Set(None),
            role: Set("DRIVER".to_string()),
            is_active: Set(true),
            phone: Set(None),
            push_token: Set(None),
            preferences: Set(serde_json::json!({})),
            last_login_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&db)
        .await
        .unwrap();

        db
    }

    fn record(user_id: &str, hash: &str, device: &str) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token_hash: hash.to_string(),
            device_id: device.to_string(),
            device_info: Some("test-device".to_string()),
            issued_at: now,
            expires_at: now + Duration::days(7),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn rotation_is_single_use() {
        let db = setup().await;
        let repo = SeaOrmRefreshTokenRepository::new(db);
        let now = Utc::now();

        repo.create_for_device(record("u1", "hash-1", "device-a"))
            .await
            .unwrap();

        // First exchange wins and carries the device binding over.
        let consumed = repo
            .rotate("u1", "hash-1", now, record("u1", "hash-2", ""))
            .await
            .unwrap()
            .expect("first rotation succeeds");
        assert_eq!(consumed.device_id, "device-a");

        // Replaying the same token finds no live row.
        let replay = repo
            .rotate("u1", "hash-1", now, record("u1", "hash-3", ""))
            .await
            .unwrap();
        assert!(replay.is_none());

        // The replacement is live and bound to the same device.
        let live = repo.find_live_by_hash("u1", "hash-2").await.unwrap().unwrap();
        assert_eq!(live.device_id, "device-a");
    }

    #[tokio::test]
    async fn new_login_replaces_the_device_session() {
        let db = setup().await;
        let repo = SeaOrmRefreshTokenRepository::new(db);

        repo.create_for_device(record("u1", "hash-1", "device-a"))
            .await
            .unwrap();
        repo.create_for_device(record("u1", "hash-2", "device-a"))
            .await
            .unwrap();

        // The first session was revoked by the second login.
        assert!(repo.find_live_by_hash("u1", "hash-1").await.unwrap().is_none());
        assert!(repo.find_live_by_hash("u1", "hash-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_tokens_do_not_rotate() {
        let db = setup().await;
        let repo = SeaOrmRefreshTokenRepository::new(db);
        let now = Utc::now();

        let mut expired = record("u1", "hash-old", "device-a");
        expired.expires_at = now - Duration::hours(1);
        repo.create_for_device(expired).await.unwrap();

        let outcome = repo
            .rotate("u1", "hash-old", now, record("u1", "hash-new", ""))
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn revoke_all_clears_every_live_session() {
        let db = setup().await;
        let repo = SeaOrmRefreshTokenRepository::new(db);

        repo.create_for_device(record("u1", "hash-1", "device-a"))
            .await
            .unwrap();
        repo.create_for_device(record("u1", "hash-2", "device-b"))
            .await
            .unwrap();

        let revoked = repo.revoke_all_for_user("u1", Utc::now()).await.unwrap();
        assert_eq!(revoked, 2);
        assert!(repo.find_live_by_hash("u1", "hash-1").await.unwrap().is_none());
        assert!(repo.find_live_by_hash("u1", "hash-2").await.unwrap().is_none());
    }
}
