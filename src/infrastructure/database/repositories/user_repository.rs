//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::user::{User, UserRepository, UserRole};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::user;
use crate::shared::types::pagination::{PaginatedResult, PaginationParams};

use super::db_err;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: user::Model) -> User {
    User {
        id: m.id,
        email: m.email,
        password_hash: m.password_hash,
        name: m.name,
        role: UserRole::from_str(&m.role).unwrap_or(UserRole::Driver),
        is_active: m.is_active,
        phone: m.phone,
        push_token: m.push_token,
        preferences: m.preferences,
        last_login_at: m.last_login_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(u: User) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(u.id),
        email: Set(u.email),
        password_hash: Set(u.password_hash),
        name: Set(u.name),
        role: Set(u.role.as_str().to_string()),
        is_active: Set(u.is_active),
        phone: Set(u.phone),
        push_token: Set(u.push_token),
        preferences: Set(u.preferences),
        last_login_at: Set(u.last_login_at),
        created_at: Set(u.created_at),
        updated_at: Set(u.updated_at),
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, new_user: User) -> DomainResult<()> {
        domain_to_active(new_user)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn list(&self, page: PaginationParams) -> DomainResult<PaginatedResult<User>> {
        let paginator = user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .paginate(&self.db, u64::from(page.limit));

        let total = paginator.num_items().await.map_err(db_err)?;
        let items = paginator
            .fetch_page(u64::from(page.page - 1))
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect();

        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn list_drivers(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .filter(user::Column::Role.eq(UserRole::Driver.as_str()))
            .filter(user::Column::IsActive.eq(true))
            .order_by_asc(user::Column::Email)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn update(&self, updated: User) -> DomainResult<()> {
        domain_to_active(updated)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        user::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_push_token(&self, user_id: &str, token: Option<String>) -> DomainResult<()> {
        user::Entity::update_many()
            .filter(user::Column::Id.eq(user_id))
            .col_expr(user::Column::PushToken, Expr::value(token))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_last_login(&self, user_id: &str, at: DateTime<Utc>) -> DomainResult<()> {
        user::Entity::update_many()
            .filter(user::Column::Id.eq(user_id))
            .col_expr(user::Column::LastLoginAt, Expr::value(Some(at)))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn count(&self) -> DomainResult<u64> {
        user::Entity::find().count(&self.db).await.map_err(db_err)
    }
}
