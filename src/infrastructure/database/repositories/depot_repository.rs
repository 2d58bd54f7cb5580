//! SeaORM implementation of DepotRepository

use async_trait::async_trait;
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::domain::depot::{Depot, DepotRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::depot;

use super::db_err;

pub struct SeaOrmDepotRepository {
    db: DatabaseConnection,
}

impl SeaOrmDepotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: depot::Model) -> Depot {
    Depot {
        id: m.id,
        name: m.name,
        address: m.address,
        lat: m.lat,
        lng: m.lng,
        default_departure_time: m.default_departure_time,
        default_service_minutes: m.default_service_minutes,
        eta_window_before: m.eta_window_before,
        eta_window_after: m.eta_window_after,
        is_default: m.is_default,
        is_active: m.is_active,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(d: Depot) -> depot::ActiveModel {
    depot::ActiveModel {
        id: Set(d.id),
        name: Set(d.name),
        address: Set(d.address),
        lat: Set(d.lat),
        lng: Set(d.lng),
        default_departure_time: Set(d.default_departure_time),
        default_service_minutes: Set(d.default_service_minutes),
        eta_window_before: Set(d.eta_window_before),
        eta_window_after: Set(d.eta_window_after),
        is_default: Set(d.is_default),
        is_active: Set(d.is_active),
        created_at: Set(d.created_at),
        updated_at: Set(d.updated_at),
    }
}

#[async_trait]
impl DepotRepository for SeaOrmDepotRepository {
    async fn save(&self, saved: Depot) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // At most one default depot.
        if saved.is_default {
            depot::Entity::update_many()
                .filter(depot::Column::Id.ne(&saved.id))
                .filter(depot::Column::IsDefault.eq(true))
                .col_expr(depot::Column::IsDefault, Expr::value(false))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        let exists = depot::Entity::find_by_id(&saved.id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .is_some();

        if exists {
            domain_to_active(saved).update(&txn).await.map_err(db_err)?;
        } else {
            domain_to_active(saved).insert(&txn).await.map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Depot>> {
        let model = depot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_default(&self) -> DomainResult<Option<Depot>> {
        let model = depot::Entity::find()
            .filter(depot::Column::IsDefault.eq(true))
            .filter(depot::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn list(&self) -> DomainResult<Vec<Depot>> {
        let models = depot::Entity::find()
            .order_by_asc(depot::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        depot::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::migrator::Migrator;
    use chrono::Utc;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    fn depot(id: &str, is_default: bool) -> Depot {
        let now = Utc::now();
        Depot {
            id: id.to_string(),
            name: format!("Depot {id}"),
            address: "Av. Principal 100".to_string(),
            lat: -33.45,
            lng: -70.66,
            default_departure_time: "09:00".to_string(),
            default_service_minutes: 10,
            eta_window_before: 30,
            eta_window_after: 30,
            is_default,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn only_one_depot_stays_default() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let repo = SeaOrmDepotRepository::new(db);

        repo.save(depot("d1", true)).await.unwrap();
        repo.save(depot("d2", true)).await.unwrap();

        let defaults: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|d| d.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, "d2");
    }
}
