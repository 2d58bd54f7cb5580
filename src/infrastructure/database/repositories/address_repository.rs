//! SeaORM implementation of AddressRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::address::{Address, AddressRepository, GeocodeStatus};
use crate::domain::payment::PaymentMethod;
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{address, stop};
use crate::shared::types::pagination::{PaginatedResult, PaginationParams};

use super::db_err;

pub struct SeaOrmAddressRepository {
    db: DatabaseConnection,
}

impl SeaOrmAddressRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: address::Model) -> Address {
    Address {
        id: m.id,
        street: m.street,
        city: m.city,
        full_address: m.full_address,
        lat: m.lat,
        lng: m.lng,
        geocode_status: GeocodeStatus::from_str(&m.geocode_status).unwrap_or(GeocodeStatus::Pending),
        customer_name: m.customer_name,
        customer_phone: m.customer_phone,
        customer_rut: m.customer_rut,
        external_order_id: m.external_order_id,
        payment_method: m.payment_method.as_deref().and_then(PaymentMethod::from_str),
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(a: Address) -> address::ActiveModel {
    address::ActiveModel {
        id: Set(a.id),
        street: Set(a.street),
        city: Set(a.city),
        full_address: Set(a.full_address),
        lat: Set(a.lat),
        lng: Set(a.lng),
        geocode_status: Set(a.geocode_status.as_str().to_string()),
        customer_name: Set(a.customer_name),
        customer_phone: Set(a.customer_phone),
        customer_rut: Set(a.customer_rut),
        external_order_id: Set(a.external_order_id),
        payment_method: Set(a.payment_method.map(|m| m.as_str().to_string())),
        created_at: Set(a.created_at),
        updated_at: Set(a.updated_at),
    }
}

#[async_trait]
impl AddressRepository for SeaOrmAddressRepository {
    async fn create(&self, new_address: Address) -> DomainResult<()> {
        domain_to_active(new_address)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Address>> {
        let model = address::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_many(&self, ids: &[String]) -> DomainResult<Vec<Address>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = address::Entity::find()
            .filter(address::Column::Id.is_in(ids.iter().cloned()))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn list(
        &self,
        search: Option<&str>,
        page: PaginationParams,
    ) -> DomainResult<PaginatedResult<Address>> {
        let mut query = address::Entity::find();
        if let Some(needle) = search.filter(|s| !s.is_empty()) {
            query = query.filter(address::Column::FullAddress.contains(needle));
        }

        let paginator = query
            .order_by_asc(address::Column::FullAddress)
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

    async fn update(&self, updated: Address) -> DomainResult<()> {
        domain_to_active(updated)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        if self.has_dependent_stops(id).await? {
            return Err(DomainError::Conflict(
                "Address is referenced by existing stops".into(),
            ));
        }
        address::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn has_dependent_stops(&self, id: &str) -> DomainResult<bool> {
        let count = stop::Entity::find()
            .filter(stop::Column::AddressId.eq(id))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }
}
