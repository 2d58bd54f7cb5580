//! SeaORM implementation of PaymentRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::payment::{
    Payment, PaymentMethod, PaymentRepository, PaymentVerification,
};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::payment;

use super::db_err;

pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: payment::Model) -> Payment {
    Payment {
        id: m.id,
        stop_id: m.stop_id,
        amount: m.amount,
        method: PaymentMethod::from_str(&m.method).unwrap_or(PaymentMethod::Cash),
        status: PaymentVerification::from_str(&m.status).unwrap_or(PaymentVerification::Pending),
        customer_rut: m.customer_rut,
        transaction_id: m.transaction_id,
        bank_reference: m.bank_reference,
        verified_at: m.verified_at,
        verified_by: m.verified_by,
        created_at: m.created_at,
    }
}

fn domain_to_active(p: Payment) -> payment::ActiveModel {
    payment::ActiveModel {
        id: Set(p.id),
        stop_id: Set(p.stop_id),
        amount: Set(p.amount),
        method: Set(p.method.as_str().to_string()),
        status: Set(p.status.as_str().to_string()),
        customer_rut: Set(p.customer_rut),
        transaction_id: Set(p.transaction_id),
        bank_reference: Set(p.bank_reference),
        verified_at: Set(p.verified_at),
        verified_by: Set(p.verified_by),
        created_at: Set(p.created_at),
    }
}

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn create(&self, new_payment: Payment) -> DomainResult<()> {
        domain_to_active(new_payment)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn list_by_stop(&self, stop_id: &str) -> DomainResult<Vec<Payment>> {
        let models = payment::Entity::find()
            .filter(payment::Column::StopId.eq(stop_id))
            .order_by_asc(payment::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find()
            .filter(payment::Column::TransactionId.eq(transaction_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn set_verification_if_pending(
        &self,
        id: &str,
        status: PaymentVerification,
        verified_by: Option<String>,
        verified_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let result = payment::Entity::update_many()
            .filter(payment::Column::Id.eq(id))
            .filter(payment::Column::Status.eq(PaymentVerification::Pending.as_str()))
            .col_expr(payment::Column::Status, Expr::value(status.as_str()))
            .col_expr(payment::Column::VerifiedAt, Expr::value(Some(verified_at)))
            .col_expr(payment::Column::VerifiedBy, Expr::value(verified_by))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}
