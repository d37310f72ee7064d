// src/services/sales_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::{error::AppError, resilience::StorePolicy},
    db::PetshopStore,
    middleware::tenancy::TenantContext,
    models::sale::{Sale, SaleDraft, SaleReceipt},
};

#[derive(Clone)]
pub struct SalesService {
    store: Arc<dyn PetshopStore>,
    policy: StorePolicy,
}

impl SalesService {
    pub fn new(store: Arc<dyn PetshopStore>, policy: StorePolicy) -> Self {
        Self { store, policy }
    }

    /// Fecha a venda do PDV. Preço, estoque e baixa são decididos pelo store,
    /// dentro da mesma unidade atômica; aqui só validamos o formato.
    pub async fn checkout(&self, ctx: &TenantContext, draft: SaleDraft) -> Result<SaleReceipt, AppError> {
        draft.validate_shape()?;

        if let Some(customer_id) = draft.customer_id {
            self.policy
                .read("find_customer", || self.store.find_customer(ctx, customer_id))
                .await?
                .ok_or(AppError::NotFound { entity: "customer", id: customer_id })?;
        }

        // Sem retry: uma venda repetida às cegas cobraria duas vezes.
        // Quem quiser repetir manda a mesma idempotency_key.
        self.policy.write("commit_sale", self.store.commit_sale(ctx, draft)).await
    }

    pub async fn void(&self, ctx: &TenantContext, id: Uuid) -> Result<SaleReceipt, AppError> {
        self.policy.write("void_sale", self.store.void_sale(ctx, id)).await
    }

    pub async fn list(&self, ctx: &TenantContext, from: NaiveDate, to: NaiveDate) -> Result<Vec<Sale>, AppError> {
        if from > to {
            return Err(AppError::InvalidInput { field: "from", code: "inverted_range" });
        }
        self.policy.read("list_sales", || self.store.list_sales(ctx, from, to)).await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<SaleReceipt, AppError> {
        self.policy
            .read("find_sale", || self.store.find_sale(ctx, id))
            .await?
            .ok_or(AppError::NotFound { entity: "sale", id })
    }
}
