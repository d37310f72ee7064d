// src/services/business_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, resilience::StorePolicy},
    db::PetshopStore,
    middleware::tenancy::TenantContext,
    models::business::{Business, BusinessSettings, Membership, NewBusiness},
};

#[derive(Clone)]
pub struct BusinessService {
    store: Arc<dyn PetshopStore>,
    policy: StorePolicy,
}

impl BusinessService {
    pub fn new(store: Arc<dyn PetshopStore>, policy: StorePolicy) -> Self {
        Self { store, policy }
    }

    /// Quem cria o estabelecimento vira o dono.
    pub async fn create_business(&self, owner_id: Uuid, new: NewBusiness) -> Result<Business, AppError> {
        let business = self
            .policy
            .write("create_business", self.store.create_business(owner_id, new))
            .await?;
        tracing::info!(business_id = %business.id, owner_id = %owner_id, "Estabelecimento criado");
        Ok(business)
    }

    pub async fn list_my_businesses(&self, owner_id: Uuid) -> Result<Vec<Business>, AppError> {
        self.policy
            .read("list_businesses", || self.store.list_businesses_for_owner(owner_id))
            .await
    }

    pub async fn membership(&self, user_id: Uuid, business_id: Uuid) -> Result<Option<Membership>, AppError> {
        self.policy
            .read("find_membership", || self.store.find_membership(user_id, business_id))
            .await
    }

    pub async fn get_business(&self, ctx: &TenantContext) -> Result<Business, AppError> {
        self.policy.read("get_business", || self.store.get_business(ctx)).await
    }

    pub async fn update_settings(&self, ctx: &TenantContext, settings: BusinessSettings) -> Result<Business, AppError> {
        for color in [&settings.primary_color, &settings.secondary_color].into_iter().flatten() {
            if !is_hex_color(color) {
                return Err(AppError::InvalidInput { field: "primaryColor", code: "invalid_color" });
            }
        }
        self.policy
            .write("update_business", self.store.update_business(ctx, settings))
            .await
    }
}

// "#RRGGBB"
fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
