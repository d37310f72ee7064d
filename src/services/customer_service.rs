// src/services/customer_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, resilience::StorePolicy},
    db::PetshopStore,
    middleware::tenancy::TenantContext,
    models::{
        business::MemberRole,
        customer::{Customer, NewCustomer, NewPet, Pet},
    },
};

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn PetshopStore>,
    policy: StorePolicy,
}

impl CustomerService {
    pub fn new(store: Arc<dyn PetshopStore>, policy: StorePolicy) -> Self {
        Self { store, policy }
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn list_customers(&self, ctx: &TenantContext) -> Result<Vec<Customer>, AppError> {
        self.policy.read("list_customers", || self.store.list_customers(ctx)).await
    }

    pub async fn get_customer(&self, ctx: &TenantContext, id: Uuid) -> Result<Customer, AppError> {
        self.policy
            .read("find_customer", || self.store.find_customer(ctx, id))
            .await?
            .ok_or(AppError::NotFound { entity: "customer", id })
    }

    pub async fn create_customer(&self, ctx: &TenantContext, new: NewCustomer) -> Result<Customer, AppError> {
        self.policy
            .write("insert_customer", self.store.insert_customer(ctx, new))
            .await
    }

    pub async fn update_customer(&self, ctx: &TenantContext, id: Uuid, new: NewCustomer) -> Result<Customer, AppError> {
        self.policy
            .write("update_customer", self.store.update_customer(ctx, id, new))
            .await?
            .ok_or(AppError::NotFound { entity: "customer", id })
    }

    pub async fn delete_customer(&self, ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
        let deleted = self
            .policy
            .write("delete_customer", self.store.delete_customer(ctx, id))
            .await?;
        if !deleted {
            return Err(AppError::NotFound { entity: "customer", id });
        }
        Ok(())
    }

    /// Portal: o usuário autenticado se cadastra como cliente do estabelecimento.
    /// O vínculo fica gravado em customers.user_id, uma vez só.
    pub async fn register_portal_customer(
        &self,
        user_id: Uuid,
        business_id: Uuid,
        mut new: NewCustomer,
    ) -> Result<Customer, AppError> {
        let ctx = TenantContext {
            business_id,
            user_id,
            role: MemberRole::Customer,
            customer_id: None,
        };

        let business = self.policy.read("get_business", || self.store.get_business(&ctx)).await?;
        if !business.active {
            return Err(AppError::NotFound { entity: "business", id: business_id });
        }

        new.user_id = Some(user_id);
        let customer = self
            .policy
            .write("insert_customer", self.store.insert_customer(&ctx, new))
            .await?;
        tracing::info!(business_id = %business_id, customer_id = %customer.id, "Cliente cadastrado pelo portal");
        Ok(customer)
    }

    // =========================================================================
    //  PETS
    // =========================================================================

    pub async fn list_pets(&self, ctx: &TenantContext, customer_id: Option<Uuid>) -> Result<Vec<Pet>, AppError> {
        self.policy.read("list_pets", || self.store.list_pets(ctx, customer_id)).await
    }

    pub async fn get_pet(&self, ctx: &TenantContext, id: Uuid) -> Result<Pet, AppError> {
        self.policy
            .read("find_pet", || self.store.find_pet(ctx, id))
            .await?
            .ok_or(AppError::NotFound { entity: "pet", id })
    }

    pub async fn create_pet(&self, ctx: &TenantContext, new: NewPet) -> Result<Pet, AppError> {
        self.check_pet(ctx, &new).await?;
        self.policy.write("insert_pet", self.store.insert_pet(ctx, new)).await
    }

    pub async fn update_pet(&self, ctx: &TenantContext, id: Uuid, new: NewPet) -> Result<Pet, AppError> {
        self.check_pet(ctx, &new).await?;
        self.policy
            .write("update_pet", self.store.update_pet(ctx, id, new))
            .await?
            .ok_or(AppError::NotFound { entity: "pet", id })
    }

    pub async fn delete_pet(&self, ctx: &TenantContext, id: Uuid) -> Result<(), AppError> {
        let deleted = self.policy.write("delete_pet", self.store.delete_pet(ctx, id)).await?;
        if !deleted {
            return Err(AppError::NotFound { entity: "pet", id });
        }
        Ok(())
    }

    // O tutor precisa ser deste estabelecimento
    async fn check_pet(&self, ctx: &TenantContext, new: &NewPet) -> Result<(), AppError> {
        if new.age < 0 {
            return Err(AppError::InvalidInput { field: "age", code: "negative" });
        }
        if new.weight.is_some_and(|w| w.is_sign_negative()) {
            return Err(AppError::InvalidInput { field: "weight", code: "negative" });
        }
        self.get_customer(ctx, new.customer_id).await?;
        Ok(())
    }
}
