// src/services/catalog_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, resilience::StorePolicy},
    db::PetshopStore,
    middleware::tenancy::TenantContext,
    models::catalog::{NewProduct, NewService, Product, Service},
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn PetshopStore>,
    policy: StorePolicy,
}

impl CatalogService {
    pub fn new(store: Arc<dyn PetshopStore>, policy: StorePolicy) -> Self {
        Self { store, policy }
    }

    // =========================================================================
    //  SERVIÇOS
    // =========================================================================

    pub async fn list_services(&self, ctx: &TenantContext) -> Result<Vec<Service>, AppError> {
        self.policy.read("list_services", || self.store.list_services(ctx)).await
    }

    pub async fn get_service(&self, ctx: &TenantContext, id: Uuid) -> Result<Service, AppError> {
        self.policy
            .read("find_service", || self.store.find_service(ctx, id))
            .await?
            .ok_or(AppError::NotFound { entity: "service", id })
    }

    pub async fn create_service(&self, ctx: &TenantContext, new: NewService) -> Result<Service, AppError> {
        check_service(&new)?;
        self.policy.write("insert_service", self.store.insert_service(ctx, new)).await
    }

    // Desativar é um update com active = false; serviços nunca são apagados
    pub async fn update_service(&self, ctx: &TenantContext, id: Uuid, new: NewService) -> Result<Service, AppError> {
        check_service(&new)?;
        self.policy
            .write("update_service", self.store.update_service(ctx, id, new))
            .await?
            .ok_or(AppError::NotFound { entity: "service", id })
    }

    // =========================================================================
    //  PRODUTOS
    // =========================================================================

    pub async fn list_products(&self, ctx: &TenantContext) -> Result<Vec<Product>, AppError> {
        self.policy.read("list_products", || self.store.list_products(ctx)).await
    }

    pub async fn list_low_stock(&self, ctx: &TenantContext) -> Result<Vec<Product>, AppError> {
        let mut products = self.list_products(ctx).await?;
        products.retain(Product::is_low_stock);
        Ok(products)
    }

    pub async fn get_product(&self, ctx: &TenantContext, id: Uuid) -> Result<Product, AppError> {
        self.policy
            .read("find_product", || self.store.find_product(ctx, id))
            .await?
            .ok_or(AppError::NotFound { entity: "product", id })
    }

    pub async fn create_product(&self, ctx: &TenantContext, new: NewProduct) -> Result<Product, AppError> {
        check_product(&new)?;
        if new.stock_quantity < 0 {
            return Err(AppError::InvalidInput { field: "stockQuantity", code: "negative" });
        }
        self.policy.write("insert_product", self.store.insert_product(ctx, new)).await
    }

    pub async fn update_product(&self, ctx: &TenantContext, id: Uuid, new: NewProduct) -> Result<Product, AppError> {
        check_product(&new)?;
        self.policy
            .write("update_product", self.store.update_product(ctx, id, new))
            .await?
            .ok_or(AppError::NotFound { entity: "product", id })
    }

    /// Entrada de mercadoria.
    pub async fn restock(&self, ctx: &TenantContext, id: Uuid, quantity: i32) -> Result<Product, AppError> {
        if quantity <= 0 {
            return Err(AppError::InvalidInput { field: "quantity", code: "must_be_positive" });
        }
        let product = self
            .policy
            .write("restock_product", self.store.restock_product(ctx, id, quantity))
            .await?
            .ok_or(AppError::NotFound { entity: "product", id })?;
        tracing::info!(product_id = %id, quantity, stock = product.stock_quantity, "Entrada de estoque");
        Ok(product)
    }
}

fn check_service(new: &NewService) -> Result<(), AppError> {
    if new.duration_minutes <= 0 {
        return Err(AppError::InvalidInput { field: "durationMinutes", code: "must_be_positive" });
    }
    let prices = [new.price_small, new.price_medium, new.price_large];
    if prices.iter().any(Decimal::is_sign_negative) {
        return Err(AppError::InvalidInput { field: "price", code: "negative" });
    }
    Ok(())
}

fn check_product(new: &NewProduct) -> Result<(), AppError> {
    if new.price.is_sign_negative() || new.cost.is_some_and(|c| c.is_sign_negative()) {
        return Err(AppError::InvalidInput { field: "price", code: "negative" });
    }
    if new.min_stock < 0 {
        return Err(AppError::InvalidInput { field: "minStock", code: "negative" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{new_product, new_service, Fixture};

    #[tokio::test]
    async fn service_needs_positive_duration_and_non_negative_prices() {
        let fx = Fixture::new().await;
        let mut bad = new_service("Tosa", 0);
        assert!(matches!(
            fx.catalog.create_service(&fx.ctx, bad.clone()).await,
            Err(AppError::InvalidInput { field: "durationMinutes", .. })
        ));

        bad.duration_minutes = 45;
        bad.price_large = Decimal::from(-1);
        assert!(matches!(
            fx.catalog.create_service(&fx.ctx, bad).await,
            Err(AppError::InvalidInput { field: "price", .. })
        ));
    }

    #[tokio::test]
    async fn update_does_not_touch_stock_but_restock_does() {
        let fx = Fixture::new().await;
        let product = fx.product("Shampoo", Decimal::new(3990, 2), 5).await;

        let mut edit = new_product("Shampoo 1L", Decimal::new(4990, 2), 999);
        edit.min_stock = 2;
        let updated = fx.catalog.update_product(&fx.ctx, product.id, edit).await.unwrap();
        assert_eq!(updated.stock_quantity, 5);
        assert_eq!(updated.name, "Shampoo 1L");

        let restocked = fx.catalog.restock(&fx.ctx, product.id, 10).await.unwrap();
        assert_eq!(restocked.stock_quantity, 15);

        assert!(matches!(
            fx.catalog.restock(&fx.ctx, product.id, 0).await,
            Err(AppError::InvalidInput { code: "must_be_positive", .. })
        ));
    }

    #[tokio::test]
    async fn low_stock_lists_active_products_at_or_below_minimum() {
        let fx = Fixture::new().await;
        let low = fx.product("Coleira", Decimal::from(15), 1).await;
        fx.product("Ração", Decimal::from(120), 40).await;

        let mut inactive = new_product("Antigo", Decimal::from(5), 0);
        inactive.active = false;
        fx.catalog.create_product(&fx.ctx, inactive).await.unwrap();

        let listed = fx.catalog.list_low_stock(&fx.ctx).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, low.id);
    }
}
