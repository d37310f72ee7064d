// src/db/catalog_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{NewProduct, NewService, Product, Service},
};

#[derive(Clone, Default)]
pub struct CatalogRepository;

impl CatalogRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Serviços
    // ---

    pub async fn list_services<'e, E>(&self, executor: E, business_id: Uuid) -> Result<Vec<Service>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let services = sqlx::query_as::<_, Service>(
            "SELECT * FROM services WHERE business_id = $1 ORDER BY name ASC",
        )
            .bind(business_id)
            .fetch_all(executor)
            .await?;
        Ok(services)
    }

    pub async fn find_service<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Service>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE business_id = $1 AND id = $2")
            .bind(business_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(service)
    }

    pub async fn insert_service<'e, E>(&self, executor: E, business_id: Uuid, new: &NewService) -> Result<Service, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service = sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (
                business_id, name, description, duration_minutes,
                price_small, price_medium, price_large, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.duration_minutes)
            .bind(new.price_small)
            .bind(new.price_medium)
            .bind(new.price_large)
            .bind(new.active)
            .fetch_one(executor)
            .await?;
        Ok(service)
    }

    pub async fn update_service<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
        new: &NewService,
    ) -> Result<Option<Service>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let service = sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET name = $3, description = $4, duration_minutes = $5,
                price_small = $6, price_medium = $7, price_large = $8,
                active = $9, updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(id)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.duration_minutes)
            .bind(new.price_small)
            .bind(new.price_medium)
            .bind(new.price_large)
            .bind(new.active)
            .fetch_optional(executor)
            .await?;
        Ok(service)
    }

    // ---
    // Produtos
    // ---

    pub async fn list_products<'e, E>(&self, executor: E, business_id: Uuid) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE business_id = $1 ORDER BY name ASC",
        )
            .bind(business_id)
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    pub async fn find_product<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE business_id = $1 AND id = $2")
            .bind(business_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    pub async fn insert_product<'e, E>(&self, executor: E, business_id: Uuid, new: &NewProduct) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                business_id, name, description, brand, category, barcode, unit,
                price, cost, stock_quantity, min_stock, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(&new.name)
            .bind(&new.description)
            .bind(&new.brand)
            .bind(&new.category)
            .bind(&new.barcode)
            .bind(&new.unit)
            .bind(new.price)
            .bind(new.cost)
            .bind(new.stock_quantity)
            .bind(new.min_stock)
            .bind(new.active)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::InvalidInput { field: "barcode", code: "already_exists" };
                    }
                }
                e.into()
            })
    }

    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
        new: &NewProduct,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // stock_quantity fica de fora de propósito: só venda/estorno/entrada mexem nele
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $3, description = $4, brand = $5, category = $6, barcode = $7,
                unit = $8, price = $9, cost = $10, min_stock = $11, active = $12,
                updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(id)
            .bind(&new.name)
            .bind(&new.description)
            .bind(&new.brand)
            .bind(&new.category)
            .bind(&new.barcode)
            .bind(&new.unit)
            .bind(new.price)
            .bind(new.cost)
            .bind(new.min_stock)
            .bind(new.active)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }

    /// Trava as linhas dos produtos até o fim da transação, sempre na ordem do id.
    pub async fn lock_products<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE business_id = $1 AND id = ANY($2)
            ORDER BY id
            FOR UPDATE
            "#,
        )
            .bind(business_id)
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(products)
    }

    /// Soma `delta` ao estoque (negativo = baixa). Retorna `false` se o saldo ficaria negativo.
    pub async fn adjust_stock<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
        delta: i32,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $3, updated_at = NOW()
            WHERE business_id = $1 AND id = $2 AND stock_quantity + $3 >= 0
            "#,
        )
            .bind(business_id)
            .bind(id)
            .bind(delta)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn restock<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
        quantity: i32,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $3, updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(id)
            .bind(quantity)
            .fetch_optional(executor)
            .await?;
        Ok(product)
    }
}
