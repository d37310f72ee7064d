// src/db/sale_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sale::{PricedLine, PricedSale, Sale, SaleDraft, SaleItem, SaleStatus},
};

#[derive(Clone, Default)]
pub struct SaleRepository;

impl SaleRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert_sale<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        draft: &SaleDraft,
        priced: &PricedSale,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (
                business_id, customer_id, total_amount, discount_amount, final_amount,
                payment_method, status, notes, idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'completed', $7, $8)
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(draft.customer_id)
            .bind(priced.total_amount)
            .bind(priced.discount_amount)
            .bind(priced.final_amount)
            .bind(draft.payment_method)
            .bind(&draft.notes)
            .bind(draft.idempotency_key)
            .fetch_one(executor)
            .await?;
        Ok(sale)
    }

    pub async fn insert_item<'e, E>(&self, executor: E, sale_id: Uuid, line: &PricedLine) -> Result<SaleItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, total_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.total_price)
            .fetch_one(executor)
            .await?;
        Ok(item)
    }

    pub async fn find_by_idempotency_key<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        key: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE business_id = $1 AND idempotency_key = $2",
        )
            .bind(business_id)
            .bind(key)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn find<'e, E>(&self, executor: E, business_id: Uuid, id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE business_id = $1 AND id = $2")
            .bind(business_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn lock<'e, E>(&self, executor: E, business_id: Uuid, id: Uuid) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE business_id = $1 AND id = $2 FOR UPDATE",
        )
            .bind(business_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn list_items<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT * FROM sale_items WHERE sale_id = $1 ORDER BY created_at ASC, id ASC",
        )
            .bind(sale_id)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    pub async fn list_between<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE business_id = $1
              AND (created_at AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
            ORDER BY created_at DESC
            "#,
        )
            .bind(business_id)
            .bind(from)
            .bind(to)
            .fetch_all(executor)
            .await?;
        Ok(sales)
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
        status: SaleStatus,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET status = $3, updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(id)
            .bind(status)
            .fetch_one(executor)
            .await?;
        Ok(sale)
    }
}
