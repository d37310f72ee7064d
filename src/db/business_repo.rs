// src/db/business_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::business::{BookingQuota, Business, BusinessSettings, MemberRole, Membership, NewBusiness},
};

// O contador mensal não é uma coluna: é contado na leitura, então nunca precisa de "reset".
const SELECT_BUSINESS: &str = r#"
    SELECT b.*,
        (SELECT COUNT(*) FROM appointments a
          WHERE a.business_id = b.id
            AND a.status <> 'cancelled'
            AND date_trunc('month', a.appointment_date) = date_trunc('month', CURRENT_DATE)
        ) AS monthly_appointments
    FROM businesses b
"#;

#[derive(Clone)]
pub struct BusinessRepository {
    pool: PgPool,
}

impl BusinessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica o vínculo de um usuário com o estabelecimento.
    /// Esta é a verificação de autorização mais importante; roda fora de qualquer tenant.
    pub async fn find_membership(
        &self,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let is_owner: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM businesses WHERE id = $1 AND owner_id = $2 AND active)",
        )
            .bind(business_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        if is_owner {
            return Ok(Some(Membership {
                business_id,
                role: MemberRole::Owner,
                customer_id: None,
            }));
        }

        // Cliente do portal: FK explícita customers.user_id (nada de casar por e-mail)
        let customer_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT c.id FROM customers c
            JOIN businesses b ON b.id = c.business_id
            WHERE c.business_id = $1 AND c.user_id = $2 AND b.active
            "#,
        )
            .bind(business_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(customer_id.map(|id| Membership {
            business_id,
            role: MemberRole::Customer,
            customer_id: Some(id),
        }))
    }

    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Business>, AppError> {
        let sql = format!("{SELECT_BUSINESS} WHERE b.owner_id = $1 ORDER BY b.name ASC");
        let businesses = sqlx::query_as::<_, Business>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(businesses)
    }

    pub async fn create_business<'e, E>(
        &self,
        executor: E,
        owner_id: Uuid,
        new: &NewBusiness,
    ) -> Result<Business, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let business = sqlx::query_as::<_, Business>(
            r#"
            INSERT INTO businesses (owner_id, name, email, phone, address, plan)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *, 0::BIGINT AS monthly_appointments
            "#,
        )
            .bind(owner_id)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(&new.address)
            .bind(new.plan)
            .fetch_one(executor)
            .await?;
        Ok(business)
    }

    pub async fn get_business<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
    ) -> Result<Option<Business>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{SELECT_BUSINESS} WHERE b.id = $1");
        let business = sqlx::query_as::<_, Business>(&sql)
            .bind(business_id)
            .fetch_optional(executor)
            .await?;
        Ok(business)
    }

    /// Trava a linha do estabelecimento até o fim da transação.
    /// Serializa as reservas concorrentes do mesmo tenant.
    pub async fn lock_quota<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
    ) -> Result<Option<BookingQuota>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quota = sqlx::query_as::<_, BookingQuota>(
            "SELECT plan, max_appointments FROM businesses WHERE id = $1 FOR UPDATE",
        )
            .bind(business_id)
            .fetch_optional(executor)
            .await?;
        Ok(quota)
    }

    pub async fn update_settings<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        settings: &BusinessSettings,
    ) -> Result<Option<Business>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let business = sqlx::query_as::<_, Business>(
            r#"
            UPDATE businesses
            SET name = $2, email = $3, phone = $4, address = $5,
                logo_url = $6, primary_color = $7, secondary_color = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING businesses.*,
                (SELECT COUNT(*) FROM appointments a
                  WHERE a.business_id = businesses.id
                    AND a.status <> 'cancelled'
                    AND date_trunc('month', a.appointment_date) = date_trunc('month', CURRENT_DATE)
                ) AS monthly_appointments
            "#,
        )
            .bind(business_id)
            .bind(&settings.name)
            .bind(&settings.email)
            .bind(&settings.phone)
            .bind(&settings.address)
            .bind(&settings.logo_url)
            .bind(&settings.primary_color)
            .bind(&settings.secondary_color)
            .fetch_optional(executor)
            .await?;
        Ok(business)
    }
}
