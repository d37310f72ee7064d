// src/db/customer_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_fk_violation, error::AppError},
    models::customer::{Customer, NewCustomer, NewPet, Pet},
};

// Clientes (tutores) e seus pets. Toda query filtra por business_id.
#[derive(Clone, Default)]
pub struct CustomerRepository;

impl CustomerRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn list_customers<'e, E>(&self, executor: E, business_id: Uuid) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE business_id = $1 ORDER BY name ASC",
        )
            .bind(business_id)
            .fetch_all(executor)
            .await?;
        Ok(customers)
    }

    pub async fn find_customer<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE business_id = $1 AND id = $2",
        )
            .bind(business_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(customer)
    }

    pub async fn insert_customer<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        new: &NewCustomer,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (business_id, user_id, name, phone, email, address, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(new.user_id)
            .bind(&new.name)
            .bind(&new.phone)
            .bind(&new.email)
            .bind(&new.address)
            .bind(&new.notes)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                // Um usuário do portal só pode ser cliente uma vez por estabelecimento
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::InvalidInput { field: "userId", code: "already_registered" };
                    }
                }
                e.into()
            })?;
        Ok(customer)
    }

    // O vínculo com a conta (user_id) é fixado no cadastro e não muda aqui
    pub async fn update_customer<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
        new: &NewCustomer,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET name = $3, phone = $4, email = $5, address = $6, notes = $7, updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(id)
            .bind(&new.name)
            .bind(&new.phone)
            .bind(&new.email)
            .bind(&new.address)
            .bind(&new.notes)
            .fetch_optional(executor)
            .await?;
        Ok(customer)
    }

    pub async fn delete_customer<'e, E>(&self, executor: E, business_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM customers WHERE business_id = $1 AND id = $2")
            .bind(business_id)
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_fk_violation(e, "customer"))?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  PETS
    // =========================================================================

    pub async fn list_pets<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        customer_id: Option<Uuid>,
    ) -> Result<Vec<Pet>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pets = sqlx::query_as::<_, Pet>(
            r#"
            SELECT * FROM pets
            WHERE business_id = $1 AND ($2::uuid IS NULL OR customer_id = $2)
            ORDER BY name ASC
            "#,
        )
            .bind(business_id)
            .bind(customer_id)
            .fetch_all(executor)
            .await?;
        Ok(pets)
    }

    pub async fn find_pet<'e, E>(&self, executor: E, business_id: Uuid, id: Uuid) -> Result<Option<Pet>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pet = sqlx::query_as::<_, Pet>("SELECT * FROM pets WHERE business_id = $1 AND id = $2")
            .bind(business_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(pet)
    }

    // O service já garantiu que o customer_id é deste estabelecimento
    pub async fn insert_pet<'e, E>(&self, executor: E, business_id: Uuid, new: &NewPet) -> Result<Pet, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pet = sqlx::query_as::<_, Pet>(
            r#"
            INSERT INTO pets (
                business_id, customer_id, name, breed, age, size,
                weight, coat_type, photo_url, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(new.customer_id)
            .bind(&new.name)
            .bind(&new.breed)
            .bind(new.age)
            .bind(new.size)
            .bind(new.weight)
            .bind(&new.coat_type)
            .bind(&new.photo_url)
            .bind(&new.notes)
            .fetch_one(executor)
            .await?;
        Ok(pet)
    }

    pub async fn update_pet<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
        new: &NewPet,
    ) -> Result<Option<Pet>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pet = sqlx::query_as::<_, Pet>(
            r#"
            UPDATE pets
            SET customer_id = $3, name = $4, breed = $5, age = $6, size = $7,
                weight = $8, coat_type = $9, photo_url = $10, notes = $11,
                updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(id)
            .bind(new.customer_id)
            .bind(&new.name)
            .bind(&new.breed)
            .bind(new.age)
            .bind(new.size)
            .bind(new.weight)
            .bind(&new.coat_type)
            .bind(&new.photo_url)
            .bind(&new.notes)
            .fetch_optional(executor)
            .await?;
        Ok(pet)
    }

    pub async fn delete_pet<'e, E>(&self, executor: E, business_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM pets WHERE business_id = $1 AND id = $2")
            .bind(business_id)
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| map_fk_violation(e, "pet"))?;
        Ok(result.rows_affected() > 0)
    }
}
