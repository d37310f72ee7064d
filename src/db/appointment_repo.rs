// src/db/appointment_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::appointment::{Appointment, AppointmentDraft, AppointmentFilter, AppointmentStatus, TimeSlot},
};

#[derive(Clone, Default)]
pub struct AppointmentRepository;

impl AppointmentRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE business_id = $1
              AND ($2::date IS NULL OR appointment_date >= $2)
              AND ($3::date IS NULL OR appointment_date <= $3)
              AND ($4::uuid IS NULL OR customer_id = $4)
            ORDER BY appointment_date ASC, start_time ASC
            "#,
        )
            .bind(business_id)
            .bind(filter.from)
            .bind(filter.to)
            .bind(filter.customer_id)
            .fetch_all(executor)
            .await?;
        Ok(appointments)
    }

    pub async fn find<'e, E>(&self, executor: E, business_id: Uuid, id: Uuid) -> Result<Option<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointment = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE business_id = $1 AND id = $2",
        )
            .bind(business_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(appointment)
    }

    /// Trava o agendamento para remarcação ou mudança de status.
    pub async fn lock<'e, E>(&self, executor: E, business_id: Uuid, id: Uuid) -> Result<Option<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointment = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE business_id = $1 AND id = $2 FOR UPDATE",
        )
            .bind(business_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(appointment)
    }

    /// Agendamentos que ainda ocupam horário no dia (e no anterior, por causa de
    /// registros antigos que viraram a meia-noite).
    pub async fn list_active_around<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointments = sqlx::query_as::<_, Appointment>(
            r#"
            SELECT * FROM appointments
            WHERE business_id = $1
              AND appointment_date BETWEEN $2::date - 1 AND $2
              AND status <> 'cancelled'
            "#,
        )
            .bind(business_id)
            .bind(date)
            .fetch_all(executor)
            .await?;
        Ok(appointments)
    }

    pub async fn count_active_between<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM appointments
            WHERE business_id = $1
              AND appointment_date BETWEEN $2 AND $3
              AND status <> 'cancelled'
            "#,
        )
            .bind(business_id)
            .bind(first)
            .bind(last)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        draft: &AppointmentDraft,
    ) -> Result<Appointment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (
                business_id, customer_id, pet_id, service_id,
                appointment_date, start_time, end_time, status, price, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(draft.customer_id)
            .bind(draft.pet_id)
            .bind(draft.service_id)
            .bind(draft.slot.date())
            .bind(draft.slot.start_time())
            .bind(draft.slot.end_time())
            .bind(draft.status)
            .bind(draft.price)
            .bind(&draft.notes)
            .fetch_one(executor)
            .await?;
        Ok(appointment)
    }

    pub async fn update_slot<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
        slot: &TimeSlot,
    ) -> Result<Appointment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET appointment_date = $3, start_time = $4, end_time = $5, updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(id)
            .bind(slot.date())
            .bind(slot.start_time())
            .bind(slot.end_time())
            .fetch_one(executor)
            .await?;
        Ok(appointment)
    }

    /// Compare-and-set: só grava se o status atual ainda for `from`.
    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        business_id: Uuid,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let appointment = sqlx::query_as::<_, Appointment>(
            r#"
            UPDATE appointments
            SET status = $4, updated_at = NOW()
            WHERE business_id = $1 AND id = $2 AND status = $3
            RETURNING *
            "#,
        )
            .bind(business_id)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(executor)
            .await?;
        Ok(appointment)
    }
}
