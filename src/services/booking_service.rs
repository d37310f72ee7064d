// src/services/booking_service.rs

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::{
    common::{error::AppError, resilience::StorePolicy},
    db::PetshopStore,
    middleware::tenancy::TenantContext,
    models::appointment::{Appointment, AppointmentDraft, AppointmentFilter, AppointmentStatus, TimeSlot},
};

// Pedido de agendamento vindo do painel ou do portal
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub customer_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn PetshopStore>,
    policy: StorePolicy,
}

impl BookingService {
    pub fn new(store: Arc<dyn PetshopStore>, policy: StorePolicy) -> Self {
        Self { store, policy }
    }

    pub async fn list(&self, ctx: &TenantContext, filter: AppointmentFilter) -> Result<Vec<Appointment>, AppError> {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(AppError::InvalidInput { field: "from", code: "inverted_range" });
            }
        }
        self.policy
            .read("list_appointments", || self.store.list_appointments(ctx, &filter))
            .await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> Result<Appointment, AppError> {
        self.policy
            .read("find_appointment", || self.store.find_appointment(ctx, id))
            .await?
            .ok_or(AppError::NotFound { entity: "appointment", id })
    }

    /// Monta o agendamento (fim, preço pelo porte) e grava de forma atômica.
    pub async fn book(&self, ctx: &TenantContext, request: BookingRequest) -> Result<Appointment, AppError> {
        let draft = self.prepare(ctx, request).await?;
        self.policy
            .write("book_appointment", self.store.book_appointment(ctx, draft))
            .await
    }

    async fn prepare(&self, ctx: &TenantContext, request: BookingRequest) -> Result<AppointmentDraft, AppError> {
        let status = request.status.unwrap_or(AppointmentStatus::Pending);
        if !status.is_valid_initial() {
            return Err(AppError::InvalidInput { field: "status", code: "invalid_initial_status" });
        }

        // 1. Referências precisam existir dentro deste estabelecimento
        let customer_id = request.customer_id;
        self.policy
            .read("find_customer", || self.store.find_customer(ctx, customer_id))
            .await?
            .ok_or(AppError::NotFound { entity: "customer", id: customer_id })?;

        let pet_id = request.pet_id;
        let pet = self
            .policy
            .read("find_pet", || self.store.find_pet(ctx, pet_id))
            .await?
            .ok_or(AppError::NotFound { entity: "pet", id: pet_id })?;
        if pet.customer_id != customer_id {
            return Err(AppError::InvalidInput { field: "petId", code: "pet_not_owned" });
        }

        let service_id = request.service_id;
        let service = self
            .policy
            .read("find_service", || self.store.find_service(ctx, service_id))
            .await?
            .ok_or(AppError::NotFound { entity: "service", id: service_id })?;
        if !service.active {
            return Err(AppError::InvalidInput { field: "serviceId", code: "inactive_service" });
        }

        // 2. Intervalo e preço
        let slot = TimeSlot::from_duration(request.date, request.start_time, i64::from(service.duration_minutes));
        if !slot.stays_within_day() {
            return Err(AppError::InvalidInput { field: "startTime", code: "crosses_midnight" });
        }

        Ok(AppointmentDraft {
            customer_id,
            pet_id,
            service_id,
            slot,
            status,
            price: service.price_for(pet.size),
            notes: request.notes,
        })
    }

    /// Novo horário com a duração do serviço original; o preço não muda.
    pub async fn reschedule(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<Appointment, AppError> {
        let current = self.get(ctx, id).await?;
        let current_slot = current.slot();
        let minutes = (current_slot.end - current_slot.start).num_minutes();

        let slot = TimeSlot::from_duration(date, start_time, minutes);
        if !slot.stays_within_day() {
            return Err(AppError::InvalidInput { field: "startTime", code: "crosses_midnight" });
        }

        self.policy
            .write("reschedule_appointment", self.store.reschedule_appointment(ctx, id, slot))
            .await
    }

    pub async fn change_status(&self, ctx: &TenantContext, id: Uuid, to: AppointmentStatus) -> Result<Appointment, AppError> {
        self.policy
            .write("transition_appointment", self.store.transition_appointment(ctx, id, None, to))
            .await
    }

    // =========================================================================
    //  PORTAL DO CLIENTE
    // =========================================================================

    pub async fn my_appointments(&self, ctx: &TenantContext) -> Result<Vec<Appointment>, AppError> {
        let customer_id = ctx.customer_id.ok_or(AppError::Forbidden)?;
        let filter = AppointmentFilter { customer_id: Some(customer_id), ..Default::default() };
        self.list(ctx, filter).await
    }

    /// Pedido do portal: sempre nasce `pending`, para o próprio cliente.
    pub async fn request_from_portal(
        &self,
        ctx: &TenantContext,
        pet_id: Uuid,
        service_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        notes: Option<String>,
    ) -> Result<Appointment, AppError> {
        let customer_id = ctx.customer_id.ok_or(AppError::Forbidden)?;
        self.book(
            ctx,
            BookingRequest {
                customer_id,
                pet_id,
                service_id,
                date,
                start_time,
                status: Some(AppointmentStatus::Pending),
                notes,
            },
        )
        .await
    }

    /// O cliente só cancela os próprios pedidos ainda pendentes.
    pub async fn cancel_from_portal(&self, ctx: &TenantContext, id: Uuid) -> Result<Appointment, AppError> {
        let customer_id = ctx.customer_id.ok_or(AppError::Forbidden)?;
        let appointment = self.get(ctx, id).await?;
        if appointment.customer_id != customer_id {
            return Err(AppError::NotFound { entity: "appointment", id });
        }
        let cancelled = AppointmentStatus::Cancelled;
        appointment.status.ensure_expected(Some(AppointmentStatus::Pending), cancelled)?;
        // A checagem se repete no store, sob lock: o dono pode confirmar entre a leitura e a escrita
        self.policy
            .write(
                "transition_appointment",
                self.store
                    .transition_appointment(ctx, id, Some(AppointmentStatus::Pending), cancelled),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rust_decimal::Decimal;

    use crate::{
        db::PetshopStore,
        models::{business::SubscriptionPlan, customer::PetSize},
        test_utils::{at, day, new_customer, Fixture},
    };

    #[tokio::test]
    async fn bath_for_a_large_pet_at_nine_ends_at_ten_and_costs_fifty() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Helena").await;
        let pet = fx.pet(customer.id, PetSize::Large).await;
        let bath = fx.bath().await;

        let appointment = fx.book(customer.id, pet.id, bath.id, 9, 0).await.unwrap();

        assert_eq!(appointment.end_time, at(10, 0));
        assert_eq!(appointment.price, Decimal::from(50));
        assert_eq!(appointment.status, AppointmentStatus::Pending);
    }

    #[tokio::test]
    async fn each_size_tier_gets_its_price_regardless_of_order() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Igor").await;
        let bath = fx.bath().await;

        let sizes = [(PetSize::Large, 50), (PetSize::Small, 25), (PetSize::Medium, 35)];
        for (hour, (size, expected)) in (8u32..).zip(sizes) {
            let pet = fx.pet(customer.id, size).await;
            let appointment = fx.book(customer.id, pet.id, bath.id, hour, 0).await.unwrap();
            assert_eq!(appointment.price, Decimal::from(expected));
        }
    }

    #[tokio::test]
    async fn overlapping_booking_is_a_conflict_and_touching_is_not() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Júlia").await;
        let pet = fx.pet(customer.id, PetSize::Small).await;
        let bath = fx.bath().await;

        let first = fx.book(customer.id, pet.id, bath.id, 9, 0).await.unwrap();

        let err = fx.book(customer.id, pet.id, bath.id, 9, 30).await.unwrap_err();
        assert!(matches!(err, AppError::SlotConflict { conflicting_id } if conflicting_id == first.id));
        assert_eq!(err.kind(), crate::common::error::ErrorKind::Conflict);

        assert!(fx.book(customer.id, pet.id, bath.id, 9, 0).await.is_err());
        assert!(fx.book(customer.id, pet.id, bath.id, 10, 0).await.is_ok());
    }

    #[tokio::test]
    async fn cancelled_appointment_frees_its_slot() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Kátia").await;
        let pet = fx.pet(customer.id, PetSize::Small).await;
        let bath = fx.bath().await;

        let first = fx.book(customer.id, pet.id, bath.id, 14, 0).await.unwrap();
        fx.booking
            .change_status(&fx.ctx, first.id, AppointmentStatus::Cancelled)
            .await
            .unwrap();

        assert!(fx.book(customer.id, pet.id, bath.id, 14, 0).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_bookings_for_the_same_slot_let_only_one_through() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Léo").await;
        let pet = fx.pet(customer.id, PetSize::Medium).await;
        let bath = fx.bath().await;

        let (a, b) = tokio::join!(
            fx.book(customer.id, pet.id, bath.id, 11, 0),
            fx.book(customer.id, pet.id, bath.id, 11, 15),
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    }

    #[tokio::test]
    async fn rejects_foreign_pet_inactive_service_and_midnight_crossing() {
        let fx = Fixture::new().await;
        let ana = fx.customer("Ana").await;
        let bruno = fx.customer("Bruno").await;
        let brunos_pet = fx.pet(bruno.id, PetSize::Small).await;
        let anas_pet = fx.pet(ana.id, PetSize::Small).await;
        let bath = fx.bath().await;

        assert!(matches!(
            fx.book(ana.id, brunos_pet.id, bath.id, 9, 0).await,
            Err(AppError::InvalidInput { code: "pet_not_owned", .. })
        ));

        assert!(matches!(
            fx.book(ana.id, anas_pet.id, bath.id, 23, 30).await,
            Err(AppError::InvalidInput { code: "crosses_midnight", .. })
        ));

        let mut inactive = crate::test_utils::new_service("Hidratação", 30);
        inactive.active = false;
        let inactive = fx.catalog.create_service(&fx.ctx, inactive).await.unwrap();
        assert!(matches!(
            fx.book(ana.id, anas_pet.id, inactive.id, 9, 0).await,
            Err(AppError::InvalidInput { code: "inactive_service", .. })
        ));

        let ghost = Uuid::new_v4();
        assert!(matches!(
            fx.book(ana.id, anas_pet.id, ghost, 9, 0).await,
            Err(AppError::NotFound { entity: "service", .. })
        ));
    }

    #[tokio::test]
    async fn references_from_another_tenant_are_not_found() {
        let fx = Fixture::new().await;
        let other = fx.other_tenant().await;
        let customer = fx.customer("Mara").await;
        let pet = fx.pet(customer.id, PetSize::Small).await;
        let bath = fx.bath().await;

        let request = BookingRequest {
            customer_id: customer.id,
            pet_id: pet.id,
            service_id: bath.id,
            date: day(),
            start_time: at(9, 0),
            status: None,
            notes: None,
        };
        assert!(matches!(
            fx.booking.book(&other, request).await,
            Err(AppError::NotFound { entity: "customer", .. })
        ));
    }

    #[tokio::test]
    async fn free_plan_cap_is_enforced_per_month() {
        let fx = Fixture::with_plan(SubscriptionPlan::Free).await;
        let customer = fx.customer("Nina").await;
        let pet = fx.pet(customer.id, PetSize::Small).await;
        let short = fx
            .catalog
            .create_service(&fx.ctx, crate::test_utils::new_service("Corte de unha", 15))
            .await
            .unwrap();

        // 30 encaixes de 15 minutos, sem sobreposição
        for i in 0..30u32 {
            let start = at(8, 0) + chrono::Duration::minutes(i64::from(i) * 15);
            let request = BookingRequest {
                customer_id: customer.id,
                pet_id: pet.id,
                service_id: short.id,
                date: day(),
                start_time: start,
                status: None,
                notes: None,
            };
            fx.booking.book(&fx.ctx, request).await.unwrap();
        }

        let next = BookingRequest {
            customer_id: customer.id,
            pet_id: pet.id,
            service_id: short.id,
            date: day(),
            start_time: at(18, 0),
            status: None,
            notes: None,
        };
        assert!(matches!(
            fx.booking.book(&fx.ctx, next.clone()).await,
            Err(AppError::MonthlyLimitReached { limit: 30 })
        ));

        // Mês seguinte tem a própria cota
        let next_month = BookingRequest { date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(), ..next };
        assert!(fx.booking.book(&fx.ctx, next_month).await.is_ok());
    }

    #[tokio::test]
    async fn reschedule_keeps_duration_and_price_and_checks_conflicts() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Otávio").await;
        let pet = fx.pet(customer.id, PetSize::Large).await;
        let bath = fx.bath().await;

        let morning = fx.book(customer.id, pet.id, bath.id, 9, 0).await.unwrap();
        let noon = fx.book(customer.id, pet.id, bath.id, 12, 0).await.unwrap();

        let moved = fx.booking.reschedule(&fx.ctx, morning.id, day(), at(15, 0)).await.unwrap();
        assert_eq!((moved.start_time, moved.end_time), (at(15, 0), at(16, 0)));
        assert_eq!(moved.price, morning.price);

        assert!(matches!(
            fx.booking.reschedule(&fx.ctx, moved.id, day(), at(12, 30)).await,
            Err(AppError::SlotConflict { conflicting_id }) if conflicting_id == noon.id
        ));
        // Remarcar sobre o próprio horário não é conflito
        assert!(fx.booking.reschedule(&fx.ctx, noon.id, day(), at(12, 30)).await.is_ok());
    }

    #[tokio::test]
    async fn status_follows_the_transition_table() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Paula").await;
        let pet = fx.pet(customer.id, PetSize::Small).await;
        let bath = fx.bath().await;
        let a = fx.book(customer.id, pet.id, bath.id, 9, 0).await.unwrap();

        assert!(matches!(
            fx.booking.change_status(&fx.ctx, a.id, AppointmentStatus::Completed).await,
            Err(AppError::InvalidStatusTransition { .. })
        ));
        fx.booking.change_status(&fx.ctx, a.id, AppointmentStatus::Confirmed).await.unwrap();
        fx.booking.change_status(&fx.ctx, a.id, AppointmentStatus::Completed).await.unwrap();
        assert!(matches!(
            fx.booking.change_status(&fx.ctx, a.id, AppointmentStatus::Cancelled).await,
            Err(AppError::InvalidStatusTransition { .. })
        ));
    }

    #[tokio::test]
    async fn portal_customer_requests_and_cancels_only_own_pending() {
        let fx = Fixture::new().await;
        let bath = fx.bath().await;
        let user = Uuid::new_v4();
        let me = fx
            .customers
            .register_portal_customer(user, fx.ctx.business_id, new_customer("Quitéria"))
            .await
            .unwrap();
        let my_pet = fx.pet(me.id, PetSize::Medium).await;
        let portal = fx.portal_context(user).await;

        let requested = fx
            .booking
            .request_from_portal(&portal, my_pet.id, bath.id, day(), at(10, 0), None)
            .await
            .unwrap();
        assert_eq!(requested.status, AppointmentStatus::Pending);
        assert_eq!(requested.price, Decimal::from(35));

        // Agendamento de outro cliente é invisível para o portal
        let someone = fx.customer("Rui").await;
        let their_pet = fx.pet(someone.id, PetSize::Small).await;
        let theirs = fx.book(someone.id, their_pet.id, bath.id, 16, 0).await.unwrap();
        assert!(matches!(
            fx.booking.cancel_from_portal(&portal, theirs.id).await,
            Err(AppError::NotFound { .. })
        ));

        let mine = fx.booking.my_appointments(&portal).await.unwrap();
        assert_eq!(mine.len(), 1);

        let cancelled = fx.booking.cancel_from_portal(&portal, requested.id).await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn portal_cancel_loses_to_an_owner_confirmation_in_flight() {
        let fx = Fixture::new().await;
        let bath = fx.bath().await;
        let user = Uuid::new_v4();
        let me = fx
            .customers
            .register_portal_customer(user, fx.ctx.business_id, new_customer("Sílvia"))
            .await
            .unwrap();
        let pet = fx.pet(me.id, PetSize::Small).await;
        let portal = fx.portal_context(user).await;
        let requested = fx
            .booking
            .request_from_portal(&portal, pet.id, bath.id, day(), at(9, 0), None)
            .await
            .unwrap();

        // O cancelamento lê `pending` e fica parado antes de gravar;
        // nesse intervalo o dono confirma.
        fx.store.set_write_latency(Duration::from_millis(100)).await;
        let (cancel, confirm) = tokio::join!(fx.booking.cancel_from_portal(&portal, requested.id), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            fx.store.set_write_latency(Duration::ZERO).await;
            fx.booking
                .change_status(&fx.ctx, requested.id, AppointmentStatus::Confirmed)
                .await
        });

        assert_eq!(confirm.unwrap().status, AppointmentStatus::Confirmed);
        assert!(matches!(cancel, Err(AppError::InvalidStatusTransition { .. })));
        let current = fx.booking.get(&fx.ctx, requested.id).await.unwrap();
        assert_eq!(current.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn timed_out_booking_leaves_nothing_behind() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Sara").await;
        let pet = fx.pet(customer.id, PetSize::Small).await;
        let bath = fx.bath().await;

        fx.store.set_write_latency(Duration::from_millis(500)).await;
        let err = fx.book(customer.id, pet.id, bath.id, 9, 0).await.unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }));
        fx.store.set_write_latency(Duration::ZERO).await;

        let all = fx.store.list_appointments(&fx.ctx, &AppointmentFilter::default()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn transient_read_failures_are_retried() {
        let fx = Fixture::new().await;
        fx.store.fail_next_reads(2).await;
        assert!(fx.booking.list(&fx.ctx, AppointmentFilter::default()).await.is_ok());

        fx.store.fail_next_reads(3).await;
        assert!(matches!(
            fx.booking.list(&fx.ctx, AppointmentFilter::default()).await,
            Err(AppError::StoreUnavailable(_))
        ));
    }
}
