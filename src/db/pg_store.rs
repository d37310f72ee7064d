// src/db/pg_store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    db::{
        AppointmentRepository, BusinessRepository, CatalogRepository, CustomerRepository, PetshopStore,
        SaleRepository,
    },
    middleware::tenancy::TenantContext,
    models::{
        appointment::{ensure_slot_free, Appointment, AppointmentDraft, AppointmentFilter, AppointmentStatus, TimeSlot},
        business::{Business, BusinessSettings, Membership, NewBusiness},
        catalog::{NewProduct, NewService, Product, Service},
        customer::{Customer, NewCustomer, NewPet, Pet},
        report::ReportMonth,
        sale::{price_sale, Sale, SaleDraft, SaleReceipt, SaleStatus},
    },
};

// Implementação Postgres. Cada chamada abre a própria transação com as
// variáveis de sessão do tenant; nada fica aberto entre chamadas.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    business_repo: BusinessRepository,
    customer_repo: CustomerRepository,
    catalog_repo: CatalogRepository,
    appointment_repo: AppointmentRepository,
    sale_repo: SaleRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            business_repo: BusinessRepository::new(pool.clone()),
            customer_repo: CustomerRepository::new(),
            catalog_repo: CatalogRepository::new(),
            appointment_repo: AppointmentRepository::new(),
            sale_repo: SaleRepository::new(),
            pool,
        }
    }

    async fn receipt(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        sale: Sale,
    ) -> Result<SaleReceipt, AppError> {
        let items = self.sale_repo.list_items(&mut **tx, sale.id).await?;
        Ok(SaleReceipt { sale, items })
    }

    /// Sobreposição + limite do mês, com a linha do estabelecimento já travada.
    async fn check_booking(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        business_id: Uuid,
        slot: &TimeSlot,
        ignore: Option<Uuid>,
        count_against_cap: bool,
    ) -> Result<(), AppError> {
        let quota = self
            .business_repo
            .lock_quota(&mut **tx, business_id)
            .await?
            .ok_or(AppError::NotFound { entity: "business", id: business_id })?;

        let active = self
            .appointment_repo
            .list_active_around(&mut **tx, business_id, slot.date())
            .await?;
        ensure_slot_free(&active, slot, ignore)?;

        if count_against_cap {
            let month = ReportMonth::of(slot.date());
            let booked = self
                .appointment_repo
                .count_active_between(&mut **tx, business_id, month.first_day(), month.last_day())
                .await?;
            quota.ensure_can_book(booked)?;
        }
        Ok(())
    }
}

#[async_trait]
impl PetshopStore for PgStore {
    // =========================================================================
    //  ESTABELECIMENTOS
    // =========================================================================

    async fn create_business(&self, owner_id: Uuid, new: NewBusiness) -> Result<Business, AppError> {
        self.business_repo.create_business(&self.pool, owner_id, &new).await
    }

    async fn list_businesses_for_owner(&self, owner_id: Uuid) -> Result<Vec<Business>, AppError> {
        self.business_repo.list_for_owner(owner_id).await
    }

    async fn find_membership(&self, user_id: Uuid, business_id: Uuid) -> Result<Option<Membership>, AppError> {
        self.business_repo.find_membership(user_id, business_id).await
    }

    async fn get_business(&self, ctx: &TenantContext) -> Result<Business, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let business = self.business_repo.get_business(&mut *tx, ctx.business_id).await?;
        tx.commit().await?;
        business.ok_or(AppError::NotFound { entity: "business", id: ctx.business_id })
    }

    async fn update_business(&self, ctx: &TenantContext, settings: BusinessSettings) -> Result<Business, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let business = self
            .business_repo
            .update_settings(&mut *tx, ctx.business_id, &settings)
            .await?
            .ok_or(AppError::NotFound { entity: "business", id: ctx.business_id })?;
        tx.commit().await?;
        Ok(business)
    }

    // =========================================================================
    //  CLIENTES E PETS
    // =========================================================================

    async fn list_customers(&self, ctx: &TenantContext) -> Result<Vec<Customer>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let customers = self.customer_repo.list_customers(&mut *tx, ctx.business_id).await?;
        tx.commit().await?;
        Ok(customers)
    }

    async fn find_customer(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Customer>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let customer = self.customer_repo.find_customer(&mut *tx, ctx.business_id, id).await?;
        tx.commit().await?;
        Ok(customer)
    }

    async fn insert_customer(&self, ctx: &TenantContext, new: NewCustomer) -> Result<Customer, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let customer = self.customer_repo.insert_customer(&mut *tx, ctx.business_id, &new).await?;
        tx.commit().await?;
        Ok(customer)
    }

    async fn update_customer(&self, ctx: &TenantContext, id: Uuid, new: NewCustomer) -> Result<Option<Customer>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let customer = self.customer_repo.update_customer(&mut *tx, ctx.business_id, id, &new).await?;
        tx.commit().await?;
        Ok(customer)
    }

    async fn delete_customer(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let deleted = self.customer_repo.delete_customer(&mut *tx, ctx.business_id, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn list_pets(&self, ctx: &TenantContext, customer_id: Option<Uuid>) -> Result<Vec<Pet>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let pets = self.customer_repo.list_pets(&mut *tx, ctx.business_id, customer_id).await?;
        tx.commit().await?;
        Ok(pets)
    }

    async fn find_pet(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Pet>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let pet = self.customer_repo.find_pet(&mut *tx, ctx.business_id, id).await?;
        tx.commit().await?;
        Ok(pet)
    }

    async fn insert_pet(&self, ctx: &TenantContext, new: NewPet) -> Result<Pet, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let pet = self.customer_repo.insert_pet(&mut *tx, ctx.business_id, &new).await?;
        tx.commit().await?;
        Ok(pet)
    }

    async fn update_pet(&self, ctx: &TenantContext, id: Uuid, new: NewPet) -> Result<Option<Pet>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let pet = self.customer_repo.update_pet(&mut *tx, ctx.business_id, id, &new).await?;
        tx.commit().await?;
        Ok(pet)
    }

    async fn delete_pet(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let deleted = self.customer_repo.delete_pet(&mut *tx, ctx.business_id, id).await?;
        tx.commit().await?;
        Ok(deleted)
    }

    // =========================================================================
    //  CATÁLOGO
    // =========================================================================

    async fn list_services(&self, ctx: &TenantContext) -> Result<Vec<Service>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let services = self.catalog_repo.list_services(&mut *tx, ctx.business_id).await?;
        tx.commit().await?;
        Ok(services)
    }

    async fn find_service(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Service>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let service = self.catalog_repo.find_service(&mut *tx, ctx.business_id, id).await?;
        tx.commit().await?;
        Ok(service)
    }

    async fn insert_service(&self, ctx: &TenantContext, new: NewService) -> Result<Service, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let service = self.catalog_repo.insert_service(&mut *tx, ctx.business_id, &new).await?;
        tx.commit().await?;
        Ok(service)
    }

    async fn update_service(&self, ctx: &TenantContext, id: Uuid, new: NewService) -> Result<Option<Service>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let service = self.catalog_repo.update_service(&mut *tx, ctx.business_id, id, &new).await?;
        tx.commit().await?;
        Ok(service)
    }

    async fn list_products(&self, ctx: &TenantContext) -> Result<Vec<Product>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let products = self.catalog_repo.list_products(&mut *tx, ctx.business_id).await?;
        tx.commit().await?;
        Ok(products)
    }

    async fn find_product(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Product>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let product = self.catalog_repo.find_product(&mut *tx, ctx.business_id, id).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn insert_product(&self, ctx: &TenantContext, new: NewProduct) -> Result<Product, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let product = self.catalog_repo.insert_product(&mut *tx, ctx.business_id, &new).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn update_product(&self, ctx: &TenantContext, id: Uuid, new: NewProduct) -> Result<Option<Product>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let product = self.catalog_repo.update_product(&mut *tx, ctx.business_id, id, &new).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn restock_product(&self, ctx: &TenantContext, id: Uuid, quantity: i32) -> Result<Option<Product>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let product = self.catalog_repo.restock(&mut *tx, ctx.business_id, id, quantity).await?;
        tx.commit().await?;
        Ok(product)
    }

    // =========================================================================
    //  AGENDAMENTOS
    // =========================================================================

    async fn list_appointments(&self, ctx: &TenantContext, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let appointments = self.appointment_repo.list(&mut *tx, ctx.business_id, filter).await?;
        tx.commit().await?;
        Ok(appointments)
    }

    async fn find_appointment(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let appointment = self.appointment_repo.find(&mut *tx, ctx.business_id, id).await?;
        tx.commit().await?;
        Ok(appointment)
    }

    async fn book_appointment(&self, ctx: &TenantContext, draft: AppointmentDraft) -> Result<Appointment, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;

        // 1. Lock do estabelecimento, conflito de horário e limite do plano
        self.check_booking(&mut tx, ctx.business_id, &draft.slot, None, true).await?;

        // 2. Grava
        let appointment = self.appointment_repo.insert(&mut *tx, ctx.business_id, &draft).await?;

        tx.commit().await?;
        tracing::info!(
            business_id = %ctx.business_id,
            appointment_id = %appointment.id,
            date = %appointment.appointment_date,
            "Agendamento criado"
        );
        Ok(appointment)
    }

    async fn reschedule_appointment(&self, ctx: &TenantContext, id: Uuid, slot: TimeSlot) -> Result<Appointment, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;

        let current = self
            .appointment_repo
            .lock(&mut *tx, ctx.business_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: "appointment", id })?;
        // Só pendentes e confirmados ainda podem mudar de horário
        if !current.status.is_valid_initial() {
            return Err(AppError::InvalidInput { field: "status", code: "not_reschedulable" });
        }

        // Mudou de mês: passa a contar no limite do mês novo
        let changes_month = ReportMonth::of(current.appointment_date) != ReportMonth::of(slot.date());
        self.check_booking(&mut tx, ctx.business_id, &slot, Some(id), changes_month).await?;

        let appointment = self.appointment_repo.update_slot(&mut *tx, ctx.business_id, id, &slot).await?;
        tx.commit().await?;
        Ok(appointment)
    }

    async fn transition_appointment(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        expected: Option<AppointmentStatus>,
        to: AppointmentStatus,
    ) -> Result<Appointment, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;

        let current = self
            .appointment_repo
            .lock(&mut *tx, ctx.business_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: "appointment", id })?;
        current.status.ensure_expected(expected, to)?;
        current.status.ensure_transition(to)?;

        let updated = self
            .appointment_repo
            .set_status(&mut *tx, ctx.business_id, id, current.status, to)
            .await?
            .ok_or(AppError::InvalidStatusTransition {
                from: current.status.to_string(),
                to: to.to_string(),
            })?;

        tx.commit().await?;
        tracing::info!(appointment_id = %id, from = %current.status, to = %to, "Status do agendamento alterado");
        Ok(updated)
    }

    // =========================================================================
    //  VENDAS (PDV)
    // =========================================================================

    async fn commit_sale(&self, ctx: &TenantContext, draft: SaleDraft) -> Result<SaleReceipt, AppError> {
        draft.validate_shape()?;
        let mut tx = begin_scoped(&self.pool, ctx).await?;

        // 0. Repetição da mesma venda (retry do PDV): devolve a original
        if let Some(key) = draft.idempotency_key {
            if let Some(existing) = self.sale_repo.find_by_idempotency_key(&mut *tx, ctx.business_id, key).await? {
                let receipt = self.receipt(&mut tx, existing).await?;
                tx.commit().await?;
                return Ok(receipt);
            }
        }

        // 1. Trava os produtos (ordem do id) e precifica com o estoque atual
        let products = self
            .catalog_repo
            .lock_products(&mut *tx, ctx.business_id, &draft.product_ids())
            .await?;
        let priced = price_sale(&draft, &products)?;

        // 2. Cabeçalho da venda
        let sale = match self.sale_repo.insert_sale(&mut *tx, ctx.business_id, &draft, &priced).await {
            Ok(sale) => sale,
            Err(AppError::DatabaseError(e))
                if draft.idempotency_key.is_some()
                    && e.as_database_error().is_some_and(|d| d.is_unique_violation()) =>
            {
                // Outra requisição com a mesma chave ganhou a corrida
                tx.rollback().await?;
                return self.replay_sale(ctx, draft.idempotency_key).await;
            }
            Err(e) => return Err(e),
        };

        // 3. Itens
        let mut items = Vec::with_capacity(priced.lines.len());
        for line in &priced.lines {
            items.push(self.sale_repo.insert_item(&mut *tx, sale.id, line).await?);
        }

        // 4. Baixa de estoque
        for (&product_id, &quantity) in &priced.stock_deltas {
            let applied = self
                .catalog_repo
                .adjust_stock(&mut *tx, ctx.business_id, product_id, -quantity)
                .await?;
            if !applied {
                let available = products
                    .iter()
                    .find(|p| p.id == product_id)
                    .map_or(0, |p| p.stock_quantity);
                return Err(AppError::InsufficientStock { product_id, requested: quantity, available });
            }
        }

        tx.commit().await?;
        tracing::info!(
            business_id = %ctx.business_id,
            sale_id = %sale.id,
            final_amount = %sale.final_amount,
            "Venda registrada"
        );
        Ok(SaleReceipt { sale, items })
    }

    async fn void_sale(&self, ctx: &TenantContext, id: Uuid) -> Result<SaleReceipt, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;

        let sale = self
            .sale_repo
            .lock(&mut *tx, ctx.business_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: "sale", id })?;
        if sale.status == SaleStatus::Voided {
            return Err(AppError::SaleAlreadyVoided);
        }

        let items = self.sale_repo.list_items(&mut *tx, id).await?;
        let mut ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        ids.sort();
        ids.dedup();
        self.catalog_repo.lock_products(&mut *tx, ctx.business_id, &ids).await?;

        for item in &items {
            self.catalog_repo
                .adjust_stock(&mut *tx, ctx.business_id, item.product_id, item.quantity)
                .await?;
        }

        let sale = self.sale_repo.set_status(&mut *tx, ctx.business_id, id, SaleStatus::Voided).await?;
        tx.commit().await?;
        tracing::info!(business_id = %ctx.business_id, sale_id = %id, "Venda estornada");
        Ok(SaleReceipt { sale, items })
    }

    async fn list_sales(&self, ctx: &TenantContext, from: NaiveDate, to: NaiveDate) -> Result<Vec<Sale>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let sales = self.sale_repo.list_between(&mut *tx, ctx.business_id, from, to).await?;
        tx.commit().await?;
        Ok(sales)
    }

    async fn find_sale(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<SaleReceipt>, AppError> {
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let receipt = match self.sale_repo.find(&mut *tx, ctx.business_id, id).await? {
            Some(sale) => Some(self.receipt(&mut tx, sale).await?),
            None => None,
        };
        tx.commit().await?;
        Ok(receipt)
    }
}

impl PgStore {
    async fn replay_sale(&self, ctx: &TenantContext, key: Option<Uuid>) -> Result<SaleReceipt, AppError> {
        let key = key.ok_or(AppError::InvalidInput { field: "idempotencyKey", code: "missing" })?;
        let mut tx = begin_scoped(&self.pool, ctx).await?;
        let sale = self
            .sale_repo
            .find_by_idempotency_key(&mut *tx, ctx.business_id, key)
            .await?
            .ok_or(AppError::StoreUnavailable("venda concorrente não encontrada".into()))?;
        let receipt = self.receipt(&mut tx, sale).await?;
        tx.commit().await?;
        Ok(receipt)
    }
}
