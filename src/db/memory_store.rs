// src/db/memory_store.rs

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PetshopStore,
    middleware::tenancy::TenantContext,
    models::{
        appointment::{ensure_slot_free, Appointment, AppointmentDraft, AppointmentFilter, AppointmentStatus, TimeSlot},
        business::{Business, BusinessSettings, MemberRole, Membership, NewBusiness},
        catalog::{NewProduct, NewService, Product, Service},
        customer::{Customer, NewCustomer, NewPet, Pet},
        report::ReportMonth,
        sale::{price_sale, Sale, SaleDraft, SaleItem, SaleReceipt, SaleStatus},
    },
};

#[derive(Default)]
struct MemoryState {
    businesses: HashMap<Uuid, Business>,
    customers: HashMap<Uuid, Customer>,
    pets: HashMap<Uuid, Pet>,
    services: HashMap<Uuid, Service>,
    products: HashMap<Uuid, Product>,
    appointments: HashMap<Uuid, Appointment>,
    sales: HashMap<Uuid, Sale>,
    sale_items: Vec<SaleItem>,
}

impl MemoryState {
    fn count_active_in(&self, business_id: Uuid, month: ReportMonth) -> i64 {
        self.appointments
            .values()
            .filter(|a| a.business_id == business_id && a.status.occupies_slot() && month.contains(a.appointment_date))
            .count() as i64
    }

    // Igual ao SELECT do Postgres: o contador é calculado na leitura
    fn business_view(&self, business: &Business) -> Business {
        let month = ReportMonth::of(Utc::now().date_naive());
        Business {
            monthly_appointments: self.count_active_in(business.id, month),
            ..business.clone()
        }
    }

    fn active_appointments(&self, business_id: Uuid) -> Vec<Appointment> {
        self.appointments
            .values()
            .filter(|a| a.business_id == business_id && a.status.occupies_slot())
            .cloned()
            .collect()
    }

    fn receipt(&self, sale: &Sale) -> SaleReceipt {
        SaleReceipt {
            sale: sale.clone(),
            items: self.sale_items.iter().filter(|i| i.sale_id == sale.id).cloned().collect(),
        }
    }

    /// Soma `delta` ao estoque; sem efeito se o saldo sairia de `0..=i32::MAX`.
    fn adjust_stock(&mut self, product_id: Uuid, delta: i32) -> bool {
        let Some(product) = self.products.get_mut(&product_id) else {
            return false;
        };
        match product.stock_quantity.checked_add(delta) {
            Some(next) if next >= 0 => {
                product.stock_quantity = next;
                product.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    // Desfaz uma venda parcialmente gravada, como o ROLLBACK do Postgres
    fn rollback_sale(&mut self, sale_id: Uuid, products_before: &[Product]) {
        self.sales.remove(&sale_id);
        self.sale_items.retain(|i| i.sale_id != sale_id);
        for product in products_before {
            self.products.insert(product.id, product.clone());
        }
    }

    fn check_booking(
        &self,
        business_id: Uuid,
        slot: &TimeSlot,
        ignore: Option<Uuid>,
        count_against_cap: bool,
    ) -> Result<(), AppError> {
        let business = self
            .businesses
            .get(&business_id)
            .ok_or(AppError::NotFound { entity: "business", id: business_id })?;

        ensure_slot_free(&self.active_appointments(business_id), slot, ignore)?;

        if count_against_cap {
            let booked = self.count_active_in(business_id, ReportMonth::of(slot.date()));
            business.quota().ensure_can_book(booked)?;
        }
        Ok(())
    }
}

/// Store em memória com o mesmo contrato do `PgStore`.
///
/// Um único mutex serializa as escritas, então cada operação é atômica.
/// Permite injetar falhas e latência para exercitar timeout e retry.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing_reads: RwLock<u32>,
    fail_writes: RwLock<bool>,
    fail_stock_adjust: RwLock<bool>,
    write_latency: RwLock<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// As próximas `n` leituras falham com erro de dependência.
    pub async fn fail_next_reads(&self, n: u32) {
        *self.failing_reads.write().await = n;
    }

    pub async fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.write().await = fail;
    }

    /// A próxima venda falha na última baixa de estoque, já com cabeçalho e itens gravados.
    pub async fn fail_next_stock_adjust(&self) {
        *self.fail_stock_adjust.write().await = true;
    }

    /// Atraso aplicado antes de cada escrita, antes de qualquer efeito.
    pub async fn set_write_latency(&self, latency: Duration) {
        *self.write_latency.write().await = latency;
    }

    async fn before_read(&self) -> Result<(), AppError> {
        let mut failing = self.failing_reads.write().await;
        if *failing > 0 {
            *failing -= 1;
            return Err(AppError::StoreUnavailable("falha de leitura simulada".into()));
        }
        Ok(())
    }

    async fn before_write(&self) -> Result<(), AppError> {
        let latency = *self.write_latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if *self.fail_writes.read().await {
            return Err(AppError::StoreUnavailable("falha de escrita simulada".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PetshopStore for MemoryStore {
    // =========================================================================
    //  ESTABELECIMENTOS
    // =========================================================================

    async fn create_business(&self, owner_id: Uuid, new: NewBusiness) -> Result<Business, AppError> {
        self.before_write().await?;
        let now = Utc::now();
        let business = Business {
            id: Uuid::new_v4(),
            owner_id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            address: new.address,
            logo_url: None,
            primary_color: None,
            secondary_color: None,
            plan: new.plan,
            max_appointments: None,
            monthly_appointments: 0,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.businesses.insert(business.id, business.clone());
        Ok(business)
    }

    async fn list_businesses_for_owner(&self, owner_id: Uuid) -> Result<Vec<Business>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        let mut businesses: Vec<Business> = state
            .businesses
            .values()
            .filter(|b| b.owner_id == owner_id)
            .map(|b| state.business_view(b))
            .collect();
        businesses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(businesses)
    }

    async fn find_membership(&self, user_id: Uuid, business_id: Uuid) -> Result<Option<Membership>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;

        let Some(business) = state.businesses.get(&business_id).filter(|b| b.active) else {
            return Ok(None);
        };
        if business.owner_id == user_id {
            return Ok(Some(Membership { business_id, role: MemberRole::Owner, customer_id: None }));
        }

        Ok(state
            .customers
            .values()
            .find(|c| c.business_id == business_id && c.user_id == Some(user_id))
            .map(|c| Membership { business_id, role: MemberRole::Customer, customer_id: Some(c.id) }))
    }

    async fn get_business(&self, ctx: &TenantContext) -> Result<Business, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        state
            .businesses
            .get(&ctx.business_id)
            .map(|b| state.business_view(b))
            .ok_or(AppError::NotFound { entity: "business", id: ctx.business_id })
    }

    async fn update_business(&self, ctx: &TenantContext, settings: BusinessSettings) -> Result<Business, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;
        let business = state
            .businesses
            .get_mut(&ctx.business_id)
            .ok_or(AppError::NotFound { entity: "business", id: ctx.business_id })?;
        business.name = settings.name;
        business.email = settings.email;
        business.phone = settings.phone;
        business.address = settings.address;
        business.logo_url = settings.logo_url;
        business.primary_color = settings.primary_color;
        business.secondary_color = settings.secondary_color;
        business.updated_at = Utc::now();
        let updated = business.clone();
        Ok(state.business_view(&updated))
    }

    // =========================================================================
    //  CLIENTES E PETS
    // =========================================================================

    async fn list_customers(&self, ctx: &TenantContext) -> Result<Vec<Customer>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        let mut customers: Vec<Customer> = state
            .customers
            .values()
            .filter(|c| c.business_id == ctx.business_id)
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn find_customer(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Customer>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        Ok(state.customers.get(&id).filter(|c| c.business_id == ctx.business_id).cloned())
    }

    async fn insert_customer(&self, ctx: &TenantContext, new: NewCustomer) -> Result<Customer, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;

        if let Some(user_id) = new.user_id {
            let taken = state
                .customers
                .values()
                .any(|c| c.business_id == ctx.business_id && c.user_id == Some(user_id));
            if taken {
                return Err(AppError::InvalidInput { field: "userId", code: "already_registered" });
            }
        }

        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            business_id: ctx.business_id,
            user_id: new.user_id,
            name: new.name,
            phone: new.phone,
            email: new.email,
            address: new.address,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        state.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn update_customer(&self, ctx: &TenantContext, id: Uuid, new: NewCustomer) -> Result<Option<Customer>, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;
        let Some(customer) = state.customers.get_mut(&id).filter(|c| c.business_id == ctx.business_id) else {
            return Ok(None);
        };
        customer.name = new.name;
        customer.phone = new.phone;
        customer.email = new.email;
        customer.address = new.address;
        customer.notes = new.notes;
        customer.updated_at = Utc::now();
        Ok(Some(customer.clone()))
    }

    async fn delete_customer(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;
        if !state.customers.get(&id).is_some_and(|c| c.business_id == ctx.business_id) {
            return Ok(false);
        }
        if state.appointments.values().any(|a| a.customer_id == id) {
            return Err(AppError::StillReferenced { entity: "customer" });
        }

        // Mesmo efeito das FKs: pets em cascata, vendas ficam sem cliente
        state.pets.retain(|_, p| p.customer_id != id);
        for sale in state.sales.values_mut().filter(|s| s.customer_id == Some(id)) {
            sale.customer_id = None;
        }
        state.customers.remove(&id);
        Ok(true)
    }

    async fn list_pets(&self, ctx: &TenantContext, customer_id: Option<Uuid>) -> Result<Vec<Pet>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        let mut pets: Vec<Pet> = state
            .pets
            .values()
            .filter(|p| p.business_id == ctx.business_id && customer_id.is_none_or(|c| p.customer_id == c))
            .cloned()
            .collect();
        pets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pets)
    }

    async fn find_pet(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Pet>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        Ok(state.pets.get(&id).filter(|p| p.business_id == ctx.business_id).cloned())
    }

    async fn insert_pet(&self, ctx: &TenantContext, new: NewPet) -> Result<Pet, AppError> {
        self.before_write().await?;
        let now = Utc::now();
        let pet = Pet {
            id: Uuid::new_v4(),
            business_id: ctx.business_id,
            customer_id: new.customer_id,
            name: new.name,
            breed: new.breed,
            age: new.age,
            size: new.size,
            weight: new.weight,
            coat_type: new.coat_type,
            photo_url: new.photo_url,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.pets.insert(pet.id, pet.clone());
        Ok(pet)
    }

    async fn update_pet(&self, ctx: &TenantContext, id: Uuid, new: NewPet) -> Result<Option<Pet>, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;
        let Some(pet) = state.pets.get_mut(&id).filter(|p| p.business_id == ctx.business_id) else {
            return Ok(None);
        };
        pet.customer_id = new.customer_id;
        pet.name = new.name;
        pet.breed = new.breed;
        pet.age = new.age;
        pet.size = new.size;
        pet.weight = new.weight;
        pet.coat_type = new.coat_type;
        pet.photo_url = new.photo_url;
        pet.notes = new.notes;
        pet.updated_at = Utc::now();
        Ok(Some(pet.clone()))
    }

    async fn delete_pet(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;
        if !state.pets.get(&id).is_some_and(|p| p.business_id == ctx.business_id) {
            return Ok(false);
        }
        if state.appointments.values().any(|a| a.pet_id == id) {
            return Err(AppError::StillReferenced { entity: "pet" });
        }
        state.pets.remove(&id);
        Ok(true)
    }

    // =========================================================================
    //  CATÁLOGO
    // =========================================================================

    async fn list_services(&self, ctx: &TenantContext) -> Result<Vec<Service>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        let mut services: Vec<Service> = state
            .services
            .values()
            .filter(|s| s.business_id == ctx.business_id)
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn find_service(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Service>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        Ok(state.services.get(&id).filter(|s| s.business_id == ctx.business_id).cloned())
    }

    async fn insert_service(&self, ctx: &TenantContext, new: NewService) -> Result<Service, AppError> {
        self.before_write().await?;
        let now = Utc::now();
        let service = Service {
            id: Uuid::new_v4(),
            business_id: ctx.business_id,
            name: new.name,
            description: new.description,
            duration_minutes: new.duration_minutes,
            price_small: new.price_small,
            price_medium: new.price_medium,
            price_large: new.price_large,
            active: new.active,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.services.insert(service.id, service.clone());
        Ok(service)
    }

    async fn update_service(&self, ctx: &TenantContext, id: Uuid, new: NewService) -> Result<Option<Service>, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;
        let Some(service) = state.services.get_mut(&id).filter(|s| s.business_id == ctx.business_id) else {
            return Ok(None);
        };
        service.name = new.name;
        service.description = new.description;
        service.duration_minutes = new.duration_minutes;
        service.price_small = new.price_small;
        service.price_medium = new.price_medium;
        service.price_large = new.price_large;
        service.active = new.active;
        service.updated_at = Utc::now();
        Ok(Some(service.clone()))
    }

    async fn list_products(&self, ctx: &TenantContext) -> Result<Vec<Product>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.business_id == ctx.business_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn find_product(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Product>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        Ok(state.products.get(&id).filter(|p| p.business_id == ctx.business_id).cloned())
    }

    async fn insert_product(&self, ctx: &TenantContext, new: NewProduct) -> Result<Product, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;

        if let Some(barcode) = new.barcode.as_deref() {
            let taken = state
                .products
                .values()
                .any(|p| p.business_id == ctx.business_id && p.barcode.as_deref() == Some(barcode));
            if taken {
                return Err(AppError::InvalidInput { field: "barcode", code: "already_exists" });
            }
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            business_id: ctx.business_id,
            name: new.name,
            description: new.description,
            brand: new.brand,
            category: new.category,
            barcode: new.barcode,
            unit: new.unit,
            price: new.price,
            cost: new.cost,
            stock_quantity: new.stock_quantity,
            min_stock: new.min_stock,
            active: new.active,
            created_at: now,
            updated_at: now,
        };
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, ctx: &TenantContext, id: Uuid, new: NewProduct) -> Result<Option<Product>, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;
        let Some(product) = state.products.get_mut(&id).filter(|p| p.business_id == ctx.business_id) else {
            return Ok(None);
        };
        product.name = new.name;
        product.description = new.description;
        product.brand = new.brand;
        product.category = new.category;
        product.barcode = new.barcode;
        product.unit = new.unit;
        product.price = new.price;
        product.cost = new.cost;
        product.min_stock = new.min_stock;
        product.active = new.active;
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn restock_product(&self, ctx: &TenantContext, id: Uuid, quantity: i32) -> Result<Option<Product>, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;
        let Some(product) = state.products.get_mut(&id).filter(|p| p.business_id == ctx.business_id) else {
            return Ok(None);
        };
        product.stock_quantity = product
            .stock_quantity
            .checked_add(quantity)
            .ok_or(AppError::InvalidInput { field: "quantity", code: "too_large" })?;
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    // =========================================================================
    //  AGENDAMENTOS
    // =========================================================================

    async fn list_appointments(&self, ctx: &TenantContext, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        let mut appointments: Vec<Appointment> = state
            .appointments
            .values()
            .filter(|a| a.business_id == ctx.business_id && filter.matches(a))
            .cloned()
            .collect();
        appointments.sort_by_key(|a| (a.appointment_date, a.start_time));
        Ok(appointments)
    }

    async fn find_appointment(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Appointment>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        Ok(state.appointments.get(&id).filter(|a| a.business_id == ctx.business_id).cloned())
    }

    async fn book_appointment(&self, ctx: &TenantContext, draft: AppointmentDraft) -> Result<Appointment, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;

        state.check_booking(ctx.business_id, &draft.slot, None, true)?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            business_id: ctx.business_id,
            customer_id: draft.customer_id,
            pet_id: draft.pet_id,
            service_id: draft.service_id,
            appointment_date: draft.slot.date(),
            start_time: draft.slot.start_time(),
            end_time: draft.slot.end_time(),
            status: draft.status,
            price: draft.price,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        };
        state.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn reschedule_appointment(&self, ctx: &TenantContext, id: Uuid, slot: TimeSlot) -> Result<Appointment, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;

        let current = state
            .appointments
            .get(&id)
            .filter(|a| a.business_id == ctx.business_id)
            .cloned()
            .ok_or(AppError::NotFound { entity: "appointment", id })?;
        if !current.status.is_valid_initial() {
            return Err(AppError::InvalidInput { field: "status", code: "not_reschedulable" });
        }

        let changes_month = ReportMonth::of(current.appointment_date) != ReportMonth::of(slot.date());
        state.check_booking(ctx.business_id, &slot, Some(id), changes_month)?;

        let appointment = state
            .appointments
            .get_mut(&id)
            .ok_or(AppError::NotFound { entity: "appointment", id })?;
        appointment.appointment_date = slot.date();
        appointment.start_time = slot.start_time();
        appointment.end_time = slot.end_time();
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn transition_appointment(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        expected: Option<AppointmentStatus>,
        to: AppointmentStatus,
    ) -> Result<Appointment, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;
        let appointment = state
            .appointments
            .get_mut(&id)
            .filter(|a| a.business_id == ctx.business_id)
            .ok_or(AppError::NotFound { entity: "appointment", id })?;
        appointment.status.ensure_expected(expected, to)?;
        appointment.status.ensure_transition(to)?;
        appointment.status = to;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    // =========================================================================
    //  VENDAS (PDV)
    // =========================================================================

    async fn commit_sale(&self, ctx: &TenantContext, draft: SaleDraft) -> Result<SaleReceipt, AppError> {
        self.before_write().await?;
        let fail_adjust = std::mem::take(&mut *self.fail_stock_adjust.write().await);
        let mut state = self.state.lock().await;

        if let Some(key) = draft.idempotency_key {
            let existing = state
                .sales
                .values()
                .find(|s| s.business_id == ctx.business_id && s.idempotency_key == Some(key));
            if let Some(sale) = existing {
                return Ok(state.receipt(sale));
            }
        }

        let products: Vec<Product> = draft
            .product_ids()
            .iter()
            .filter_map(|id| state.products.get(id))
            .filter(|p| p.business_id == ctx.business_id)
            .cloned()
            .collect();
        let priced = price_sale(&draft, &products)?;

        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4(),
            business_id: ctx.business_id,
            customer_id: draft.customer_id,
            total_amount: priced.total_amount,
            discount_amount: priced.discount_amount,
            final_amount: priced.final_amount,
            payment_method: draft.payment_method,
            status: SaleStatus::Completed,
            notes: draft.notes,
            idempotency_key: draft.idempotency_key,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<SaleItem> = priced
            .lines
            .iter()
            .map(|line| SaleItem {
                id: Uuid::new_v4(),
                sale_id: sale.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: line.total_price,
                created_at: now,
            })
            .collect();

        // Mesma ordem do PgStore: cabeçalho, itens, baixa de estoque
        state.sales.insert(sale.id, sale.clone());
        state.sale_items.extend(items.iter().cloned());

        let mut deltas: Vec<(Uuid, i32)> = priced.stock_deltas.iter().map(|(id, q)| (*id, *q)).collect();
        deltas.sort();
        let last = deltas.len().saturating_sub(1);
        for (i, (product_id, quantity)) in deltas.into_iter().enumerate() {
            if fail_adjust && i == last {
                state.rollback_sale(sale.id, &products);
                return Err(AppError::StoreUnavailable("falha simulada na baixa de estoque".into()));
            }
            if !state.adjust_stock(product_id, -quantity) {
                state.rollback_sale(sale.id, &products);
                let available = products
                    .iter()
                    .find(|p| p.id == product_id)
                    .map_or(0, |p| p.stock_quantity);
                return Err(AppError::InsufficientStock { product_id, requested: quantity, available });
            }
        }

        Ok(SaleReceipt { sale, items })
    }

    async fn void_sale(&self, ctx: &TenantContext, id: Uuid) -> Result<SaleReceipt, AppError> {
        self.before_write().await?;
        let mut state = self.state.lock().await;

        let sale = state
            .sales
            .get(&id)
            .filter(|s| s.business_id == ctx.business_id)
            .cloned()
            .ok_or(AppError::NotFound { entity: "sale", id })?;
        if sale.status == SaleStatus::Voided {
            return Err(AppError::SaleAlreadyVoided);
        }

        let now = Utc::now();
        let items = state.receipt(&sale).items;
        let products_before: Vec<Product> = items
            .iter()
            .filter_map(|item| state.products.get(&item.product_id))
            .cloned()
            .collect();
        for item in &items {
            let known = state.products.contains_key(&item.product_id);
            if known && !state.adjust_stock(item.product_id, item.quantity) {
                for product in &products_before {
                    state.products.insert(product.id, product.clone());
                }
                return Err(AppError::InvalidInput { field: "quantity", code: "too_large" });
            }
        }

        let sale = state
            .sales
            .get_mut(&id)
            .ok_or(AppError::NotFound { entity: "sale", id })?;
        sale.status = SaleStatus::Voided;
        sale.updated_at = now;
        Ok(SaleReceipt { sale: sale.clone(), items })
    }

    async fn list_sales(&self, ctx: &TenantContext, from: NaiveDate, to: NaiveDate) -> Result<Vec<Sale>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        let mut sales: Vec<Sale> = state
            .sales
            .values()
            .filter(|s| {
                let day = s.created_at.date_naive();
                s.business_id == ctx.business_id && day >= from && day <= to
            })
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sales)
    }

    async fn find_sale(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<SaleReceipt>, AppError> {
        self.before_read().await?;
        let state = self.state.lock().await;
        Ok(state
            .sales
            .get(&id)
            .filter(|s| s.business_id == ctx.business_id)
            .map(|s| state.receipt(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::business::SubscriptionPlan;

    fn new_business(name: &str) -> NewBusiness {
        NewBusiness {
            name: name.into(),
            email: "contato@example.com".into(),
            phone: "".into(),
            address: "".into(),
            plan: SubscriptionPlan::Basic,
        }
    }

    #[tokio::test]
    async fn membership_distinguishes_owner_customer_and_stranger() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let portal_user = Uuid::new_v4();
        let business = store.create_business(owner, new_business("Pet A")).await.unwrap();
        let ctx = TenantContext::owner(business.id, owner);

        let customer = store
            .insert_customer(
                &ctx,
                NewCustomer {
                    user_id: Some(portal_user),
                    name: "Ana".into(),
                    phone: "1".into(),
                    email: None,
                    address: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let m = store.find_membership(owner, business.id).await.unwrap().unwrap();
        assert_eq!(m.role, MemberRole::Owner);

        let m = store.find_membership(portal_user, business.id).await.unwrap().unwrap();
        assert_eq!(m.role, MemberRole::Customer);
        assert_eq!(m.customer_id, Some(customer.id));

        assert!(store.find_membership(Uuid::new_v4(), business.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_read_failures_are_consumed_one_by_one() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store.fail_next_reads(1).await;

        assert!(matches!(
            store.list_businesses_for_owner(owner).await,
            Err(AppError::StoreUnavailable(_))
        ));
        assert!(store.list_businesses_for_owner(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rows_from_another_business_are_invisible() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let a = store.create_business(owner, new_business("A")).await.unwrap();
        let b = store.create_business(owner, new_business("B")).await.unwrap();
        let ctx_a = TenantContext::owner(a.id, owner);
        let ctx_b = TenantContext::owner(b.id, owner);

        let customer = store
            .insert_customer(
                &ctx_a,
                NewCustomer {
                    user_id: None,
                    name: "Bia".into(),
                    phone: "2".into(),
                    email: None,
                    address: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert!(store.find_customer(&ctx_b, customer.id).await.unwrap().is_none());
        assert!(store.list_customers(&ctx_b).await.unwrap().is_empty());
        assert!(!store.delete_customer(&ctx_b, customer.id).await.unwrap());
        assert_eq!(store.list_customers(&ctx_a).await.unwrap().len(), 1);
    }
}
