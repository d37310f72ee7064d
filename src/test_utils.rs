// src/test_utils.rs
//
// Fixtures dos testes: um estabelecimento já criado sobre o MemoryStore,
// com os services montados como no AppState.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, resilience::StorePolicy},
    db::{MemoryStore, PetshopStore},
    middleware::tenancy::TenantContext,
    models::{
        appointment::Appointment,
        business::{NewBusiness, SubscriptionPlan},
        catalog::{NewProduct, NewService, Product, Service},
        customer::{Customer, NewCustomer, NewPet, Pet, PetSize},
    },
    services::{
        booking_service::BookingRequest, BookingService, BusinessService, CatalogService, CustomerService,
        ReportService, SalesService,
    },
};

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 14).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn fast_policy() -> StorePolicy {
    StorePolicy {
        timeout: Duration::from_millis(200),
        read_retries: 2,
        backoff: Duration::from_millis(1),
    }
}

pub fn new_business(name: &str) -> NewBusiness {
    NewBusiness {
        name: name.into(),
        email: "contato@example.com".into(),
        phone: "11 4002-8922".into(),
        address: "Rua das Flores, 10".into(),
        plan: SubscriptionPlan::Basic,
    }
}

pub fn new_customer(name: &str) -> NewCustomer {
    NewCustomer {
        user_id: None,
        name: name.into(),
        phone: "11 99999-0000".into(),
        email: None,
        address: None,
        notes: None,
    }
}

pub fn new_pet(customer_id: Uuid, size: PetSize) -> NewPet {
    NewPet {
        customer_id,
        name: "Thor".into(),
        breed: "SRD".into(),
        age: 3,
        size,
        weight: None,
        coat_type: None,
        photo_url: None,
        notes: None,
    }
}

pub fn new_service(name: &str, duration_minutes: i32) -> NewService {
    NewService {
        name: name.into(),
        description: None,
        duration_minutes,
        price_small: Decimal::from(25),
        price_medium: Decimal::from(35),
        price_large: Decimal::from(50),
        active: true,
    }
}

pub fn new_product(name: &str, price: Decimal, stock_quantity: i32) -> NewProduct {
    NewProduct {
        name: name.into(),
        description: None,
        brand: None,
        category: Some("Higiene".into()),
        barcode: None,
        unit: Some("un".into()),
        price,
        cost: None,
        stock_quantity,
        min_stock: 2,
        active: true,
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub owner_id: Uuid,
    pub ctx: TenantContext,
    pub businesses: BusinessService,
    pub customers: CustomerService,
    pub catalog: CatalogService,
    pub booking: BookingService,
    pub sales: SalesService,
    pub reports: ReportService,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_plan(SubscriptionPlan::Basic).await
    }

    pub async fn with_plan(plan: SubscriptionPlan) -> Self {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<dyn PetshopStore> = store.clone();
        let policy = fast_policy();

        let owner_id = Uuid::new_v4();
        let business = store
            .create_business(owner_id, NewBusiness { plan, ..new_business("Pet Feliz") })
            .await
            .unwrap();

        Self {
            ctx: TenantContext::owner(business.id, owner_id),
            owner_id,
            businesses: BusinessService::new(shared.clone(), policy),
            customers: CustomerService::new(shared.clone(), policy),
            catalog: CatalogService::new(shared.clone(), policy),
            booking: BookingService::new(shared.clone(), policy),
            sales: SalesService::new(shared.clone(), policy),
            reports: ReportService::new(shared, policy),
            store,
        }
    }

    /// Outro estabelecimento no mesmo store, com outro dono.
    pub async fn other_tenant(&self) -> TenantContext {
        let owner = Uuid::new_v4();
        let business = self
            .store
            .create_business(owner, new_business("Concorrente"))
            .await
            .unwrap();
        TenantContext::owner(business.id, owner)
    }

    /// Contexto como o tenant_guard montaria para um usuário do portal.
    pub async fn portal_context(&self, user_id: Uuid) -> TenantContext {
        let membership = self
            .businesses
            .membership(user_id, self.ctx.business_id)
            .await
            .unwrap()
            .unwrap();
        TenantContext::new(user_id, membership)
    }

    pub async fn customer(&self, name: &str) -> Customer {
        self.customers.create_customer(&self.ctx, new_customer(name)).await.unwrap()
    }

    pub async fn pet(&self, customer_id: Uuid, size: PetSize) -> Pet {
        self.customers
            .create_pet(&self.ctx, new_pet(customer_id, size))
            .await
            .unwrap()
    }

    /// "Bath": 60 minutos, 25 / 35 / 50.
    pub async fn bath(&self) -> Service {
        self.catalog.create_service(&self.ctx, new_service("Bath", 60)).await.unwrap()
    }

    pub async fn product(&self, name: &str, price: Decimal, stock: i32) -> Product {
        self.catalog
            .create_product(&self.ctx, new_product(name, price, stock))
            .await
            .unwrap()
    }

    pub async fn book(
        &self,
        customer_id: Uuid,
        pet_id: Uuid,
        service_id: Uuid,
        hour: u32,
        minute: u32,
    ) -> Result<Appointment, AppError> {
        self.booking
            .book(
                &self.ctx,
                BookingRequest {
                    customer_id,
                    pet_id,
                    service_id,
                    date: day(),
                    start_time: at(hour, minute),
                    status: None,
                    notes: None,
                },
            )
            .await
    }
}
