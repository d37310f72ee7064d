// src/db/store.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    middleware::tenancy::TenantContext,
    models::{
        appointment::{Appointment, AppointmentDraft, AppointmentFilter, AppointmentStatus, TimeSlot},
        business::{Business, BusinessSettings, Membership, NewBusiness},
        catalog::{NewProduct, NewService, Product, Service},
        customer::{Customer, NewCustomer, NewPet, Pet},
        sale::{Sale, SaleDraft, SaleReceipt},
    },
};

/// Interface de consulta particionada por tenant.
///
/// Toda operação recebe o `TenantContext` e só enxerga linhas do estabelecimento
/// dele. As operações de agendamento e de venda são atômicas: ou tudo é gravado,
/// ou nada é.
///
/// Implementações:
/// - `PgStore`: Postgres (produção)
/// - `MemoryStore`: em memória (testes e demonstração local)
#[async_trait]
pub trait PetshopStore: Send + Sync {
    // =========================================================================
    //  ESTABELECIMENTOS
    // =========================================================================

    async fn create_business(&self, owner_id: Uuid, new: NewBusiness) -> Result<Business, AppError>;

    async fn list_businesses_for_owner(&self, owner_id: Uuid) -> Result<Vec<Business>, AppError>;

    /// Vínculo do usuário com o estabelecimento: dono ou cliente (FK customers.user_id).
    async fn find_membership(&self, user_id: Uuid, business_id: Uuid) -> Result<Option<Membership>, AppError>;

    async fn get_business(&self, ctx: &TenantContext) -> Result<Business, AppError>;

    async fn update_business(&self, ctx: &TenantContext, settings: BusinessSettings) -> Result<Business, AppError>;

    // =========================================================================
    //  CLIENTES E PETS
    // =========================================================================

    async fn list_customers(&self, ctx: &TenantContext) -> Result<Vec<Customer>, AppError>;

    async fn find_customer(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Customer>, AppError>;

    async fn insert_customer(&self, ctx: &TenantContext, new: NewCustomer) -> Result<Customer, AppError>;

    async fn update_customer(&self, ctx: &TenantContext, id: Uuid, new: NewCustomer) -> Result<Option<Customer>, AppError>;

    async fn delete_customer(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, AppError>;

    async fn list_pets(&self, ctx: &TenantContext, customer_id: Option<Uuid>) -> Result<Vec<Pet>, AppError>;

    async fn find_pet(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Pet>, AppError>;

    async fn insert_pet(&self, ctx: &TenantContext, new: NewPet) -> Result<Pet, AppError>;

    async fn update_pet(&self, ctx: &TenantContext, id: Uuid, new: NewPet) -> Result<Option<Pet>, AppError>;

    async fn delete_pet(&self, ctx: &TenantContext, id: Uuid) -> Result<bool, AppError>;

    // =========================================================================
    //  CATÁLOGO
    // =========================================================================

    async fn list_services(&self, ctx: &TenantContext) -> Result<Vec<Service>, AppError>;

    async fn find_service(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Service>, AppError>;

    async fn insert_service(&self, ctx: &TenantContext, new: NewService) -> Result<Service, AppError>;

    async fn update_service(&self, ctx: &TenantContext, id: Uuid, new: NewService) -> Result<Option<Service>, AppError>;

    async fn list_products(&self, ctx: &TenantContext) -> Result<Vec<Product>, AppError>;

    async fn find_product(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Product>, AppError>;

    async fn insert_product(&self, ctx: &TenantContext, new: NewProduct) -> Result<Product, AppError>;

    /// Atualiza o cadastro. O estoque (`stock_quantity`) é ignorado: ele só muda
    /// por venda, estorno ou entrada.
    async fn update_product(&self, ctx: &TenantContext, id: Uuid, new: NewProduct) -> Result<Option<Product>, AppError>;

    /// Entrada de estoque (incremento atômico).
    async fn restock_product(&self, ctx: &TenantContext, id: Uuid, quantity: i32) -> Result<Option<Product>, AppError>;

    // =========================================================================
    //  AGENDAMENTOS
    // =========================================================================

    async fn list_appointments(&self, ctx: &TenantContext, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppError>;

    async fn find_appointment(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<Appointment>, AppError>;

    /// Sob um lock por estabelecimento: rejeita sobreposição com agendamentos
    /// ativos do dia, aplica o limite mensal do plano e grava.
    async fn book_appointment(&self, ctx: &TenantContext, draft: AppointmentDraft) -> Result<Appointment, AppError>;

    /// Move um agendamento ativo para outro intervalo, com as mesmas regras do `book_appointment`.
    async fn reschedule_appointment(&self, ctx: &TenantContext, id: Uuid, slot: TimeSlot) -> Result<Appointment, AppError>;

    /// Compare-and-set do status segundo a tabela de transições.
    /// Com `expected`, falha se o status atual (lido sob lock) for outro.
    async fn transition_appointment(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        expected: Option<AppointmentStatus>,
        to: AppointmentStatus,
    ) -> Result<Appointment, AppError>;

    // =========================================================================
    //  VENDAS (PDV)
    // =========================================================================

    /// Venda + itens + baixa de estoque em uma única unidade atômica.
    /// Com `idempotency_key` repetida, devolve a venda original sem gravar de novo.
    async fn commit_sale(&self, ctx: &TenantContext, draft: SaleDraft) -> Result<SaleReceipt, AppError>;

    /// Estorno: marca a venda como `voided` e devolve o estoque, atomicamente.
    async fn void_sale(&self, ctx: &TenantContext, id: Uuid) -> Result<SaleReceipt, AppError>;

    /// Vendas com `created_at` (data UTC) entre `from` e `to`, inclusive.
    async fn list_sales(&self, ctx: &TenantContext, from: NaiveDate, to: NaiveDate) -> Result<Vec<Sale>, AppError>;

    async fn find_sale(&self, ctx: &TenantContext, id: Uuid) -> Result<Option<SaleReceipt>, AppError>;
}
