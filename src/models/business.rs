// src/models/business.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Basic,
    Professional,
    Master,
}

impl SubscriptionPlan {
    /// Limite mensal de agendamentos do plano. `None` = ilimitado.
    pub fn default_monthly_cap(self) -> Option<i64> {
        match self {
            SubscriptionPlan::Free => Some(30),
            SubscriptionPlan::Basic => Some(200),
            SubscriptionPlan::Professional | SubscriptionPlan::Master => None,
        }
    }
}

// Papel do usuário autenticado dentro de um estabelecimento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Customer,
}

// ---
// 1. Business (O "Petshop", nosso tenant)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: Uuid,
    #[schema(ignore)]
    pub owner_id: Uuid,
    #[schema(example = "Banho & Tosa Feliz")]
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub logo_url: Option<String>,
    #[schema(example = "#8B5CF6")]
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub plan: SubscriptionPlan,
    pub max_appointments: Option<i32>,
    // Calculado na leitura: agendamentos não cancelados no mês corrente
    pub monthly_appointments: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Business {
    pub fn quota(&self) -> BookingQuota {
        BookingQuota {
            plan: self.plan,
            max_appointments: self.max_appointments,
        }
    }

    pub fn monthly_cap(&self) -> Option<i64> {
        self.quota().monthly_cap()
    }

    pub fn ensure_can_book(&self, booked_in_month: i64) -> Result<(), AppError> {
        self.quota().ensure_can_book(booked_in_month)
    }
}

// O que a reserva precisa saber do plano (lido com a linha do estabelecimento travada)
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct BookingQuota {
    pub plan: SubscriptionPlan,
    // Sobrescreve o limite padrão do plano quando preenchido
    pub max_appointments: Option<i32>,
}

impl BookingQuota {
    pub fn monthly_cap(&self) -> Option<i64> {
        self.max_appointments
            .map(i64::from)
            .or_else(|| self.plan.default_monthly_cap())
    }

    /// Recusa um novo agendamento quando o mês já atingiu o limite do plano.
    pub fn ensure_can_book(&self, booked_in_month: i64) -> Result<(), AppError> {
        match self.monthly_cap() {
            Some(limit) if booked_in_month >= limit => Err(AppError::MonthlyLimitReached { limit }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub plan: SubscriptionPlan,
}

// Campos editáveis na tela de Configurações
#[derive(Debug, Clone)]
pub struct BusinessSettings {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
}

// Resultado da verificação do tenant guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub business_id: Uuid,
    pub role: MemberRole,
    // Preenchido quando o papel é Customer (FK explícita customers.user_id)
    pub customer_id: Option<Uuid>,
}
