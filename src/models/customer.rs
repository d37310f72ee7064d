// src/models/customer.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Faixa de porte do pet. Só serve para escolher o preço do serviço.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pet_size", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PetSize {
    Small,
    Medium,
    Large,
}

// --- CLIENTE (Tutor) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(ignore)]
    pub business_id: Uuid,
    // Conta do portal do cliente, quando existir
    pub user_id: Option<Uuid>,
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[schema(example = "(11) 99999-0000")]
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

// --- PET ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: Uuid,
    #[schema(ignore)]
    pub business_id: Uuid,
    pub customer_id: Uuid,
    #[schema(example = "Thor")]
    pub name: String,
    #[schema(example = "Golden Retriever")]
    pub breed: String,
    pub age: i32,
    pub size: PetSize,
    #[schema(example = "28.5")]
    pub weight: Option<Decimal>,
    pub coat_type: Option<String>,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPet {
    pub customer_id: Uuid,
    pub name: String,
    pub breed: String,
    pub age: i32,
    pub size: PetSize,
    pub weight: Option<Decimal>,
    pub coat_type: Option<String>,
    pub photo_url: Option<String>,
    pub notes: Option<String>,
}
