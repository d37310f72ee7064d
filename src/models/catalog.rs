// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::customer::PetSize;

// --- 1. Serviços (Banho, Tosa...) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    #[schema(ignore)]
    pub business_id: Uuid,
    #[schema(example = "Banho")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 60)]
    pub duration_minutes: i32,
    #[schema(example = "25.00")]
    pub price_small: Decimal,
    #[schema(example = "35.00")]
    pub price_medium: Decimal,
    #[schema(example = "50.00")]
    pub price_large: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    pub fn price_for(&self, size: PetSize) -> Decimal {
        match size {
            PetSize::Small => self.price_small,
            PetSize::Medium => self.price_medium,
            PetSize::Large => self.price_large,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub price_small: Decimal,
    pub price_medium: Decimal,
    pub price_large: Decimal,
    pub active: bool,
}

// --- 2. Produtos (PDV) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(ignore)]
    pub business_id: Uuid,
    #[schema(example = "Shampoo Neutro 500ml")]
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    #[schema(example = "7891234567890")]
    pub barcode: Option<String>,
    #[schema(example = "un")]
    pub unit: Option<String>,
    #[schema(example = "39.90")]
    pub price: Decimal,
    pub cost: Option<Decimal>,
    pub stock_quantity: i32,
    pub min_stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.active && self.stock_quantity <= self.min_stock
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub unit: Option<String>,
    pub price: Decimal,
    pub cost: Option<Decimal>,
    pub stock_quantity: i32,
    pub min_stock: i32,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_size_picks_its_own_price() {
        let bath = Service {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "Bath".into(),
            description: None,
            duration_minutes: 60,
            price_small: Decimal::from(25),
            price_medium: Decimal::from(35),
            price_large: Decimal::from(50),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        // A ordem das consultas não muda o resultado
        for size in [PetSize::Large, PetSize::Small, PetSize::Medium, PetSize::Large] {
            let expected = match size {
                PetSize::Small => 25,
                PetSize::Medium => 35,
                PetSize::Large => 50,
            };
            assert_eq!(bath.price_for(size), Decimal::from(expected));
        }
    }
}
