// src/models/sale.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::catalog::Product;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Pix,
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Completed,
    Voided,
}

// --- Venda ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(ignore)]
    pub business_id: Uuid,
    pub customer_id: Option<Uuid>,
    #[schema(example = "79.80")]
    pub total_amount: Decimal,
    #[schema(example = "5.00")]
    pub discount_amount: Decimal,
    #[schema(example = "74.80")]
    pub final_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
    pub idempotency_key: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = 2)]
    pub quantity: i32,
    // Copiado do produto no momento da venda
    #[schema(example = "39.90")]
    pub unit_price: Decimal,
    #[schema(example = "79.80")]
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

// Venda + itens, o que o PDV precisa para imprimir o cupom
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// --- Carrinho ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct SaleDraft {
    pub customer_id: Option<Uuid>,
    pub lines: Vec<SaleLine>,
    pub discount_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub idempotency_key: Option<Uuid>,
}

impl SaleDraft {
    /// Checagens que não dependem do estoque nem dos preços.
    pub fn validate_shape(&self) -> Result<(), AppError> {
        if self.lines.is_empty() {
            return Err(AppError::InvalidInput { field: "items", code: "empty_cart" });
        }
        if self.lines.iter().any(|l| l.quantity <= 0) {
            return Err(AppError::InvalidInput { field: "quantity", code: "must_be_positive" });
        }
        if self.discount_amount.is_sign_negative() {
            return Err(AppError::InvalidInput { field: "discountAmount", code: "negative" });
        }
        Ok(())
    }

    /// Quantidade total pedida por produto (linhas repetidas somam).
    pub fn quantities(&self) -> Result<HashMap<Uuid, i32>, AppError> {
        let mut totals: HashMap<Uuid, i32> = HashMap::new();
        for line in &self.lines {
            let total = totals.entry(line.product_id).or_insert(0);
            *total = total
                .checked_add(line.quantity)
                .ok_or(AppError::InvalidInput { field: "quantity", code: "too_large" })?;
        }
        Ok(totals)
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.lines.iter().map(|l| l.product_id).collect();
        // Ordem fixa de lock evita deadlock entre vendas concorrentes
        ids.sort();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedSale {
    pub lines: Vec<PricedLine>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    /// Quanto baixar de cada produto; nunca maior que o estoque lido.
    pub stock_deltas: HashMap<Uuid, i32>,
}

/// Precifica o carrinho a partir dos produtos lidos (e travados) pelo store.
///
/// total = Σ quantidade × preço unitário; final = total − desconto.
/// Nenhuma linha pode pedir mais do que o estoque atual.
pub fn price_sale(draft: &SaleDraft, products: &[Product]) -> Result<PricedSale, AppError> {
    draft.validate_shape()?;

    let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();
    let stock_deltas = draft.quantities()?;

    for (&product_id, &requested) in &stock_deltas {
        let product = by_id.get(&product_id).ok_or(AppError::NotFound {
            entity: "product",
            id: product_id,
        })?;
        if !product.active {
            return Err(AppError::InvalidInput { field: "productId", code: "inactive_product" });
        }
        if requested > product.stock_quantity {
            return Err(AppError::InsufficientStock {
                product_id,
                requested,
                available: product.stock_quantity,
            });
        }
    }

    let amount_overflow = || AppError::InvalidInput { field: "items", code: "amount_too_large" };
    let mut lines = Vec::with_capacity(draft.lines.len());
    let mut total_amount = Decimal::ZERO;
    for line in &draft.lines {
        let unit_price = by_id
            .get(&line.product_id)
            .map(|p| p.price)
            .ok_or(AppError::NotFound { entity: "product", id: line.product_id })?;
        let total_price = unit_price
            .checked_mul(Decimal::from(line.quantity))
            .ok_or_else(amount_overflow)?;
        total_amount = total_amount.checked_add(total_price).ok_or_else(amount_overflow)?;
        lines.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price,
            total_price,
        });
    }

    if draft.discount_amount > total_amount {
        return Err(AppError::InvalidInput { field: "discountAmount", code: "exceeds_total" });
    }

    Ok(PricedSale {
        lines,
        total_amount,
        discount_amount: draft.discount_amount,
        final_amount: total_amount - draft.discount_amount,
        stock_deltas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: Decimal, stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            name: "Shampoo".into(),
            description: None,
            brand: None,
            category: None,
            barcode: None,
            unit: Some("un".into()),
            price,
            cost: None,
            stock_quantity: stock,
            min_stock: 1,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn draft(lines: Vec<SaleLine>, discount: Decimal) -> SaleDraft {
        SaleDraft {
            customer_id: None,
            lines,
            discount_amount: discount,
            payment_method: PaymentMethod::Pix,
            notes: None,
            idempotency_key: None,
        }
    }

    #[test]
    fn totals_follow_line_prices_and_discount() {
        let shampoo = product(Decimal::new(3990, 2), 10);
        let collar = product(Decimal::new(1500, 2), 3);
        let cart = draft(
            vec![
                SaleLine { product_id: shampoo.id, quantity: 2 },
                SaleLine { product_id: collar.id, quantity: 1 },
            ],
            Decimal::new(480, 2),
        );

        let shampoo_id = shampoo.id;
        let priced = price_sale(&cart, &[shampoo, collar]).unwrap();
        let expected_total: Decimal = priced
            .lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();

        assert_eq!(priced.total_amount, expected_total);
        assert_eq!(priced.total_amount, Decimal::new(9480, 2));
        assert_eq!(priced.final_amount, priced.total_amount - priced.discount_amount);
        assert_eq!(priced.final_amount, Decimal::new(9000, 2));
        assert_eq!(priced.stock_deltas[&shampoo_id], 2);
    }

    #[test]
    fn repeated_lines_are_summed_against_stock() {
        let p = product(Decimal::ONE, 5);
        let cart = draft(
            vec![
                SaleLine { product_id: p.id, quantity: 3 },
                SaleLine { product_id: p.id, quantity: 3 },
            ],
            Decimal::ZERO,
        );

        assert!(matches!(
            price_sale(&cart, &[p]),
            Err(AppError::InsufficientStock { requested: 6, available: 5, .. })
        ));
    }

    #[test]
    fn quantities_that_overflow_are_rejected_not_wrapped() {
        let p = product(Decimal::ONE, 5);
        let cart = draft(
            vec![
                SaleLine { product_id: p.id, quantity: i32::MAX },
                SaleLine { product_id: p.id, quantity: i32::MAX },
            ],
            Decimal::ZERO,
        );

        assert!(matches!(
            price_sale(&cart, &[p]),
            Err(AppError::InvalidInput { field: "quantity", code: "too_large" })
        ));
    }

    #[test]
    fn line_total_overflow_is_an_invalid_input() {
        let p = product(Decimal::MAX, 10);
        let cart = draft(vec![SaleLine { product_id: p.id, quantity: 2 }], Decimal::ZERO);

        assert!(matches!(
            price_sale(&cart, &[p]),
            Err(AppError::InvalidInput { code: "amount_too_large", .. })
        ));
    }

    #[test]
    fn sale_total_overflow_is_an_invalid_input() {
        let a = product(Decimal::MAX, 10);
        let b = product(Decimal::MAX, 10);
        let cart = draft(
            vec![
                SaleLine { product_id: a.id, quantity: 1 },
                SaleLine { product_id: b.id, quantity: 1 },
            ],
            Decimal::ZERO,
        );

        assert!(matches!(
            price_sale(&cart, &[a, b]),
            Err(AppError::InvalidInput { code: "amount_too_large", .. })
        ));
    }

    #[test]
    fn discount_cannot_exceed_total() {
        let p = product(Decimal::from(10), 5);
        let cart = draft(vec![SaleLine { product_id: p.id, quantity: 1 }], Decimal::from(11));

        assert!(matches!(
            price_sale(&cart, &[p]),
            Err(AppError::InvalidInput { code: "exceeds_total", .. })
        ));
    }

    #[test]
    fn empty_cart_and_unknown_product_are_rejected() {
        assert!(matches!(
            price_sale(&draft(vec![], Decimal::ZERO), &[]),
            Err(AppError::InvalidInput { code: "empty_cart", .. })
        ));

        let ghost = Uuid::new_v4();
        let cart = draft(vec![SaleLine { product_id: ghost, quantity: 1 }], Decimal::ZERO);
        assert!(matches!(
            price_sale(&cart, &[]),
            Err(AppError::NotFound { entity: "product", id }) if id == ghost
        ));
    }
}
