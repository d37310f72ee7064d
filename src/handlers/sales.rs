// src/handlers/sales.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::customers::validate_not_negative,
    middleware::{i18n::Locale, rbac::OwnerOnly, tenancy::TenantContext},
    models::sale::{PaymentMethod, Sale, SaleDraft, SaleLine, SaleReceipt},
};

// Serialize: o validator exige para `length` em Vec com `nested`
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemPayload {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, message = "O carrinho está vazio."), nested)]
    pub items: Vec<SaleItemPayload>,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    #[schema(example = "5.00")]
    pub discount_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    /// Gerada pelo PDV; reenviar a mesma chave devolve a venda já registrada
    pub idempotency_key: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = CheckoutPayload,
    responses(
        (status = 201, description = "Venda registrada e estoque baixado", body = SaleReceipt),
        (status = 400, description = "Carrinho inválido ou desconto maior que o total"),
        (status = 404, description = "Produto ou cliente não encontrado"),
        (status = 409, description = "Estoque insuficiente; nada foi alterado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn checkout(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Json(payload): Json<CheckoutPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let draft = SaleDraft {
        customer_id: payload.customer_id,
        lines: payload
            .items
            .iter()
            .map(|item| SaleLine { product_id: item.product_id, quantity: item.quantity })
            .collect(),
        discount_amount: payload.discount_amount,
        payment_method: payload.payment_method,
        notes: payload.notes,
        idempotency_key: payload.idempotency_key,
    };

    let receipt = app_state
        .sales_service
        .checkout(&tenant, draft)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesQuery {
    /// Data inicial (inclusiva, UTC)
    pub from: NaiveDate,
    /// Data final (inclusiva, UTC)
    pub to: NaiveDate,
}

#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    responses(
        (status = 200, description = "Vendas do período, mais recentes primeiro", body = Vec<Sale>),
        (status = 400, description = "Período invertido")
    ),
    params(
        SalesQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Query(query): Query<SalesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sales = app_state
        .sales_service
        .list(&tenant, query.from, query.to)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(sales)))
}

#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    responses(
        (status = 200, description = "Venda com itens", body = SaleReceipt),
        (status = 404, description = "Venda não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da venda"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = app_state
        .sales_service
        .get(&tenant, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(receipt)))
}

#[utoipa::path(
    post,
    path = "/api/sales/{id}/void",
    tag = "Sales",
    responses(
        (status = 200, description = "Venda estornada; estoque devolvido", body = SaleReceipt),
        (status = 404, description = "Venda não encontrada"),
        (status = 409, description = "Venda já estornada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da venda"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn void_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = app_state
        .sales_service
        .void(&tenant, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(receipt)))
}
