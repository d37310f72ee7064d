// src/handlers/catalog.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::customers::validate_not_negative,
    middleware::{i18n::Locale, rbac::OwnerOnly, tenancy::TenantContext},
    models::catalog::{NewProduct, NewService, Product, Service},
};

fn default_true() -> bool {
    true
}

// =============================================================================
//  SERVIÇOS (Banho, Tosa...)
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServicePayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Banho")]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "A duração deve ser maior que zero."))]
    #[schema(example = 60)]
    pub duration_minutes: i32,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "25.00")]
    pub price_small: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "35.00")]
    pub price_medium: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "50.00")]
    pub price_large: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl From<ServicePayload> for NewService {
    fn from(payload: ServicePayload) -> Self {
        NewService {
            name: payload.name,
            description: payload.description,
            duration_minutes: payload.duration_minutes,
            price_small: payload.price_small,
            price_medium: payload.price_medium,
            price_large: payload.price_large,
            active: payload.active,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/services",
    tag = "Catalog",
    request_body = ServicePayload,
    responses(
        (status = 201, description = "Serviço criado", body = Service),
        (status = 400, description = "Dados inválidos")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_service(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Json(payload): Json<ServicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let service = app_state
        .catalog_service
        .create_service(&tenant, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(service)))
}

// O portal também lista os serviços para o cliente escolher
#[utoipa::path(
    get,
    path = "/api/services",
    tag = "Catalog",
    responses(
        (status = 200, description = "Serviços da loja", body = Vec<Service>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_services(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut services = app_state
        .catalog_service
        .list_services(&tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    if !tenant.is_owner() {
        services.retain(|s| s.active);
    }

    Ok((StatusCode::OK, Json(services)))
}

#[utoipa::path(
    put,
    path = "/api/services/{id}",
    tag = "Catalog",
    request_body = ServicePayload,
    responses(
        (status = 200, description = "Serviço atualizado (inclusive desativação)", body = Service),
        (status = 404, description = "Serviço não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do serviço"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_service(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<ServicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let service = app_state
        .catalog_service
        .update_service(&tenant, id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(service)))
}

// =============================================================================
//  PRODUTOS (PDV)
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Shampoo Neutro 500ml")]
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub unit: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "39.90")]
    pub price: Decimal,
    #[validate(custom(function = "validate_not_negative"))]
    pub cost: Option<Decimal>,
    // Só é usado na criação; depois o estoque muda por venda ou reposição
    #[validate(range(min = 0, message = "O estoque não pode ser negativo."))]
    #[serde(default)]
    pub stock_quantity: i32,
    #[validate(range(min = 0, message = "O estoque mínimo não pode ser negativo."))]
    #[serde(default)]
    pub min_stock: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl From<ProductPayload> for NewProduct {
    fn from(payload: ProductPayload) -> Self {
        NewProduct {
            name: payload.name,
            description: payload.description,
            brand: payload.brand,
            category: payload.category,
            barcode: payload.barcode,
            unit: payload.unit,
            price: payload.price,
            cost: payload.cost,
            stock_quantity: payload.stock_quantity,
            min_stock: payload.min_stock,
            active: payload.active,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Catalog",
    request_body = ProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 400, description = "Dados inválidos ou código de barras repetido")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .create_product(&tenant, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Catalog",
    responses(
        (status = 200, description = "Produtos da loja", body = Vec<Product>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .catalog_service
        .list_products(&tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    tag = "Catalog",
    responses(
        (status = 200, description = "Produtos ativos com estoque no mínimo ou abaixo", body = Vec<Product>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_low_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .catalog_service
        .list_low_stock(&tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Catalog",
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .catalog_service
        .get_product(&tenant, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    tag = "Catalog",
    request_body = ProductPayload,
    responses(
        (status = 200, description = "Produto atualizado (estoque não muda por aqui)", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_product(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .update_product(&tenant, id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(product)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RestockPayload {
    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    #[schema(example = 12)]
    pub quantity: i32,
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/restock",
    tag = "Catalog",
    request_body = RestockPayload,
    responses(
        (status = 200, description = "Estoque reposto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn restock_product(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<RestockPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .catalog_service
        .restock(&tenant, id, payload.quantity)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(product)))
}
