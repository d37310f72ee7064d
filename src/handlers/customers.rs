// src/handlers/customers.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, rbac::OwnerOnly, tenancy::TenantContext},
    models::customer::{Customer, NewCustomer, NewPet, Pet, PetSize},
};

pub(crate) fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payload: Customer (criação e edição usam o mesmo corpo)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[validate(length(min = 1, message = "O telefone é obrigatório."))]
    #[schema(example = "(11) 99999-0000")]
    pub phone: String,
    #[validate(email(message = "E-mail inválido."))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl From<CustomerPayload> for NewCustomer {
    fn from(payload: CustomerPayload) -> Self {
        NewCustomer {
            user_id: None,
            name: payload.name,
            phone: payload.phone,
            email: payload.email,
            address: payload.address,
            notes: payload.notes,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CustomerPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Customer),
        (status = 400, description = "Dados inválidos")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .customer_service
        .create_customer(&tenant, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    responses(
        (status = 200, description = "Clientes da loja", body = Vec<Customer>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
) -> Result<impl IntoResponse, ApiError> {
    let customers = app_state
        .customer_service
        .list_customers(&tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customers)))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let customer = app_state
        .customer_service
        .get_customer(&tenant, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Customers",
    request_body = CustomerPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let customer = app_state
        .customer_service
        .update_customer(&tenant, id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customer)))
}

#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "Customers",
    responses(
        (status = 204, description = "Cliente removido (pets juntos)"),
        (status = 404, description = "Cliente não encontrado"),
        (status = 409, description = "Cliente possui agendamentos")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .customer_service
        .delete_customer(&tenant, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  PETS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PetPayload {
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Thor")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "Golden Retriever")]
    pub breed: String,
    #[validate(range(min = 0, message = "A idade não pode ser negativa."))]
    pub age: i32,
    pub size: PetSize,
    #[validate(custom(function = "validate_not_negative"))]
    pub weight: Option<Decimal>,
    pub coat_type: Option<String>,
    #[validate(url(message = "URL da foto inválida."))]
    pub photo_url: Option<String>,
    pub notes: Option<String>,
}

impl From<PetPayload> for NewPet {
    fn from(payload: PetPayload) -> Self {
        NewPet {
            customer_id: payload.customer_id,
            name: payload.name,
            breed: payload.breed,
            age: payload.age,
            size: payload.size,
            weight: payload.weight,
            coat_type: payload.coat_type,
            photo_url: payload.photo_url,
            notes: payload.notes,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct PetQuery {
    /// Filtra os pets de um cliente
    pub customer_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/pets",
    tag = "Pets",
    request_body = PetPayload,
    responses(
        (status = 201, description = "Pet cadastrado", body = Pet),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Cliente não encontrado nesta loja")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_pet(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Json(payload): Json<PetPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let pet = app_state
        .customer_service
        .create_pet(&tenant, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(pet)))
}

#[utoipa::path(
    get,
    path = "/api/pets",
    tag = "Pets",
    responses(
        (status = 200, description = "Pets da loja", body = Vec<Pet>)
    ),
    params(
        PetQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_pets(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Query(query): Query<PetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pets = app_state
        .customer_service
        .list_pets(&tenant, query.customer_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(pets)))
}

#[utoipa::path(
    get,
    path = "/api/pets/{id}",
    tag = "Pets",
    responses(
        (status = 200, description = "Pet", body = Pet),
        (status = 404, description = "Pet não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do pet"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_pet(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pet = app_state
        .customer_service
        .get_pet(&tenant, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(pet)))
}

#[utoipa::path(
    put,
    path = "/api/pets/{id}",
    tag = "Pets",
    request_body = PetPayload,
    responses(
        (status = 200, description = "Pet atualizado", body = Pet),
        (status = 404, description = "Pet ou cliente não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do pet"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_pet(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
    Json(payload): Json<PetPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let pet = app_state
        .customer_service
        .update_pet(&tenant, id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(pet)))
}

#[utoipa::path(
    delete,
    path = "/api/pets/{id}",
    tag = "Pets",
    responses(
        (status = 204, description = "Pet removido"),
        (status = 404, description = "Pet não encontrado"),
        (status = 409, description = "Pet possui agendamentos")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do pet"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_pet(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: OwnerOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .customer_service
        .delete_pet(&tenant, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
