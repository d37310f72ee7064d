// src/handlers/portal.rs
//
// Portal do cliente: o tutor autenticado vê os próprios pets e agendamentos
// e pede horários, que sempre entram como pendentes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::customers::CustomerPayload,
    middleware::{i18n::Locale, rbac::CustomerOnly, tenancy::TenantContext},
    models::{appointment::Appointment, customer::{Customer, NewCustomer, Pet}},
    services::auth::AuthenticatedUser,
};

#[utoipa::path(
    post,
    path = "/api/portal/businesses/{business_id}/register",
    tag = "Portal",
    request_body = CustomerPayload,
    responses(
        (status = 201, description = "Usuário vinculado como cliente do estabelecimento", body = Customer),
        (status = 400, description = "Usuário já é cliente deste estabelecimento"),
        (status = 404, description = "Estabelecimento não encontrado ou inativo")
    ),
    params(
        ("business_id" = Uuid, Path, description = "ID do estabelecimento")
    ),
    security(("api_jwt" = []))
)]
pub async fn register(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(business_id): Path<Uuid>,
    Json(payload): Json<CustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut new: NewCustomer = payload.into();
    // Sem e-mail informado, usa o do token
    if new.email.is_none() {
        new.email = user.email.clone();
    }

    let customer = app_state
        .customer_service
        .register_portal_customer(user.id, business_id, new)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

#[utoipa::path(
    get,
    path = "/api/portal/pets",
    tag = "Portal",
    responses(
        (status = 200, description = "Pets do cliente logado", body = Vec<Pet>),
        (status = 403, description = "Usuário não é cliente desta loja")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn my_pets(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: CustomerOnly,
) -> Result<impl IntoResponse, ApiError> {
    let customer_id = tenant
        .customer_id
        .ok_or_else(|| AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store))?;

    let pets = app_state
        .customer_service
        .list_pets(&tenant, Some(customer_id))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(pets)))
}

#[utoipa::path(
    get,
    path = "/api/portal/appointments",
    tag = "Portal",
    responses(
        (status = 200, description = "Agendamentos do cliente logado", body = Vec<Appointment>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn my_appointments(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: CustomerOnly,
) -> Result<impl IntoResponse, ApiError> {
    let appointments = app_state
        .booking_service
        .my_appointments(&tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(appointments)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequestPayload {
    pub pet_id: Uuid,
    pub service_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2025-08-14")]
    pub appointment_date: NaiveDate,
    #[schema(value_type = String, example = "10:00:00")]
    pub start_time: NaiveTime,
    #[validate(length(max = 1000, message = "Observação muito longa."))]
    pub notes: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/portal/appointments",
    tag = "Portal",
    request_body = PortalRequestPayload,
    responses(
        (status = 201, description = "Pedido de agendamento registrado como pendente", body = Appointment),
        (status = 400, description = "Pet de outro tutor ou horário inválido"),
        (status = 409, description = "Horário ocupado ou limite mensal atingido")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: CustomerOnly,
    Json(payload): Json<PortalRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let appointment = app_state
        .booking_service
        .request_from_portal(
            &tenant,
            payload.pet_id,
            payload.service_id,
            payload.appointment_date,
            payload.start_time,
            payload.notes,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[utoipa::path(
    post,
    path = "/api/portal/appointments/{id}/cancel",
    tag = "Portal",
    responses(
        (status = 200, description = "Pedido cancelado", body = Appointment),
        (status = 404, description = "Agendamento não encontrado"),
        (status = 409, description = "Só pedidos pendentes podem ser cancelados pelo portal")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do agendamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_appointment(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: CustomerOnly,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let appointment = app_state
        .booking_service
        .cancel_from_portal(&tenant, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(appointment)))
}
